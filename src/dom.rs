use std::collections::HashMap;

use crate::form_controls::{is_form_control_element, is_input_element, is_select_element};
use crate::{Error, Result};

/// Handle to a node of a [`Page`](crate::Page).
///
/// Handles stay valid for the lifetime of the page; a removed node keeps its
/// handle but is no longer connected to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    // Set once the value property was written; the `value` attribute stops
    // driving the property from then on.
    pub(crate) value_dirty: bool,
    pub(crate) selected: bool,
    // On a `<select>`: a value write matched no option, so nothing is
    // selected and the value reads as empty.
    pub(crate) selection_cleared: bool,
}

impl Element {
    fn new(tag_name: String, attrs: HashMap<String, String>) -> Self {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let selected = attrs.contains_key("selected");
        Self {
            tag_name,
            attrs,
            value,
            value_dirty: false,
            selected,
            selection_cleared: false,
        }
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|name| name == class_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MutationKind {
    ChildList,
    CharacterData,
    Attributes { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MutationRecord {
    pub(crate) target: NodeId,
    pub(crate) kind: MutationKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    records: Vec<MutationRecord>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            records: Vec::new(),
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        self.create_node(Some(parent), NodeType::Element(Element::new(tag_name, attrs)))
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, node_id)
    }

    pub(crate) fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node_id) {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements_dfs(*child, out);
        }
    }

    fn sibling_elements(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(node_id) else {
            return Vec::new();
        };
        self.children(parent)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub(crate) fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let siblings = self.sibling_elements(node_id);
        let pos = siblings.iter().position(|sibling| *sibling == node_id)?;
        pos.checked_sub(1).map(|prev| siblings[prev])
    }

    pub(crate) fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let siblings = self.sibling_elements(node_id);
        let pos = siblings.iter().position(|sibling| *sibling == node_id)?;
        siblings.get(pos + 1).copied()
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match self.nodes.get(node_id.0).map(|node| &node.node_type) {
            Some(NodeType::Text(text)) => text.clone(),
            Some(NodeType::Document | NodeType::Element(_)) => {
                let mut out = String::new();
                for child in self.children(node_id) {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            None => String::new(),
        }
    }

    pub(crate) fn first_text_child(&self, node_id: NodeId) -> Option<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .find(|child| matches!(self.nodes[child.0].node_type, NodeType::Text(_)))
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn is_form_control(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some_and(is_form_control_element)
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        if is_select_element(element) {
            return Ok(self.select_value(node_id));
        }
        Ok(element.value.clone())
    }

    /// Writes the `value` property. Records no mutation, like the DOM.
    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self.element(node_id).is_some_and(is_select_element) {
            self.set_select_value(node_id, value);
            return Ok(());
        }
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        element.value = value.to_string();
        element.value_dirty = true;
        Ok(())
    }

    fn select_options(&self, select_node: NodeId) -> Vec<NodeId> {
        let mut elements = Vec::new();
        self.collect_elements_dfs(select_node, &mut elements);
        elements.retain(|node| {
            self.tag_name(*node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("option"))
        });
        elements
    }

    fn option_value(&self, option_node: NodeId) -> String {
        self.attr(option_node, "value")
            .unwrap_or_else(|| self.text_content(option_node).trim().to_string())
    }

    pub(crate) fn has_option_value(&self, select_node: NodeId, value: &str) -> bool {
        self.select_options(select_node)
            .into_iter()
            .any(|option| self.option_value(option) == value)
    }

    fn select_value(&self, select_node: NodeId) -> String {
        let options = self.select_options(select_node);
        let selected = options
            .iter()
            .rev()
            .find(|option| self.element(**option).is_some_and(|e| e.selected));
        let cleared = self
            .element(select_node)
            .is_some_and(|select| select.selection_cleared);
        // Markup without a `selected` option shows its first option.
        let shown = if cleared {
            selected
        } else {
            selected.or_else(|| options.first())
        };
        shown
            .map(|option| self.option_value(*option))
            .unwrap_or_default()
    }

    fn set_select_value(&mut self, select_node: NodeId, requested: &str) {
        let options = self.select_options(select_node);
        let matched = options
            .iter()
            .copied()
            .find(|option| self.option_value(*option) == requested);
        for option in options {
            if let Some(element) = self.element_mut(option) {
                element.selected = Some(option) == matched;
            }
        }
        if let Some(select) = self.element_mut(select_node) {
            select.selection_cleared = matched.is_none();
        }
    }

    fn select_option(&mut self, option_node: NodeId) {
        let Some(select_node) = self.find_ancestor_by_tag(option_node, "select") else {
            return;
        };
        for option in self.select_options(select_node) {
            if let Some(element) = self.element_mut(option) {
                element.selected = option == option_node;
            }
        }
        if let Some(select) = self.element_mut(select_node) {
            select.selection_cleared = false;
        }
    }

    /// Syncs property values that follow markup until a script writes them.
    pub(crate) fn initialize_form_control_values(&mut self) {
        let mut elements = Vec::new();
        self.collect_elements_dfs(self.root, &mut elements);
        for node in elements {
            let is_textarea = self
                .tag_name(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("textarea"));
            if is_textarea {
                let text = self.text_content(node);
                if let Some(element) = self.element_mut(node)
                    && !element.value_dirty
                {
                    element.value = text;
                }
            }
        }
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("attribute target is not an element".into()))?;
        element.attrs.insert(name.clone(), value.to_string());
        if name == "value" && is_input_element(element) && !element.value_dirty {
            element.value = value.to_string();
        }
        let is_option = element.tag_name.eq_ignore_ascii_case("option");
        if name == "selected" && is_option {
            self.select_option(node_id);
        }
        self.records.push(MutationRecord {
            target: node_id,
            kind: MutationKind::Attributes { name },
        });
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("attribute target is not an element".into()))?;
        if element.attrs.remove(&name).is_none() {
            return Ok(());
        }
        if name == "value" && is_input_element(element) && !element.value_dirty {
            element.value.clear();
        }
        self.records.push(MutationRecord {
            target: node_id,
            kind: MutationKind::Attributes { name },
        });
        Ok(())
    }

    pub(crate) fn set_text_content(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if let Some(NodeType::Text(text)) = self.nodes.get_mut(node_id.0).map(|n| &mut n.node_type)
        {
            *text = value.to_string();
            self.records.push(MutationRecord {
                target: node_id,
                kind: MutationKind::CharacterData,
            });
            return Ok(());
        }
        if self.element(node_id).is_none() {
            return Err(Error::Dom(
                "textContent target is not an element".into(),
            ));
        }

        self.detach_children(node_id);
        if !value.is_empty() {
            self.create_text(node_id, value.to_string());
        }
        self.after_children_changed(node_id);
        Ok(())
    }

    pub(crate) fn append_fragment(&mut self, parent: NodeId, fragment: &Dom) -> Result<()> {
        if self.element(parent).is_none() {
            return Err(Error::Dom("append target is not an element".into()));
        }
        for child in fragment.children(fragment.root).to_vec() {
            self.clone_subtree_from_dom(fragment, child, parent)?;
        }
        self.after_children_changed(parent);
        Ok(())
    }

    pub(crate) fn replace_children(&mut self, parent: NodeId, fragment: &Dom) -> Result<()> {
        if self.element(parent).is_none() {
            return Err(Error::Dom("innerHTML target is not an element".into()));
        }
        self.detach_children(parent);
        for child in fragment.children(fragment.root).to_vec() {
            self.clone_subtree_from_dom(fragment, child, parent)?;
        }
        self.after_children_changed(parent);
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> Result<()> {
        let parent = self
            .parent(node_id)
            .ok_or_else(|| Error::Dom("cannot remove a detached node".into()))?;
        self.nodes[parent.0].children.retain(|child| *child != node_id);
        self.nodes[node_id.0].parent = None;
        self.after_children_changed(parent);
        Ok(())
    }

    pub(crate) fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    fn detach_children(&mut self, node_id: NodeId) {
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }
    }

    fn after_children_changed(&mut self, node_id: NodeId) {
        self.records.push(MutationRecord {
            target: node_id,
            kind: MutationKind::ChildList,
        });
        let follows_text = self.element(node_id).is_some_and(|element| {
            element.tag_name.eq_ignore_ascii_case("textarea") && !element.value_dirty
        });
        if follows_text {
            let text = self.text_content(node_id);
            if let Some(element) = self.element_mut(node_id) {
                element.value = text;
            }
        }
    }

    fn clone_subtree_from_dom(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: NodeId,
    ) -> Result<NodeId> {
        let node_type = match &source.nodes[source_node.0].node_type {
            NodeType::Document => {
                return Err(Error::Dom(
                    "cannot clone a document node into an element".into(),
                ));
            }
            NodeType::Element(element) => NodeType::Element(element.clone()),
            NodeType::Text(text) => NodeType::Text(text.clone()),
        };

        let node = self.create_node(Some(parent), node_type);
        for child in source.children(source_node) {
            self.clone_subtree_from_dom(source, *child, node)?;
        }
        Ok(node)
    }

    /// Short `tag#id.class` label used in trace lines.
    pub(crate) fn node_label(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return match self.nodes.get(node_id.0).map(|node| &node.node_type) {
                Some(NodeType::Document) => "#document".to_string(),
                Some(NodeType::Text(_)) => "#text".to_string(),
                _ => "#unknown".to_string(),
            };
        };
        let mut label = element.tag_name.clone();
        if let Some(id) = element.attrs.get("id") {
            label.push('#');
            label.push_str(id);
        }
        if let Some(classes) = element.attrs.get("class") {
            for class_name in classes.split_whitespace() {
                label.push('.');
                label.push_str(class_name);
            }
        }
        label
    }
}
