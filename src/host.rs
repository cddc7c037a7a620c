//! Capability seam between the engine and the document it reads.
//!
//! The engine never touches a concrete DOM. It asks a [`Document`] to resolve
//! selectors and read text, values and attributes, and it asks an
//! [`ObservationHost`] to attach mutation watchers, event listeners and
//! interval timers. Every attachment hands back a [`Registration`] that
//! detaches on drop.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Zero-argument notification invoked whenever a change may have happened.
pub type Callback = Rc<dyn Fn()>;

/// What an element can do, as far as value extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Input, select or textarea: carries a live `value` property that scripts
    /// can change without touching the markup.
    FormControl,
    /// Anything else; its state only changes through DOM mutation.
    Generic,
}

/// Which input of the total a selector feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Price,
    Quantity,
}

impl Role {
    pub fn selector_label(self) -> &'static str {
        match self {
            Self::Price => "priceSelector",
            Self::Quantity => "quantitySelector",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => f.write_str("price"),
            Self::Quantity => f.write_str("quantity"),
        }
    }
}

/// A selector paired with the role it feeds.
///
/// Holds the selector text only; [`SelectorBinding::resolve`] queries the
/// document afresh on every call because the bound element or its content may
/// be replaced between calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorBinding {
    pub role: Role,
    pub selector: String,
}

impl SelectorBinding {
    pub fn new(role: Role, selector: impl Into<String>) -> Self {
        Self {
            role,
            selector: selector.into(),
        }
    }

    pub fn resolve<D: Document + ?Sized>(&self, doc: &D) -> Option<D::Element> {
        doc.query_selector(&self.selector)
    }
}

impl fmt::Display for SelectorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.role.selector_label(), self.selector)
    }
}

/// Native interaction events a form control emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeEvent {
    Input,
    Change,
    KeyUp,
}

impl NativeEvent {
    pub const FORM_CONTROL_EVENTS: [NativeEvent; 3] = [Self::Input, Self::Change, Self::KeyUp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
            Self::KeyUp => "keyup",
        }
    }
}

/// Which kinds of mutation a watcher reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationWatch {
    pub child_list: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attributes: bool,
    /// Attribute names to react to; empty means every attribute.
    pub attribute_filter: Vec<String>,
}

impl MutationWatch {
    /// Structure and text anywhere below the element.
    pub fn content() -> Self {
        Self {
            child_list: true,
            character_data: true,
            subtree: true,
            ..Self::default()
        }
    }

    /// Structure, text, and the `value`/`data-value` attributes.
    pub fn content_and_value_attributes() -> Self {
        Self {
            attributes: true,
            attribute_filter: vec!["value".to_string(), "data-value".to_string()],
            ..Self::content()
        }
    }

    pub fn accepts_attribute(&self, name: &str) -> bool {
        if !self.attributes && self.attribute_filter.is_empty() {
            return false;
        }
        self.attribute_filter.is_empty() || self.attribute_filter.iter().any(|it| it == name)
    }
}

/// Read access to the live document.
///
/// Selectors are resolved on every call; implementations must not cache
/// element handles between calls. An unparsable selector resolves to `None`.
pub trait Document {
    type Element: Clone + 'static;

    fn query_selector(&self, selector: &str) -> Option<Self::Element>;

    fn element_kind(&self, element: &Self::Element) -> ElementKind;

    /// Concatenated text of the element and all of its descendants.
    fn text_content(&self, element: &Self::Element) -> String;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Live `value` property; `None` for elements that have none.
    fn value(&self, element: &Self::Element) -> Option<String>;
}

/// Attachment points the change observer needs on top of [`Document`].
pub trait ObservationHost: Document + Clone + 'static {
    fn watch_mutations(
        &self,
        element: &Self::Element,
        watch: MutationWatch,
        callback: Callback,
    ) -> Registration;

    fn listen(&self, element: &Self::Element, event: NativeEvent, callback: Callback)
    -> Registration;

    /// Runs `tick` every `period`. The host passes itself to each tick so the
    /// timer does not need to own a handle back to the host.
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut(&Self)>) -> Registration;
}

/// Optional third-party event library living on the host page.
///
/// `events` is a space-separated list such as `"change input"`. Returning
/// `None` means the bridge could not attach; that is never an error.
pub trait EventBridge<E> {
    fn on(&self, element: &E, events: &str, callback: Callback) -> Option<Registration>;
}

/// One attached hook. Dropping it detaches the hook.
#[must_use = "dropping a Registration detaches it immediately"]
pub struct Registration {
    release: Option<Box<dyn FnOnce()>>,
}

impl Registration {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Detaches now instead of at drop.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("attached", &self.release.is_some())
            .finish()
    }
}

/// Every hook attached for one selector binding.
///
/// Released as a unit when dropped or cancelled.
#[derive(Debug)]
#[must_use = "dropping a Subscription stops observing immediately"]
pub struct Subscription {
    binding: SelectorBinding,
    registrations: Vec<Registration>,
}

impl Subscription {
    pub(crate) fn new(binding: SelectorBinding, registrations: Vec<Registration>) -> Self {
        Self {
            binding,
            registrations,
        }
    }

    pub fn binding(&self) -> &SelectorBinding {
        &self.binding
    }

    pub fn role(&self) -> Role {
        self.binding.role
    }

    pub fn selector(&self) -> &str {
        &self.binding.selector
    }

    /// Number of underlying hooks (watchers, listeners, timers, bridge hooks).
    pub fn hook_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn cancel(self) {
        for registration in self.registrations {
            registration.release();
        }
    }
}
