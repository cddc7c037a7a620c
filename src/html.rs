//! Forgiving HTML reader for merchant markup.
//!
//! Covers what product pages actually contain: comments, doctype, void and
//! self-closing elements, the usual implied end tags (`<option>`, `<li>`,
//! `<p>`) and character references. Raw-text elements keep their body as
//! inert text. Structural garbage is recovered from; only input that cannot
//! be delimited at all (an unterminated comment, tag or quoted attribute) is
//! an error.

use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut builder = TreeBuilder::new(html);
    builder.run()?;
    let mut dom = builder.dom;
    dom.initialize_form_control_values();
    dom.take_records();
    Ok(dom)
}

struct StartTag {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

struct TreeBuilder<'a> {
    source: &'a str,
    pos: usize,
    dom: Dom,
    open: Vec<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        let dom = Dom::new();
        let open = vec![dom.root()];
        Self {
            source,
            pos: 0,
            dom,
            open,
        }
    }

    fn rest(&self) -> &'a str {
        let source: &'a str = self.source;
        &source[self.pos..]
    }

    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.dom.root())
    }

    fn run(&mut self) -> Result<()> {
        while !self.rest().is_empty() {
            let rest = self.rest();
            if let Some(body) = rest.strip_prefix("<!--") {
                let end = body
                    .find("-->")
                    .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
                self.pos += 4 + end + 3;
            } else if rest.starts_with("</") {
                let name = self.end_tag()?;
                self.close_element(&name);
            } else if rest.starts_with("<!") {
                self.skip_declaration()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|ch: char| ch.is_ascii_alphabetic())
            {
                let tag = self.start_tag()?;
                self.open_element(tag)?;
            } else {
                self.text();
            }
        }
        Ok(())
    }

    fn text(&mut self) {
        let rest = self.rest();
        // A `<` that starts no markup is literal text.
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let len = rest[first..].find('<').map_or(rest.len(), |at| at + first);
        self.pos += len;
        let decoded = decode_character_references(&rest[..len]);
        if !decoded.is_empty() {
            let parent = self.current_parent();
            self.dom.create_text(parent, decoded);
        }
    }

    fn open_element(&mut self, tag: StartTag) -> Result<()> {
        self.close_implied(&tag.name);
        let parent = self.current_parent();
        let node = self.dom.create_element(parent, tag.name.clone(), tag.attrs);

        if is_raw_text_tag(&tag.name) && !tag.self_closing {
            let body_len = find_raw_text_end(self.rest(), &tag.name)
                .ok_or_else(|| Error::HtmlParse(format!("unclosed <{}>", tag.name)))?;
            let body = &self.rest()[..body_len];
            if !body.is_empty() {
                self.dom.create_text(node, body.to_string());
            }
            self.pos += body_len;
            self.end_tag()?;
            return Ok(());
        }

        if !tag.self_closing && !is_void_tag(&tag.name) {
            self.open.push(node);
        }
        Ok(())
    }

    /// Pops to the nearest open element named `name`; a stray end tag with
    /// no open counterpart is ignored.
    fn close_element(&mut self, name: &str) {
        let found = self
            .open
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, node)| self.dom.tag_name(**node) == Some(name))
            .map(|(depth, _)| depth);
        if let Some(depth) = found {
            self.open.truncate(depth);
        }
    }

    fn close_implied(&mut self, starting: &str) {
        match starting {
            "option" | "optgroup" => {
                self.close_within("option", &["optgroup", "select", "datalist"]);
            }
            "li" => self.close_within("li", &["ol", "ul", "menu"]),
            tag if closes_paragraph(tag) => self.close_within("p", &[]),
            _ => {}
        }
    }

    /// Closes the innermost open `target` unless one of `scope` is hit first.
    fn close_within(&mut self, target: &str, scope: &[&str]) {
        for depth in (1..self.open.len()).rev() {
            match self.dom.tag_name(self.open[depth]) {
                Some(open) if open == target => {
                    self.open.truncate(depth);
                    return;
                }
                Some(open) if scope.contains(&open) => return,
                _ => {}
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_name(&mut self, accept: fn(char) -> bool) -> String {
        let rest = self.rest();
        let len = rest.find(|ch: char| !accept(ch)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_ascii_lowercase()
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        self.pos += 1;
        let name = self.take_name(is_tag_name_char);
        let mut attrs = HashMap::new();

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(Error::HtmlParse(format!("unclosed <{name}> start tag")));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            if !rest.starts_with(is_attribute_name_char) {
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }

            let attr_name = self.take_name(is_attribute_name_char);
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value()?
            } else {
                String::new()
            };
            attrs.entry(attr_name).or_insert(value);
        }
    }

    fn attribute_value(&mut self) -> Result<String> {
        let rest = self.rest();
        let raw = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let len = rest[1..]
                    .find(quote)
                    .ok_or_else(|| Error::HtmlParse("unclosed quoted attribute value".into()))?;
                self.pos += len + 2;
                &rest[1..=len]
            }
            _ => {
                let len = rest
                    .find(|ch: char| ch.is_ascii_whitespace() || ch == '>')
                    .unwrap_or(rest.len());
                let len = if rest[..len].ends_with('/') && rest[len..].starts_with('>') {
                    len - 1
                } else {
                    len
                };
                self.pos += len;
                &rest[..len]
            }
        };
        Ok(decode_character_references(raw))
    }

    fn end_tag(&mut self) -> Result<String> {
        self.pos += 2;
        self.skip_whitespace();
        let name = self.take_name(is_tag_name_char);
        let close = self
            .rest()
            .find('>')
            .ok_or_else(|| Error::HtmlParse(format!("unclosed </{name}> end tag")))?;
        self.pos += close + 1;
        Ok(name)
    }

    fn skip_declaration(&mut self) -> Result<()> {
        let mut quote = None;
        for (offset, ch) in self.rest().char_indices().skip(2) {
            match (quote, ch) {
                (Some(open), ch) if ch == open => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(ch),
                (None, '>') => {
                    self.pos += offset + 1;
                    return Ok(());
                }
                (None, _) => {}
            }
        }
        Err(Error::HtmlParse("unclosed declaration".into()))
    }
}

fn is_tag_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_attribute_name_char(ch: char) -> bool {
    is_tag_name_char(ch) || ch == ':'
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "noscript")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

fn closes_paragraph(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "fieldset"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

/// Byte length of a raw-text body up to its `</tag` terminator.
fn find_raw_text_end(body: &str, tag: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = body[from..].find("</") {
        let at = from + found;
        let name = body[at + 2..].trim_start();
        let matches_tag = name
            .get(..tag.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(tag))
            && !name[tag.len()..].starts_with(|ch: char| ch.is_ascii_alphanumeric());
        if matches_tag {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

fn decode_character_references(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let reference = after
            .find(';')
            .and_then(|end| Some((resolve_reference(&after[..end])?, end + 1)));
        match reference {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let codepoint = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(codepoint);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "thinsp" => '\u{2009}',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "times" => '×',
        "middot" => '·',
        "rarr" => '→',
        _ => return None,
    })
}
