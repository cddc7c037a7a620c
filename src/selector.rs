//! The selector subset merchants use to point at prices and quantities.
//!
//! Supported: type, `*`, `#id`, `.class`, attribute tests (`[a]`, `=`, `^=`,
//! `$=`, `*=`, `~=`, `|=`), `:first-child`, `:last-child`, `:only-child`,
//! `:empty`, `:not(..)`, `:is(..)`, all four combinators and `,` lists.
//! Anything else is rejected as [`Error::UnsupportedSelector`].

use std::iter;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<ComplexSelector>);

/// `compounds[i]` and `compounds[i + 1]` are joined by `combinators[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    LaterSibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
    pseudos: Vec<Pseudo>,
}

impl Compound {
    fn is_blank(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudos.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    expected: Option<(AttributeOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Prefix,
    Suffix,
    Substring,
    Word,
    LangPrefix,
}

impl AttributeOp {
    fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Substring => !expected.is_empty() && actual.contains(expected),
            Self::Word => actual.split_whitespace().any(|word| word == expected),
            Self::LangPrefix => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Not(SelectorList),
    Is(SelectorList),
}

impl SelectorList {
    pub(crate) fn parse(source: &str) -> Result<Self> {
        Parser { source, pos: 0 }.list(false)
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn unsupported(&self) -> Error {
        Error::UnsupportedSelector(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }

    /// Returns whether any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        let source: &'a str = self.source;
        &source[start..self.pos]
    }

    fn ident(&mut self) -> Result<String> {
        let ident = self.take_while(is_ident_char);
        if ident.is_empty() {
            return Err(self.unsupported());
        }
        Ok(ident.to_string())
    }

    /// A comma-separated list; `nested` lists end at the closing `)` of a
    /// functional pseudo-class, which is left for the caller.
    fn list(&mut self, nested: bool) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.complex()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') if nested => return Ok(SelectorList(selectors)),
                None if !nested => return Ok(SelectorList(selectors)),
                _ => return Err(self.unsupported()),
            }
        }
    }

    fn complex(&mut self) -> Result<ComplexSelector> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::LaterSibling,
                Some(ch) if spaced && starts_compound(ch) => Combinator::Descendant,
                _ => break,
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_whitespace();
            }
            compounds.push(self.compound()?);
            combinators.push(combinator);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        if self.eat('*') {
            compound.universal = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    let id = self.ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.unsupported());
                    }
                }
                Some('.') => {
                    self.bump();
                    let class_name = self.ident()?;
                    compound.classes.push(class_name);
                }
                Some('[') => {
                    self.bump();
                    let test = self.attribute_test()?;
                    compound.attributes.push(test);
                }
                Some(':') => {
                    self.bump();
                    let pseudo = self.pseudo()?;
                    compound.pseudos.push(pseudo);
                }
                _ => break,
            }
        }

        if compound.is_blank() {
            return Err(self.unsupported());
        }
        Ok(compound)
    }

    fn attribute_test(&mut self) -> Result<AttributeTest> {
        self.skip_whitespace();
        let name = self.take_while(is_attribute_name_char).to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unsupported());
        }
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(AttributeTest {
                name,
                expected: None,
            });
        }

        let op = match self.bump() {
            Some('=') => AttributeOp::Equals,
            Some(symbol) => {
                let op = match symbol {
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    '*' => AttributeOp::Substring,
                    '~' => AttributeOp::Word,
                    '|' => AttributeOp::LangPrefix,
                    _ => return Err(self.unsupported()),
                };
                self.expect('=')?;
                op
            }
            None => return Err(self.unsupported()),
        };

        self.skip_whitespace();
        let value = self.attribute_value()?;
        self.skip_whitespace();
        self.expect(']')?;
        Ok(AttributeTest {
            name,
            expected: Some((op, value)),
        })
    }

    fn attribute_value(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                Some(quote)
            }
            _ => None,
        };

        let mut value = String::new();
        loop {
            match (self.bump(), quote) {
                (None, Some(_)) => return Err(self.unsupported()),
                (None, None) => break,
                (Some('\\'), _) => {
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                (Some(ch), Some(quote)) if ch == quote => return Ok(value),
                (Some(ch), None) if ch == ']' || ch.is_ascii_whitespace() => {
                    self.pos -= ch.len_utf8();
                    break;
                }
                (Some(ch), _) => value.push(ch),
            }
        }

        if value.is_empty() {
            return Err(self.unsupported());
        }
        Ok(value)
    }

    fn pseudo(&mut self) -> Result<Pseudo> {
        let name = self.ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "empty" => Pseudo::Empty,
            "not" | "is" => {
                self.expect('(')?;
                let inner = self.list(true)?;
                self.expect(')')?;
                if name == "not" {
                    Pseudo::Not(inner)
                } else {
                    Pseudo::Is(inner)
                }
            }
            _ => return Err(self.unsupported()),
        };
        Ok(pseudo)
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_attribute_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':')
}

fn starts_compound(ch: char) -> bool {
    matches!(ch, '*' | '#' | '.' | '[' | ':') || is_ident_char(ch)
}

impl Dom {
    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .elements_in_order()
            .into_iter()
            .find(|node| self.matches_list(*node, &list)))
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let mut matches = self.elements_in_order();
        matches.retain(|node| self.matches_list(*node, &list));
        Ok(matches)
    }

    fn elements_in_order(&self) -> Vec<NodeId> {
        let mut elements = Vec::new();
        self.collect_elements_dfs(self.root(), &mut elements);
        elements
    }

    fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        list.0.iter().any(|complex| {
            let last = complex.compounds.len() - 1;
            self.matches_compound(node, &complex.compounds[last])
                && self.matches_leftwards(node, complex, last)
        })
    }

    /// `node` already matched `compounds[index]`; checks everything left of
    /// it, trying every candidate a combinator allows.
    fn matches_leftwards(&self, node: NodeId, complex: &ComplexSelector, index: usize) -> bool {
        let Some(left) = index.checked_sub(1) else {
            return true;
        };
        let compound = &complex.compounds[left];
        let fits = |candidate: &NodeId| {
            self.matches_compound(*candidate, compound)
                && self.matches_leftwards(*candidate, complex, left)
        };

        match complex.combinators[left] {
            Combinator::Child => self.parent(node).as_ref().is_some_and(fits),
            Combinator::Descendant => {
                iter::successors(self.parent(node), |current| self.parent(*current))
                    .any(|candidate| fits(&candidate))
            }
            Combinator::NextSibling => {
                self.previous_element_sibling(node).as_ref().is_some_and(fits)
            }
            Combinator::LaterSibling => {
                iter::successors(self.previous_element_sibling(node), |current| {
                    self.previous_element_sibling(*current)
                })
                .any(|candidate| fits(&candidate))
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };

        if compound
            .tag
            .as_ref()
            .is_some_and(|tag| !element.tag_name.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        if compound
            .id
            .as_ref()
            .is_some_and(|id| element.attrs.get("id") != Some(id))
        {
            return false;
        }
        if !compound.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        let attributes_match = compound.attributes.iter().all(|test| {
            let actual = element.attrs.get(&test.name);
            match (&test.expected, actual) {
                (None, actual) => actual.is_some(),
                (Some((op, expected)), Some(actual)) => op.test(actual, expected),
                (Some(_), None) => false,
            }
        });

        attributes_match
            && compound.pseudos.iter().all(|pseudo| match pseudo {
                Pseudo::FirstChild => self.previous_element_sibling(node).is_none(),
                Pseudo::LastChild => self.next_element_sibling(node).is_none(),
                Pseudo::OnlyChild => {
                    self.previous_element_sibling(node).is_none()
                        && self.next_element_sibling(node).is_none()
                }
                Pseudo::Empty => self.children(node).is_empty(),
                Pseudo::Not(list) => !self.matches_list(node, list),
                Pseudo::Is(list) => self.matches_list(node, list),
            })
    }
}
