//! The element tree consumed by the pipeline.
//!
//! An external parser hands over the document as a tree of [`Element`]s.
//! Each element carries its attributes, optional character data,
//! and its children grouped by tag name:
//! a group holds either a single child or an ordered list of children
//! (see [`Children`]).
//!
//! Attributes can be stored under two key conventions,
//! prefixed (`@_id`) or plain (`id`).
//! All lookups go through the [`Attributes`] trait,
//! which resolves a name with a fixed precedence (prefixed first).
//!
//! ```
//! # use scxc_core::element::{Attributes, Element};
//! let scxml = Element::new("scxml")
//!     .with_attribute("@_initial", "idle")
//!     .with_child(Element::new("state").with_attribute("id", "idle"));
//!
//! assert_eq!(scxml.attribute("initial"), Some("idle"));
//! assert_eq!(scxml.children_named("state").count(), 1);
//! ```

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Prefix marking attribute keys in the prefixed convention.
pub const ATTRIBUTE_PREFIX: &str = "@_";

const ATTRIBUTE_BLOCK: &str = "$";
const TEXT_KEY: &str = "#text";
const LINE_KEY: &str = "#line";
const COLUMN_KEY: &str = "#column";

/// The error type for building an [`Element`] tree out of its JSON rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ElementError {
    /// The top-level value does not name exactly one root element.
    #[error("element tree root must be a single-key object naming the root element")]
    AmbiguousRoot,
    /// Attribute values must be scalars.
    #[error("attribute `{0}` of <{1}> must be a string, number or boolean")]
    NonScalarAttribute(String, String),
    /// The `$` attribute block is not an object.
    #[error("attribute block of <{0}> must be an object")]
    BadAttributeBlock(String),
    /// A child group contains an array.
    #[error("<{0}> cannot be rendered as a nested array")]
    NestedArray(String),
    /// Position fields must be non-negative integers.
    #[error("position field `{0}` of <{1}> must be a non-negative integer")]
    BadPosition(String, String),
}

/// Source position of an element, as reported by the external parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// Line number.
    pub line: u32,
    /// Column number, if known.
    pub column: Option<u32>,
}

impl Position {
    /// Creates a position with both line and column.
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column: Some(column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyConvention {
    Prefixed,
    Plain,
}

impl KeyConvention {
    const LOOKUP_ORDER: [KeyConvention; 2] = [KeyConvention::Prefixed, KeyConvention::Plain];

    fn matches(self, key: &str, name: &str) -> bool {
        match self {
            KeyConvention::Prefixed => key.strip_prefix(ATTRIBUTE_PREFIX) == Some(name),
            KeyConvention::Plain => key == name,
        }
    }

    fn canonical(key: &str) -> &str {
        key.strip_prefix(ATTRIBUTE_PREFIX).unwrap_or(key)
    }
}

/// Uniform access to attributes stored under either key convention.
pub trait Attributes {
    /// Every stored `(key, value)` pair, keys as stored.
    fn raw_attributes(&self) -> impl Iterator<Item = (&str, &str)>;

    /// Looks up an attribute by its canonical name.
    ///
    /// A value stored under the prefixed key takes precedence over one stored under the plain key.
    fn attribute(&self, name: &str) -> Option<&str> {
        KeyConvention::LOOKUP_ORDER.iter().find_map(|convention| {
            self.raw_attributes()
                .find(|(key, _)| convention.matches(key, name))
                .map(|(_, value)| value)
        })
    }

    /// Whether the attribute is present under any convention.
    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Canonical names of all attributes, without duplicates.
    fn attribute_names(&self) -> IndexSet<&str> {
        self.raw_attributes()
            .map(|(key, _)| KeyConvention::canonical(key))
            .collect()
    }
}

impl Attributes for IndexMap<String, String> {
    fn raw_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A group of children sharing a tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    /// A single child.
    One(Box<Element>),
    /// An ordered list of children.
    Many(Vec<Element>),
}

impl Children {
    /// Iterates over the children of the group, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        match self {
            Children::One(element) => std::slice::from_ref(element.as_ref()).iter(),
            Children::Many(elements) => elements.iter(),
        }
    }

    /// Number of children in the group.
    pub fn len(&self) -> usize {
        match self {
            Children::One(_) => 1,
            Children::Many(elements) => elements.len(),
        }
    }

    /// Whether the group is empty (only possible for an empty list).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, element: Element) {
        let previous = std::mem::replace(self, Children::Many(Vec::new()));
        *self = match previous {
            Children::One(first) => Children::Many(vec![*first, element]),
            Children::Many(mut elements) => {
                elements.push(element);
                Children::Many(elements)
            }
        };
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    children: IndexMap<String, Children>,
    text: Option<String>,
    position: Option<Position>,
}

impl Element {
    /// Creates an element with the given tag name, no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: IndexMap::new(),
            text: None,
            position: None,
        }
    }

    /// Adds an attribute, stored under the key exactly as given.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Appends a child to the group named after the child's tag.
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Sets the character data.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the source position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Appends a child to the group named after the child's tag.
    pub fn push_child(&mut self, child: Element) {
        if let Some(group) = self.children.get_mut(&child.name) {
            group.push(child);
        } else {
            self.children
                .insert(child.name.clone(), Children::One(Box::new(child)));
        }
    }

    /// The tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The character data, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The source position, if known.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Children with the given tag name, in order.
    pub fn children_named<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a Element> + use<'a> {
        self.children
            .get(tag)
            .into_iter()
            .flat_map(Children::iter)
    }

    /// Every child, group by group, together with its index within its group.
    pub fn children(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .values()
            .flat_map(|group| group.iter().enumerate())
    }

    /// Tag names of the child groups, in order.
    pub fn child_tags(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Builds an element tree from a JSON object with a single key naming the root element.
    ///
    /// ```
    /// # use scxc_core::element::{Attributes, Element};
    /// let json = serde_json::json!({
    ///     "scxml": {
    ///         "@_initial": "a",
    ///         "state": [{ "@_id": "a" }, { "$": { "id": "b" } }]
    ///     }
    /// });
    /// let root = Element::from_json(&json).expect("well-formed rendering");
    /// assert_eq!(root.name(), "scxml");
    /// let ids: Vec<_> = root.children_named("state").filter_map(|s| s.attribute("id")).collect();
    /// assert_eq!(ids, ["a", "b"]);
    /// ```
    pub fn from_json(value: &Value) -> Result<Element, ElementError> {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let (name, content) = map.iter().next().ok_or(ElementError::AmbiguousRoot)?;
                if is_reserved(name) || !matches!(content, Value::Object(_)) {
                    return Err(ElementError::AmbiguousRoot);
                }
                Element::from_json_named(name, content)
            }
            _ => Err(ElementError::AmbiguousRoot),
        }
    }

    /// Builds an element with the given tag name out of the JSON rendering of its content.
    pub fn from_json_named(name: &str, content: &Value) -> Result<Element, ElementError> {
        let mut element = Element::new(name);
        match content {
            Value::Object(map) => {
                for (key, value) in map {
                    element.absorb(key, value)?;
                }
            }
            Value::Null => {}
            Value::String(text) => element.text = Some(text.clone()),
            Value::Bool(_) | Value::Number(_) => element.text = Some(content.to_string()),
            Value::Array(_) => return Err(ElementError::NestedArray(name.to_string())),
        }
        Ok(element)
    }

    fn absorb(&mut self, key: &str, value: &Value) -> Result<(), ElementError> {
        match key {
            ATTRIBUTE_BLOCK => {
                let Value::Object(block) = value else {
                    return Err(ElementError::BadAttributeBlock(self.name.clone()));
                };
                for (attr, value) in block {
                    let value = self.scalar(attr, value)?;
                    self.attributes.insert(attr.clone(), value);
                }
            }
            TEXT_KEY => {
                let text = self.scalar(key, value)?;
                self.text = Some(text);
            }
            LINE_KEY | COLUMN_KEY => {
                let number = value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ElementError::BadPosition(key.to_string(), self.name.clone()))?;
                let position = self.position.get_or_insert(Position {
                    line: 0,
                    column: None,
                });
                if key == LINE_KEY {
                    position.line = number;
                } else {
                    position.column = Some(number);
                }
            }
            attr if attr.starts_with(ATTRIBUTE_PREFIX) => {
                let value = self.scalar(attr, value)?;
                self.attributes.insert(attr.to_string(), value);
            }
            tag => {
                if let Value::Array(items) = value {
                    for item in items {
                        self.push_child(Element::from_json_named(tag, item)?);
                    }
                } else {
                    self.push_child(Element::from_json_named(tag, value)?);
                }
            }
        }
        Ok(())
    }

    fn scalar(&self, key: &str, value: &Value) -> Result<String, ElementError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
            _ => Err(ElementError::NonScalarAttribute(
                key.to_string(),
                self.name.clone(),
            )),
        }
    }
}

impl Attributes for Element {
    fn raw_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.raw_attributes()
    }
}

fn is_reserved(key: &str) -> bool {
    key == ATTRIBUTE_BLOCK || key.starts_with('#') || key.starts_with(ATTRIBUTE_PREFIX)
}

/// Locator of the `index`-th child named `name` under the element located at `parent`.
///
/// Used to name elements that carry no id, e.g. `/scxml/state[1]/transition[0]`.
pub fn child_locator(parent: &str, name: &str, index: usize) -> String {
    format!("{parent}/{name}[{index}]")
}
