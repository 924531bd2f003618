//! Content nodes
//!
//! Provides the tagged [`NodeKind`] union for the rendered tree: plain text,
//! ordinary elements and annotation markers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Index of a node inside a [`ContentTree`](crate::ContentTree)
///
/// Ids stay valid for the lifetime of the tree; detached nodes keep their id
/// but are no longer reachable from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier the persistence side assigns to an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl Display for AnnotationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element payload: tag, classes and attributes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
}

impl ElementData {
    /// Create element with the given tag
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a class, returning the element
    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    /// Set an attribute, returning the element
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Tag name
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Classes in insertion order
    #[inline]
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the element carries `class`
    #[inline]
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a class unless already present
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    /// Attribute value
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set or replace an attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// All attributes, sorted by name
    #[inline]
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Marker payload: the annotation this wrapper belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerData {
    /// Owning annotation
    pub annotation_id: AnnotationId,
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Text leaf
    Text(String),

    /// Ordinary element
    Element(ElementData),

    /// Inline annotation wrapper
    ///
    /// Always has exactly one child: the highlight element holding the
    /// original content.
    Marker(MarkerData),
}

impl NodeKind {
    /// Text payload, if this is a text node
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Element payload, if this is an element
    #[inline]
    #[must_use]
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            Self::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Marker payload, if this is a marker
    #[inline]
    #[must_use]
    pub fn as_marker(&self) -> Option<&MarkerData> {
        match self {
            Self::Marker(data) => Some(data),
            _ => None,
        }
    }

    /// Whether this is a text leaf
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// Parent node, `None` for the root and detached nodes
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// All children in order, text included
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// Length of a text in Unicode scalar values
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `offset`-th character, `text.len()` at the end
#[inline]
#[must_use]
pub(crate) fn byte_index(text: &str, offset: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_classes_are_unique() {
        let mut el = ElementData::new("div").with_class("par");
        el.add_class("par");
        el.add_class("selected");
        assert_eq!(el.classes(), &["par", "selected"]);
        assert!(el.has_class("selected"));
        assert!(!el.has_class("missing"));
    }

    #[test]
    fn element_attributes() {
        let el = ElementData::new("div").with_attribute("t", "abc");
        assert_eq!(el.attribute("t"), Some("abc"));
        assert!(el.has_attribute("t"));
        assert!(!el.has_attribute("id"));
    }

    #[test]
    fn byte_index_counts_chars() {
        let text = "äbc";
        assert_eq!(byte_index(text, 0), Some(0));
        assert_eq!(byte_index(text, 1), Some(2));
        assert_eq!(byte_index(text, 3), Some(text.len()));
        assert_eq!(byte_index(text, 4), None);
        assert_eq!(char_len(text), 3);
    }

    #[test]
    fn kind_accessors() {
        let text = NodeKind::Text("x".into());
        assert_eq!(text.as_text(), Some("x"));
        assert!(text.as_element().is_none());

        let marker = NodeKind::Marker(MarkerData {
            annotation_id: AnnotationId(7),
        });
        assert_eq!(marker.as_marker().map(|m| m.annotation_id), Some(AnnotationId(7)));
        assert!(!marker.is_text());
    }
}
