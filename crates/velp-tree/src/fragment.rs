//! Rendered content descriptions
//!
//! A [`Fragment`] is what the rendering side hands over when it (re)renders a
//! paragraph. In JSON a bare string is a text node and an object is an element:
//!
//! ```json
//! ["Hello ", {"tag": "em", "children": ["world"]}]
//! ```

use crate::node::ElementData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendered content to be built into a [`ContentTree`](crate::ContentTree)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    /// Text leaf
    Text(String),

    /// Element with nested content
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        classes: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Fragment>,
    },
}

impl Fragment {
    /// Text fragment
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Element fragment without children
    #[inline]
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Element fragment with children
    #[inline]
    #[must_use]
    pub fn elem(tag: impl Into<String>, children: Vec<Fragment>) -> Self {
        Self::element(tag).with_children(children)
    }

    /// Add a class (no-op on text)
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        if let Self::Element { classes, .. } = &mut self {
            classes.push(class.into());
        }
        self
    }

    /// Set an attribute (no-op on text)
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Append children (no-op on text)
    #[must_use]
    pub fn with_children(mut self, more: Vec<Fragment>) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.extend(more);
        }
        self
    }

    /// Concatenated text of the fragment
    #[must_use]
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Element { children, .. } => children.iter().map(Self::text_content).collect(),
        }
    }

    pub(crate) fn element_data(&self) -> Option<ElementData> {
        match self {
            Self::Text(_) => None,
            Self::Element {
                tag,
                classes,
                attributes,
                ..
            } => {
                let mut data = ElementData::new(tag.clone());
                for class in classes {
                    data.add_class(class.clone());
                }
                for (name, value) in attributes {
                    data.set_attribute(name.clone(), value.clone());
                }
                Some(data)
            }
        }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}
