//! Live document: a content tree plus its paragraph registry
//!
//! Each paragraph is rendered with the layout described in [`crate::layout`].
//! The document hands out [`ParagraphRef`]s that are only valid until the
//! next mutation of that paragraph.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::fragment::Fragment;
use crate::layout;
use crate::navigator::nearest_ancestor_with_attribute;
use crate::node::{AnnotationId, ElementData, NodeId};
use crate::span::{Span, TextPoint};
use crate::tree::ContentTree;

/// Stable paragraph identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParId(String);

impl ParId {
    /// Create id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ParId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Resolved paragraph nodes and current version token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphRef {
    /// Paragraph id
    pub id: ParId,
    /// The `div.par` element
    pub node: NodeId,
    /// Content root, where element paths start
    pub content: NodeId,
    /// Margin region
    pub margin: NodeId,
    /// Version token at resolution time
    pub token: String,
}

/// A rendered document made of paragraphs
#[derive(Debug, Clone, Default)]
pub struct Document {
    tree: ContentTree,
    paragraphs: IndexMap<ParId, NodeId>,
}

impl Document {
    /// Create empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    /// Underlying tree, mutable
    #[inline]
    pub fn tree_mut(&mut self) -> &mut ContentTree {
        &mut self.tree
    }

    /// Ids of all paragraphs in insertion order
    pub fn paragraph_ids(&self) -> impl Iterator<Item = &ParId> {
        self.paragraphs.keys()
    }

    /// Render a new paragraph at the end of the document
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateParagraph`] if the id is taken
    pub fn add_paragraph(
        &mut self,
        id: impl Into<ParId>,
        token: impl Into<String>,
        content: &[Fragment],
    ) -> Result<ParagraphRef, TreeError> {
        let id = id.into();
        if self.paragraphs.contains_key(&id) {
            return Err(TreeError::DuplicateParagraph(id));
        }

        let par = self.tree.create_element(
            ElementData::new("div")
                .with_class(layout::PARAGRAPH_CLASS)
                .with_attribute(layout::ID_ATTR, id.as_str())
                .with_attribute(layout::VERSION_ATTR, token),
        );
        let root = self.tree.root();
        self.tree.append(root, par)?;

        let content_root = self
            .tree
            .create_element(ElementData::new("div").with_class(layout::CONTENT_CLASS));
        self.tree.append(par, content_root)?;
        for fragment in content {
            self.tree.build(content_root, fragment)?;
        }
        let margin = self
            .tree
            .create_element(ElementData::new("div").with_class(layout::MARGIN_CLASS));
        self.tree.append(par, margin)?;

        self.paragraphs.insert(id.clone(), par);
        self.paragraph(&id).ok_or(TreeError::UnknownParagraph(id))
    }

    /// Replace a paragraph's content and version token
    ///
    /// Inline markers in the old content are gone afterwards; margin notes stay.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownParagraph`] for unknown ids
    pub fn rerender_paragraph(
        &mut self,
        id: &ParId,
        token: impl Into<String>,
        content: &[Fragment],
    ) -> Result<ParagraphRef, TreeError> {
        let par = self.require(id)?;
        self.tree.clear_children(par.content)?;
        for fragment in content {
            self.tree.build(par.content, fragment)?;
        }
        self.tree
            .element_mut(par.node)?
            .set_attribute(layout::VERSION_ATTR, token);
        self.require(id)
    }

    /// Remove a paragraph from the document
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownParagraph`] for unknown ids
    pub fn remove_paragraph(&mut self, id: &ParId) -> Result<(), TreeError> {
        let node = self
            .paragraphs
            .shift_remove(id)
            .ok_or_else(|| TreeError::UnknownParagraph(id.clone()))?;
        self.tree.detach(node)
    }

    /// Resolve a paragraph id to its live nodes and token
    #[must_use]
    pub fn paragraph(&self, id: &ParId) -> Option<ParagraphRef> {
        let node = *self.paragraphs.get(id)?;
        if !self.tree.is_attached(node) {
            return None;
        }
        let token = self
            .tree
            .element(node)?
            .attribute(layout::VERSION_ATTR)?
            .to_string();
        let child_with = |class: &str| {
            self.tree
                .children(node)
                .iter()
                .copied()
                .find(|&c| self.tree.element(c).is_some_and(|d| d.has_class(class)))
        };
        Some(ParagraphRef {
            id: id.clone(),
            node,
            content: child_with(layout::CONTENT_CLASS)?,
            margin: child_with(layout::MARGIN_CLASS)?,
            token,
        })
    }

    fn require(&self, id: &ParId) -> Result<ParagraphRef, TreeError> {
        self.paragraph(id)
            .ok_or_else(|| TreeError::UnknownParagraph(id.clone()))
    }

    /// Current version token of a paragraph
    #[must_use]
    pub fn token(&self, id: &ParId) -> Option<&str> {
        let node = *self.paragraphs.get(id)?;
        self.tree.element(node)?.attribute(layout::VERSION_ATTR)
    }

    /// Paragraph containing a node (or the paragraph element itself)
    #[must_use]
    pub fn paragraph_of(&self, node: NodeId) -> Option<ParagraphRef> {
        let is_paragraph = self
            .tree
            .element(node)
            .is_some_and(|d| d.has_attribute(layout::VERSION_ATTR));
        let par = if is_paragraph {
            node
        } else {
            nearest_ancestor_with_attribute(&self.tree, node, layout::VERSION_ATTR)?
        };
        let id = self.tree.element(par)?.attribute(layout::ID_ATTR)?;
        self.paragraph(&ParId::new(id))
    }

    /// Plain text of a paragraph's content
    #[must_use]
    pub fn plain_text(&self, id: &ParId) -> Option<String> {
        self.paragraph(id)
            .map(|par| self.tree.text_content(par.content))
    }

    /// Character offset of a point within its paragraph's plain text
    #[must_use]
    pub fn absolute_offset(&self, point: TextPoint) -> Option<usize> {
        let par = self.paragraph_of(point.node)?;
        self.tree.offset_in(par.content, point)
    }

    /// Text covered by a span
    #[must_use]
    pub fn text_of(&self, span: Span) -> Option<String> {
        self.tree.text_between(span)
    }

    /// Inline marker of an annotation anywhere in the document
    #[must_use]
    pub fn inline_marker(&self, annotation_id: AnnotationId) -> Option<NodeId> {
        self.tree.find_marker(self.tree.root(), annotation_id)
    }

    /// Add a class to an element
    ///
    /// # Errors
    /// Returns [`TreeError::NotContainer`] for non-elements
    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), TreeError> {
        self.tree.element_mut(node)?.add_class(class);
        Ok(())
    }

    /// Place a note for an annotation in a paragraph's margin
    ///
    /// Any existing note of the same annotation is replaced.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownParagraph`] for unknown ids
    pub fn attach_margin(
        &mut self,
        id: &ParId,
        annotation_id: AnnotationId,
        text: &str,
    ) -> Result<NodeId, TreeError> {
        let par = self.require(id)?;
        self.remove_margin(annotation_id)?;

        let note = self.tree.create_element(
            ElementData::new("annotation")
                .with_class(layout::MARGIN_NOTE_CLASS)
                .with_attribute(layout::ANNOTATION_ID_ATTR, annotation_id.to_string()),
        );
        let body = self.tree.create_text(text);
        self.tree.append(note, body)?;
        self.tree.append(par.margin, note)?;
        Ok(note)
    }

    /// Margin note of an annotation
    #[must_use]
    pub fn margin_note(&self, annotation_id: AnnotationId) -> Option<NodeId> {
        let aid = annotation_id.to_string();
        self.paragraphs
            .keys()
            .filter_map(|id| self.paragraph(id))
            .flat_map(|par| self.tree.children(par.margin).to_vec())
            .find(|&note| {
                self.tree
                    .element(note)
                    .and_then(|d| d.attribute(layout::ANNOTATION_ID_ATTR))
                    == Some(aid.as_str())
            })
    }

    /// Margin notes of a paragraph in order
    #[must_use]
    pub fn margin_notes(&self, id: &ParId) -> Vec<NodeId> {
        self.paragraph(id)
            .map(|par| self.tree.children(par.margin).to_vec())
            .unwrap_or_default()
    }

    /// Text shown in an annotation's margin note
    #[must_use]
    pub fn margin_text(&self, annotation_id: AnnotationId) -> Option<String> {
        self.margin_note(annotation_id)
            .map(|note| self.tree.text_content(note))
    }

    /// Remove an annotation's margin note, returning whether one existed
    ///
    /// # Errors
    /// Propagates tree errors from detaching the note
    pub fn remove_margin(&mut self, annotation_id: AnnotationId) -> Result<bool, TreeError> {
        match self.margin_note(annotation_id) {
            Some(note) => {
                self.tree.detach(note)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Element holding the displayed plugin answer of a paragraph
    #[must_use]
    pub fn answer_view(&self, id: &ParId) -> Option<NodeId> {
        let par = self.paragraph(id)?;
        self.tree.descendants(par.content).into_iter().find(|&n| {
            self.tree
                .element(n)
                .is_some_and(|d| d.tag() == layout::ANSWER_TAG)
        })
    }

    /// Plain text of the displayed plugin answer
    #[must_use]
    pub fn answer_text(&self, id: &ParId) -> Option<String> {
        self.answer_view(id).map(|view| self.tree.text_content(view))
    }

    /// Replace the displayed answer text, creating the answer view if needed
    ///
    /// Inline markers inside the old answer are discarded.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownParagraph`] for unknown ids
    pub fn set_answer_text(&mut self, id: &ParId, text: &str) -> Result<NodeId, TreeError> {
        let view = match self.answer_view(id) {
            Some(view) => {
                self.tree.clear_children(view)?;
                view
            }
            None => {
                let par = self.require(id)?;
                let view = self.tree.create_element(ElementData::new(layout::ANSWER_TAG));
                self.tree.append(par.content, view)?;
                view
            }
        };
        let body = self.tree.create_text(text);
        self.tree.append(view, body)?;
        Ok(view)
    }
}
