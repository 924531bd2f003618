//! Margin fallback rendering
//!
//! A margin note shows an annotation next to its paragraph without touching
//! the paragraph content, so it survives any re-render. Every annotation gets
//! one; annotations that cannot be anchored inline get only that.

use serde::Serialize;
use velp_anchor::AnchorError;
use velp_tree::{AnnotationId, Document, NodeId, TreeError};

use crate::types::Annotation;

/// Why an annotation is shown in the margin only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarginReason {
    /// Anchor covers the whole paragraph
    NoCoordinate,
    /// Paragraph version token changed since anchoring
    ParagraphModified,
    /// Stored coordinate did not resolve
    Unresolved { detail: String },
    /// Resolved span could not be wrapped
    WrapFailed { detail: String },
    /// Annotation belongs to a plugin answer
    AnswerScoped,
    /// Answer annotations are configured to stay out of the answer text
    NotShownInPlace,
}

impl From<&AnchorError> for MarginReason {
    fn from(err: &AnchorError) -> Self {
        match err {
            AnchorError::PartialCoord => Self::NoCoordinate,
            AnchorError::StaleVersion { .. } => Self::ParagraphModified,
            AnchorError::WrapBoundaryViolation(source) => Self::WrapFailed {
                detail: source.to_string(),
            },
            other => Self::Unresolved {
                detail: other.to_string(),
            },
        }
    }
}

/// Where an annotation ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    /// Wrapped in the text, with a margin copy
    Inline,
    /// Margin note only
    MarginOnly { reason: MarginReason },
}

impl Placement {
    /// Margin-only placement
    #[inline]
    #[must_use]
    pub fn margin(reason: MarginReason) -> Self {
        Self::MarginOnly { reason }
    }

    /// Whether the annotation is wrapped inline
    #[inline]
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline)
    }
}

/// Diagnostic anchoring state of one annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorStatus {
    /// Placement
    #[serde(flatten)]
    pub placement: Placement,
    /// Whether the reviewer has the annotation expanded
    pub shown: bool,
}

/// Renders margin notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginRenderer {
    padding: char,
}

impl MarginRenderer {
    /// Create renderer padding note text with `padding`
    #[inline]
    #[must_use]
    pub fn new(padding: char) -> Self {
        Self { padding }
    }

    /// Note text for an annotation
    ///
    /// The velp label and the comment, whichever are present.
    #[must_use]
    pub fn text(&self, annotation: &Annotation, velp_label: Option<&str>) -> String {
        let comment = annotation.comment.trim();
        let body = match (velp_label, comment.is_empty()) {
            (Some(label), false) => format!("{label}: {comment}"),
            (Some(label), true) => label.to_string(),
            (None, false) => comment.to_string(),
            (None, true) => format!("velp {}", annotation.velp_id),
        };
        format!("{pad}{body}{pad}", pad = self.padding)
    }

    /// Attach (or replace) the note of an annotation
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownParagraph`] if the paragraph is gone
    pub fn attach(
        &self,
        doc: &mut Document,
        annotation: &Annotation,
        velp_label: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        let text = self.text(annotation, velp_label);
        doc.attach_margin(annotation.par_id(), annotation.id, &text)
    }

    /// Re-render an existing note, returning whether one existed
    ///
    /// # Errors
    /// See [`MarginRenderer::attach`]
    pub fn refresh(
        &self,
        doc: &mut Document,
        annotation: &Annotation,
        velp_label: Option<&str>,
    ) -> Result<bool, TreeError> {
        if doc.margin_note(annotation.id).is_none() {
            return Ok(false);
        }
        self.attach(doc, annotation, velp_label)?;
        Ok(true)
    }

    /// Remove the note of an annotation
    ///
    /// # Errors
    /// Propagates tree errors from detaching
    pub fn remove(&self, doc: &mut Document, annotation_id: AnnotationId) -> Result<bool, TreeError> {
        doc.remove_margin(annotation_id)
    }
}

impl Default for MarginRenderer {
    fn default() -> Self {
        Self::new('\u{a0}')
    }
}
