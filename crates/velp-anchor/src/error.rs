//! Anchoring errors

use velp_tree::{AnnotationId, NodeId, ParId, TreeError};

use crate::coord::CoordError;

/// Failures while encoding a selection or resolving a stored anchor
///
/// Every variant except [`AnchorError::NoParagraph`] is recovered by the
/// caller with a margin-only rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    /// Selection is not inside any paragraph
    #[error("selection is not inside a paragraph")]
    NoParagraph,

    /// Stored paragraph no longer exists
    #[error("paragraph '{0}' is gone")]
    ParagraphGone(ParId),

    /// Paragraph was re-rendered since the anchor was taken
    #[error("paragraph version changed (stored {stored:?}, current {current:?})")]
    StaleVersion {
        stored: Option<String>,
        current: String,
    },

    /// Coordinate lacks path fields, so it can only be shown in the margin
    #[error("coordinate is not full")]
    PartialCoord,

    /// A level of the stored path no longer exists
    #[error("no child {index} at depth {depth}")]
    PathMissing { depth: usize, index: usize },

    /// Offset exceeds the resolved text
    #[error("offset {offset} exceeds text length {len}")]
    RangeInvalid { offset: usize, len: usize },

    /// Live span could not be wrapped without splitting an element
    #[error("cannot wrap span: {0}")]
    WrapBoundaryViolation(#[source] TreeError),

    /// Selection lies in the paragraph but outside its content root
    #[error("selection is outside the paragraph content")]
    OutsideContent,

    /// Selection endpoint is not a text node
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// Inline marker of an annotation is not in the document
    #[error("no inline marker for annotation {0}")]
    MarkerMissing(AnnotationId),

    /// Paragraph shows no plugin answer
    #[error("paragraph '{0}' has no answer view")]
    AnswerMissing(ParId),

    /// Stored coordinate violates its own invariants
    #[error("malformed coordinate: {0}")]
    Malformed(#[from] CoordError),
}

impl AnchorError {
    /// Short stable name for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoParagraph => "no_paragraph",
            Self::ParagraphGone(_) => "paragraph_gone",
            Self::StaleVersion { .. } => "stale_version",
            Self::PartialCoord => "partial_coord",
            Self::PathMissing { .. } => "path_missing",
            Self::RangeInvalid { .. } => "range_invalid",
            Self::WrapBoundaryViolation(_) => "wrap_boundary_violation",
            Self::OutsideContent => "outside_content",
            Self::NotText(_) => "not_text",
            Self::MarkerMissing(_) => "marker_missing",
            Self::AnswerMissing(_) => "answer_missing",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<TreeError> for AnchorError {
    fn from(err: TreeError) -> Self {
        Self::WrapBoundaryViolation(err)
    }
}
