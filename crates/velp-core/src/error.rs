//! Error types for the review engine
//!
//! Anchoring problems are recovered locally by falling back to the margin;
//! only persistence failures reach the reviewer.

use velp_anchor::AnchorError;
use velp_tree::{AnnotationId, TreeError};

use crate::stage::CreationStage;

/// Main review error type
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Anchoring failed
    #[error("anchoring failed: {0}")]
    Anchor(#[from] AnchorError),

    /// Tree mutation failed
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Persistence collaborator failed
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Answer collaborator failed
    #[error("answer browser failed: {0}")]
    Answer(#[from] AnswerError),

    /// Creation state machine misuse
    #[error("invalid creation stage transition: {0}")]
    Transition(#[from] TransitionError),

    /// Annotation is not in the in-memory set
    #[error("unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),
}

impl ReviewError {
    /// Whether the reviewer must be told
    ///
    /// Only persistence failures qualify: nothing was saved anywhere.
    #[inline]
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Errors reported by an [`AnnotationStore`](crate::AnnotationStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// Record does not exist
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),

    /// Request was refused
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by an [`AnswerBrowser`](crate::AnswerBrowser)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    /// No such answer
    #[error("answer {0} not found")]
    NotFound(crate::AnswerId),

    /// Paragraph has no answer browser
    #[error("paragraph '{0}' has no answer browser")]
    NoBrowser(velp_tree::ParId),

    /// Switching failed
    #[error("could not switch answer: {0}")]
    SwitchFailed(String),
}

/// Illegal creation stage change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{from:?} -> {to:?}")]
pub struct TransitionError {
    /// Stage before
    pub from: CreationStage,
    /// Requested stage
    pub to: CreationStage,
}
