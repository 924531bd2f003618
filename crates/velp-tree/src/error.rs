//! Error types for tree reads and mutations

use crate::document::ParId;
use crate::node::NodeId;

/// Errors raised by [`ContentTree`](crate::ContentTree) and
/// [`Document`](crate::Document) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Id does not exist in the arena
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Operation requires a text node
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// Operation requires a marker node
    #[error("node {0} is not an annotation marker")]
    NotMarker(NodeId),

    /// Text nodes cannot hold children
    #[error("node {0} cannot have children")]
    NotContainer(NodeId),

    /// Node must be detached before it is inserted elsewhere
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    /// Node has no parent
    #[error("node {0} is detached")]
    Detached(NodeId),

    /// Inserting would make a node its own ancestor
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// Character offset past the end of a text node
    #[error("offset {offset} out of range for {node} (length {len})")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    /// Span endpoints do not share a parent, so wrapping would split an element
    #[error("span from {start} to {end} crosses an element boundary")]
    BoundaryViolation { start: NodeId, end: NodeId },

    /// Span end precedes its start
    #[error("span end precedes its start")]
    InvertedSpan,

    /// Span selects nothing
    #[error("span is empty")]
    EmptySpan,

    /// Paragraph id registered twice
    #[error("paragraph '{0}' already exists")]
    DuplicateParagraph(ParId),

    /// Paragraph id not registered
    #[error("paragraph '{0}' not found")]
    UnknownParagraph(ParId),
}
