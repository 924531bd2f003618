//! Positions and spans in the live tree

use crate::node::NodeId;

/// A character position inside a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPoint {
    /// Text node
    pub node: NodeId,
    /// Character offset within the node
    pub offset: usize,
}

impl TextPoint {
    /// Create point
    #[inline]
    #[must_use]
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection between two text points, start first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// First selected position
    pub start: TextPoint,
    /// Position just past the selection
    pub end: TextPoint,
}

impl Span {
    /// Create span
    #[inline]
    #[must_use]
    pub fn new(start: TextPoint, end: TextPoint) -> Self {
        Self { start, end }
    }

    /// Whether both ends sit in the same text node
    #[inline]
    #[must_use]
    pub fn is_single_node(&self) -> bool {
        self.start.node == self.end.node
    }

    /// Whether the span is collapsed to one position
    #[inline]
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Which text fragment wins when an offset falls on a fragment boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Prefer the fragment that starts at the offset (span starts)
    Forward,
    /// Prefer the fragment that ends at the offset (span ends)
    Backward,
}
