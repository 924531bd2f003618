//! Annotation markers and the unwrapped view of the tree
//!
//! Every inline annotation is a [`NodeKind::Marker`] whose single child is a
//! highlight element holding the original content. Paths and offsets are
//! computed over the *unwrapped* view, where markers are replaced by that
//! content and adjacent text fragments read as one logical text node. Wrapping
//! or unwrapping a marker therefore never moves a coordinate of its siblings.

use smallvec::{smallvec, SmallVec};

use crate::layout;
use crate::node::{AnnotationId, NodeId, NodeKind};
use crate::span::{Bias, TextPoint};
use crate::tree::{locate_offset, ContentTree};

/// Whether the node is an annotation marker
#[inline]
#[must_use]
pub fn is_marker(tree: &ContentTree, node: NodeId) -> bool {
    matches!(tree.kind(node), Some(NodeKind::Marker(_)))
}

/// Whether the node is the highlight child of a marker
#[must_use]
pub fn is_highlight(tree: &ContentTree, node: NodeId) -> bool {
    tree.element(node)
        .is_some_and(|data| data.has_class(layout::HIGHLIGHT_CLASS))
        && tree.parent(node).is_some_and(|p| is_marker(tree, p))
}

/// Annotation owning a marker
#[inline]
#[must_use]
pub fn marker_annotation(tree: &ContentTree, node: NodeId) -> Option<AnnotationId> {
    tree.kind(node)
        .and_then(NodeKind::as_marker)
        .map(|m| m.annotation_id)
}

/// The highlight element holding a marker's original content
#[must_use]
pub fn unwrapped_content(tree: &ContentTree, marker: NodeId) -> Option<NodeId> {
    if !is_marker(tree, marker) {
        return None;
    }
    tree.children(marker).first().copied()
}

/// Number of children of a marker's unwrapped content
#[must_use]
pub fn unwrapped_child_count(tree: &ContentTree, marker: NodeId) -> usize {
    unwrapped_content(tree, marker).map_or(0, |content| tree.children(content).len())
}

/// Children of `node` with every marker replaced by its content, recursively
#[must_use]
pub fn unwrapped_children(tree: &ContentTree, node: NodeId) -> Vec<NodeId> {
    fn expand(tree: &ContentTree, children: &[NodeId], out: &mut Vec<NodeId>) {
        for &child in children {
            if is_marker(tree, child) {
                if let Some(content) = unwrapped_content(tree, child) {
                    expand(tree, tree.children(content), out);
                }
            } else {
                out.push(child);
            }
        }
    }

    let mut out = Vec::with_capacity(tree.children(node).len());
    expand(tree, tree.children(node), &mut out);
    out
}

/// Element children of `node` in the unwrapped view
#[must_use]
pub fn unwrapped_element_children(tree: &ContentTree, node: NodeId) -> Vec<NodeId> {
    unwrapped_children(tree, node)
        .into_iter()
        .filter(|&c| matches!(tree.kind(c), Some(NodeKind::Element(_))))
        .collect()
}

/// Parent of a node in the unwrapped view, skipping marker levels
#[must_use]
pub fn logical_parent(tree: &ContentTree, node: NodeId) -> Option<NodeId> {
    let mut parent = tree.parent(node)?;
    while is_marker(tree, parent) || is_highlight(tree, parent) {
        parent = tree.parent(parent)?;
    }
    Some(parent)
}

/// Adjacent text fragments that read as one text node when markers are removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    fragments: SmallVec<[NodeId; 4]>,
}

impl TextRun {
    /// Text nodes of the run in document order
    #[inline]
    #[must_use]
    pub fn fragments(&self) -> &[NodeId] {
        &self.fragments
    }

    /// Whether the run contains a text node
    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.fragments.contains(&node)
    }

    /// Combined character length
    #[must_use]
    pub fn len(&self, tree: &ContentTree) -> usize {
        self.fragments
            .iter()
            .filter_map(|&f| tree.text_len(f))
            .sum()
    }

    /// Whether the run holds no characters
    #[must_use]
    pub fn is_empty(&self, tree: &ContentTree) -> bool {
        self.len(tree) == 0
    }

    /// Offset of `point` from the start of the run
    #[must_use]
    pub fn offset_of(&self, tree: &ContentTree, point: TextPoint) -> Option<usize> {
        let mut before = 0;
        for &fragment in &self.fragments {
            let len = tree.text_len(fragment)?;
            if fragment == point.node {
                return (point.offset <= len).then_some(before + point.offset);
            }
            before += len;
        }
        None
    }

    /// Point at `offset` from the start of the run
    #[must_use]
    pub fn locate(&self, tree: &ContentTree, offset: usize, bias: Bias) -> Option<TextPoint> {
        locate_offset(tree, &self.fragments, offset, bias)
    }
}

/// One child in the unwrapped view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalChild {
    /// Merged text
    Text(TextRun),
    /// Ordinary element
    Element(NodeId),
}

impl LogicalChild {
    /// Text run, if this child is text
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(run) => Some(run),
            Self::Element(_) => None,
        }
    }
}

/// Children of `node` in the unwrapped view, with text runs merged
#[must_use]
pub fn logical_children(tree: &ContentTree, node: NodeId) -> Vec<LogicalChild> {
    let mut out: Vec<LogicalChild> = Vec::new();
    for child in unwrapped_children(tree, node) {
        match tree.kind(child) {
            Some(NodeKind::Text(_)) => match out.last_mut() {
                Some(LogicalChild::Text(run)) => run.fragments.push(child),
                _ => out.push(LogicalChild::Text(TextRun {
                    fragments: smallvec![child],
                })),
            },
            Some(_) => out.push(LogicalChild::Element(child)),
            None => {}
        }
    }
    out
}

/// Logical child index and run offset of a text point
///
/// This is what `node` and `offset` of a stored coordinate describe.
#[must_use]
pub fn logical_position(tree: &ContentTree, point: TextPoint) -> Option<(usize, usize)> {
    tree.text(point.node)?;
    let parent = logical_parent(tree, point.node)?;
    logical_children(tree, parent)
        .iter()
        .enumerate()
        .find_map(|(index, child)| {
            let run = child.as_text()?;
            run.contains(point.node)
                .then(|| run.offset_of(tree, point).map(|offset| (index, offset)))
                .flatten()
        })
}
