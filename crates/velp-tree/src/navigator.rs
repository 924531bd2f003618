//! Read-only walks over a [`ContentTree`]
//!
//! Tree shape is untrusted since content may be re-rendered at any time, so
//! every function returns `None` or an empty list instead of failing.

use crate::node::{NodeId, NodeKind};
use crate::tree::ContentTree;

/// Parent of a node
#[inline]
#[must_use]
pub fn parent_of(tree: &ContentTree, node: NodeId) -> Option<NodeId> {
    tree.parent(node)
}

/// Non-text children of a node, in order
///
/// Markers count as elements here; use
/// [`unwrapped_element_children`](crate::marker::unwrapped_element_children)
/// for the marker-free view.
#[must_use]
pub fn element_children(tree: &ContentTree, node: NodeId) -> Vec<NodeId> {
    tree.children(node)
        .iter()
        .copied()
        .filter(|&c| tree.kind(c).is_some_and(|k| !k.is_text()))
        .collect()
}

/// Strict ancestors of a node, nearest first
#[must_use]
pub fn ancestors(tree: &ContentTree, node: NodeId) -> Ancestors<'_> {
    Ancestors {
        tree,
        next: tree.parent(node),
    }
}

/// Iterator returned by [`ancestors`]
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a ContentTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Nearest strict ancestor carrying `attribute`
#[must_use]
pub fn nearest_ancestor_with_attribute(
    tree: &ContentTree,
    node: NodeId,
    attribute: &str,
) -> Option<NodeId> {
    ancestors(tree, node).find(|&a| {
        tree.element(a)
            .is_some_and(|data| data.has_attribute(attribute))
    })
}

/// First descendant without children, the node itself if it is a leaf
#[must_use]
pub fn first_leaf(tree: &ContentTree, node: NodeId) -> Option<NodeId> {
    tree.get(node)?;
    let mut current = node;
    while let Some(&child) = tree.children(current).first() {
        current = child;
    }
    Some(current)
}

/// Last descendant without children, the node itself if it is a leaf
#[must_use]
pub fn last_leaf(tree: &ContentTree, node: NodeId) -> Option<NodeId> {
    tree.get(node)?;
    let mut current = node;
    while let Some(&child) = tree.children(current).last() {
        current = child;
    }
    Some(current)
}

/// Whether the node is an element (not text, not a marker)
#[inline]
#[must_use]
pub fn is_element(tree: &ContentTree, node: NodeId) -> bool {
    matches!(tree.kind(node), Some(NodeKind::Element(_)))
}
