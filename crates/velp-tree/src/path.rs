//! Element paths for addressing within a paragraph
//!
//! Provides [`ElementPath`], the `el_path` of a stored coordinate: one
//! element-child index per level below a paragraph's content root, counted in
//! the unwrapped view so markers never add a level or shift an index.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::marker::{logical_parent, unwrapped_element_children};
use crate::node::NodeId;
use crate::tree::ContentTree;

/// Path from a content root down to an element
///
/// # Examples
/// - `[]` → the content root itself
/// - `[1, 0]` → first element child of the second element child
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementPath(Vec<usize>);

impl ElementPath {
    /// Create new path from indices
    #[inline]
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Empty path (the content root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path indices
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of levels below the root
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of `node` below `root`, `None` if it is not an element under it
    #[must_use]
    pub fn locate(tree: &ContentTree, root: NodeId, node: NodeId) -> Option<Self> {
        position_in_tree(tree, root, node).map(Self)
    }

    /// Element addressed by this path below `root`
    ///
    /// # Errors
    /// Returns [`PathError::Missing`] at the first level whose index no
    /// longer exists
    pub fn resolve(&self, tree: &ContentTree, root: NodeId) -> Result<NodeId, PathError> {
        self.0
            .iter()
            .enumerate()
            .try_fold(root, |current, (depth, &index)| {
                unwrapped_element_children(tree, current)
                    .get(index)
                    .copied()
                    .ok_or(PathError::Missing { depth, index })
            })
    }
}

fn position_in_tree(tree: &ContentTree, root: NodeId, node: NodeId) -> Option<Vec<usize>> {
    if node == root {
        return Some(Vec::new());
    }
    let parent = logical_parent(tree, node)?;
    let mut path = position_in_tree(tree, root, parent)?;
    let index = unwrapped_element_children(tree, parent)
        .iter()
        .position(|&c| c == node)?;
    path.push(index);
    Some(path)
}

impl Display for ElementPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", joined.join("."))
    }
}

impl FromStr for ElementPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let indices: Vec<usize> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    seg.parse()
                        .map_err(|_| PathError::InvalidSegment(seg.to_string()))
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(indices))
    }
}

impl From<Vec<usize>> for ElementPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// Errors related to element paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment is not an index
    #[error("invalid segment: {0} (must be a non-negative integer)")]
    InvalidSegment(String),

    /// Level no longer exists in the tree
    #[error("no element child {index} at depth {depth}")]
    Missing { depth: usize, index: usize },
}
