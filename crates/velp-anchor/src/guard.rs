//! Validation of new selections
//!
//! Provides [`SelectionGuard`], which decides whether a live selection may
//! become an inline annotation before anything is encoded.

use velp_tree::layout;
use velp_tree::marker::{is_highlight, is_marker};
use velp_tree::navigator::ancestors;
use velp_tree::{Document, NodeId, Span};

/// Classes whose regions are never annotatable
pub const DEFAULT_ILLEGAL_CLASSES: [&str; 5] = [
    "annotation-info",
    layout::HIGHLIGHT_CLASS,
    "editorArea",
    "previewcontent",
    layout::MARGIN_CLASS,
];

/// Selection validator
///
/// Rejects selections that would produce a corrupt or ambiguous anchor:
/// crossing element boundaries, nesting inside or overlapping an existing
/// annotation, or touching editor chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionGuard {
    illegal_classes: Vec<String>,
}

impl SelectionGuard {
    /// Create guard with a custom denylist
    #[must_use]
    pub fn new(illegal_classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            illegal_classes: illegal_classes.into_iter().map(Into::into).collect(),
        }
    }

    /// Denylisted classes
    #[inline]
    #[must_use]
    pub fn illegal_classes(&self) -> &[String] {
        &self.illegal_classes
    }

    /// Validate a selection
    ///
    /// # Returns
    /// - `Ok(())` if the selection can be anchored inline
    /// - `Err(Rejection)` naming the first failed check
    pub fn validate(&self, doc: &Document, span: Span) -> Result<(), Rejection> {
        let tree = doc.tree();
        if span.is_collapsed() {
            return Err(Rejection::Empty);
        }
        for point in [span.start, span.end] {
            if tree.text(point.node).is_none() {
                return Err(Rejection::NotText(point.node));
            }
        }

        let parent = tree.parent(span.start.node);
        if parent.is_none() || tree.parent(span.end.node) != parent {
            return Err(Rejection::CrossingTags);
        }

        self.check_ancestry(doc, span.start.node)?;
        self.check_ancestry(doc, span.end.node)?;

        if Self::contains_marker(doc, span)? {
            return Err(Rejection::ContainsAnnotation);
        }
        Ok(())
    }

    fn check_ancestry(&self, doc: &Document, node: NodeId) -> Result<(), Rejection> {
        let tree = doc.tree();
        for ancestor in ancestors(tree, node) {
            if is_marker(tree, ancestor) || is_highlight(tree, ancestor) {
                return Err(Rejection::InsideAnnotation);
            }
            let Some(data) = tree.element(ancestor) else {
                continue;
            };
            if data.has_attribute(layout::VERSION_ATTR) {
                return Ok(());
            }
            if let Some(class) = self.illegal_classes.iter().find(|c| data.has_class(c)) {
                return Err(Rejection::IllegalRegion { class: class.clone() });
            }
        }
        Err(Rejection::NoParagraph)
    }

    /// Whether a marker lies strictly between the selection ends
    fn contains_marker(doc: &Document, span: Span) -> Result<bool, Rejection> {
        let tree = doc.tree();
        let parent = tree.parent(span.start.node).ok_or(Rejection::CrossingTags)?;
        let siblings = tree.children(parent);
        let position = |node| siblings.iter().position(|&c| c == node);
        let (Some(first), Some(last)) = (position(span.start.node), position(span.end.node)) else {
            return Err(Rejection::CrossingTags);
        };
        if first > last || (first == last && span.start.offset > span.end.offset) {
            return Err(Rejection::Inverted);
        }

        Ok(siblings[first..=last]
            .iter()
            .flat_map(|&sibling| tree.descendants(sibling))
            .any(|n| is_marker(tree, n)))
    }
}

impl Default for SelectionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ILLEGAL_CLASSES)
    }
}

/// Reason a selection was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Nothing selected
    #[error("selection is empty")]
    Empty,

    /// Selection end precedes its start
    #[error("selection end precedes its start")]
    Inverted,

    /// Endpoint is not in a text node
    #[error("selection endpoint {0} is not text")]
    NotText(NodeId),

    /// Ends belong to different elements
    #[error("selection crosses element boundaries")]
    CrossingTags,

    /// An end lies inside an existing annotation
    #[error("selection is inside an existing annotation")]
    InsideAnnotation,

    /// An end lies in a region that is never annotatable
    #[error("selection is inside a '{class}' region")]
    IllegalRegion { class: String },

    /// Selection overlaps an existing annotation
    #[error("selection contains an existing annotation")]
    ContainsAnnotation,

    /// Selection is not inside a paragraph
    #[error("selection is not inside a paragraph")]
    NoParagraph,
}
