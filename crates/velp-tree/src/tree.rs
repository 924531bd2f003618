//! Arena-backed content tree
//!
//! [`ContentTree`] owns every node of a rendered document. Reads are pure and
//! return `None` on unexpected shapes; mutations validate their input and
//! return [`TreeError`].

use crate::error::TreeError;
use crate::fragment::Fragment;
use crate::layout;
use crate::node::{byte_index, char_len, AnnotationId, ElementData, MarkerData, Node, NodeId, NodeKind};
use crate::span::{Bias, Span, TextPoint};

/// Rendered document tree
///
/// The arena only grows: detached nodes keep their slot so that a stale
/// [`NodeId`] never aliases a newer node. Every re-render, wrap, unwrap and
/// margin replacement adds its new nodes, so memory is bounded by the
/// lifetime of one document view. Lookups walk from the root and only visit
/// attached nodes; their cost follows the live tree, not the arena.
#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ContentTree {
    /// Create a tree holding only an empty `body` root
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Element(ElementData::new("body")))],
            root: NodeId(0),
        }
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Node by id
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for unknown ids
    #[inline]
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::NodeNotFound(id))
    }

    /// Node kind
    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Parent of a node
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children of a node, empty for unknown ids
    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    /// Position of a node among its parent's children
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Text of a text node
    #[inline]
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.kind(id).and_then(NodeKind::as_text)
    }

    /// Character length of a text node
    #[inline]
    #[must_use]
    pub fn text_len(&self, id: NodeId) -> Option<usize> {
        self.text(id).map(char_len)
    }

    /// Element payload
    #[inline]
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.kind(id).and_then(NodeKind::as_element)
    }

    /// Whether the node is reachable from the root
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.is_ancestor(self.root, id)
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// The node and all its descendants in document order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.get(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Text leaves under `scope` in document order
    #[must_use]
    pub fn text_leaves(&self, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.text(n).is_some())
            .collect()
    }

    /// Concatenated text under `scope`
    #[must_use]
    pub fn text_content(&self, scope: NodeId) -> String {
        self.text_leaves(scope)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Character offset of `point` within the text of `scope`
    #[must_use]
    pub fn offset_in(&self, scope: NodeId, point: TextPoint) -> Option<usize> {
        let mut before = 0;
        for leaf in self.text_leaves(scope) {
            let len = self.text_len(leaf)?;
            if leaf == point.node {
                return (point.offset <= len).then_some(before + point.offset);
            }
            before += len;
        }
        None
    }

    /// Point at character `offset` within the text of `scope`
    #[must_use]
    pub fn point_in(&self, scope: NodeId, offset: usize, bias: Bias) -> Option<TextPoint> {
        locate_offset(self, &self.text_leaves(scope), offset, bias)
    }

    /// Text covered by a span, `None` if the span is not in document order
    #[must_use]
    pub fn text_between(&self, span: Span) -> Option<String> {
        let Span { start, end } = span;
        let start_text = self.text(start.node)?;
        if start.node == end.node {
            let from = byte_index(start_text, start.offset)?;
            let to = byte_index(start_text, end.offset)?;
            return (from <= to).then(|| start_text[from..to].to_string());
        }

        let leaves = self.text_leaves(self.root);
        let first = leaves.iter().position(|&n| n == start.node)?;
        let last = leaves.iter().position(|&n| n == end.node)?;
        if first > last {
            return None;
        }

        let mut out = start_text[byte_index(start_text, start.offset)?..].to_string();
        for &leaf in &leaves[first + 1..last] {
            out.push_str(self.text(leaf)?);
        }
        let end_text = self.text(end.node)?;
        out.push_str(&end_text[..byte_index(end_text, end.offset)?]);
        Some(out)
    }

    /// Marker of `annotation_id` under `scope`
    #[must_use]
    pub fn find_marker(&self, scope: NodeId, annotation_id: AnnotationId) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|&n| {
            self.kind(n)
                .and_then(NodeKind::as_marker)
                .is_some_and(|m| m.annotation_id == annotation_id)
        })
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.alloc(NodeKind::Element(data))
    }

    /// Number of allocated slots, attached or not
    #[inline]
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    /// Append a detached node as the last child of `parent`
    ///
    /// # Errors
    /// See [`ContentTree::insert`]
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let index = self.children(parent).len();
        self.insert(parent, index, child)
    }

    /// Insert a detached node at `index` among `parent`'s children
    ///
    /// Indices past the end append.
    ///
    /// # Errors
    /// - unknown ids
    /// - `parent` is a text node
    /// - `child` is attached or an ancestor of `parent`
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        if self.node(parent)?.kind.is_text() {
            return Err(TreeError::NotContainer(parent));
        }
        let node = self.node(child)?;
        if node.parent.is_some() || child == self.root {
            return Err(TreeError::AlreadyAttached(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }

        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove a node (and its subtree) from its parent
    ///
    /// # Errors
    /// Returns [`TreeError::Detached`] if the node has no parent
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.node(id)?.parent.ok_or(TreeError::Detached(id))?;
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Detach all children of a node
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for unknown ids
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Build a fragment as the last child of `parent`
    ///
    /// # Errors
    /// See [`ContentTree::insert`]
    pub fn build(&mut self, parent: NodeId, fragment: &Fragment) -> Result<NodeId, TreeError> {
        let id = match fragment {
            Fragment::Text(text) => self.create_text(text.clone()),
            Fragment::Element { children, .. } => {
                let data = fragment.element_data().unwrap_or_default();
                let id = self.create_element(data);
                for child in children {
                    self.build(id, child)?;
                }
                id
            }
        };
        self.append(parent, id)?;
        Ok(id)
    }

    /// Replace the text of a text node
    ///
    /// # Errors
    /// Returns [`TreeError::NotText`] for non-text nodes
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), TreeError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(current) => {
                *current = text.into();
                Ok(())
            }
            _ => Err(TreeError::NotText(id)),
        }
    }

    /// Mutable element payload
    ///
    /// # Errors
    /// Returns [`TreeError::NotContainer`] for text and marker nodes
    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, TreeError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(TreeError::NotContainer(id)),
        }
    }

    /// Split a text node at a character offset
    ///
    /// The original node keeps the text before `offset`; a new sibling right
    /// after it receives the rest. Returns the new node.
    ///
    /// # Errors
    /// - not a text node
    /// - offset past the end
    /// - node is detached
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, TreeError> {
        let text = self.text(id).ok_or(TreeError::NotText(id))?;
        let len = char_len(text);
        let at = byte_index(text, offset).ok_or(TreeError::OffsetOutOfRange {
            node: id,
            offset,
            len,
        })?;
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;

        let rest = text[at..].to_string();
        let head = text[..at].to_string();
        self.set_text(id, head)?;
        let right = self.create_text(rest);
        self.insert(parent, index + 1, right)?;
        Ok(right)
    }

    /// Surround the content of a span with an annotation marker
    ///
    /// Both endpoints must be text nodes under the same parent; text nodes are
    /// split at the span boundaries. The marker's single child is a
    /// `span.highlighted` element holding the wrapped nodes. Returns the marker.
    ///
    /// # Errors
    /// - [`TreeError::BoundaryViolation`] if the endpoints have different parents
    /// - [`TreeError::InvertedSpan`] / [`TreeError::EmptySpan`] for bad spans
    /// - offsets past the end of their node
    pub fn wrap(&mut self, span: Span, annotation_id: AnnotationId) -> Result<NodeId, TreeError> {
        let Span { start, end } = span;
        let start_len = self.text_len(start.node).ok_or(TreeError::NotText(start.node))?;
        let end_len = self.text_len(end.node).ok_or(TreeError::NotText(end.node))?;
        for (point, len) in [(start, start_len), (end, end_len)] {
            if point.offset > len {
                return Err(TreeError::OffsetOutOfRange {
                    node: point.node,
                    offset: point.offset,
                    len,
                });
            }
        }

        let parent = self.parent(start.node).ok_or(TreeError::Detached(start.node))?;
        if self.parent(end.node) != Some(parent) {
            return Err(TreeError::BoundaryViolation {
                start: start.node,
                end: end.node,
            });
        }
        let start_index = self.index_in_parent(start.node).ok_or(TreeError::Detached(start.node))?;
        let end_index = self.index_in_parent(end.node).ok_or(TreeError::Detached(end.node))?;
        if start_index > end_index || (start_index == end_index && start.offset > end.offset) {
            return Err(TreeError::InvertedSpan);
        }
        if span.is_collapsed() {
            return Err(TreeError::EmptySpan);
        }

        // Split the end first so the start node keeps its identity.
        if end.offset < end_len {
            self.split_text(end.node, end.offset)?;
        }
        let first = if start.offset > 0 {
            self.split_text(start.node, start.offset)?
        } else {
            start.node
        };
        let last = if start.node == end.node { first } else { end.node };

        let first_index = self.index_in_parent(first).ok_or(TreeError::Detached(first))?;
        let last_index = self.index_in_parent(last).ok_or(TreeError::Detached(last))?;
        let wrapped: Vec<NodeId> = self
            .node_mut(parent)?
            .children
            .drain(first_index..=last_index)
            .collect();

        let highlight = self.create_element(ElementData::new("span").with_class(layout::HIGHLIGHT_CLASS));
        for &child in &wrapped {
            self.node_mut(child)?.parent = Some(highlight);
        }
        self.node_mut(highlight)?.children = wrapped;

        let marker = self.alloc(NodeKind::Marker(MarkerData { annotation_id }));
        self.node_mut(marker)?.children.push(highlight);
        self.node_mut(highlight)?.parent = Some(marker);
        self.insert(parent, first_index, marker)?;
        Ok(marker)
    }

    /// Remove a marker, putting its original content back in place
    ///
    /// Adjacent text nodes in the parent are merged afterwards.
    ///
    /// # Errors
    /// Returns [`TreeError::NotMarker`] or [`TreeError::Detached`]
    pub fn unwrap_marker(&mut self, marker: NodeId) -> Result<(), TreeError> {
        if self.node(marker)?.kind.as_marker().is_none() {
            return Err(TreeError::NotMarker(marker));
        }
        let parent = self.parent(marker).ok_or(TreeError::Detached(marker))?;
        let index = self.index_in_parent(marker).ok_or(TreeError::Detached(marker))?;

        let content = match self.children(marker).first().copied() {
            Some(highlight) => std::mem::take(&mut self.node_mut(highlight)?.children),
            None => Vec::new(),
        };
        for &child in &content {
            self.node_mut(child)?.parent = Some(parent);
        }
        let siblings = &mut self.node_mut(parent)?.children;
        siblings.remove(index);
        for (i, child) in content.into_iter().enumerate() {
            siblings.insert(index + i, child);
        }
        self.node_mut(marker)?.parent = None;
        self.merge_adjacent_text(parent)
    }

    /// Merge runs of adjacent text children and drop empty ones
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for unknown ids
    pub fn merge_adjacent_text(&mut self, parent: NodeId) -> Result<(), TreeError> {
        let children = std::mem::take(&mut self.node_mut(parent)?.children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            if let Some(text) = self.text(child).map(str::to_owned) {
                let previous = kept.last().copied().filter(|&p| self.text(p).is_some());
                if text.is_empty() || previous.is_some() {
                    if let Some(prev) = previous {
                        if let NodeKind::Text(existing) = &mut self.node_mut(prev)?.kind {
                            existing.push_str(&text);
                        }
                    }
                    self.node_mut(child)?.parent = None;
                    continue;
                }
            }
            kept.push(child);
        }

        self.node_mut(parent)?.children = kept;
        Ok(())
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a character offset across consecutive text fragments to a point
///
/// On a boundary between two fragments `bias` decides which one is used.
/// Returns `None` if the offset is past the end or a fragment is not text.
#[must_use]
pub fn locate_offset(
    tree: &ContentTree,
    fragments: &[NodeId],
    offset: usize,
    bias: Bias,
) -> Option<TextPoint> {
    let mut start = 0;
    let mut last = None;
    for &fragment in fragments {
        let len = tree.text_len(fragment)?;
        let end = start + len;
        let hit = match bias {
            Bias::Forward => offset < end,
            Bias::Backward => offset <= end,
        };
        if hit && offset >= start {
            return Some(TextPoint::new(fragment, offset - start));
        }
        start = end;
        last = Some((fragment, len));
    }
    match (bias, last) {
        (Bias::Forward, Some((fragment, len))) if offset == start => Some(TextPoint::new(fragment, len)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_with(fragments: &[Fragment]) -> (ContentTree, NodeId) {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let container = tree.build(root, &Fragment::element("div")).unwrap();
        for fragment in fragments {
            tree.build(container, fragment).unwrap();
        }
        (tree, container)
    }

    #[test]
    fn build_and_read() {
        let (tree, div) = tree_with(&["Hello ".into(), Fragment::elem("em", vec!["world".into()])]);
        assert_eq!(tree.children(div).len(), 2);
        assert_eq!(tree.text_content(div), "Hello world");
        assert!(tree.is_attached(div));
    }

    #[test]
    fn split_text_keeps_head() {
        let (mut tree, div) = tree_with(&["abcdef".into()]);
        let first = tree.children(div)[0];
        let second = tree.split_text(first, 2).unwrap();
        assert_eq!(tree.text(first), Some("ab"));
        assert_eq!(tree.text(second), Some("cdef"));
        assert_eq!(tree.children(div), &[first, second]);
    }

    #[test]
    fn split_text_out_of_range() {
        let (mut tree, div) = tree_with(&["abc".into()]);
        let first = tree.children(div)[0];
        assert!(matches!(
            tree.split_text(first, 4),
            Err(TreeError::OffsetOutOfRange { len: 3, .. })
        ));
    }

    #[test]
    fn wrap_single_node() {
        let (mut tree, div) = tree_with(&["The quick fox".into()]);
        let text = tree.children(div)[0];
        let marker = tree
            .wrap(
                Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9)),
                AnnotationId(1),
            )
            .unwrap();

        let children = tree.children(div).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], marker);
        assert_eq!(tree.text(children[0]), Some("The "));
        assert_eq!(tree.text(children[2]), Some(" fox"));
        assert_eq!(tree.text_content(marker), "quick");
        assert_eq!(tree.text_content(div), "The quick fox");
        assert_eq!(tree.find_marker(div, AnnotationId(1)), Some(marker));
    }

    #[test]
    fn wrap_whole_node_does_not_split() {
        let (mut tree, div) = tree_with(&["abc".into()]);
        let text = tree.children(div)[0];
        tree.wrap(
            Span::new(TextPoint::new(text, 0), TextPoint::new(text, 3)),
            AnnotationId(1),
        )
        .unwrap();
        assert_eq!(tree.children(div).len(), 1);
    }

    #[test]
    fn wrap_across_siblings() {
        let (mut tree, div) = tree_with(&[
            "Hello ".into(),
            Fragment::elem("em", vec!["world".into()]),
            " again".into(),
        ]);
        let children = tree.children(div).to_vec();
        let marker = tree
            .wrap(
                Span::new(TextPoint::new(children[0], 2), TextPoint::new(children[2], 3)),
                AnnotationId(5),
            )
            .unwrap();
        assert_eq!(tree.text_content(marker), "llo world ag");
        assert_eq!(tree.text_content(div), "Hello world again");
    }

    #[test]
    fn wrap_rejects_crossing_parents() {
        let (mut tree, div) = tree_with(&["Hello ".into(), Fragment::elem("em", vec!["world".into()])]);
        let children = tree.children(div).to_vec();
        let inner = tree.children(children[1])[0];
        let result = tree.wrap(
            Span::new(TextPoint::new(children[0], 1), TextPoint::new(inner, 2)),
            AnnotationId(1),
        );
        assert!(matches!(result, Err(TreeError::BoundaryViolation { .. })));
        assert_eq!(tree.text_content(div), "Hello world");
    }

    #[test]
    fn wrap_rejects_inverted_and_empty() {
        let (mut tree, div) = tree_with(&["abc".into()]);
        let text = tree.children(div)[0];
        assert_eq!(
            tree.wrap(Span::new(TextPoint::new(text, 2), TextPoint::new(text, 1)), AnnotationId(1)),
            Err(TreeError::InvertedSpan)
        );
        assert_eq!(
            tree.wrap(Span::new(TextPoint::new(text, 1), TextPoint::new(text, 1)), AnnotationId(1)),
            Err(TreeError::EmptySpan)
        );
    }

    #[test]
    fn unwrap_restores_single_text() {
        let (mut tree, div) = tree_with(&["The quick fox".into()]);
        let text = tree.children(div)[0];
        let marker = tree
            .wrap(
                Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9)),
                AnnotationId(1),
            )
            .unwrap();
        tree.unwrap_marker(marker).unwrap();
        assert_eq!(tree.children(div).len(), 1);
        assert_eq!(tree.text(tree.children(div)[0]), Some("The quick fox"));
        assert!(!tree.is_attached(marker));
    }

    #[test]
    fn unwrap_requires_marker() {
        let (mut tree, div) = tree_with(&["abc".into()]);
        assert_eq!(tree.unwrap_marker(div), Err(TreeError::NotMarker(div)));
    }

    #[test]
    fn insert_rejects_cycles() {
        let (mut tree, div) = tree_with(&[]);
        let root = tree.root();
        tree.detach(div).unwrap();
        let inner = tree.create_element(ElementData::new("p"));
        tree.append(div, inner).unwrap();
        assert_eq!(tree.append(inner, div), Err(TreeError::Cycle { parent: inner, child: div }));
        assert_eq!(tree.append(root, inner), Err(TreeError::AlreadyAttached(inner)));
    }

    #[test]
    fn text_between_spans_nodes() {
        let (tree, div) = tree_with(&[
            "Hello ".into(),
            Fragment::elem("em", vec!["world".into()]),
            " again".into(),
        ]);
        let children = tree.children(div).to_vec();
        let span = Span::new(TextPoint::new(children[0], 3), TextPoint::new(children[2], 2));
        assert_eq!(tree.text_between(span).as_deref(), Some("lo world a"));
        let backwards = Span::new(TextPoint::new(children[2], 2), TextPoint::new(children[0], 3));
        assert_eq!(tree.text_between(backwards), None);
    }

    #[test]
    fn offsets_in_scope() {
        let (tree, div) = tree_with(&["ab".into(), Fragment::elem("em", vec!["cd".into()]), "ef".into()]);
        let em_text = tree.children(tree.children(div)[1])[0];
        assert_eq!(tree.offset_in(div, TextPoint::new(em_text, 1)), Some(3));

        let forward = tree.point_in(div, 2, Bias::Forward).unwrap();
        assert_eq!(forward, TextPoint::new(em_text, 0));
        let backward = tree.point_in(div, 2, Bias::Backward).unwrap();
        assert_eq!(backward.offset, 2);
        assert!(tree.point_in(div, 7, Bias::Forward).is_none());
        assert!(tree.point_in(div, 6, Bias::Forward).is_some());
    }

    #[test]
    fn merge_drops_empty_text() {
        let (mut tree, div) = tree_with(&["a".into(), "".into(), "b".into()]);
        tree.merge_adjacent_text(div).unwrap();
        assert_eq!(tree.children(div).len(), 1);
        assert_eq!(tree.text(tree.children(div)[0]), Some("ab"));
    }
}
