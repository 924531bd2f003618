//! Coordinate codec
//!
//! Converts live selections into [`AnnotationInterval`]s and back. All
//! positions are taken in the unwrapped view of the tree (see
//! [`velp_tree::marker`]), so existing markers never shift a coordinate and a
//! coordinate stays valid after its own marker is inserted.

use tracing::debug;
use velp_tree::marker::{logical_children, logical_parent, logical_position, unwrapped_content};
use velp_tree::{
    AnnotationId, Bias, Document, ElementPath, LogicalChild, NodeId, ParId, ParagraphRef, PathError,
    Span, TextPoint,
};

use crate::coord::{AnnotationCoord, AnnotationInterval, CoordError};
use crate::error::AnchorError;

/// Encode one selection endpoint as a full coordinate
///
/// # Errors
/// - [`AnchorError::NotText`] if the point is not in a text node
/// - [`AnchorError::NoParagraph`] if no ancestor carries a version token
/// - [`AnchorError::OutsideContent`] for points outside the content root
/// - [`AnchorError::RangeInvalid`] if the offset exceeds the text node
pub fn encode_point(doc: &Document, point: TextPoint) -> Result<AnnotationCoord, AnchorError> {
    let tree = doc.tree();
    let len = tree.text_len(point.node).ok_or(AnchorError::NotText(point.node))?;
    if point.offset > len {
        return Err(AnchorError::RangeInvalid {
            offset: point.offset,
            len,
        });
    }

    let par = doc.paragraph_of(point.node).ok_or(AnchorError::NoParagraph)?;
    if !tree.is_ancestor(par.content, point.node) {
        return Err(AnchorError::OutsideContent);
    }

    let parent = logical_parent(tree, point.node).ok_or(AnchorError::OutsideContent)?;
    let el_path = ElementPath::locate(tree, par.content, parent).ok_or(AnchorError::OutsideContent)?;
    let (node, offset) = logical_position(tree, point).ok_or(AnchorError::RangeInvalid {
        offset: point.offset,
        len,
    })?;

    Ok(AnnotationCoord::full(par.id, par.token, el_path, node, offset))
}

/// Encode a selection as a full interval
///
/// # Errors
/// See [`encode_point`]; additionally fails with
/// [`AnchorError::Malformed`] when the ends lie in different paragraphs
pub fn encode(doc: &Document, span: Span) -> Result<AnnotationInterval, AnchorError> {
    let interval = AnnotationInterval::new(encode_point(doc, span.start)?, encode_point(doc, span.end)?);
    interval.validate()?;
    debug!(
        par_id = %interval.par_id(),
        start = ?interval.start.offset,
        end = ?interval.end.offset,
        "encoded selection"
    );
    Ok(interval)
}

/// Compare the stored version tokens with the paragraph's current one
///
/// A missing stored token never counts as fresh.
///
/// # Errors
/// Returns [`AnchorError::StaleVersion`] on the first mismatching end
pub fn check_freshness(par: &ParagraphRef, interval: &AnnotationInterval) -> Result<(), AnchorError> {
    for coord in [&interval.start, &interval.end] {
        if coord.t.as_deref() != Some(par.token.as_str()) {
            return Err(AnchorError::StaleVersion {
                stored: coord.t.clone(),
                current: par.token.clone(),
            });
        }
    }
    Ok(())
}

/// Resolve a stored interval to a live span
///
/// Checks, in order: coordinate shape, paragraph presence, freshness, full
/// coordinates on both ends, element path, child index and offset.
///
/// # Errors
/// Any [`AnchorError`] except the encoding-only variants
pub fn decode(doc: &Document, interval: &AnnotationInterval) -> Result<Span, AnchorError> {
    match interval.validate() {
        // half-full intervals decode as partial once the paragraph checks pass
        Ok(()) | Err(CoordError::AsymmetricFullness) => {}
        Err(err) => return Err(err.into()),
    }
    let par = doc
        .paragraph(interval.par_id())
        .ok_or_else(|| AnchorError::ParagraphGone(interval.par_id().clone()))?;
    check_freshness(&par, interval)?;
    if !interval.is_full() {
        return Err(AnchorError::PartialCoord);
    }

    let start = resolve_point(doc, par.content, &interval.start, Bias::Forward)?;
    let end = resolve_point(doc, par.content, &interval.end, Bias::Backward)?;
    Ok(Span::new(start, end))
}

fn resolve_point(
    doc: &Document,
    content: NodeId,
    coord: &AnnotationCoord,
    bias: Bias,
) -> Result<TextPoint, AnchorError> {
    let tree = doc.tree();
    let (Some(path), Some(node), Some(offset)) = (&coord.el_path, coord.node, coord.offset) else {
        return Err(AnchorError::PartialCoord);
    };

    let element = path.resolve(tree, content).map_err(|err| match err {
        PathError::Missing { depth, index } => AnchorError::PathMissing { depth, index },
        other => AnchorError::Malformed(CoordError::Path(other)),
    })?;

    let children = logical_children(tree, element);
    let run = children
        .get(node)
        .and_then(LogicalChild::as_text)
        .ok_or(AnchorError::PathMissing {
            depth: path.len(),
            index: node,
        })?;

    let len = run.len(tree);
    if offset > len {
        return Err(AnchorError::RangeInvalid { offset, len });
    }
    run.locate(tree, offset, bias)
        .ok_or(AnchorError::RangeInvalid { offset, len })
}

/// Encode a selection inside a paragraph's plugin answer
///
/// Produces offset-only coordinates relative to the answer's plain text.
///
/// # Errors
/// - [`AnchorError::NoParagraph`] / [`AnchorError::AnswerMissing`]
/// - [`AnchorError::OutsideContent`] if an end is outside the answer view
pub fn encode_answer(doc: &Document, span: Span) -> Result<AnnotationInterval, AnchorError> {
    let tree = doc.tree();
    let par = doc.paragraph_of(span.start.node).ok_or(AnchorError::NoParagraph)?;
    let view = doc
        .answer_view(&par.id)
        .ok_or_else(|| AnchorError::AnswerMissing(par.id.clone()))?;

    let offset_of = |point: TextPoint| -> Result<usize, AnchorError> {
        let len = tree.text_len(point.node).ok_or(AnchorError::NotText(point.node))?;
        if !tree.is_ancestor(view, point.node) {
            return Err(AnchorError::OutsideContent);
        }
        tree.offset_in(view, point).ok_or(AnchorError::RangeInvalid {
            offset: point.offset,
            len,
        })
    };
    let start = offset_of(span.start)?;
    let end = offset_of(span.end)?;

    let token = Some(par.token.clone());
    Ok(AnnotationInterval::new(
        AnnotationCoord::offset_only(par.id.clone(), token.clone(), start),
        AnnotationCoord::offset_only(par.id, token, end),
    ))
}

/// Resolve offset-only coordinates against the displayed answer text
///
/// # Errors
/// - [`AnchorError::ParagraphGone`] / [`AnchorError::AnswerMissing`]
/// - [`AnchorError::PartialCoord`] if an offset is missing
/// - [`AnchorError::RangeInvalid`] if the answer text is shorter
pub fn decode_answer(doc: &Document, interval: &AnnotationInterval) -> Result<Span, AnchorError> {
    let par_id: &ParId = interval.par_id();
    doc.paragraph(par_id)
        .ok_or_else(|| AnchorError::ParagraphGone(par_id.clone()))?;
    let (Some(start), Some(end)) = (interval.start.offset, interval.end.offset) else {
        return Err(AnchorError::PartialCoord);
    };
    let view = doc
        .answer_view(par_id)
        .ok_or_else(|| AnchorError::AnswerMissing(par_id.clone()))?;

    let tree = doc.tree();
    let len = tree.text_content(view).chars().count();
    let point = |offset: usize, bias: Bias| {
        tree.point_in(view, offset, bias)
            .ok_or(AnchorError::RangeInvalid { offset, len })
    };
    Ok(Span::new(point(start, Bias::Forward)?, point(end, Bias::Backward)?))
}

/// Recompute the child indices of a full interval from its live marker
///
/// Runs after the wrap, once the tree has settled. Offsets and paths are
/// kept as stored.
///
/// # Errors
/// - [`AnchorError::PartialCoord`] for non-full intervals
/// - [`AnchorError::MarkerMissing`] if the marker is not in the document
pub fn finalize_node_numbers(
    doc: &Document,
    annotation_id: AnnotationId,
    interval: &AnnotationInterval,
) -> Result<AnnotationInterval, AnchorError> {
    if !interval.is_full() {
        return Err(AnchorError::PartialCoord);
    }
    let tree = doc.tree();
    let marker = doc
        .inline_marker(annotation_id)
        .ok_or(AnchorError::MarkerMissing(annotation_id))?;
    let content = unwrapped_content(tree, marker).ok_or(AnchorError::MarkerMissing(annotation_id))?;
    let children = tree.children(content);
    let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
        return Err(AnchorError::MarkerMissing(annotation_id));
    };

    let last_len = tree.text_len(last).ok_or(AnchorError::NotText(last))?;
    let (start_node, _) = logical_position(tree, TextPoint::new(first, 0)).ok_or(AnchorError::NotText(first))?;
    let (end_node, _) =
        logical_position(tree, TextPoint::new(last, last_len)).ok_or(AnchorError::NotText(last))?;

    let mut finalized = interval.clone();
    finalized.start.node = Some(start_node);
    finalized.end.node = Some(end_node);
    if finalized != *interval {
        debug!(
            annotation_id = %annotation_id,
            start_node,
            end_node,
            "corrected node numbers after wrap"
        );
    }
    Ok(finalized)
}
