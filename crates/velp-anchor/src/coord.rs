//! Persisted annotation coordinates
//!
//! An [`AnnotationCoord`] is one end of an anchor. It always names the
//! paragraph; a *full* coordinate also carries the element path, the logical
//! child index and the character offset. Answer-scoped coordinates carry an
//! offset only.

use serde::{Deserialize, Serialize};
use velp_tree::{ElementPath, ParId, PathError};

/// One end of a persisted anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationCoord {
    /// Paragraph the annotation belongs to
    pub par_id: ParId,
    /// Paragraph version token when the coordinate was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Element path below the paragraph's content root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_path: Option<ElementPath>,
    /// Logical child index under the addressed element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<usize>,
    /// Character offset within that child (or within the answer text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Number of path levels, equal to `el_path.len()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

impl AnnotationCoord {
    /// Whole-paragraph coordinate
    #[must_use]
    pub fn paragraph(par_id: ParId, t: Option<String>) -> Self {
        Self {
            par_id,
            t,
            el_path: None,
            node: None,
            offset: None,
            depth: None,
        }
    }

    /// Full structural coordinate
    #[must_use]
    pub fn full(par_id: ParId, t: impl Into<String>, el_path: ElementPath, node: usize, offset: usize) -> Self {
        let depth = el_path.len();
        Self {
            par_id,
            t: Some(t.into()),
            el_path: Some(el_path),
            node: Some(node),
            offset: Some(offset),
            depth: Some(depth),
        }
    }

    /// Offset-only coordinate into a plugin answer
    #[must_use]
    pub fn offset_only(par_id: ParId, t: Option<String>, offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..Self::paragraph(par_id, t)
        }
    }

    /// Whether path, node and offset are all present
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.el_path.is_some() && self.node.is_some() && self.offset.is_some()
    }

    /// Same paragraph and token with the path fields dropped
    #[must_use]
    pub fn to_paragraph(&self) -> Self {
        Self::paragraph(self.par_id.clone(), self.t.clone())
    }

    fn check_depth(&self) -> Result<(), CoordError> {
        match (&self.el_path, self.depth) {
            (Some(path), Some(depth)) if path.len() != depth => Err(CoordError::DepthMismatch {
                depth,
                path_len: path.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Persisted anchor of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInterval {
    /// Start of the annotated range
    pub start: AnnotationCoord,
    /// End of the annotated range
    pub end: AnnotationCoord,
}

impl AnnotationInterval {
    /// Create interval
    #[inline]
    #[must_use]
    pub fn new(start: AnnotationCoord, end: AnnotationCoord) -> Self {
        Self { start, end }
    }

    /// Whole-paragraph interval
    #[must_use]
    pub fn paragraph(par_id: ParId, t: Option<String>) -> Self {
        let coord = AnnotationCoord::paragraph(par_id, t);
        Self::new(coord.clone(), coord)
    }

    /// Paragraph both ends belong to
    #[inline]
    #[must_use]
    pub fn par_id(&self) -> &ParId {
        &self.start.par_id
    }

    /// Whether both ends are full, so the annotation can be shown inline
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.start.is_full() && self.end.is_full()
    }

    /// Whether both ends carry an offset
    #[inline]
    #[must_use]
    pub fn has_offsets(&self) -> bool {
        self.start.offset.is_some() && self.end.offset.is_some()
    }

    /// Start offset, used to order annotations within an answer
    #[inline]
    #[must_use]
    pub fn start_offset(&self) -> Option<usize> {
        self.start.offset
    }

    /// The same paragraph with path fields dropped
    #[must_use]
    pub fn to_paragraph(&self) -> Self {
        Self::new(self.start.to_paragraph(), self.end.to_paragraph())
    }

    /// Check the structural invariants of a stored interval
    ///
    /// # Errors
    /// - ends in different paragraphs
    /// - only one end is full
    /// - `depth` disagrees with the element path
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.start.par_id != self.end.par_id {
            return Err(CoordError::ParagraphMismatch {
                start: self.start.par_id.clone(),
                end: self.end.par_id.clone(),
            });
        }
        if self.start.is_full() != self.end.is_full() {
            return Err(CoordError::AsymmetricFullness);
        }
        self.start.check_depth()?;
        self.end.check_depth()
    }
}

/// Structural problems in a stored coordinate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    /// Interval spans two paragraphs
    #[error("interval starts in paragraph '{start}' but ends in '{end}'")]
    ParagraphMismatch { start: ParId, end: ParId },

    /// Exactly one end is full
    #[error("only one end of the interval is a full coordinate")]
    AsymmetricFullness,

    /// Stored depth disagrees with the element path
    #[error("depth {depth} does not match element path of length {path_len}")]
    DepthMismatch { depth: usize, path_len: usize },

    /// Element path could not be read
    #[error(transparent)]
    Path(#[from] PathError),
}
