//! Velp Anchoring
//!
//! Durable coordinates for annotations on live, re-rendered paragraphs.
//!
//! # Core Concepts
//!
//! - [`AnnotationInterval`]: Persisted anchor, two [`AnnotationCoord`]s
//! - [`encode`] / [`decode`]: Selection to coordinate and back, marker-independent
//! - [`encode_answer`] / [`decode_answer`]: Offset-only anchors into plugin answers
//! - [`finalize_node_numbers`]: Post-wrap correction of child indices
//! - [`SelectionGuard`]: Rejects selections that cannot be anchored inline
//!
//! # Example
//!
//! ```rust
//! use velp_anchor::{decode, encode};
//! use velp_tree::{Document, Span, TextPoint};
//!
//! let mut doc = Document::new();
//! let par = doc.add_paragraph("p1", "t1", &["The quick fox".into()]).unwrap();
//! let text = doc.tree().children(par.content)[0];
//!
//! let interval = encode(&doc, Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9))).unwrap();
//! assert_eq!(interval.start.offset, Some(4));
//! let span = decode(&doc, &interval).unwrap();
//! assert_eq!(doc.text_of(span).unwrap(), "quick");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codec;
mod coord;
mod error;
mod guard;

pub use codec::{
    check_freshness, decode, decode_answer, encode, encode_answer, encode_point, finalize_node_numbers,
};
pub use coord::{AnnotationCoord, AnnotationInterval, CoordError};
pub use error::AnchorError;
pub use guard::{Rejection, SelectionGuard, DEFAULT_ILLEGAL_CLASSES};

pub use velp_tree::{ElementPath, ParId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
