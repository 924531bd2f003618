//! Velp Content Tree
//!
//! The live, re-renderable document that annotations are anchored in.
//!
//! # Core Concepts
//!
//! - [`ContentTree`]: Arena of text, element and marker nodes
//! - [`Document`]: Paragraph registry on top of the tree, with version tokens,
//!   content roots and margin regions
//! - [`navigator`]: Pure walks (parents, element children, leaves, ancestors)
//! - [`marker`]: Annotation markers and the unwrapped view of the tree
//! - [`ElementPath`]: Marker-independent addressing below a content root
//!
//! # Example
//!
//! ```rust
//! use velp_tree::{AnnotationId, Document, Span, TextPoint};
//!
//! let mut doc = Document::new();
//! let par = doc.add_paragraph("p1", "t1", &["The quick fox".into()]).unwrap();
//! let text = doc.tree().children(par.content)[0];
//!
//! let span = Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9));
//! let marker = doc.tree_mut().wrap(span, AnnotationId(1)).unwrap();
//! assert_eq!(doc.tree().text_content(marker), "quick");
//! assert_eq!(doc.plain_text(&"p1".into()).unwrap(), "The quick fox");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod error;
mod fragment;
mod node;
mod path;
mod span;
mod tree;

pub mod layout;
pub mod marker;
pub mod navigator;

pub use document::{Document, ParId, ParagraphRef};
pub use error::TreeError;
pub use fragment::Fragment;
pub use marker::{LogicalChild, TextRun};
pub use node::{char_len, AnnotationId, ElementData, MarkerData, Node, NodeId, NodeKind};
pub use path::{ElementPath, PathError};
pub use span::{Bias, Span, TextPoint};
pub use tree::{locate_offset, ContentTree};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
