//! Velp Core - review engine
//!
//! Ties anchoring to the live document and its collaborators:
//! - Annotation records, velps and review configuration
//! - Margin fallback rendering
//! - The creation state machine and the anchoring orchestrator
//! - Persistence and answer-browser seams
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use velp_core::prelude::*;
//! use velp_tree::{Document, Span, TextPoint};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::new();
//! let par = doc.add_paragraph("p1", "t1", &["The quick fox".into()])?;
//! let text = doc.tree().children(par.content)[0];
//!
//! let scope = ReviewScope::new(document_handle(doc), DocumentId(1), Arc::new(MemoryStore::new()));
//! let controller = ReviewController::new(scope, ReviewConfig::default());
//!
//! controller.select_text(text, Some(Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9))));
//! let created = controller.use_velp(&Velp::new(VelpId(1), "Word choice")).await?;
//! assert!(created.is_some_and(|a| a.coord.is_full()));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod answers;
pub mod error;
pub mod margin;
pub mod orchestrator;
pub mod scope;
pub mod stage;
pub mod store;
pub mod types;

pub use answers::{AnswerBrowser, AnswerCatalog, NoAnswers};
pub use error::{AnswerError, PersistenceError, ReviewError, TransitionError};
pub use margin::{AnchorStatus, MarginReason, MarginRenderer, Placement};
pub use orchestrator::{RestoreSummary, ReviewController, Selection};
pub use scope::{document_handle, DocumentHandle, ReviewScope};
pub use stage::{allowed_transitions, validate_transition, CreationStage};
pub use store::{AnnotationStore, MemoryStore};
pub use types::{
    Annotation, AnnotationPatch, AnswerId, AnswerRef, DocumentId, NewAnnotation, ReviewConfig, UserId, UserRef,
    Velp, VelpId, Visibility,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the review engine
    pub use crate::{
        document_handle, Annotation, AnnotationPatch, AnnotationStore, AnswerBrowser, DocumentId, MemoryStore,
        ReviewConfig, ReviewController, ReviewError, ReviewScope, Velp, VelpId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
