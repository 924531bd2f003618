//! Explicit review context
//!
//! Everything the orchestrator works on is passed in through a
//! [`ReviewScope`]: the live document, its id and the collaborators.

use std::sync::Arc;

use parking_lot::RwLock;
use velp_tree::Document;

use crate::answers::{AnswerBrowser, NoAnswers};
use crate::store::AnnotationStore;
use crate::types::DocumentId;

/// Shared handle to the live document
pub type DocumentHandle = Arc<RwLock<Document>>;

/// Wrap a document in a shareable handle
#[must_use]
pub fn document_handle(document: Document) -> DocumentHandle {
    Arc::new(RwLock::new(document))
}

/// The annotatable surface being reviewed and its collaborators
#[derive(Clone)]
pub struct ReviewScope {
    /// Live document
    pub document: DocumentHandle,
    /// Document id used with the store
    pub document_id: DocumentId,
    /// Persistence collaborator
    pub store: Arc<dyn AnnotationStore>,
    /// Answer-browser collaborator
    pub answers: Arc<dyn AnswerBrowser>,
}

impl ReviewScope {
    /// Create scope without plugin answers
    #[must_use]
    pub fn new(document: DocumentHandle, document_id: DocumentId, store: Arc<dyn AnnotationStore>) -> Self {
        Self {
            document,
            document_id,
            store,
            answers: Arc::new(NoAnswers),
        }
    }

    /// With answer browser
    #[inline]
    #[must_use]
    pub fn with_answers(mut self, answers: Arc<dyn AnswerBrowser>) -> Self {
        self.answers = answers;
        self
    }
}

impl std::fmt::Debug for ReviewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewScope")
            .field("document_id", &self.document_id)
            .finish_non_exhaustive()
    }
}
