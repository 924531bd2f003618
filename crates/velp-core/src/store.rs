//! Persistence collaborator
//!
//! The engine never talks to a server directly; it goes through
//! [`AnnotationStore`]. [`MemoryStore`] keeps records in process.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use velp_tree::AnnotationId;

use crate::error::PersistenceError;
use crate::types::{Annotation, AnnotationPatch, AnswerRef, DocumentId, NewAnnotation};

/// Stores annotation records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Persist a new annotation and return the canonical record
    async fn create_annotation(&self, annotation: NewAnnotation) -> Result<Annotation, PersistenceError>;

    /// Apply a patch and return the updated record
    async fn update_annotation(
        &self,
        id: AnnotationId,
        patch: AnnotationPatch,
    ) -> Result<Annotation, PersistenceError>;

    /// Invalidate a record
    async fn invalidate_annotation(&self, id: AnnotationId) -> Result<(), PersistenceError>;

    /// All valid annotations of a document
    async fn list_annotations(&self, doc_id: DocumentId) -> Result<Vec<Annotation>, PersistenceError>;
}

/// In-process annotation store
#[derive(Debug)]
pub struct MemoryStore {
    next_id: AtomicU64,
    records: DashMap<AnnotationId, (DocumentId, Annotation)>,
}

impl MemoryStore {
    /// Create empty store; ids start at 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            records: DashMap::new(),
        }
    }

    /// Seed existing records of a document
    #[must_use]
    pub fn with_annotations(self, doc_id: DocumentId, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        for annotation in annotations {
            self.next_id.fetch_max(annotation.id.0 + 1, Ordering::Relaxed);
            self.records.insert(annotation.id, (doc_id, annotation));
        }
        self
    }

    /// Record by id
    #[must_use]
    pub fn get(&self, id: AnnotationId) -> Option<Annotation> {
        self.records.get(&id).map(|entry| entry.1.clone())
    }

    /// Number of valid records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AnnotationStore for MemoryStore {
    async fn create_annotation(&self, new: NewAnnotation) -> Result<Annotation, PersistenceError> {
        let id = AnnotationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let annotation = Annotation {
            id,
            velp_id: new.velp_id,
            coord: new.coord,
            answer: new.answer_id.map(|id| AnswerRef { id, users: Vec::new() }),
            points: new.points,
            visible_to: new.visible_to,
            comment: new.comment,
        };
        self.records.insert(id, (new.doc_id, annotation.clone()));
        Ok(annotation)
    }

    async fn update_annotation(
        &self,
        id: AnnotationId,
        patch: AnnotationPatch,
    ) -> Result<Annotation, PersistenceError> {
        let mut entry = self.records.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        entry.1.apply(&patch);
        Ok(entry.1.clone())
    }

    async fn invalidate_annotation(&self, id: AnnotationId) -> Result<(), PersistenceError> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }

    async fn list_annotations(&self, doc_id: DocumentId) -> Result<Vec<Annotation>, PersistenceError> {
        let mut listed: Vec<Annotation> = self
            .records
            .iter()
            .filter(|entry| entry.0 == doc_id)
            .map(|entry| entry.1.clone())
            .collect();
        listed.sort_by_key(|a| a.id);
        Ok(listed)
    }
}
