//! Anchoring orchestrator
//!
//! [`ReviewController`] owns the in-memory annotation set of one document
//! view. It drives creation (encode, persist, wrap, settle, finalize),
//! restoration of stored annotations, answer switching and deletion, and
//! falls back to margin notes whenever an inline anchor is not possible.
//!
//! Tree access goes through the scope's document lock. The lock is never
//! held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use velp_anchor::{
    decode, decode_answer, encode, encode_answer, finalize_node_numbers, AnchorError, AnnotationInterval,
    SelectionGuard,
};
use velp_tree::{layout, AnnotationId, Document, NodeId, ParId, Span};

use crate::error::{ReviewError, TransitionError};
use crate::margin::{AnchorStatus, MarginReason, MarginRenderer, Placement};
use crate::scope::{DocumentHandle, ReviewScope};
use crate::stage::{validate_transition, CreationStage};
use crate::types::{Annotation, AnnotationPatch, AnswerId, NewAnnotation, ReviewConfig, Velp, VelpId};

/// The reviewer's current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Validated text range in paragraph content
    Range { par_id: ParId, span: Span },
    /// Validated text range in the displayed plugin answer
    AnswerRange {
        par_id: ParId,
        answer_id: AnswerId,
        span: Span,
    },
    /// Whole paragraph
    Paragraph { par_id: ParId },
}

impl Selection {
    /// Paragraph the selection belongs to
    #[inline]
    #[must_use]
    pub fn par_id(&self) -> &ParId {
        match self {
            Self::Range { par_id, .. } | Self::AnswerRange { par_id, .. } | Self::Paragraph { par_id } => par_id,
        }
    }
}

/// Counts reported by [`ReviewController::load_document_annotations`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Wrapped inline
    pub inline: usize,
    /// Margin only
    pub margin: usize,
    /// Dropped because their paragraph is gone
    pub dropped: usize,
}

/// Orchestrates anchoring for one document view
pub struct ReviewController {
    scope: ReviewScope,
    config: ReviewConfig,
    guard: SelectionGuard,
    margin: MarginRenderer,
    annotations: watch::Sender<Arc<Vec<Annotation>>>,
    statuses: Mutex<HashMap<AnnotationId, AnchorStatus>>,
    velp_labels: DashMap<VelpId, String>,
    selection: Mutex<Option<Selection>>,
    stage: Mutex<CreationStage>,
    creation: tokio::sync::Mutex<()>,
}

impl ReviewController {
    /// Create controller for a scope
    #[must_use]
    pub fn new(scope: ReviewScope, config: ReviewConfig) -> Self {
        let (annotations, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            guard: config.guard(),
            margin: MarginRenderer::new(config.margin_padding),
            scope,
            config,
            annotations,
            statuses: Mutex::new(HashMap::new()),
            velp_labels: DashMap::new(),
            selection: Mutex::new(None),
            stage: Mutex::new(CreationStage::Idle),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Get scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &ReviewScope {
        &self.scope
    }

    /// Shared handle to the live document
    #[inline]
    #[must_use]
    pub fn document(&self) -> DocumentHandle {
        Arc::clone(&self.scope.document)
    }

    /// Current creation stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> CreationStage {
        *self.stage.lock()
    }

    /// Snapshot of the annotation set
    #[must_use]
    pub fn annotations(&self) -> Arc<Vec<Annotation>> {
        Arc::clone(&self.annotations.borrow())
    }

    /// Change feed; every mutation publishes a fresh collection
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Annotation>>> {
        self.annotations.subscribe()
    }

    /// Annotation by id
    #[must_use]
    pub fn annotation(&self, id: AnnotationId) -> Option<Annotation> {
        self.annotations.borrow().iter().find(|a| a.id == id).cloned()
    }

    /// Annotations of an answer, latest start offset first
    #[must_use]
    pub fn annotations_by_answer(&self, answer_id: AnswerId) -> Vec<Annotation> {
        let mut found: Vec<Annotation> = self
            .annotations
            .borrow()
            .iter()
            .filter(|a| a.answer_id() == Some(answer_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.coord.start_offset().cmp(&a.coord.start_offset()));
        found
    }

    /// Anchoring status of an annotation
    #[must_use]
    pub fn status(&self, id: AnnotationId) -> Option<AnchorStatus> {
        self.statuses.lock().get(&id).cloned()
    }

    /// Remember a velp's label for margin notes
    pub fn register_velp(&self, velp: &Velp) {
        self.velp_labels.insert(velp.id, velp.content.clone());
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection.lock().clone()
    }

    /// Forget the current selection
    pub fn clear_selection(&self) {
        *self.selection.lock() = None;
    }

    /// Record the reviewer's selection
    ///
    /// A range the guard accepts is kept as is. Otherwise the selection falls
    /// through to the whole paragraph containing `target`, or is cleared when
    /// `target` is outside every paragraph.
    pub fn select_text(&self, target: NodeId, range: Option<Span>) -> Option<Selection> {
        let selection = {
            let doc = self.scope.document.read();
            range
                .and_then(|span| self.accept_range(&doc, span))
                .or_else(|| {
                    doc.paragraph_of(target)
                        .map(|par| Selection::Paragraph { par_id: par.id })
                })
        };
        tracing::debug!(?selection, "selection changed");
        *self.selection.lock() = selection.clone();
        selection
    }

    fn accept_range(&self, doc: &Document, span: Span) -> Option<Selection> {
        if let Err(rejection) = self.guard.validate(doc, span) {
            tracing::debug!(%rejection, "selection rejected");
            return None;
        }
        let par = doc.paragraph_of(span.start.node)?;
        let in_answer = doc
            .answer_view(&par.id)
            .is_some_and(|view| doc.tree().is_ancestor(view, span.start.node));
        match self.scope.answers.displayed_answer(&par.id) {
            Some(answer_id) if in_answer => Some(Selection::AnswerRange {
                par_id: par.id,
                answer_id,
                span,
            }),
            _ => Some(Selection::Range { par_id: par.id, span }),
        }
    }

    /// Create an annotation from the current selection
    ///
    /// Returns `Ok(None)` when there is nothing to annotate. The selection is
    /// consumed either way.
    ///
    /// # Errors
    /// Returns [`ReviewError::Persistence`] if the store refuses the
    /// annotation; no local state is kept in that case.
    pub async fn use_velp(&self, velp: &Velp) -> Result<Option<Annotation>, ReviewError> {
        let _creation = self.creation.lock().await;
        self.register_velp(velp);
        let selection = self.selection.lock().take();
        let Some(selection) = selection else {
            tracing::debug!(velp_id = %velp.id, "no selection, nothing to annotate");
            return Ok(None);
        };

        let result = match selection {
            Selection::Paragraph { par_id } => self
                .create_margin_only(velp, &par_id, None, MarginReason::NoCoordinate)
                .await
                .map(Some),
            Selection::Range { span, .. } => self.create_inline(velp, span).await,
            Selection::AnswerRange { span, answer_id, .. } => self.create_in_answer(velp, span, answer_id).await,
        };

        let stage = self.stage();
        if stage != CreationStage::Idle {
            tracing::warn!(?stage, "creation ended outside Idle, resetting");
            *self.stage.lock() = CreationStage::Idle;
        }
        result
    }

    async fn create_inline(&self, velp: &Velp, span: Span) -> Result<Option<Annotation>, ReviewError> {
        self.advance(CreationStage::Encoding)?;
        let encoded = {
            let doc = self.scope.document.read();
            encode(&doc, span).map_err(|err| (err, doc.paragraph_of(span.start.node).map(|p| p.id)))
        };
        let interval = match encoded {
            Ok(interval) => interval,
            Err((AnchorError::NoParagraph, _) | (_, None)) => {
                tracing::debug!("selection is not in a paragraph, aborting");
                self.advance(CreationStage::Idle)?;
                return Ok(None);
            }
            Err((err, Some(par_id))) => {
                tracing::warn!(error = %err, %par_id, "encoding failed, annotating whole paragraph");
                let reason = MarginReason::Unresolved {
                    detail: err.to_string(),
                };
                return self.create_margin_only(velp, &par_id, None, reason).await.map(Some);
            }
        };

        self.advance(CreationStage::Persisting)?;
        let created = self
            .persist(self.new_annotation(velp, interval.to_paragraph(), None))
            .await?;

        self.advance(CreationStage::Wrapping)?;
        let wrapped = {
            let mut doc = self.scope.document.write();
            self.attach_margin(&mut doc, &created);
            doc.tree_mut().wrap(span, created.id).map_err(AnchorError::from)
        };
        if let Err(err) = wrapped {
            tracing::warn!(annotation_id = %created.id, error = %err, "wrap failed, keeping margin note only");
            self.advance(CreationStage::MarginOnly)?;
            self.set_placement(created.id, Placement::margin(MarginReason::from(&err)));
            self.advance(CreationStage::Idle)?;
            return Ok(Some(created));
        }
        self.set_placement(created.id, Placement::Inline);

        self.advance(CreationStage::Finalizing)?;
        for _ in 0..self.config.effective_settle_turns() {
            tokio::task::yield_now().await;
        }
        let finalized = {
            let doc = self.scope.document.read();
            finalize_node_numbers(&doc, created.id, &interval)
        };
        let annotation = match finalized {
            Ok(coord) => self.persist_final_coord(created, coord).await,
            Err(err) => {
                tracing::warn!(annotation_id = %created.id, error = %err, "could not finalize coordinate");
                created
            }
        };

        self.advance(CreationStage::Idle)?;
        Ok(Some(annotation))
    }

    async fn persist_final_coord(&self, created: Annotation, coord: AnnotationInterval) -> Annotation {
        let patch = AnnotationPatch::new().with_coord(coord.clone());
        let annotation = match self.scope.store.update_annotation(created.id, patch).await {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(annotation_id = %created.id, error = %err, "final coordinate not persisted");
                Annotation { coord, ..created }
            }
        };
        tracing::debug!(annotation_id = %annotation.id, coord = ?annotation.coord, "coordinate finalized");
        self.replace(annotation.clone());
        annotation
    }

    async fn create_in_answer(
        &self,
        velp: &Velp,
        span: Span,
        answer_id: AnswerId,
    ) -> Result<Option<Annotation>, ReviewError> {
        self.advance(CreationStage::Encoding)?;
        let encoded = {
            let doc = self.scope.document.read();
            encode_answer(&doc, span).map_err(|err| (err, doc.paragraph_of(span.start.node).map(|p| p.id)))
        };
        let interval = match encoded {
            Ok(interval) => interval,
            Err((AnchorError::NoParagraph, _) | (_, None)) => {
                self.advance(CreationStage::Idle)?;
                return Ok(None);
            }
            Err((err, Some(par_id))) => {
                tracing::warn!(error = %err, %par_id, "answer encoding failed, annotating whole answer");
                let reason = MarginReason::Unresolved {
                    detail: err.to_string(),
                };
                return self
                    .create_margin_only(velp, &par_id, Some(answer_id), reason)
                    .await
                    .map(Some);
            }
        };

        self.advance(CreationStage::Persisting)?;
        let created = self
            .persist(self.new_annotation(velp, interval, Some(answer_id)))
            .await?;

        self.advance(CreationStage::Wrapping)?;
        let placement = {
            let mut doc = self.scope.document.write();
            self.attach_margin(&mut doc, &created);
            if self.config.show_answers_in_place {
                match doc.tree_mut().wrap(span, created.id) {
                    Ok(_) => Placement::Inline,
                    Err(err) => Placement::margin(MarginReason::from(&AnchorError::from(err))),
                }
            } else {
                Placement::margin(MarginReason::NotShownInPlace)
            }
        };
        self.set_placement(created.id, placement);
        self.advance(CreationStage::Idle)?;
        Ok(Some(created))
    }

    async fn create_margin_only(
        &self,
        velp: &Velp,
        par_id: &ParId,
        answer_id: Option<AnswerId>,
        reason: MarginReason,
    ) -> Result<Annotation, ReviewError> {
        self.advance(CreationStage::MarginOnly)?;
        let token = self.scope.document.read().token(par_id).map(ToString::to_string);
        let new = self.new_annotation(velp, AnnotationInterval::paragraph(par_id.clone(), token), answer_id);
        let created = self.persist(new).await?;

        {
            let mut doc = self.scope.document.write();
            self.attach_margin(&mut doc, &created);
        }
        self.set_placement(created.id, Placement::margin(reason));
        self.advance(CreationStage::Idle)?;
        Ok(created)
    }

    /// Store a new annotation and publish it; aborts to Idle on failure
    async fn persist(&self, new: NewAnnotation) -> Result<Annotation, ReviewError> {
        match self.scope.store.create_annotation(new).await {
            Ok(created) => {
                tracing::info!(annotation_id = %created.id, par_id = %created.par_id(), "annotation created");
                self.publish(|set| set.push(created.clone()));
                Ok(created)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not save annotation");
                self.advance(CreationStage::Idle)?;
                Err(err.into())
            }
        }
    }

    fn new_annotation(&self, velp: &Velp, coord: AnnotationInterval, answer_id: Option<AnswerId>) -> NewAnnotation {
        NewAnnotation {
            doc_id: self.scope.document_id,
            velp_id: velp.id,
            coord,
            answer_id,
            points: velp.points,
            visible_to: velp.visible_to,
            comment: velp.default_comment.clone(),
        }
    }

    /// Restore every stored annotation of the document
    ///
    /// Annotations whose paragraph no longer exists are dropped from the
    /// in-memory set; their records stay in the store. Markers, notes and
    /// statuses of annotations that are no longer listed are removed.
    ///
    /// # Errors
    /// Returns [`ReviewError::Persistence`] if listing fails
    pub async fn load_document_annotations(&self) -> Result<RestoreSummary, ReviewError> {
        let listed = self.scope.store.list_annotations(self.scope.document_id).await?;
        let mut summary = RestoreSummary::default();
        let mut kept = Vec::with_capacity(listed.len());

        {
            let mut doc = self.scope.document.write();
            for annotation in listed {
                match self.place(&mut doc, &annotation) {
                    Some(Placement::Inline) => summary.inline += 1,
                    Some(Placement::MarginOnly { .. }) => summary.margin += 1,
                    None => {
                        summary.dropped += 1;
                        continue;
                    }
                }
                kept.push(annotation);
            }

            let kept_ids: HashSet<AnnotationId> = kept.iter().map(|a| a.id).collect();
            let mut stale: HashSet<AnnotationId> = self.statuses.lock().keys().copied().collect();
            stale.extend(self.annotations.borrow().iter().map(|a| a.id));
            stale.retain(|id| !kept_ids.contains(id));
            for &id in &stale {
                self.remove_from_document(&mut doc, id);
            }
            self.statuses.lock().retain(|id, _| kept_ids.contains(id));
            tracing::debug!(
                stale = stale.len(),
                allocated = doc.tree().allocated(),
                "cleared annotations no longer listed"
            );
        }

        self.publish(|set| *set = kept);
        tracing::info!(
            inline = summary.inline,
            margin = summary.margin,
            dropped = summary.dropped,
            "annotations restored"
        );
        Ok(summary)
    }

    /// Place one annotation in the document, `None` if its paragraph is gone
    fn place(&self, doc: &mut Document, annotation: &Annotation) -> Option<Placement> {
        let par = doc.paragraph(annotation.par_id())?;

        let placement = if annotation.is_answer_scoped() {
            if let Err(err) = doc.add_class(par.node, layout::HAS_ANNOTATION_CLASS) {
                tracing::warn!(error = %err, "could not mark paragraph");
            }
            if doc.inline_marker(annotation.id).is_some() {
                Placement::Inline
            } else {
                Placement::margin(MarginReason::AnswerScoped)
            }
        } else if doc.inline_marker(annotation.id).is_some() {
            Placement::Inline
        } else {
            let wrapped = decode(doc, &annotation.coord)
                .and_then(|span| doc.tree_mut().wrap(span, annotation.id).map_err(AnchorError::from));
            match wrapped {
                Ok(_) => Placement::Inline,
                Err(AnchorError::ParagraphGone(_)) => return None,
                Err(err) => {
                    tracing::debug!(annotation_id = %annotation.id, reason = err.kind(), "showing in margin");
                    Placement::margin(MarginReason::from(&err))
                }
            }
        };

        self.attach_margin(doc, annotation);
        self.set_placement(annotation.id, placement.clone());
        Some(placement)
    }

    /// Re-place the annotations of one answer in a paragraph
    ///
    /// Existing notes and markers of those annotations are removed first.
    /// Annotations are placed latest offset first.
    pub fn load_annotations_to_answer(&self, answer_id: AnswerId, par_id: &ParId, show_in_place: bool) {
        let targets: Vec<Annotation> = self
            .annotations_by_answer(answer_id)
            .into_iter()
            .filter(|a| a.par_id() == par_id)
            .collect();

        let mut doc = self.scope.document.write();
        for annotation in &targets {
            self.remove_from_document(&mut doc, annotation.id);
        }

        for annotation in &targets {
            let placement = if !annotation.coord.has_offsets() {
                Placement::margin(MarginReason::NoCoordinate)
            } else if !show_in_place {
                Placement::margin(MarginReason::NotShownInPlace)
            } else {
                let wrapped = decode_answer(&doc, &annotation.coord)
                    .and_then(|span| doc.tree_mut().wrap(span, annotation.id).map_err(AnchorError::from));
                match wrapped {
                    Ok(_) => Placement::Inline,
                    Err(err) => Placement::margin(MarginReason::from(&err)),
                }
            };
            self.attach_margin(&mut doc, annotation);
            self.set_placement(annotation.id, placement);
        }
        tracing::debug!(%answer_id, %par_id, count = targets.len(), "answer annotations placed");
    }

    /// Toggle whether an annotation is shown
    ///
    /// Answer-scoped annotations first get their answer (and its user)
    /// displayed, then their offsets are resolved against it.
    ///
    /// # Errors
    /// - [`ReviewError::UnknownAnnotation`]
    /// - [`ReviewError::Answer`] if switching the answer fails
    pub async fn toggle_annotation_visible(&self, id: AnnotationId) -> Result<bool, ReviewError> {
        let annotation = self.annotation(id).ok_or(ReviewError::UnknownAnnotation(id))?;

        if let Some(answer) = &annotation.answer {
            let par_id = annotation.par_id();
            let answers = &self.scope.answers;
            if answers.displayed_answer(par_id) != Some(answer.id) {
                if let Some(user) = answer.users.first() {
                    if answers.reviewed_user() != Some(user.id) {
                        answers.change_user(user.id).await?;
                    }
                }
                answers.show_answer(par_id, answer.id).await?;
            }
            self.load_annotations_to_answer(answer.id, par_id, self.config.show_answers_in_place);
        }

        let mut statuses = self.statuses.lock();
        let status = statuses.entry(id).or_insert_with(|| AnchorStatus {
            placement: Placement::margin(MarginReason::NoCoordinate),
            shown: false,
        });
        status.shown = !status.shown;
        Ok(status.shown)
    }

    /// Update an annotation
    ///
    /// A changed coordinate re-runs freshness and decode; otherwise only the
    /// margin note is re-rendered.
    ///
    /// # Errors
    /// - [`ReviewError::UnknownAnnotation`]
    /// - [`ReviewError::Persistence`]
    pub async fn update_annotation(&self, id: AnnotationId, patch: AnnotationPatch) -> Result<Annotation, ReviewError> {
        self.annotation(id).ok_or(ReviewError::UnknownAnnotation(id))?;
        let updated = self.scope.store.update_annotation(id, patch.clone()).await?;
        self.replace(updated.clone());

        let mut doc = self.scope.document.write();
        if patch.coord.is_some() {
            self.remove_from_document(&mut doc, id);
            if self.place(&mut doc, &updated).is_none() {
                drop(doc);
                self.forget(id);
            }
        } else if let Err(err) = self.margin.refresh(&mut doc, &updated, self.label(updated.velp_id).as_deref()) {
            tracing::warn!(annotation_id = %id, error = %err, "margin note not refreshed");
        }
        Ok(updated)
    }

    /// Delete an annotation
    ///
    /// # Errors
    /// - [`ReviewError::UnknownAnnotation`]
    /// - [`ReviewError::Persistence`] if invalidation fails; nothing changes
    pub async fn delete_annotation(&self, id: AnnotationId) -> Result<(), ReviewError> {
        self.annotation(id).ok_or(ReviewError::UnknownAnnotation(id))?;
        self.scope.store.invalidate_annotation(id).await?;
        {
            let mut doc = self.scope.document.write();
            self.remove_from_document(&mut doc, id);
        }
        self.forget(id);
        tracing::info!(annotation_id = %id, "annotation deleted");
        Ok(())
    }

    fn forget(&self, id: AnnotationId) {
        self.statuses.lock().remove(&id);
        self.publish(|set| set.retain(|a| a.id != id));
    }

    fn remove_from_document(&self, doc: &mut Document, id: AnnotationId) {
        if let Some(marker) = doc.inline_marker(id) {
            if let Err(err) = doc.tree_mut().unwrap_marker(marker) {
                tracing::warn!(annotation_id = %id, error = %err, "could not remove marker");
            }
        }
        if let Err(err) = self.margin.remove(doc, id) {
            tracing::warn!(annotation_id = %id, error = %err, "could not remove margin note");
        }
    }

    fn attach_margin(&self, doc: &mut Document, annotation: &Annotation) {
        let label = self.label(annotation.velp_id);
        if let Err(err) = self.margin.attach(doc, annotation, label.as_deref()) {
            tracing::warn!(annotation_id = %annotation.id, error = %err, "could not attach margin note");
        }
    }

    fn label(&self, velp_id: VelpId) -> Option<String> {
        self.velp_labels.get(&velp_id).map(|entry| entry.clone())
    }

    fn set_placement(&self, id: AnnotationId, placement: Placement) {
        let mut statuses = self.statuses.lock();
        let shown = statuses.get(&id).is_some_and(|s| s.shown);
        statuses.insert(id, AnchorStatus { placement, shown });
    }

    fn replace(&self, annotation: Annotation) {
        self.publish(|set| {
            if let Some(slot) = set.iter_mut().find(|a| a.id == annotation.id) {
                *slot = annotation;
            }
        });
    }

    fn publish(&self, mutate: impl FnOnce(&mut Vec<Annotation>)) {
        self.annotations.send_modify(|current| {
            let mut next = Vec::clone(current);
            mutate(&mut next);
            *current = Arc::new(next);
        });
    }

    fn advance(&self, to: CreationStage) -> Result<(), TransitionError> {
        let mut stage = self.stage.lock();
        validate_transition(*stage, to)?;
        tracing::debug!(from = ?*stage, ?to, "creation stage");
        *stage = to;
        Ok(())
    }
}

impl std::fmt::Debug for ReviewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewController")
            .field("scope", &self.scope)
            .field("stage", &self.stage())
            .field("annotations", &self.annotations.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::scope::document_handle;
    use crate::store::MockAnnotationStore;
    use crate::types::DocumentId;
    use mockall::predicate::{always, eq};
    use velp_tree::TextPoint;

    fn quick_fox() -> (DocumentHandle, NodeId) {
        let mut doc = Document::new();
        let par = doc.add_paragraph("p1", "t1", &["The quick fox".into()]).unwrap();
        let text = doc.tree().children(par.content)[0];
        (document_handle(doc), text)
    }

    fn controller(store: MockAnnotationStore) -> (ReviewController, NodeId) {
        let (doc, text) = quick_fox();
        let scope = ReviewScope::new(doc, DocumentId(1), Arc::new(store));
        (ReviewController::new(scope, ReviewConfig::default()), text)
    }

    fn echo(id: u64) -> impl Fn(NewAnnotation) -> Result<Annotation, PersistenceError> {
        move |new| {
            Ok(Annotation {
                id: AnnotationId(id),
                velp_id: new.velp_id,
                coord: new.coord,
                answer: None,
                points: new.points,
                visible_to: new.visible_to,
                comment: new.comment,
            })
        }
    }

    fn quick(text: NodeId) -> Span {
        Span::new(TextPoint::new(text, 4), TextPoint::new(text, 9))
    }

    #[tokio::test]
    async fn persistence_failure_leaves_no_state() {
        let mut store = MockAnnotationStore::new();
        store
            .expect_create_annotation()
            .times(1)
            .returning(|_| Err(PersistenceError::Unavailable("offline".into())));
        let (ctrl, text) = controller(store);

        ctrl.select_text(text, Some(quick(text)));
        let err = ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap_err();

        assert!(err.is_user_facing());
        assert!(ctrl.annotations().is_empty());
        assert_eq!(ctrl.stage(), CreationStage::Idle);
        let doc = ctrl.document();
        let doc = doc.read();
        assert!(doc.margin_notes(&"p1".into()).is_empty());
        assert_eq!(doc.tree().children(doc.paragraph(&"p1".into()).unwrap().content).len(), 1);
    }

    #[tokio::test]
    async fn failed_final_update_keeps_local_coordinate() {
        let mut store = MockAnnotationStore::new();
        store.expect_create_annotation().times(1).returning(echo(7));
        store
            .expect_update_annotation()
            .with(eq(AnnotationId(7)), always())
            .times(1)
            .returning(|_, _| Err(PersistenceError::Rejected("busy".into())));
        let (ctrl, text) = controller(store);

        ctrl.select_text(text, Some(quick(text)));
        let created = ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap().unwrap();

        assert!(created.coord.is_full());
        assert_eq!(created.coord.start.offset, Some(4));
        assert_eq!(created.coord.end.offset, Some(9));
        assert_eq!(ctrl.annotation(AnnotationId(7)), Some(created));
        assert!(ctrl.status(AnnotationId(7)).unwrap().placement.is_inline());
        assert_eq!(ctrl.stage(), CreationStage::Idle);
    }

    #[tokio::test]
    async fn persists_paragraph_coordinate_before_wrapping() {
        let mut store = MockAnnotationStore::new();
        store
            .expect_create_annotation()
            .withf(|new| !new.coord.is_full() && new.coord.par_id().as_str() == "p1")
            .times(1)
            .returning(echo(1));
        store
            .expect_update_annotation()
            .withf(|_, patch| patch.coord.as_ref().is_some_and(AnnotationInterval::is_full))
            .times(1)
            .returning(|id, patch| {
                echo(id.0)(NewAnnotation {
                    doc_id: DocumentId(1),
                    velp_id: VelpId(3),
                    coord: patch.coord.unwrap(),
                    answer_id: None,
                    points: None,
                    visible_to: crate::types::Visibility::default(),
                    comment: String::new(),
                })
            });
        let (ctrl, text) = controller(store);

        ctrl.select_text(text, Some(quick(text)));
        let created = ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap().unwrap();
        assert!(created.coord.is_full());

        let doc = ctrl.document();
        let doc = doc.read();
        assert!(doc.inline_marker(AnnotationId(1)).is_some());
        assert_eq!(doc.margin_text(AnnotationId(1)).as_deref(), Some("\u{a0}Typo\u{a0}"));
    }

    #[tokio::test]
    async fn rejected_range_falls_back_to_paragraph() {
        let mut store = MockAnnotationStore::new();
        store
            .expect_create_annotation()
            .withf(|new| !new.coord.has_offsets() && new.coord.start.t.as_deref() == Some("t1"))
            .times(1)
            .returning(echo(2));
        let (ctrl, text) = controller(store);

        let collapsed = Span::new(TextPoint::new(text, 4), TextPoint::new(text, 4));
        let selection = ctrl.select_text(text, Some(collapsed));
        assert_eq!(selection, Some(Selection::Paragraph { par_id: "p1".into() }));

        let created = ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap().unwrap();
        assert_eq!(
            ctrl.status(created.id).unwrap().placement,
            Placement::margin(MarginReason::NoCoordinate)
        );
        assert!(ctrl.document().read().inline_marker(created.id).is_none());
    }

    #[tokio::test]
    async fn no_selection_creates_nothing() {
        let mut store = MockAnnotationStore::new();
        store.expect_create_annotation().times(0);
        let (ctrl, _) = controller(store);

        assert!(ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap().is_none());
        assert_eq!(ctrl.stage(), CreationStage::Idle);
    }

    #[tokio::test]
    async fn failed_invalidation_keeps_annotation() {
        let mut store = MockAnnotationStore::new();
        store.expect_create_annotation().returning(echo(5));
        store.expect_update_annotation().returning(|id, _| Err(PersistenceError::NotFound(id)));
        store
            .expect_invalidate_annotation()
            .times(1)
            .returning(|_| Err(PersistenceError::Unavailable("offline".into())));
        let (ctrl, text) = controller(store);

        ctrl.select_text(text, Some(quick(text)));
        ctrl.use_velp(&Velp::new(VelpId(3), "Typo")).await.unwrap();

        assert!(ctrl.delete_annotation(AnnotationId(5)).await.is_err());
        assert!(ctrl.annotation(AnnotationId(5)).is_some());
        assert!(ctrl.document().read().inline_marker(AnnotationId(5)).is_some());
    }

    #[tokio::test]
    async fn failed_answer_switch_keeps_state() {
        use crate::answers::MockAnswerBrowser;
        use crate::error::AnswerError;
        use crate::types::{AnswerRef, UserId, UserRef};
        use velp_anchor::AnnotationCoord;

        let coord = AnnotationInterval::new(
            AnnotationCoord::offset_only("p1".into(), Some("t1".into()), 0),
            AnnotationCoord::offset_only("p1".into(), Some("t1".into()), 3),
        );
        let stored = Annotation {
            answer: Some(AnswerRef {
                id: AnswerId(42),
                users: vec![UserRef {
                    id: UserId(2),
                    name: "anna".into(),
                }],
            }),
            ..echo(4)(NewAnnotation {
                doc_id: DocumentId(1),
                velp_id: VelpId(1),
                coord,
                answer_id: None,
                points: None,
                visible_to: crate::types::Visibility::default(),
                comment: String::new(),
            })
            .unwrap()
        };
        let mut store = MockAnnotationStore::new();
        store.expect_list_annotations().returning(move |_| Ok(vec![stored.clone()]));

        let mut answers = MockAnswerBrowser::new();
        answers.expect_displayed_answer().return_const(None);
        answers.expect_reviewed_user().return_const(Some(UserId(2)));
        answers.expect_change_user().times(0);
        answers
            .expect_show_answer()
            .with(eq(ParId::from("p1")), eq(AnswerId(42)))
            .times(1)
            .returning(|_, _| Err(AnswerError::SwitchFailed("timeout".into())));

        let (doc, _) = quick_fox();
        let scope = ReviewScope::new(doc, DocumentId(1), Arc::new(store)).with_answers(Arc::new(answers));
        let ctrl = ReviewController::new(scope, ReviewConfig::default());
        ctrl.load_document_annotations().await.unwrap();

        let err = ctrl.toggle_annotation_visible(AnnotationId(4)).await.unwrap_err();
        assert!(matches!(err, ReviewError::Answer(AnswerError::SwitchFailed(_))));
        let status = ctrl.status(AnnotationId(4)).unwrap();
        assert!(!status.shown);
        assert_eq!(status.placement, Placement::margin(MarginReason::AnswerScoped));
    }

    #[tokio::test]
    async fn unknown_annotation_is_reported() {
        let (ctrl, _) = controller(MockAnnotationStore::new());
        assert!(matches!(
            ctrl.toggle_annotation_visible(AnnotationId(99)).await,
            Err(ReviewError::UnknownAnnotation(AnnotationId(99)))
        ));
        assert!(matches!(
            ctrl.delete_annotation(AnnotationId(99)).await,
            Err(ReviewError::UnknownAnnotation(_))
        ));
    }
}
