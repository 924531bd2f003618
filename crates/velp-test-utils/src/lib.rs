//! Testing utilities for the velp workspace
//!
//! Shared documents, selections and collaborator doubles.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::Mutex;
use velp_anchor::AnnotationInterval;
use velp_core::{
    document_handle, Annotation, AnnotationPatch, AnnotationStore, AnswerBrowser, AnswerCatalog, AnswerError,
    AnswerId, AnswerRef, DocumentHandle, DocumentId, NewAnnotation, PersistenceError, ReviewConfig,
    ReviewController, ReviewScope, UserId, UserRef, Velp, VelpId, Visibility,
};
use velp_tree::{AnnotationId, Bias, Document, Fragment, NodeId, ParId, Span};

pub const DOC_ID: DocumentId = DocumentId(1);

/// One paragraph `p1` reading "The quick fox", version `t1`
pub fn scenario_document() -> Document {
    let mut doc = Document::new();
    doc.add_paragraph("p1", "t1", &["The quick fox".into()]).unwrap();
    doc
}

/// Paragraphs with nested markup
///
/// - `p1`: "Hello <em>big</em> world" (`t1`)
/// - `p2`: "<p>Intro <strong>bold <em>deep</em></strong> end</p>" (`t1`)
pub fn mixed_document() -> Document {
    let mut doc = Document::new();
    doc.add_paragraph(
        "p1",
        "t1",
        &["Hello ".into(), Fragment::elem("em", vec!["big".into()]), " world".into()],
    )
    .unwrap();
    doc.add_paragraph(
        "p2",
        "t1",
        &[Fragment::elem(
            "p",
            vec![
                "Intro ".into(),
                Fragment::elem("strong", vec!["bold ".into(), Fragment::elem("em", vec!["deep".into()])]),
                " end".into(),
            ],
        )],
    )
    .unwrap();
    doc
}

/// `p1` is a question, `p2` shows `answer_text` in its answer view
pub fn answer_document(answer_text: &str) -> Document {
    let mut doc = scenario_document();
    doc.add_paragraph(
        "p2",
        "t1",
        &[
            Fragment::elem("p", vec!["Write a haiku".into()]),
            Fragment::elem("pre", vec![answer_text.into()]),
        ],
    )
    .unwrap();
    doc
}

/// Selection over paragraph-relative offsets `[start, end)`
pub fn select(doc: &Document, par: &str, start: usize, end: usize) -> Span {
    let content = doc.paragraph(&par.into()).unwrap().content;
    let tree = doc.tree();
    Span::new(
        tree.point_in(content, start, Bias::Forward).unwrap(),
        tree.point_in(content, end, Bias::Backward).unwrap(),
    )
}

/// Selection over offsets of the displayed answer text
pub fn select_answer(doc: &Document, par: &str, start: usize, end: usize) -> Span {
    let view = doc.answer_view(&par.into()).unwrap();
    let tree = doc.tree();
    Span::new(
        tree.point_in(view, start, Bias::Forward).unwrap(),
        tree.point_in(view, end, Bias::Backward).unwrap(),
    )
}

/// First text leaf in a paragraph's content
pub fn first_text(doc: &Document, par: &str) -> NodeId {
    let content = doc.paragraph(&par.into()).unwrap().content;
    doc.tree().text_leaves(content)[0]
}

pub fn velp(id: u64, label: &str) -> Velp {
    Velp::new(VelpId(id), label)
}

/// Stored annotation record
pub fn annotation(id: u64, coord: AnnotationInterval) -> Annotation {
    Annotation {
        id: AnnotationId(id),
        velp_id: VelpId(1),
        coord,
        answer: None,
        points: None,
        visible_to: Visibility::Everyone,
        comment: format!("note {id}"),
    }
}

/// Stored annotation scoped to an answer of `user`
pub fn answer_annotation(id: u64, coord: AnnotationInterval, answer: u64, user: u64) -> Annotation {
    Annotation {
        answer: Some(AnswerRef {
            id: AnswerId(answer),
            users: vec![UserRef {
                id: UserId(user),
                name: format!("user{user}"),
            }],
        }),
        ..annotation(id, coord)
    }
}

pub fn handle(doc: Document) -> DocumentHandle {
    document_handle(doc)
}

/// Controller over `doc` with the default configuration
pub fn controller(doc: &DocumentHandle, store: Arc<dyn AnnotationStore>) -> ReviewController {
    ReviewController::new(
        ReviewScope::new(Arc::clone(doc), DOC_ID, store),
        ReviewConfig::default(),
    )
}

/// Store that refuses everything
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait::async_trait]
impl AnnotationStore for FailingStore {
    async fn create_annotation(&self, _annotation: NewAnnotation) -> Result<Annotation, PersistenceError> {
        Err(PersistenceError::Unavailable("store offline".into()))
    }

    async fn update_annotation(
        &self,
        _id: AnnotationId,
        _patch: AnnotationPatch,
    ) -> Result<Annotation, PersistenceError> {
        Err(PersistenceError::Unavailable("store offline".into()))
    }

    async fn invalidate_annotation(&self, _id: AnnotationId) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("store offline".into()))
    }

    async fn list_annotations(&self, _doc_id: DocumentId) -> Result<Vec<Annotation>, PersistenceError> {
        Err(PersistenceError::Unavailable("store offline".into()))
    }
}

/// Call made on a [`RecordingAnswers`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCall {
    ChangeUser(UserId),
    ShowAnswer(ParId, AnswerId),
}

/// [`AnswerCatalog`] that records the switches it is asked for
#[derive(Debug)]
pub struct RecordingAnswers {
    inner: AnswerCatalog,
    calls: Mutex<Vec<AnswerCall>>,
}

impl RecordingAnswers {
    pub fn new(inner: AnswerCatalog) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<AnswerCall> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl AnswerBrowser for RecordingAnswers {
    fn displayed_answer(&self, par_id: &ParId) -> Option<AnswerId> {
        self.inner.displayed_answer(par_id)
    }

    fn reviewed_user(&self) -> Option<UserId> {
        self.inner.reviewed_user()
    }

    async fn change_user(&self, user: UserId) -> Result<(), AnswerError> {
        self.calls.lock().push(AnswerCall::ChangeUser(user));
        self.inner.change_user(user).await
    }

    async fn show_answer(&self, par_id: &ParId, answer: AnswerId) -> Result<(), AnswerError> {
        self.calls.lock().push(AnswerCall::ShowAnswer(par_id.clone(), answer));
        self.inner.show_answer(par_id, answer).await
    }
}
