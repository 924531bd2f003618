//! End-to-end review flows against in-process collaborators

use std::sync::Arc;

use pretty_assertions::assert_eq;
use velp_anchor::{encode, AnnotationCoord, AnnotationInterval};
use velp_core::{
    AnnotationPatch, AnnotationStore, AnswerCatalog, AnswerId, MarginReason, MemoryStore, Placement, RestoreSummary, ReviewConfig,
    ReviewController, ReviewScope, Selection, UserId,
};
use velp_test_utils::{
    annotation, answer_annotation, answer_document, controller, first_text, handle, mixed_document,
    scenario_document, select, select_answer, velp, AnswerCall, FailingStore, RecordingAnswers, DOC_ID,
};
use velp_tree::{AnnotationId, Document, ParId};

fn p(id: &str) -> ParId {
    id.into()
}

fn marker_text(ctrl: &ReviewController, id: AnnotationId) -> Option<String> {
    let doc = ctrl.document();
    let doc = doc.read();
    doc.inline_marker(id).map(|marker| doc.tree().text_content(marker))
}

#[tokio::test]
async fn test_create_wraps_and_finalizes() {
    let doc = handle(scenario_document());
    let store = Arc::new(MemoryStore::new());
    let ctrl = controller(&doc, store.clone());

    let span = select(&doc.read(), "p1", 4, 9);
    let selection = ctrl.select_text(span.start.node, Some(span));
    assert_eq!(selection, Some(Selection::Range { par_id: p("p1"), span }));

    let created = ctrl.use_velp(&velp(3, "Typo")).await.unwrap().unwrap();

    assert!(created.coord.is_full());
    assert_eq!(created.coord.start.offset, Some(4));
    assert_eq!(created.coord.end.offset, Some(9));
    assert_eq!(store.get(created.id), Some(created.clone()));
    assert_eq!(marker_text(&ctrl, created.id).as_deref(), Some("quick"));
    assert_eq!(doc.read().plain_text(&p("p1")).as_deref(), Some("The quick fox"));
    assert_eq!(doc.read().margin_text(created.id).as_deref(), Some("\u{a0}Typo\u{a0}"));
}

#[tokio::test]
async fn test_second_annotation_encodes_marker_transparently() {
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, Arc::new(MemoryStore::new()));

    let first = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(first.start.node, Some(first));
    ctrl.use_velp(&velp(1, "quick")).await.unwrap();

    let fox = select(&doc.read(), "p1", 10, 13);
    ctrl.select_text(fox.start.node, Some(fox));
    let second = ctrl.use_velp(&velp(2, "fox")).await.unwrap().unwrap();

    assert_eq!(second.coord.start.offset, Some(10));
    assert_eq!(second.coord.end.offset, Some(13));
    assert_eq!(marker_text(&ctrl, second.id).as_deref(), Some("fox"));
}

#[tokio::test]
async fn test_stale_paragraph_goes_to_margin() {
    let coord = encode(&scenario_document(), select(&scenario_document(), "p1", 4, 9)).unwrap();
    let store = Arc::new(MemoryStore::new().with_annotations(DOC_ID, [annotation(1, coord)]));

    let mut edited = Document::new();
    edited.add_paragraph("p1", "t2", &["The quick fox".into()]).unwrap();
    let doc = handle(edited);
    let ctrl = controller(&doc, store);

    let summary = ctrl.load_document_annotations().await.unwrap();

    assert_eq!(summary, RestoreSummary { inline: 0, margin: 1, dropped: 0 });
    assert_eq!(
        ctrl.status(AnnotationId(1)).unwrap().placement,
        Placement::margin(MarginReason::ParagraphModified)
    );
    assert!(marker_text(&ctrl, AnnotationId(1)).is_none());
    assert_eq!(doc.read().margin_text(AnnotationId(1)).as_deref(), Some("\u{a0}note 1\u{a0}"));
}

#[tokio::test]
async fn test_restore_places_inline_and_drops_removed_paragraphs() {
    let source = mixed_document();
    let deep = encode(&source, select(&source, "p2", 11, 15)).unwrap();
    let gone = AnnotationInterval::paragraph(p("p9"), Some("t1".into()));
    let partial = AnnotationInterval::paragraph(p("p1"), Some("t1".into()));
    let store = Arc::new(MemoryStore::new().with_annotations(
        DOC_ID,
        [annotation(1, deep), annotation(2, gone), annotation(3, partial)],
    ));

    let doc = handle(mixed_document());
    let ctrl = controller(&doc, store.clone());
    let summary = ctrl.load_document_annotations().await.unwrap();

    assert_eq!(summary, RestoreSummary { inline: 1, margin: 1, dropped: 1 });
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("deep"));
    assert_eq!(
        ctrl.status(AnnotationId(3)).unwrap().placement,
        Placement::margin(MarginReason::NoCoordinate)
    );
    assert!(ctrl.annotation(AnnotationId(2)).is_none());
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_restore_is_idempotent_and_survives_rerender() {
    let source = scenario_document();
    let coord = encode(&source, select(&source, "p1", 4, 9)).unwrap();
    let store = Arc::new(MemoryStore::new().with_annotations(DOC_ID, [annotation(1, coord)]));
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, store);

    ctrl.load_document_annotations().await.unwrap();
    ctrl.load_document_annotations().await.unwrap();
    {
        let doc = doc.read();
        let marker = doc.inline_marker(AnnotationId(1)).unwrap();
        let content = doc.paragraph(&p("p1")).unwrap().content;
        assert_eq!(doc.tree().parent(marker), Some(content));
        assert_eq!(doc.tree().children(content).len(), 3);
        assert_eq!(doc.margin_notes(&p("p1")).len(), 1);
    }

    doc.write()
        .rerender_paragraph(&p("p1"), "t1", &["The quick fox".into()])
        .unwrap();
    assert!(marker_text(&ctrl, AnnotationId(1)).is_none());

    ctrl.load_document_annotations().await.unwrap();
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("quick"));
}

#[tokio::test]
async fn test_crossing_selection_falls_back_to_paragraph() {
    let doc = handle(mixed_document());
    let ctrl = controller(&doc, Arc::new(MemoryStore::new()));

    let crossing = select(&doc.read(), "p1", 3, 8);
    let target = crossing.start.node;
    assert_eq!(
        ctrl.select_text(target, Some(crossing)),
        Some(Selection::Paragraph { par_id: p("p1") })
    );

    let created = ctrl.use_velp(&velp(1, "Style")).await.unwrap().unwrap();
    assert!(!created.coord.has_offsets());
    assert_eq!(created.coord.start.t.as_deref(), Some("t1"));
    assert_eq!(
        ctrl.status(created.id).unwrap().placement,
        Placement::margin(MarginReason::NoCoordinate)
    );
}

#[tokio::test]
async fn test_persistence_failure_keeps_document_clean() {
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, Arc::new(FailingStore));

    let span = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(span.start.node, Some(span));
    let err = ctrl.use_velp(&velp(1, "Typo")).await.unwrap_err();

    assert!(err.is_user_facing());
    assert!(ctrl.annotations().is_empty());
    let doc = doc.read();
    assert_eq!(doc.tree().children(doc.paragraph(&p("p1")).unwrap().content).len(), 1);
    assert!(doc.margin_notes(&p("p1")).is_empty());
}

#[tokio::test]
async fn test_delete_removes_marker_and_note() {
    let doc = handle(scenario_document());
    let store = Arc::new(MemoryStore::new());
    let ctrl = controller(&doc, store.clone());

    let span = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(span.start.node, Some(span));
    let created = ctrl.use_velp(&velp(1, "Typo")).await.unwrap().unwrap();

    ctrl.delete_annotation(created.id).await.unwrap();

    assert!(store.is_empty());
    assert!(ctrl.annotations().is_empty());
    assert!(ctrl.status(created.id).is_none());
    let doc = doc.read();
    assert!(doc.inline_marker(created.id).is_none());
    assert!(doc.margin_note(created.id).is_none());
    let content = doc.paragraph(&p("p1")).unwrap().content;
    assert_eq!(doc.tree().children(content).len(), 1);
    assert_eq!(doc.tree().text_content(content), "The quick fox");
}

#[tokio::test]
async fn test_update_comment_refreshes_margin() {
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, Arc::new(MemoryStore::new()));
    let span = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(span.start.node, Some(span));
    let created = ctrl.use_velp(&velp(1, "Typo")).await.unwrap().unwrap();

    let updated = ctrl
        .update_annotation(created.id, AnnotationPatch::new().with_comment("spelling"))
        .await
        .unwrap();

    assert_eq!(updated.comment, "spelling");
    assert_eq!(ctrl.annotation(created.id).unwrap().comment, "spelling");
    assert_eq!(doc.read().margin_text(created.id).as_deref(), Some("\u{a0}Typo: spelling\u{a0}"));
    assert_eq!(marker_text(&ctrl, created.id).as_deref(), Some("quick"));
}

#[tokio::test]
async fn test_update_coordinate_moves_marker() {
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, Arc::new(MemoryStore::new()));
    let span = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(span.start.node, Some(span));
    let created = ctrl.use_velp(&velp(1, "Typo")).await.unwrap().unwrap();

    let fox = encode(&scenario_document(), select(&scenario_document(), "p1", 10, 13)).unwrap();
    ctrl.update_annotation(created.id, AnnotationPatch::new().with_coord(fox))
        .await
        .unwrap();

    assert_eq!(marker_text(&ctrl, created.id).as_deref(), Some("fox"));
    assert_eq!(doc.read().plain_text(&p("p1")).as_deref(), Some("The quick fox"));
}

#[tokio::test]
async fn test_subscribers_see_fresh_collections() {
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, Arc::new(MemoryStore::new()));
    let mut rx = ctrl.subscribe();
    let before = ctrl.annotations();

    let span = select(&doc.read(), "p1", 4, 9);
    ctrl.select_text(span.start.node, Some(span));
    ctrl.use_velp(&velp(1, "Typo")).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let after = rx.borrow_and_update().clone();
    assert!(before.is_empty());
    assert_eq!(after.len(), 1);
    assert!(!Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_answer_selection_creates_offset_coordinate() {
    let doc = handle(answer_document("x = 1 + 2"));
    let answers = AnswerCatalog::new(Arc::clone(&doc))
        .with_answer(AnswerId(7), "p2", UserId(1), "x = 1 + 2")
        .displaying("p2", AnswerId(7), UserId(1));
    let ctrl = ReviewController::new(
        ReviewScope::new(Arc::clone(&doc), DOC_ID, Arc::new(MemoryStore::new())).with_answers(Arc::new(answers)),
        ReviewConfig::default(),
    );

    let span = select_answer(&doc.read(), "p2", 4, 9);
    let selection = ctrl.select_text(span.start.node, Some(span));
    assert!(matches!(selection, Some(Selection::AnswerRange { answer_id: AnswerId(7), .. })));

    let created = ctrl.use_velp(&velp(1, "Math")).await.unwrap().unwrap();

    assert_eq!(created.answer_id(), Some(AnswerId(7)));
    assert!(!created.coord.is_full());
    assert_eq!(created.coord.start.offset, Some(4));
    assert_eq!(created.coord.end.offset, Some(9));
    assert_eq!(marker_text(&ctrl, created.id).as_deref(), Some("1 + 2"));
    assert_eq!(ctrl.annotations_by_answer(AnswerId(7)).len(), 1);
}

#[tokio::test]
async fn test_toggle_switches_answer_before_anchoring() {
    let doc = handle(answer_document("first answer text"));
    let coord = AnnotationInterval::new(
        AnnotationCoord::offset_only(p("p2"), Some("t1".into()), 4),
        AnnotationCoord::offset_only(p("p2"), Some("t1".into()), 8),
    );
    let store = Arc::new(MemoryStore::new().with_annotations(DOC_ID, [answer_annotation(1, coord, 42, 2)]));
    let answers = Arc::new(RecordingAnswers::new(
        AnswerCatalog::new(Arc::clone(&doc))
            .with_answer(AnswerId(7), "p2", UserId(1), "first answer text")
            .with_answer(AnswerId(42), "p2", UserId(2), "the real answer")
            .displaying("p2", AnswerId(7), UserId(1)),
    ));
    let ctrl = ReviewController::new(
        ReviewScope::new(Arc::clone(&doc), DOC_ID, store).with_answers(answers.clone()),
        ReviewConfig::default(),
    );

    let summary = ctrl.load_document_annotations().await.unwrap();
    assert_eq!(summary.margin, 1);
    assert_eq!(
        ctrl.status(AnnotationId(1)).unwrap().placement,
        Placement::margin(MarginReason::AnswerScoped)
    );

    assert!(ctrl.toggle_annotation_visible(AnnotationId(1)).await.unwrap());

    assert_eq!(
        answers.calls(),
        vec![
            AnswerCall::ChangeUser(UserId(2)),
            AnswerCall::ShowAnswer(p("p2"), AnswerId(42))
        ]
    );
    assert_eq!(doc.read().answer_text(&p("p2")).as_deref(), Some("the real answer"));
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("real"));
    assert!(ctrl.status(AnnotationId(1)).unwrap().placement.is_inline());

    // already displayed: no further switching
    assert!(!ctrl.toggle_annotation_visible(AnnotationId(1)).await.unwrap());
    assert_eq!(answers.calls().len(), 2);
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("real"));
}

#[tokio::test]
async fn test_reload_keeps_answer_annotation_inline() {
    let doc = handle(answer_document("first answer text"));
    let coord = AnnotationInterval::new(
        AnnotationCoord::offset_only(p("p2"), Some("t1".into()), 4),
        AnnotationCoord::offset_only(p("p2"), Some("t1".into()), 8),
    );
    let store = Arc::new(MemoryStore::new().with_annotations(DOC_ID, [answer_annotation(1, coord, 42, 2)]));
    let answers = AnswerCatalog::new(Arc::clone(&doc))
        .with_answer(AnswerId(42), "p2", UserId(2), "the real answer")
        .displaying("p2", AnswerId(7), UserId(1));
    let ctrl = ReviewController::new(
        ReviewScope::new(Arc::clone(&doc), DOC_ID, store).with_answers(Arc::new(answers)),
        ReviewConfig::default(),
    );

    ctrl.load_document_annotations().await.unwrap();
    assert!(ctrl.toggle_annotation_visible(AnnotationId(1)).await.unwrap());
    let marker = doc.read().inline_marker(AnnotationId(1));
    assert!(marker.is_some());

    let summary = ctrl.load_document_annotations().await.unwrap();

    assert_eq!(summary, RestoreSummary { inline: 1, margin: 0, dropped: 0 });
    let status = ctrl.status(AnnotationId(1)).unwrap();
    assert!(status.placement.is_inline());
    assert!(status.shown);
    assert_eq!(doc.read().inline_marker(AnnotationId(1)), marker);
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("real"));
    assert_eq!(doc.read().margin_notes(&p("p2")).len(), 1);
}

#[tokio::test]
async fn test_reload_clears_annotations_no_longer_listed() {
    let source = scenario_document();
    let quick = encode(&source, select(&source, "p1", 4, 9)).unwrap();
    let fox = encode(&source, select(&source, "p1", 10, 13)).unwrap();
    let store = Arc::new(MemoryStore::new().with_annotations(DOC_ID, [annotation(1, quick), annotation(2, fox)]));
    let doc = handle(scenario_document());
    let ctrl = controller(&doc, store.clone());

    let first = ctrl.load_document_annotations().await.unwrap();
    assert_eq!(first.inline, 2);

    store.invalidate_annotation(AnnotationId(2)).await.unwrap();
    let second = ctrl.load_document_annotations().await.unwrap();

    assert_eq!(second, RestoreSummary { inline: 1, margin: 0, dropped: 0 });
    assert!(ctrl.status(AnnotationId(2)).is_none());
    assert!(ctrl.annotation(AnnotationId(2)).is_none());
    {
        let doc = doc.read();
        assert!(doc.inline_marker(AnnotationId(2)).is_none());
        assert!(doc.margin_note(AnnotationId(2)).is_none());
        assert_eq!(doc.plain_text(&p("p1")).as_deref(), Some("The quick fox"));
    }
    assert_eq!(marker_text(&ctrl, AnnotationId(1)).as_deref(), Some("quick"));

    doc.write().remove_paragraph(&p("p1")).unwrap();
    let third = ctrl.load_document_annotations().await.unwrap();
    assert_eq!(third, RestoreSummary { inline: 0, margin: 0, dropped: 1 });
    assert!(ctrl.status(AnnotationId(1)).is_none());
    assert!(ctrl.annotations().is_empty());
}

#[tokio::test]
async fn test_answers_kept_out_of_place_when_configured() {
    let doc = handle(answer_document("x = 1 + 2"));
    let answers = AnswerCatalog::new(Arc::clone(&doc))
        .with_answer(AnswerId(7), "p2", UserId(1), "x = 1 + 2")
        .displaying("p2", AnswerId(7), UserId(1));
    let ctrl = ReviewController::new(
        ReviewScope::new(Arc::clone(&doc), DOC_ID, Arc::new(MemoryStore::new())).with_answers(Arc::new(answers)),
        ReviewConfig::default().with_answers_in_place(false),
    );

    let span = select_answer(&doc.read(), "p2", 0, 1);
    ctrl.select_text(span.start.node, Some(span));
    let created = ctrl.use_velp(&velp(1, "Name")).await.unwrap().unwrap();

    assert!(marker_text(&ctrl, created.id).is_none());
    assert_eq!(
        ctrl.status(created.id).unwrap().placement,
        Placement::margin(MarginReason::NotShownInPlace)
    );
    assert_eq!(doc.read().answer_text(&p("p2")).as_deref(), Some("x = 1 + 2"));
}

#[test]
fn test_first_text_helper_points_into_content() {
    let doc = scenario_document();
    let text = first_text(&doc, "p1");
    assert_eq!(doc.tree().text(text), Some("The quick fox"));
}
