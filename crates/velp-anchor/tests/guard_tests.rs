use proptest::prelude::*;
use velp_anchor::{Rejection, SelectionGuard};
use velp_tree::{AnnotationId, Bias, Document, Fragment, ParId, Span, TextPoint};

fn document() -> Document {
    let mut doc = Document::new();
    doc.add_paragraph(
        "p1",
        "t1",
        &[
            "Alpha beta ".into(),
            Fragment::elem("code", vec!["gamma()".into()]),
            " delta epsilon".into(),
        ],
    )
    .unwrap();
    doc
}

fn select(doc: &Document, start: usize, end: usize) -> Span {
    let par = doc.paragraph(&ParId::new("p1")).unwrap();
    Span::new(
        doc.tree().point_in(par.content, start, Bias::Forward).unwrap(),
        doc.tree().point_in(par.content, end, Bias::Backward).unwrap(),
    )
}

#[test]
fn test_rejection_messages() {
    assert_eq!(Rejection::CrossingTags.to_string(), "selection crosses element boundaries");
    assert_eq!(
        Rejection::IllegalRegion { class: "editorArea".into() }.to_string(),
        "selection is inside a 'editorArea' region"
    );
}

#[test]
fn test_default_denylist() {
    let guard = SelectionGuard::default();
    for class in ["annotation-info", "highlighted", "editorArea", "previewcontent", "notes"] {
        assert!(guard.illegal_classes().iter().any(|c| c == class));
    }
}

proptest! {
    #[test]
    fn prop_crossing_never_accepted(start in 0usize..11, end in 12usize..18) {
        // Start in the leading text, end inside the code element.
        let doc = document();
        let span = select(&doc, start, end);
        prop_assert_eq!(SelectionGuard::default().validate(&doc, span), Err(Rejection::CrossingTags));
    }

    #[test]
    fn prop_nested_never_accepted(offset in 0usize..5, len in 1usize..5) {
        let mut doc = document();
        let outer = select(&doc, 18, 32);
        doc.tree_mut().wrap(outer, AnnotationId(1)).unwrap();

        let begin = 18 + offset;
        let end = (begin + len).min(32);
        let inner = select(&doc, begin, end);
        prop_assert_eq!(SelectionGuard::default().validate(&doc, inner), Err(Rejection::InsideAnnotation));
    }

    #[test]
    fn prop_overlapping_never_accepted(lead in 0usize..2, tail in 1usize..=6) {
        let mut doc = document();
        let target = select(&doc, 20, 26);
        doc.tree_mut().wrap(target, AnnotationId(1)).unwrap();

        let span = select(&doc, 18 + lead, 26 + tail);
        prop_assert_eq!(SelectionGuard::default().validate(&doc, span), Err(Rejection::ContainsAnnotation));
    }

    #[test]
    fn prop_partial_overlap_never_accepted(lead in 0usize..2, inner in 1usize..6) {
        let mut doc = document();
        let target = select(&doc, 20, 26);
        doc.tree_mut().wrap(target, AnnotationId(1)).unwrap();

        let span = select(&doc, 18 + lead, 20 + inner);
        prop_assert!(SelectionGuard::default().validate(&doc, span).is_err());
    }
}
