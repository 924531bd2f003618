//! Velp CLI
//!
//! Diagnostic front end for the anchoring engine:
//! - `resolve`: restore stored annotations into a document and report where
//!   each one ended up
//! - `encode`: encode a character range of a paragraph

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod fixture;
pub mod report;

use std::sync::Arc;

use anyhow::Context;
use velp_anchor::{encode, AnnotationInterval, SelectionGuard};
use velp_core::{
    document_handle, Annotation, DocumentId, MemoryStore, ReviewConfig, ReviewController, ReviewScope,
};
use velp_tree::{Bias, Document, ParId, Span};

pub use fixture::{load_annotations, load_config, DocumentFixture, ParagraphFixture};
pub use report::{AnnotationLine, ResolveReport};

const FIXTURE_DOC_ID: DocumentId = DocumentId(1);

/// Restore `annotations` into the fixture document
///
/// # Errors
/// Fails if the fixture does not build or restoration cannot list records
pub async fn resolve(
    fixture: &DocumentFixture,
    annotations: Vec<Annotation>,
    config: ReviewConfig,
) -> anyhow::Result<ResolveReport> {
    let doc = fixture.build().context("building document")?;
    let order: Vec<(_, ParId)> = annotations.iter().map(|a| (a.id, a.par_id().clone())).collect();
    let store = MemoryStore::new().with_annotations(FIXTURE_DOC_ID, annotations);
    let controller = ReviewController::new(
        ReviewScope::new(document_handle(doc), FIXTURE_DOC_ID, Arc::new(store)),
        config,
    );

    let summary = controller.load_document_annotations().await?;
    let annotations = order
        .into_iter()
        .map(|(id, par_id)| AnnotationLine {
            id,
            par_id,
            placement: controller.status(id).map(|status| status.placement),
        })
        .collect();
    Ok(ResolveReport { summary, annotations })
}

/// Encode the characters `[start, end)` of a paragraph's plain text
///
/// Selections the guard would refuse are still encoded, with a warning.
///
/// # Errors
/// Fails for unknown paragraphs, out-of-range offsets and encoding errors
pub fn encode_range(doc: &Document, par_id: &ParId, start: usize, end: usize) -> anyhow::Result<AnnotationInterval> {
    let par = doc
        .paragraph(par_id)
        .with_context(|| format!("unknown paragraph '{par_id}'"))?;
    let tree = doc.tree();
    let len = tree.text_content(par.content).chars().count();
    let point = |offset: usize, bias: Bias| {
        tree.point_in(par.content, offset, bias)
            .with_context(|| format!("offset {offset} outside paragraph of length {len}"))
    };
    let span = Span::new(point(start, Bias::Forward)?, point(end, Bias::Backward)?);

    if let Err(rejection) = SelectionGuard::default().validate(doc, span) {
        tracing::warn!(%rejection, "selection would not be accepted for inline anchoring");
    }
    Ok(encode(doc, span)?)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
