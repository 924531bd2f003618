//! Anchoring reports

use std::fmt::Write as _;

use serde::Serialize;
use velp_core::{MarginReason, Placement, RestoreSummary};
use velp_tree::{AnnotationId, ParId};

/// Outcome of one stored annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationLine {
    pub id: AnnotationId,
    pub par_id: ParId,
    /// `None` when the paragraph no longer exists
    #[serde(flatten)]
    pub placement: Option<Placement>,
}

/// Result of `velp resolve`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveReport {
    pub summary: RestoreSummary,
    pub annotations: Vec<AnnotationLine>,
}

impl ResolveReport {
    /// One tab-separated line per annotation, then the totals
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in &self.annotations {
            let (placement, reason) = match &line.placement {
                Some(Placement::Inline) => ("inline", String::new()),
                Some(Placement::MarginOnly { reason }) => ("margin", reason_label(reason)),
                None => ("dropped", "paragraph_gone".to_string()),
            };
            let _ = writeln!(out, "{}\t{}\t{placement}\t{reason}", line.id, line.par_id);
        }
        let _ = write!(
            out,
            "inline: {}, margin: {}, dropped: {}",
            self.summary.inline, self.summary.margin, self.summary.dropped
        );
        out
    }
}

fn reason_label(reason: &MarginReason) -> String {
    match reason {
        MarginReason::NoCoordinate => "no_coordinate".into(),
        MarginReason::ParagraphModified => "paragraph_modified".into(),
        MarginReason::Unresolved { detail } => format!("unresolved: {detail}"),
        MarginReason::WrapFailed { detail } => format!("wrap_failed: {detail}"),
        MarginReason::AnswerScoped => "answer_scoped".into(),
        MarginReason::NotShownInPlace => "not_shown_in_place".into(),
    }
}
