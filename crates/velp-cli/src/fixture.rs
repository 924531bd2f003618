//! Input files
//!
//! A document fixture lists paragraphs with their version token and rendered
//! content:
//!
//! ```json
//! {"paragraphs": [{"id": "p1", "t": "t1", "content": ["The quick fox"]}]}
//! ```
//!
//! Annotation files are JSON arrays of stored annotation records.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use velp_core::{Annotation, ReviewConfig};
use velp_tree::{Document, Fragment, ParId, TreeError};

/// Document fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFixture {
    pub paragraphs: Vec<ParagraphFixture>,
}

/// One rendered paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphFixture {
    pub id: ParId,
    pub t: String,
    #[serde(default)]
    pub content: Vec<Fragment>,
}

impl DocumentFixture {
    /// Parse a fixture file
    ///
    /// # Errors
    /// Fails on unreadable files and invalid JSON
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing document {}", path.display()))
    }

    /// Render into a live document
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateParagraph`] for repeated ids
    pub fn build(&self) -> Result<Document, TreeError> {
        let mut doc = Document::new();
        for par in &self.paragraphs {
            doc.add_paragraph(par.id.clone(), par.t.clone(), &par.content)?;
        }
        Ok(doc)
    }
}

/// Read stored annotations
///
/// # Errors
/// Fails on unreadable files and invalid JSON
pub fn load_annotations(path: &Path) -> anyhow::Result<Vec<Annotation>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing annotations {}", path.display()))
}

/// Read review configuration, defaults when no file is given
///
/// # Errors
/// Fails on unreadable files and invalid TOML
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ReviewConfig> {
    let Some(path) = path else {
        return Ok(ReviewConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_content() {
        let fixture: DocumentFixture = serde_json::from_str(
            r#"{"paragraphs": [
                {"id": "p1", "t": "t1", "content": ["Hello ", {"tag": "em", "children": ["big"]}, " world"]},
                {"id": "p2", "t": "t4"}
            ]}"#,
        )
        .unwrap();
        let doc = fixture.build().unwrap();

        assert_eq!(doc.plain_text(&"p1".into()).as_deref(), Some("Hello big world"));
        assert_eq!(doc.token(&"p2".into()), Some("t4"));
    }

    #[test]
    fn duplicate_paragraphs_fail() {
        let par = ParagraphFixture {
            id: "p1".into(),
            t: "t1".into(),
            content: Vec::new(),
        };
        let fixture = DocumentFixture {
            paragraphs: vec![par.clone(), par],
        };
        assert!(matches!(fixture.build(), Err(TreeError::DuplicateParagraph(_))));
    }
}
