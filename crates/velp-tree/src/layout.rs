//! Names the rendered paragraph layout is built from
//!
//! ```text
//! div.par[id=<par_id>][t=<token>]
//! ├── div.parContent        content root, `el_path` starts here
//! │   └── ...rendered content, inline markers
//! └── div.notes             margin region
//!     └── annotation.margin-annotation[aid=<id>]
//! ```

/// Attribute carrying the paragraph version token
pub const VERSION_ATTR: &str = "t";

/// Attribute carrying the paragraph id
pub const ID_ATTR: &str = "id";

/// Attribute carrying an annotation id on margin notes
pub const ANNOTATION_ID_ATTR: &str = "aid";

/// Class of paragraph elements
pub const PARAGRAPH_CLASS: &str = "par";

/// Class of the content root inside a paragraph
pub const CONTENT_CLASS: &str = "parContent";

/// Class of the margin region inside a paragraph
pub const MARGIN_CLASS: &str = "notes";

/// Class of the element a marker wraps content in
pub const HIGHLIGHT_CLASS: &str = "highlighted";

/// Class of margin notes
pub const MARGIN_NOTE_CLASS: &str = "margin-annotation";

/// Class set on paragraphs that have answer-scoped annotations
pub const HAS_ANNOTATION_CLASS: &str = "has-annotation";

/// Tag of the element holding a rendered plugin answer
pub const ANSWER_TAG: &str = "pre";
