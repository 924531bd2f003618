//! Review data model and configuration

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use velp_anchor::{AnnotationInterval, SelectionGuard, DEFAULT_ILLEGAL_CLASSES};
use velp_tree::{AnnotationId, ParId};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Rubric item identifier
    VelpId
);
numeric_id!(
    /// Submitted answer identifier
    AnswerId
);
numeric_id!(
    /// User identifier
    UserId
);
numeric_id!(
    /// Document identifier
    DocumentId
);

/// Who may see an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Visibility {
    /// Only the annotator
    Myself = 1,
    /// Annotator and document owner
    Owner = 2,
    /// All teachers of the document
    Teachers = 3,
    /// Everyone who can see the document
    #[default]
    Everyone = 4,
}

impl TryFrom<u8> for Visibility {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Myself),
            2 => Ok(Self::Owner),
            3 => Ok(Self::Teachers),
            4 => Ok(Self::Everyone),
            other => Err(format!("invalid visibility level {other}")),
        }
    }
}

impl From<Visibility> for u8 {
    fn from(value: Visibility) -> Self {
        value as u8
    }
}

/// Reference to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User id
    pub id: UserId,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// The submitted answer an annotation belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRef {
    /// Answer id
    pub id: AnswerId,
    /// Users who submitted the answer
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// Rubric item a reviewer applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Velp {
    /// Velp id
    pub id: VelpId,
    /// Short label
    pub content: String,
    /// Comment prefilled into new annotations
    #[serde(default)]
    pub default_comment: String,
    /// Points prefilled into new annotations
    #[serde(default)]
    pub points: Option<f64>,
    /// Visibility prefilled into new annotations
    #[serde(default)]
    pub visible_to: Visibility,
}

impl Velp {
    /// Create velp with defaults
    #[must_use]
    pub fn new(id: VelpId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            default_comment: String::new(),
            points: None,
            visible_to: Visibility::default(),
        }
    }

    /// With default comment
    #[inline]
    #[must_use]
    pub fn with_default_comment(mut self, comment: impl Into<String>) -> Self {
        self.default_comment = comment.into();
        self
    }

    /// With default points
    #[inline]
    #[must_use]
    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    /// With default visibility
    #[inline]
    #[must_use]
    pub fn with_visibility(mut self, visible_to: Visibility) -> Self {
        self.visible_to = visible_to;
        self
    }
}

/// Canonical annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Id assigned by the persistence side
    pub id: AnnotationId,
    /// Velp the annotation was created from
    pub velp_id: VelpId,
    /// Persisted anchor
    pub coord: AnnotationInterval,
    /// Answer the annotation is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerRef>,
    /// Awarded points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    /// Visibility
    #[serde(default)]
    pub visible_to: Visibility,
    /// Reviewer comment
    #[serde(default)]
    pub comment: String,
}

impl Annotation {
    /// Paragraph the annotation belongs to
    #[inline]
    #[must_use]
    pub fn par_id(&self) -> &ParId {
        self.coord.par_id()
    }

    /// Answer id, for answer-scoped annotations
    #[inline]
    #[must_use]
    pub fn answer_id(&self) -> Option<AnswerId> {
        self.answer.as_ref().map(|a| a.id)
    }

    /// Whether the annotation targets a submitted answer
    #[inline]
    #[must_use]
    pub fn is_answer_scoped(&self) -> bool {
        self.answer.is_some()
    }

    /// Apply an update in place
    pub fn apply(&mut self, patch: &AnnotationPatch) {
        if let Some(comment) = &patch.comment {
            self.comment.clone_from(comment);
        }
        if let Some(points) = patch.points {
            self.points = Some(points);
        }
        if let Some(visible_to) = patch.visible_to {
            self.visible_to = visible_to;
        }
        if let Some(coord) = &patch.coord {
            self.coord = coord.clone();
        }
    }
}

/// Annotation submitted for creation, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    /// Document being reviewed
    pub doc_id: DocumentId,
    /// Velp applied
    pub velp_id: VelpId,
    /// Initial anchor
    pub coord: AnnotationInterval,
    /// Answer being reviewed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<AnswerId>,
    /// Points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    /// Visibility
    pub visible_to: Visibility,
    /// Comment
    #[serde(default)]
    pub comment: String,
}

/// Partial update of an annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    /// New comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// New points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    /// New visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<Visibility>,
    /// New anchor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord: Option<AnnotationInterval>,
}

impl AnnotationPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// With points
    #[inline]
    #[must_use]
    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    /// With visibility
    #[inline]
    #[must_use]
    pub fn with_visibility(mut self, visible_to: Visibility) -> Self {
        self.visible_to = Some(visible_to);
        self
    }

    /// With anchor
    #[inline]
    #[must_use]
    pub fn with_coord(mut self, coord: AnnotationInterval) -> Self {
        self.coord = Some(coord);
        self
    }
}

/// Review engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Classes whose regions can never be annotated
    pub illegal_classes: Vec<String>,
    /// Whether answer annotations are wrapped inline in the answer text
    pub show_answers_in_place: bool,
    /// Character placed on both sides of margin text
    pub margin_padding: char,
    /// Scheduling turns yielded between wrapping and finalizing
    pub settle_turns: u32,
}

impl ReviewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With denylisted classes
    #[inline]
    #[must_use]
    pub fn with_illegal_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.illegal_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// With in-place answer annotations
    #[inline]
    #[must_use]
    pub fn with_answers_in_place(mut self, in_place: bool) -> Self {
        self.show_answers_in_place = in_place;
        self
    }

    /// With margin padding
    #[inline]
    #[must_use]
    pub fn with_margin_padding(mut self, padding: char) -> Self {
        self.margin_padding = padding;
        self
    }

    /// With settle turns
    #[inline]
    #[must_use]
    pub fn with_settle_turns(mut self, turns: u32) -> Self {
        self.settle_turns = turns;
        self
    }

    /// Turns to yield before finalizing, at least one
    #[inline]
    #[must_use]
    pub fn effective_settle_turns(&self) -> u32 {
        self.settle_turns.max(1)
    }

    /// Selection guard using the configured denylist
    #[must_use]
    pub fn guard(&self) -> SelectionGuard {
        SelectionGuard::new(self.illegal_classes.iter().cloned())
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            illegal_classes: DEFAULT_ILLEGAL_CLASSES.iter().map(ToString::to_string).collect(),
            show_answers_in_place: true,
            margin_padding: '\u{a0}',
            settle_turns: 1,
        }
    }
}
