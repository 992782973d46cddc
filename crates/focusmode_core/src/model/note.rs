//! Study note model.
//!
//! # Invariants
//! - `category` is normalized to lowercase; blank input means `general`.
//! - `session_id` optionally links a note to the session it was taken in.

use crate::model::entity::{check_length, require_text, Entity, EntityId, EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TITLE_MAX_CHARS: usize = 200;
const CONTENT_MAX_CHARS: usize = 20_000;
const CATEGORY_MAX_CHARS: usize = 40;
pub const DEFAULT_NOTE_CATEGORY: &str = "general";

/// Persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub session_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted fields for creating or replacing a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub session_id: Option<EntityId>,
}

impl NoteDraft {
    /// Creates a draft with normalized category.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: Option<&str>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: normalize_category(category),
            session_id: None,
        }
    }

    pub fn for_session(mut self, session_id: EntityId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

impl Entity for Note {
    type Draft = NoteDraft;

    const KIND: EntityKind = EntityKind::Note;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate_draft(draft: &NoteDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title, TITLE_MAX_CHARS)?;
        check_length("content", &draft.content, CONTENT_MAX_CHARS)?;
        require_text("category", &draft.category, CATEGORY_MAX_CHARS)?;
        Ok(())
    }
}

/// Normalizes one category value; blank or missing input maps to `general`.
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => DEFAULT_NOTE_CATEGORY.to_string(),
    }
}

fn default_category() -> String {
    DEFAULT_NOTE_CATEGORY.to_string()
}

#[cfg(test)]
mod tests {
    use super::{normalize_category, Note, NoteDraft};
    use crate::model::entity::{Entity, ValidationError};

    #[test]
    fn category_is_normalized() {
        assert_eq!(normalize_category(Some("  Summary ")), "summary");
        assert_eq!(normalize_category(Some("   ")), "general");
        assert_eq!(normalize_category(None), "general");
    }

    #[test]
    fn validate_rejects_blank_title() {
        let draft = NoteDraft::new("", "body", None);
        assert_eq!(
            Note::validate_draft(&draft),
            Err(ValidationError::EmptyField("title"))
        );
    }

    #[test]
    fn missing_category_deserializes_as_general() {
        let draft: NoteDraft =
            serde_json::from_value(serde_json::json!({"title": "Limits"})).unwrap();
        assert_eq!(draft.category, "general");
        assert!(draft.content.is_empty());
    }
}
