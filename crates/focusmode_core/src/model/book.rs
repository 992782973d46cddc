//! Reading-list book model.

use crate::model::entity::{check_length, require_text, Entity, EntityId, EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const TITLE_MAX_CHARS: usize = 200;
const AUTHOR_MAX_CHARS: usize = 120;
const CATEGORY_MAX_CHARS: usize = 40;
const NOTES_MAX_CHARS: usize = 5_000;

/// Reading progress of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    ToRead,
    Reading,
    Finished,
}

impl BookStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToRead => "to_read",
            Self::Reading => "reading",
            Self::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "to_read" | "toread" => Some(Self::ToRead),
            "reading" => Some(Self::Reading),
            "finished" | "read" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl Display for BookStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted fields for creating or replacing a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            status: BookStatus::ToRead,
            category: None,
            notes: None,
        }
    }
}

impl Entity for Book {
    type Draft = BookDraft;

    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate_draft(draft: &BookDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title, TITLE_MAX_CHARS)?;
        if let Some(author) = draft.author.as_deref() {
            check_length("author", author, AUTHOR_MAX_CHARS)?;
        }
        if let Some(category) = draft.category.as_deref() {
            check_length("category", category, CATEGORY_MAX_CHARS)?;
        }
        if let Some(notes) = draft.notes.as_deref() {
            check_length("notes", notes, NOTES_MAX_CHARS)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Book, BookDraft, BookStatus};
    use crate::model::entity::Entity;

    #[test]
    fn status_parses_common_spellings() {
        assert_eq!(BookStatus::parse("to-read"), Some(BookStatus::ToRead));
        assert_eq!(BookStatus::parse("Reading"), Some(BookStatus::Reading));
        assert_eq!(BookStatus::parse("read"), Some(BookStatus::Finished));
        assert_eq!(BookStatus::parse("lost"), None);
    }

    #[test]
    fn validate_checks_optional_lengths() {
        let mut draft = BookDraft::new("SICP");
        assert!(Book::validate_draft(&draft).is_ok());

        draft.author = Some("x".repeat(121));
        assert!(Book::validate_draft(&draft).is_err());
    }
}
