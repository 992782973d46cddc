//! Entity identity, kinds and the shared entity contract.
//!
//! # Responsibility
//! - Define `EntityId` for server-assigned and locally-generated identities.
//! - Map each entity kind to its local collection and remote resource path.
//! - Provide draft validation helpers used by every entity kind.
//!
//! # Invariants
//! - Remote ids are integers; local ids are UUID v4 values.
//! - Display order is `created_at DESC`, ties broken by id text ascending.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a persisted entity.
///
/// Serialized untagged: a JSON number for remote ids, a string for local ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Identifier assigned by the remote service.
    Remote(i64),
    /// Identifier generated on this device by the local store.
    Local(Uuid),
}

impl EntityId {
    /// Generates a fresh local identifier.
    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    /// Parses user or storage input into an id.
    ///
    /// Integer text maps to `Remote`, UUID text maps to `Local`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(number) = trimmed.parse::<i64>() {
            return Some(Self::Remote(number));
        }
        Uuid::parse_str(trimmed).ok().map(Self::Local)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(id) => write!(f, "{id}"),
            Self::Local(id) => write!(f, "{id}"),
        }
    }
}

/// Tracked resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Session,
    Note,
    Book,
    FocusTimer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Session, Self::Note, Self::Book, Self::FocusTimer];

    /// Local store collection name.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Session => "sessions",
            Self::Note => "notes",
            Self::Book => "books",
            Self::FocusTimer => "timers",
        }
    }

    /// Remote resource path, relative to the API base URL.
    pub fn remote_path(self) -> &'static str {
        match self {
            Self::Session => "/sessions",
            Self::Note => "/notes",
            Self::Book => "/books",
            Self::FocusTimer => "/timers",
        }
    }

    /// Capitalized label used in user-facing notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::Session => "Session",
            Self::Note => "Note",
            Self::Book => "Book",
            Self::FocusTimer => "Timer",
        }
    }

    /// Parses a collection name (`sessions`, `notes`, `books`, `timers`).
    pub fn from_collection(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == normalized)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

/// Draft field validation failure, raised before any dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },
    InvalidFormat {
        field: &'static str,
        details: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` cannot be empty"),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` exceeds {max_chars} characters")
            }
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "`{field}` must be within {min}..={max}, got {actual}"),
            Self::InvalidFormat { field, details } => write!(f, "invalid `{field}`: {details}"),
        }
    }
}

impl Error for ValidationError {}

/// Rejected lifecycle move, e.g. restarting a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot move from `{}` to `{}`", self.from, self.to)
    }
}

impl Error for TransitionError {}

/// Contract shared by every tracked resource.
pub trait Entity: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    /// Submitted fields for create/update, without identity or timestamps.
    type Draft: Clone + Debug + Serialize;

    const KIND: EntityKind;

    fn id(&self) -> &EntityId;

    fn created_at(&self) -> DateTime<Utc>;

    /// Validates submitted fields before they are dispatched to any source.
    fn validate_draft(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Checks that replacing `self` with `draft` keeps lifecycle rules.
    fn check_update(&self, _draft: &Self::Draft) -> Result<(), TransitionError> {
        Ok(())
    }
}

/// Sorts a collection into display order.
pub fn sort_for_display<E: Entity>(items: &mut [E]) {
    items.sort_by(|left, right| {
        right
            .created_at()
            .cmp(&left.created_at())
            .then_with(|| left.id().to_string().cmp(&right.id().to_string()))
    });
}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    check_length(field, value, max_chars)
}

pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            actual: value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{EntityId, EntityKind};
    use uuid::Uuid;

    #[test]
    fn parse_distinguishes_remote_and_local_ids() {
        assert_eq!(EntityId::parse(" 42 "), Some(EntityId::Remote(42)));

        let uuid = Uuid::new_v4();
        assert_eq!(
            EntityId::parse(&uuid.to_string()),
            Some(EntityId::Local(uuid))
        );
        assert_eq!(EntityId::parse("not-an-id"), None);
    }

    #[test]
    fn ids_serialize_untagged() {
        let remote = serde_json::to_value(EntityId::Remote(7)).unwrap();
        assert_eq!(remote, serde_json::json!(7));

        let uuid = Uuid::new_v4();
        let local: EntityId = serde_json::from_value(serde_json::json!(uuid.to_string())).unwrap();
        assert_eq!(local, EntityId::Local(uuid));
    }

    #[test]
    fn collection_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_collection(kind.collection()), Some(kind));
        }
        assert_eq!(EntityKind::from_collection("Timers"), Some(EntityKind::FocusTimer));
        assert_eq!(EntityKind::from_collection("atoms"), None);
    }
}
