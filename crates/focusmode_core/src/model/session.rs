//! Study session model.
//!
//! # Responsibility
//! - Define the session record and its submitted-field draft.
//! - Own the one-directional session lifecycle.
//!
//! # Invariants
//! - Status only moves `planned -> inprogress -> completed`.
//! - `duration` is the planned length in minutes (1..=600).
//! - `actual_duration` is only set once the session is completed.

use crate::model::entity::{
    check_length, require_range, require_text, Entity, EntityId, EntityKind, TransitionError,
    ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const TITLE_MAX_CHARS: usize = 120;
const SUBJECT_MAX_CHARS: usize = 80;
const NOTES_MAX_CHARS: usize = 2_000;
pub const SESSION_DURATION_MIN: u32 = 1;
pub const SESSION_DURATION_MAX: u32 = 600;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Scheduled, not started yet.
    #[default]
    Planned,
    /// Currently being studied.
    InProgress,
    /// Finished; terminal state.
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "inprogress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Some(Self::Planned),
            "inprogress" | "in_progress" | "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns whether `next` is reachable in one forward step (or unchanged).
    pub fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Planned, Self::Planned)
                | (Self::Planned, Self::InProgress)
                | (Self::InProgress, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Completed, Self::Completed)
        )
    }

    /// Validates one lifecycle move.
    pub fn ensure_move_to(self, next: Self) -> Result<(), TransitionError> {
        if self.can_move_to(next) {
            return Ok(());
        }
        Err(TransitionError {
            from: self.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: EntityId,
    pub title: String,
    pub subject: String,
    /// Planned length in minutes.
    pub duration: u32,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Minutes actually studied, recorded on completion.
    #[serde(default)]
    pub actual_duration: Option<u32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Moves a planned session to `inprogress` and stamps `started_at`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_step(SessionStatus::InProgress)?;
        self.status = SessionStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves an in-progress session to `completed` with the studied minutes.
    pub fn complete(&mut self, actual_minutes: u32, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_step(SessionStatus::Completed)?;
        self.status = SessionStatus::Completed;
        self.actual_duration = Some(actual_minutes);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Minutes counted toward focus time: actual minutes, else planned.
    pub fn focus_minutes(&self) -> u32 {
        self.actual_duration.unwrap_or(self.duration)
    }

    /// Checks an explicit transition; unlike draft updates it must change state.
    pub fn check_step(&self, next: SessionStatus) -> Result<(), TransitionError> {
        if self.status == next {
            return Err(TransitionError {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status.ensure_move_to(next)
    }
}

/// Submitted fields for creating or replacing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub title: String,
    pub subject: String,
    pub duration: u32,
    /// Requested state; `None` keeps the stored one (new sessions start planned).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionDraft {
    /// Creates a planned-session draft.
    pub fn planned(title: impl Into<String>, subject: impl Into<String>, duration: u32) -> Self {
        Self {
            title: title.into(),
            subject: subject.into(),
            duration,
            status: Some(SessionStatus::Planned),
            notes: None,
        }
    }

    /// Edits only the descriptive fields; the lifecycle state is left alone.
    pub fn details(title: impl Into<String>, subject: impl Into<String>, duration: u32) -> Self {
        Self {
            status: None,
            ..Self::planned(title, subject, duration)
        }
    }

    /// Builds a replacement draft carrying the current values of `session`.
    pub fn from_session(session: &Session) -> Self {
        Self {
            title: session.title.clone(),
            subject: session.subject.clone(),
            duration: session.duration,
            status: Some(session.status),
            notes: session.notes.clone(),
        }
    }
}

impl Entity for Session {
    type Draft = SessionDraft;

    const KIND: EntityKind = EntityKind::Session;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate_draft(draft: &SessionDraft) -> Result<(), ValidationError> {
        require_text("title", &draft.title, TITLE_MAX_CHARS)?;
        require_text("subject", &draft.subject, SUBJECT_MAX_CHARS)?;
        require_range(
            "duration",
            draft.duration,
            SESSION_DURATION_MIN,
            SESSION_DURATION_MAX,
        )?;
        if let Some(notes) = draft.notes.as_deref() {
            check_length("notes", notes, NOTES_MAX_CHARS)?;
        }
        Ok(())
    }

    fn check_update(&self, draft: &SessionDraft) -> Result<(), TransitionError> {
        match draft.status {
            Some(next) => self.status.ensure_move_to(next),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionDraft, SessionStatus};
    use crate::model::entity::{Entity, EntityId, ValidationError};
    use chrono::Utc;

    fn planned_session() -> Session {
        let now = Utc::now();
        Session {
            id: EntityId::Remote(1),
            title: "Math".to_string(),
            subject: "Algebra".to_string(),
            duration: 25,
            status: SessionStatus::Planned,
            notes: None,
            actual_duration: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_serializes_as_lowercase_words() {
        let value = serde_json::to_value(SessionStatus::InProgress).unwrap();
        assert_eq!(value, serde_json::json!("inprogress"));
        assert_eq!(SessionStatus::parse("in_progress"), Some(SessionStatus::InProgress));
    }

    #[test]
    fn lifecycle_only_moves_forward() {
        let mut session = planned_session();
        let now = Utc::now();

        session.start(now).unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.start(now).is_err());

        session.complete(30, now).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.actual_duration, Some(30));
        assert_eq!(session.focus_minutes(), 30);

        let err = session.start(now).unwrap_err();
        assert_eq!(err.from, "completed");
        assert_eq!(err.to, "inprogress");
    }

    #[test]
    fn planned_session_cannot_skip_to_completed() {
        let mut session = planned_session();
        assert!(session.complete(25, Utc::now()).is_err());
        assert_eq!(session.status, SessionStatus::Planned);
    }

    #[test]
    fn check_update_rejects_reverse_status() {
        let mut session = planned_session();
        session.status = SessionStatus::Completed;
        let mut draft = SessionDraft::from_session(&session);
        assert!(session.check_update(&draft).is_ok());

        draft.status = Some(SessionStatus::Planned);
        assert!(session.check_update(&draft).is_err());

        let details = SessionDraft::details("Math", "Geometry", 30);
        assert!(session.check_update(&details).is_ok());
    }

    #[test]
    fn validate_draft_checks_fields() {
        let valid = SessionDraft::planned("Math", "Algebra", 25);
        assert!(Session::validate_draft(&valid).is_ok());

        let blank = SessionDraft::planned("  ", "Algebra", 25);
        assert_eq!(
            Session::validate_draft(&blank),
            Err(ValidationError::EmptyField("title"))
        );

        let zero = SessionDraft::planned("Math", "Algebra", 0);
        assert!(matches!(
            Session::validate_draft(&zero),
            Err(ValidationError::OutOfRange { field: "duration", .. })
        ));
    }

    #[test]
    fn draft_without_status_leaves_it_out_on_the_wire() {
        let draft: SessionDraft = serde_json::from_value(serde_json::json!({
            "title": "Math",
            "subject": "Algebra",
            "duration": 25
        }))
        .unwrap();
        assert_eq!(draft.status, None);

        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("status").is_none());
        let planned = serde_json::to_value(SessionDraft::planned("Math", "Algebra", 25)).unwrap();
        assert_eq!(planned["status"], "planned");
    }
}
