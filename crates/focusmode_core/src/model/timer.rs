//! Focus timer model.

use crate::model::entity::{require_range, require_text, Entity, EntityId, EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const LABEL_MAX_CHARS: usize = 80;
pub const TIMER_DURATION_MIN: u32 = 1;
pub const TIMER_DURATION_MAX: u32 = 180;

/// Timer run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Finished,
}

impl TimerStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Persisted focus timer preset or run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTimer {
    pub id: EntityId,
    pub label: String,
    /// Length in minutes.
    pub duration: u32,
    #[serde(default)]
    pub session_id: Option<EntityId>,
    #[serde(default)]
    pub status: TimerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted fields for creating or replacing a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTimerDraft {
    pub label: String,
    pub duration: u32,
    #[serde(default)]
    pub session_id: Option<EntityId>,
    #[serde(default)]
    pub status: TimerStatus,
}

impl FocusTimerDraft {
    pub fn new(label: impl Into<String>, duration: u32) -> Self {
        Self {
            label: label.into(),
            duration,
            session_id: None,
            status: TimerStatus::Idle,
        }
    }
}

impl Entity for FocusTimer {
    type Draft = FocusTimerDraft;

    const KIND: EntityKind = EntityKind::FocusTimer;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate_draft(draft: &FocusTimerDraft) -> Result<(), ValidationError> {
        require_text("label", &draft.label, LABEL_MAX_CHARS)?;
        require_range(
            "duration",
            draft.duration,
            TIMER_DURATION_MIN,
            TIMER_DURATION_MAX,
        )
    }
}
