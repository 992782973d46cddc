//! Source-selecting controllers used by the View layer.
//!
//! # Responsibility
//! - Route every entity operation to the remote API or the local store.
//! - Turn source failures into user notices and soft, degraded outcomes.
//!
//! # Invariants
//! - Remote failures never surface as `Err`; they degrade to a local read.
//! - Local storage failures are terminal for the operation.
//! - Writes never fail over between sources.

use crate::model::entity::{EntityKind, TransitionError, ValidationError};
use crate::remote::RemoteError;
use crate::repo::{FailureKind, Source, SourceError};
use crate::store::StoreError;
use serde::Serialize;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dual_source;

pub use dual_source::{
    BookController, DualSourceController, NoteController, SessionController, TimerController,
};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Sink for user-facing notices.
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

impl<F> Notifier for F
where
    F: Fn(&Notice),
{
    fn notify(&self, notice: &Notice) {
        self(notice)
    }
}

/// Notifier that records every notice in order.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: RefCell<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    /// Drains recorded notices.
    pub fn take(&self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

/// Result of an operation that reached a source.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Applied and the collection was reloaded from `source`.
    Applied { source: Source, value: T },
    /// Applied remotely, but the follow-up reload failed and the collection
    /// now mirrors the local store.
    Unsynced { value: T, error: SourceError },
    /// The remote call failed; nothing was written and the collection now
    /// mirrors the local store.
    Degraded { error: SourceError },
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Value produced by the source, if the operation was applied.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Applied { value, .. } | Self::Unsynced { value, .. } => Some(value),
            Self::Degraded { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Applied { value, .. } | Self::Unsynced { value, .. } => Some(value),
            Self::Degraded { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&SourceError> {
        match self {
            Self::Applied { .. } => None,
            Self::Unsynced { error, .. } | Self::Degraded { error } => Some(error),
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Hard failure returned to the View.
#[derive(Debug)]
pub enum ControllerError {
    /// Draft rejected before dispatch.
    Validation(ValidationError),
    /// Lifecycle move not allowed from the current status.
    Transition(TransitionError),
    /// Local store has no entity with this id.
    NotFound { kind: EntityKind, id: String },
    /// Local store failed; no further fallback exists.
    LocalStorage(StoreError),
    /// A remote failure reported by the repository wired as local.
    Remote(RemoteError),
}

impl ControllerError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) | Self::Transition(_) => FailureKind::Validation,
            Self::NotFound { .. } | Self::LocalStorage(_) => FailureKind::LocalStorageFailure,
            Self::Remote(err) if err.is_auth_required() => FailureKind::AuthRequired,
            Self::Remote(_) => FailureKind::RemoteUnavailable,
        }
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Transition(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{} `{id}` not found", kind.label()),
            Self::LocalStorage(err) => write!(f, "local storage failed: {err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transition(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::LocalStorage(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ControllerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransitionError> for ControllerError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

impl ControllerError {
    /// Classifies a source failure that cannot degrade any further.
    pub(crate) fn from_source(kind: EntityKind, error: SourceError) -> Self {
        match error {
            SourceError::Transition(err) => Self::Transition(err),
            SourceError::Local(StoreError::NotFound { id, .. }) => Self::NotFound { kind, id },
            SourceError::Local(err) => Self::LocalStorage(err),
            SourceError::Remote(err) => Self::Remote(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ControllerError, Notice, NoticeKind, NoticeLog, Notifier, Outcome};
    use crate::model::entity::EntityKind;
    use crate::remote::RemoteError;
    use crate::repo::{FailureKind, Source, SourceError};
    use crate::store::StoreError;
    use std::cell::Cell;

    #[test]
    fn notice_log_records_in_order() {
        let log = NoticeLog::new();
        log.notify(&Notice::success("Session created."));
        log.notify(&Notice::error("Could not sync."));

        let notices = log.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].kind, NoticeKind::Success);
        assert!(log.last().unwrap().is_error());
        assert_eq!(log.take().len(), 2);
        assert!(log.notices().is_empty());
    }

    #[test]
    fn closures_are_notifiers() {
        let count = Cell::new(0);
        let notifier = |_: &Notice| count.set(count.get() + 1);
        notifier.notify(&Notice::success("ok"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn degraded_outcome_has_no_value() {
        let outcome: Outcome<i32> = Outcome::Degraded {
            error: SourceError::Remote(RemoteError::AuthRequired("expired".to_string())),
        };
        assert!(outcome.value().is_none());
        assert!(outcome.is_degraded());

        let applied = Outcome::Applied {
            source: Source::Local,
            value: 7,
        };
        assert_eq!(applied.into_value(), Some(7));
    }

    #[test]
    fn local_not_found_maps_to_not_found() {
        let err = ControllerError::from_source(
            EntityKind::Note,
            SourceError::Local(StoreError::NotFound {
                collection: "notes".to_string(),
                id: "abc".to_string(),
            }),
        );
        assert!(matches!(err, ControllerError::NotFound { ref id, .. } if id == "abc"));
        assert_eq!(err.failure_kind(), FailureKind::LocalStorageFailure);
        assert_eq!(err.to_string(), "Note `abc` not found");
    }
}
