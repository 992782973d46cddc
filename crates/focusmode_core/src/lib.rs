//! Core of the FocusMode study tracker.
//! Owns the entity rules and the choice between the remote API and the
//! on-device store; front ends only render what this crate returns.

pub mod app;
pub mod auth;
pub mod command;
pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;
pub mod store;

pub use app::{AppError, AppResult, FocusApp};
pub use auth::{AuthSession, LoginRequest, RegisterRequest, SessionContext, UserProfile};
pub use command::{dispatch, Action, ActionResponse};
pub use config::{AppConfig, ConfigError};
pub use controller::{
    ControllerError, ControllerResult, DualSourceController, Notice, NoticeKind, NoticeLog,
    Notifier, Outcome,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{Book, BookDraft, BookStatus};
pub use model::entity::{Entity, EntityId, EntityKind, TransitionError, ValidationError};
pub use model::note::{Note, NoteDraft};
pub use model::session::{Session, SessionDraft, SessionStatus};
pub use model::timer::{FocusTimer, FocusTimerDraft, TimerStatus};
pub use remote::{RemoteClient, RemoteError};
pub use repo::{EntityRepository, FailureKind, SessionRepository, Source, SourceError};
pub use service::stats::{StatsReport, TodayStats};
pub use store::{LocalStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
