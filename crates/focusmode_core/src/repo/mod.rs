//! Source-agnostic repository contracts.
//!
//! # Responsibility
//! - Define the `EntityRepository` capability both sources satisfy.
//! - Classify source failures into the user-facing failure taxonomy.
//!
//! # Invariants
//! - `list` returns the complete set held by the source, in display order.
//! - Repositories never fall over to another source on their own.

use crate::model::entity::{Entity, EntityId, TransitionError};
use crate::model::session::Session;
use crate::remote::RemoteError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod local_repo;
pub mod remote_repo;

pub use local_repo::LocalRepository;
pub use remote_repo::RemoteRepository;

/// Backing store serving an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Remote,
    Local,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Input rejected before dispatch.
    Validation,
    /// Network, timeout or non-2xx answer from the remote service.
    RemoteUnavailable,
    /// Missing, expired or rejected token.
    AuthRequired,
    /// On-device storage failed; no further fallback exists.
    LocalStorageFailure,
}

impl FailureKind {
    /// Stable code used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::AuthRequired => "auth_required",
            Self::LocalStorageFailure => "local_storage",
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Failure raised by one source.
#[derive(Debug)]
pub enum SourceError {
    Remote(RemoteError),
    Local(StoreError),
    Transition(TransitionError),
}

impl SourceError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Remote(err) if err.is_auth_required() => FailureKind::AuthRequired,
            Self::Remote(_) => FailureKind::RemoteUnavailable,
            Self::Local(_) => FailureKind::LocalStorageFailure,
            Self::Transition(_) => FailureKind::Validation,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(err) => write!(f, "{err}"),
            Self::Local(err) => write!(f, "{err}"),
            Self::Transition(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::Local(err) => Some(err),
            Self::Transition(err) => Some(err),
        }
    }
}

impl From<RemoteError> for SourceError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<StoreError> for SourceError {
    fn from(value: StoreError) -> Self {
        Self::Local(value)
    }
}

impl From<TransitionError> for SourceError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Local(StoreError::Serde(value))
    }
}

/// List/create/update/delete capability shared by remote and local sources.
pub trait EntityRepository<E: Entity> {
    fn source(&self) -> Source;
    fn list(&self) -> SourceResult<Vec<E>>;
    fn create(&self, draft: &E::Draft) -> SourceResult<EntityId>;
    fn update(&self, id: &EntityId, draft: &E::Draft) -> SourceResult<()>;
    fn delete(&self, id: &EntityId) -> SourceResult<()>;
}

/// Session lifecycle transitions on top of plain CRUD.
pub trait SessionRepository: EntityRepository<Session> {
    /// Moves a planned session to `inprogress`.
    fn start(&self, id: &EntityId) -> SourceResult<()>;
    /// Moves an in-progress session to `completed`.
    fn complete(&self, id: &EntityId, duration: u32) -> SourceResult<()>;
}
