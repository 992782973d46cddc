//! Dual-source controller.
//!
//! # Responsibility
//! - Pick the remote API or the local store per call from the session context.
//! - Reload the full collection after every applied mutation.
//! - Degrade remote failures to a local read with an error notice.
//!
//! # Invariants
//! - `items()` always reflects the last successful reload.
//! - A failed remote write is never replayed against the local store.
//! - Validation and lifecycle violations are rejected before dispatch; the
//!   current state is read from the selected source when it is not loaded.

use crate::auth::SessionContext;
use crate::controller::{ControllerError, ControllerResult, Notice, Notifier, Outcome};
use crate::logging::sanitize_message;
use crate::model::book::Book;
use crate::model::entity::{require_range, Entity, EntityId, TransitionError, ValidationError};
use crate::model::note::Note;
use crate::model::session::{Session, SessionStatus};
use crate::model::timer::FocusTimer;
use crate::repo::{
    EntityRepository, FailureKind, SessionRepository, Source, SourceError, SourceResult,
};
use log::{error, info, warn};

const MAX_LOGGED_ERROR_CHARS: usize = 200;
/// Upper bound for minutes reported when completing a session.
pub const MAX_ACTUAL_MINUTES: u32 = 24 * 60;

pub type SessionController<'a> = DualSourceController<'a, Session, dyn SessionRepository + 'a>;
pub type NoteController<'a> = DualSourceController<'a, Note, dyn EntityRepository<Note> + 'a>;
pub type BookController<'a> = DualSourceController<'a, Book, dyn EntityRepository<Book> + 'a>;
pub type TimerController<'a> =
    DualSourceController<'a, FocusTimer, dyn EntityRepository<FocusTimer> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Start,
    Complete,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Start => "start",
            Self::Complete => "complete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Load => "loaded",
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::Start => "started",
            Self::Complete => "completed",
        }
    }
}

/// Controller for one entity kind over a remote and a local repository.
pub struct DualSourceController<'a, E, R>
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    context: &'a SessionContext,
    notifier: &'a dyn Notifier,
    remote: Box<R>,
    local: Box<R>,
    items: Vec<E>,
    source: Option<Source>,
}

impl<'a, E, R> DualSourceController<'a, E, R>
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    pub fn new(
        context: &'a SessionContext,
        notifier: &'a dyn Notifier,
        remote: Box<R>,
        local: Box<R>,
    ) -> Self {
        Self {
            context,
            notifier,
            remote,
            local,
            items: Vec::new(),
            source: None,
        }
    }

    /// Collection as of the last successful reload, in display order.
    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn find(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Source the current collection was read from; `None` before any load.
    pub fn source(&self) -> Option<Source> {
        self.source
    }

    /// Source the next operation will use.
    pub fn resolve_source(&self) -> Source {
        if self.context.is_logged_in() {
            Source::Remote
        } else {
            Source::Local
        }
    }

    /// Replaces the collection with the selected source's full set.
    pub fn load(&mut self) -> ControllerResult<Outcome<()>> {
        let source = self.resolve_source();
        match self.reload(source) {
            Ok(()) => {
                info!(
                    "event=entity_op module=controller status=ok kind={} op=load source={source} count={}",
                    E::KIND,
                    self.items.len()
                );
                Ok(Outcome::Applied { source, value: () })
            }
            Err(err) => self.recover(Operation::Load, source, err),
        }
    }

    /// Creates an entity and returns the id assigned by the source.
    pub fn create(&mut self, draft: &E::Draft) -> ControllerResult<Outcome<EntityId>> {
        self.validate(Operation::Create, draft)?;
        self.mutate(Operation::Create, |repo| repo.create(draft))
    }

    /// Replaces the submitted fields of an existing entity.
    pub fn update(&mut self, id: &EntityId, draft: &E::Draft) -> ControllerResult<Outcome<()>> {
        self.validate(Operation::Update, draft)?;
        if let Some(degraded) =
            self.check_current(Operation::Update, id, |current| current.check_update(draft))?
        {
            return Ok(degraded);
        }
        self.mutate(Operation::Update, |repo| repo.update(id, draft))
    }

    pub fn delete(&mut self, id: &EntityId) -> ControllerResult<Outcome<()>> {
        self.mutate(Operation::Delete, |repo| repo.delete(id))
    }

    fn repository(&self, source: Source) -> &R {
        match source {
            Source::Remote => &*self.remote,
            Source::Local => &*self.local,
        }
    }

    /// Runs `check` against the state `source` currently holds for `id`.
    ///
    /// Returns `Some(outcome)` when the source could not be read and the
    /// call already degraded. An id the source does not list is left for the
    /// repository to reject.
    fn check_current(
        &mut self,
        operation: Operation,
        id: &EntityId,
        check: impl FnOnce(&E) -> Result<(), TransitionError>,
    ) -> ControllerResult<Option<Outcome<()>>> {
        let source = self.resolve_source();
        if self.source != Some(source) || self.find(id).is_none() {
            if let Err(err) = self.reload(source) {
                return self.recover(operation, source, err).map(Some);
            }
        }
        let verdict = match self.find(id) {
            Some(current) => check(current),
            None => Ok(()),
        };
        match verdict {
            Ok(()) => Ok(None),
            Err(err) => Err(self.fail(operation, source, err.into())),
        }
    }

    fn reload(&mut self, source: Source) -> SourceResult<()> {
        let items = self.repository(source).list()?;
        self.items = items;
        self.source = Some(source);
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        operation: Operation,
        call: impl FnOnce(&R) -> SourceResult<T>,
    ) -> ControllerResult<Outcome<T>> {
        let source = self.resolve_source();
        let value = match call(self.repository(source)) {
            Ok(value) => value,
            Err(err) => return self.recover(operation, source, err),
        };
        info!(
            "event=entity_op module=controller status=ok kind={} op={} source={source}",
            E::KIND,
            operation.as_str()
        );
        self.notifier.notify(&Notice::success(format!(
            "{} {}.",
            E::KIND.label(),
            operation.past_tense()
        )));

        match self.reload(source) {
            Ok(()) => Ok(Outcome::Applied { source, value }),
            Err(err) if source == Source::Remote && err.is_remote() => {
                self.fall_back(Operation::Load, &err)?;
                Ok(Outcome::Unsynced { value, error: err })
            }
            Err(err) => Err(self.fail(Operation::Load, source, err)),
        }
    }

    fn recover<T>(
        &mut self,
        operation: Operation,
        source: Source,
        err: SourceError,
    ) -> ControllerResult<Outcome<T>> {
        if source == Source::Remote && err.is_remote() {
            self.fall_back(operation, &err)?;
            return Ok(Outcome::Degraded { error: err });
        }
        Err(self.fail(operation, source, err))
    }

    // Remote failed: tell the user, then show what the local store holds.
    fn fall_back(&mut self, operation: Operation, err: &SourceError) -> ControllerResult<()> {
        let failure = err.failure_kind();
        warn!(
            "event=entity_op module=controller status=degraded kind={} op={} source=remote error_code={} error={}",
            E::KIND,
            operation.as_str(),
            failure.as_str(),
            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
        );
        let reason = match failure {
            FailureKind::AuthRequired => "sign-in required",
            _ => "server unreachable",
        };
        let message = match operation {
            Operation::Load => format!(
                "Could not sync {} with the server ({reason}); showing local data.",
                E::KIND
            ),
            other => format!(
                "Could not {} {} on the server ({reason}); showing local data.",
                other.as_str(),
                E::KIND.label().to_lowercase()
            ),
        };
        self.notifier.notify(&Notice::error(message));

        self.reload(Source::Local)
            .map_err(|local_err| self.fail(Operation::Load, Source::Local, local_err))
    }

    fn fail(&self, operation: Operation, source: Source, err: SourceError) -> ControllerError {
        let noun = E::KIND.label().to_lowercase();
        let message = match &err {
            SourceError::Local(store_err) if store_err.is_not_found() => {
                format!("{} not found.", E::KIND.label())
            }
            SourceError::Transition(transition) => {
                format!("Cannot {} {noun}: {transition}.", operation.as_str())
            }
            SourceError::Local(_) => {
                format!("Could not {} {noun}: local storage failed.", operation.as_str())
            }
            SourceError::Remote(remote) => {
                format!("Could not {} {noun}: {remote}.", operation.as_str())
            }
        };
        error!(
            "event=entity_op module=controller status=error kind={} op={} source={source} error_code={} error={}",
            E::KIND,
            operation.as_str(),
            err.failure_kind().as_str(),
            sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
        );
        self.notifier.notify(&Notice::error(message));
        ControllerError::from_source(E::KIND, err)
    }

    fn validate(&self, operation: Operation, draft: &E::Draft) -> ControllerResult<()> {
        E::validate_draft(draft).map_err(|err| self.reject(operation, err))
    }

    fn reject(&self, operation: Operation, err: ValidationError) -> ControllerError {
        warn!(
            "event=entity_op module=controller status=rejected kind={} op={} error_code=validation error={}",
            E::KIND,
            operation.as_str(),
            err
        );
        self.notifier.notify(&Notice::error(format!(
            "Invalid {}: {err}.",
            E::KIND.label().to_lowercase()
        )));
        ControllerError::Validation(err)
    }
}

impl<'a> DualSourceController<'a, Session, dyn SessionRepository + 'a> {
    /// Moves a planned session to `inprogress`.
    pub fn start(&mut self, id: &EntityId) -> ControllerResult<Outcome<()>> {
        if let Some(degraded) = self.guard_step(Operation::Start, id, SessionStatus::InProgress)? {
            return Ok(degraded);
        }
        self.mutate(Operation::Start, |repo| repo.start(id))
    }

    /// Moves an in-progress session to `completed` with the minutes studied.
    pub fn complete(&mut self, id: &EntityId, duration: u32) -> ControllerResult<Outcome<()>> {
        require_range("duration", duration, 0, MAX_ACTUAL_MINUTES)
            .map_err(|err| self.reject(Operation::Complete, err))?;
        if let Some(degraded) =
            self.guard_step(Operation::Complete, id, SessionStatus::Completed)?
        {
            return Ok(degraded);
        }
        self.mutate(Operation::Complete, |repo| repo.complete(id, duration))
    }

    fn guard_step(
        &mut self,
        operation: Operation,
        id: &EntityId,
        next: SessionStatus,
    ) -> ControllerResult<Option<Outcome<()>>> {
        self.check_current(operation, id, |session| session.check_step(next))
    }
}
