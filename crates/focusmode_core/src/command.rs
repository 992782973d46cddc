//! View-facing command dispatch.
//!
//! # Responsibility
//! - Map one user action onto the app and its controllers.
//! - Flatten every result into an `ActionResponse` envelope.
//!
//! # Invariants
//! - `dispatch` never panics and never returns `Err`.
//! - Degraded outcomes report `ok = false` with the local collection as payload.

use crate::app::FocusApp;
use crate::auth::{LoginRequest, RegisterRequest};
use crate::controller::{ControllerResult, DualSourceController, Notifier, Outcome};
use crate::model::book::BookDraft;
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::note::NoteDraft;
use crate::model::session::SessionDraft;
use crate::model::timer::FocusTimerDraft;
use crate::repo::{EntityRepository, Source};
use serde::Serialize;
use serde_json::Value;

/// One user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Register(RegisterRequest),
    Login(LoginRequest),
    Logout,
    /// Reports who is signed in and which source is active.
    Status,
    List(EntityKind),
    CreateSession(SessionDraft),
    UpdateSession { id: EntityId, draft: SessionDraft },
    StartSession(EntityId),
    CompleteSession { id: EntityId, duration: u32 },
    CreateNote(NoteDraft),
    UpdateNote { id: EntityId, draft: NoteDraft },
    CreateBook(BookDraft),
    UpdateBook { id: EntityId, draft: BookDraft },
    CreateTimer(FocusTimerDraft),
    UpdateTimer { id: EntityId, draft: FocusTimerDraft },
    Delete { kind: EntityKind, id: EntityId },
    TodayStats,
}

/// Result envelope returned to the View.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
    /// Id assigned by a create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Collection, stats or profile produced by the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            id: None,
            source: None,
            payload: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            ..Self::success(message)
        }
    }

    fn with_source(mut self, source: Option<Source>) -> Self {
        self.source = source;
        self
    }

    fn with_payload(mut self, payload: impl Serialize) -> Self {
        self.payload = serde_json::to_value(payload).ok();
        self
    }
}

/// Runs `action` against `app`, reporting notices through `notifier`.
pub fn dispatch(app: &mut FocusApp, action: Action, notifier: &dyn Notifier) -> ActionResponse {
    match action {
        Action::Register(request) => match app.register(&request) {
            Ok(user) => {
                ActionResponse::success(format!("Registered as {}.", user.username)).with_payload(user)
            }
            Err(err) => ActionResponse::failure(format!("register failed: {err}")),
        },
        Action::Login(request) => match app.login(&request) {
            Ok(user) => {
                ActionResponse::success(format!("Signed in as {}.", user.username)).with_payload(user)
            }
            Err(err) => ActionResponse::failure(format!("login failed: {err}")),
        },
        Action::Logout => match app.logout() {
            Ok(()) => ActionResponse::success("Signed out."),
            Err(err) => ActionResponse::failure(format!("logout failed: {err}")),
        },
        Action::Status => status(app),
        Action::List(kind) => list(app, kind, notifier),
        Action::CreateSession(draft) => created(&mut app.sessions(notifier), &draft),
        Action::UpdateSession { id, draft } => {
            applied(&mut app.sessions(notifier), "update", |c| c.update(&id, &draft))
        }
        Action::StartSession(id) => applied(&mut app.sessions(notifier), "start", |c| c.start(&id)),
        Action::CompleteSession { id, duration } => {
            applied(&mut app.sessions(notifier), "complete", |c| {
                c.complete(&id, duration)
            })
        }
        Action::CreateNote(draft) => created(&mut app.notes(notifier), &draft),
        Action::UpdateNote { id, draft } => {
            applied(&mut app.notes(notifier), "update", |c| c.update(&id, &draft))
        }
        Action::CreateBook(draft) => created(&mut app.books(notifier), &draft),
        Action::UpdateBook { id, draft } => {
            applied(&mut app.books(notifier), "update", |c| c.update(&id, &draft))
        }
        Action::CreateTimer(draft) => created(&mut app.timers(notifier), &draft),
        Action::UpdateTimer { id, draft } => {
            applied(&mut app.timers(notifier), "update", |c| c.update(&id, &draft))
        }
        Action::Delete { kind, id } => delete(app, kind, &id, notifier),
        Action::TodayStats => match app.stats(notifier).today() {
            Ok(report) => {
                let response = match &report.degraded {
                    None => ActionResponse::success("Today's stats loaded."),
                    Some(error) => ActionResponse::failure(format!(
                        "server unavailable, showing local data: {error}"
                    )),
                };
                response
                    .with_source(Some(report.source))
                    .with_payload(report.stats)
            }
            Err(err) => ActionResponse::failure(format!("stats failed: {err}")),
        },
    }
}

fn status(app: &FocusApp) -> ActionResponse {
    let context = app.context();
    let source = if context.is_logged_in() {
        Source::Remote
    } else {
        Source::Local
    };
    let message = match context.user().filter(|_| context.is_logged_in()) {
        Some(user) => format!("Signed in as {} ({}).", user.username, user.email),
        None => "Not signed in; using local data.".to_string(),
    };
    ActionResponse::success(message)
        .with_source(Some(source))
        .with_payload(context.user().filter(|_| context.is_logged_in()))
}

fn list(app: &FocusApp, kind: EntityKind, notifier: &dyn Notifier) -> ActionResponse {
    match kind {
        EntityKind::Session => listed(&mut app.sessions(notifier)),
        EntityKind::Note => listed(&mut app.notes(notifier)),
        EntityKind::Book => listed(&mut app.books(notifier)),
        EntityKind::FocusTimer => listed(&mut app.timers(notifier)),
    }
}

fn delete(app: &FocusApp, kind: EntityKind, id: &EntityId, notifier: &dyn Notifier) -> ActionResponse {
    match kind {
        EntityKind::Session => applied(&mut app.sessions(notifier), "delete", |c| c.delete(id)),
        EntityKind::Note => applied(&mut app.notes(notifier), "delete", |c| c.delete(id)),
        EntityKind::Book => applied(&mut app.books(notifier), "delete", |c| c.delete(id)),
        EntityKind::FocusTimer => applied(&mut app.timers(notifier), "delete", |c| c.delete(id)),
    }
}

fn listed<E, R>(controller: &mut DualSourceController<'_, E, R>) -> ActionResponse
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    match controller.load() {
        Ok(outcome) => outcome_response(
            &outcome,
            format!("{} {} loaded.", controller.items().len(), E::KIND),
        )
        .with_source(controller.source())
        .with_payload(controller.items()),
        Err(err) => ActionResponse::failure(format!("list {} failed: {err}", E::KIND)),
    }
}

fn created<E, R>(controller: &mut DualSourceController<'_, E, R>, draft: &E::Draft) -> ActionResponse
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    match controller.create(draft) {
        Ok(outcome) => {
            let response =
                outcome_response(&outcome, format!("{} created.", E::KIND.label()));
            ActionResponse {
                id: outcome.value().map(ToString::to_string),
                ..response
            }
            .with_source(controller.source())
            .with_payload(controller.items())
        }
        Err(err) => ActionResponse::failure(format!("create {} failed: {err}", E::KIND)),
    }
}

fn applied<'a, E, R>(
    controller: &mut DualSourceController<'a, E, R>,
    verb: &str,
    call: impl FnOnce(&mut DualSourceController<'a, E, R>) -> ControllerResult<Outcome<()>>,
) -> ActionResponse
where
    E: Entity,
    R: EntityRepository<E> + ?Sized,
{
    match call(controller) {
        Ok(outcome) => outcome_response(&outcome, format!("{verb} {} succeeded.", E::KIND))
            .with_source(controller.source())
            .with_payload(controller.items()),
        Err(err) => ActionResponse::failure(format!("{verb} {} failed: {err}", E::KIND)),
    }
}

// Unsynced writes were applied remotely, so they still count as ok.
fn outcome_response<T>(outcome: &Outcome<T>, applied_message: String) -> ActionResponse {
    match outcome {
        Outcome::Applied { .. } => ActionResponse::success(applied_message),
        Outcome::Unsynced { error, .. } => ActionResponse::success(format!(
            "{applied_message} Refresh failed, showing local data: {error}"
        )),
        Outcome::Degraded { error } => {
            ActionResponse::failure(format!("server unavailable, showing local data: {error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch, Action};
    use crate::app::FocusApp;
    use crate::auth::{AuthSession, SessionContext, UserProfile};
    use crate::config::AppConfig;
    use crate::controller::NoticeLog;
    use crate::model::entity::{EntityId, EntityKind};
    use crate::model::session::SessionDraft;
    use crate::remote::RemoteClient;
    use crate::repo::Source;
    use crate::store::LocalStore;
    use chrono::Utc;
    use std::time::Duration;

    fn local_app() -> FocusApp {
        FocusApp::from_parts(
            AppConfig::default(),
            LocalStore::open_in_memory().unwrap(),
            RemoteClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
            SessionContext::anonymous(),
        )
    }

    #[test]
    fn create_then_list_sessions_locally() {
        let mut app = local_app();
        let notices = NoticeLog::new();

        let created = dispatch(
            &mut app,
            Action::CreateSession(SessionDraft::planned("Math", "Algebra", 25)),
            &notices,
        );
        assert!(created.ok, "{}", created.message);
        assert_eq!(created.source, Some(Source::Local));
        let id = created.id.expect("create should report the new id");
        assert!(EntityId::parse(&id).unwrap().is_local());

        let listed = dispatch(&mut app, Action::List(EntityKind::Session), &notices);
        assert!(listed.ok);
        let payload = listed.payload.unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 1);
        assert_eq!(payload[0]["status"], "planned");
        assert_eq!(notices.notices()[0].message, "Session created.");
    }

    #[test]
    fn invalid_draft_is_reported_without_writing() {
        let mut app = local_app();
        let notices = NoticeLog::new();

        let response = dispatch(
            &mut app,
            Action::CreateSession(SessionDraft::planned("", "Algebra", 25)),
            &notices,
        );

        assert!(!response.ok);
        assert!(response.message.contains("title"));
        assert!(app.store().get_all("sessions").unwrap().is_empty());
    }

    #[test]
    fn deleting_missing_local_id_fails() {
        let mut app = local_app();
        let response = dispatch(
            &mut app,
            Action::Delete {
                kind: EntityKind::Note,
                id: EntityId::new_local(),
            },
            &NoticeLog::new(),
        );
        assert!(!response.ok);
        assert!(response.message.contains("not found"));
    }

    #[test]
    fn unreachable_server_stats_are_not_ok() {
        let context = SessionContext::authenticated(AuthSession::issued(
            "token-1".to_string(),
            UserProfile {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            Utc::now(),
            None,
        ));
        let mut app = FocusApp::from_parts(
            AppConfig::default(),
            LocalStore::open_in_memory().unwrap(),
            RemoteClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
            context,
        );

        let response = dispatch(&mut app, Action::TodayStats, &NoticeLog::new());

        assert!(!response.ok);
        assert!(response.message.contains("showing local data"));
        assert_eq!(response.source, Some(Source::Local));
        assert_eq!(response.payload.unwrap()["total_sessions"], 0);
    }

    #[test]
    fn local_stats_are_ok_when_anonymous() {
        let mut app = local_app();
        let response = dispatch(&mut app, Action::TodayStats, &NoticeLog::new());
        assert!(response.ok);
        assert_eq!(response.source, Some(Source::Local));
    }

    #[test]
    fn status_reports_local_source_when_anonymous() {
        let mut app = local_app();
        let response = dispatch(&mut app, Action::Status, &NoticeLog::new());
        assert!(response.ok);
        assert_eq!(response.source, Some(Source::Local));
        assert_eq!(response.payload, Some(serde_json::Value::Null));
    }
}
