//! Application root: owns the store, the HTTP client and the auth context.
//!
//! # Responsibility
//! - Open the local store and restore the persisted sign-in.
//! - Hand out controllers that borrow the shared parts.
//! - Run sign-in, registration and sign-out.

use crate::auth::{AuthSession, LoginRequest, RegisterRequest, SessionContext, UserProfile};
use crate::config::{AppConfig, ConfigError};
use crate::controller::{
    BookController, NoteController, Notifier, SessionController, TimerController,
};
use crate::model::entity::ValidationError;
use crate::remote::{RemoteClient, RemoteError};
use crate::repo::{LocalRepository, RemoteRepository};
use crate::service::stats::{LocalStats, RemoteStats, StatsService};
use crate::store::{LocalStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Store(StoreError),
    Remote(RemoteError),
    Validation(ValidationError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Validation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RemoteError> for AppError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct FocusApp {
    config: AppConfig,
    store: LocalStore,
    client: RemoteClient,
    context: SessionContext,
}

impl FocusApp {
    /// Opens the store under `config.data_dir` and restores any saved sign-in.
    pub fn open(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let store = LocalStore::open(config.store_path())?;
        let client = RemoteClient::new(&config.api_base_url, config.request_timeout())?;
        let context = SessionContext::restore(&store)?;
        info!(
            "event=app_open module=app status=ok signed_in={} api_base_url={}",
            context.is_logged_in(),
            client.base_url()
        );
        Ok(Self::from_parts(config, store, client, context))
    }

    pub fn from_parts(
        config: AppConfig,
        store: LocalStore,
        client: RemoteClient,
        context: SessionContext,
    ) -> Self {
        Self {
            config,
            store,
            client,
            context,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn register(&mut self, request: &RegisterRequest) -> AppResult<UserProfile> {
        request.validate()?;
        let auth = self.client.register(request)?;
        self.sign_in("register", auth)
    }

    pub fn login(&mut self, request: &LoginRequest) -> AppResult<UserProfile> {
        request.validate()?;
        let auth = self.client.login(request)?;
        self.sign_in("login", auth)
    }

    /// Drops the in-memory and persisted session.
    pub fn logout(&mut self) -> AppResult<()> {
        let user_id = self.context.user().map(|user| user.id);
        self.context = SessionContext::anonymous();
        self.context.persist(&self.store)?;
        info!(
            "event=auth_logout module=app status=ok user_id={}",
            user_id.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    fn sign_in(&mut self, operation: &str, auth: AuthSession) -> AppResult<UserProfile> {
        let user = auth.user.clone();
        let context = SessionContext::authenticated(auth);
        context.persist(&self.store)?;
        self.context = context;
        info!(
            "event=auth_{operation} module=app status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    pub fn sessions<'a>(&'a self, notifier: &'a dyn Notifier) -> SessionController<'a> {
        SessionController::new(
            &self.context,
            notifier,
            Box::new(RemoteRepository::new(&self.client, &self.context)),
            Box::new(LocalRepository::new(&self.store)),
        )
    }

    pub fn notes<'a>(&'a self, notifier: &'a dyn Notifier) -> NoteController<'a> {
        NoteController::new(
            &self.context,
            notifier,
            Box::new(RemoteRepository::new(&self.client, &self.context)),
            Box::new(LocalRepository::new(&self.store)),
        )
    }

    pub fn books<'a>(&'a self, notifier: &'a dyn Notifier) -> BookController<'a> {
        BookController::new(
            &self.context,
            notifier,
            Box::new(RemoteRepository::new(&self.client, &self.context)),
            Box::new(LocalRepository::new(&self.store)),
        )
    }

    pub fn timers<'a>(&'a self, notifier: &'a dyn Notifier) -> TimerController<'a> {
        TimerController::new(
            &self.context,
            notifier,
            Box::new(RemoteRepository::new(&self.client, &self.context)),
            Box::new(LocalRepository::new(&self.store)),
        )
    }

    pub fn stats<'a>(&'a self, notifier: &'a dyn Notifier) -> StatsService<'a> {
        StatsService::new(
            &self.context,
            notifier,
            Box::new(RemoteStats::new(&self.client, &self.context)),
            Box::new(LocalStats::new(&self.store)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, FocusApp};
    use crate::auth::{AuthSession, LoginRequest, SessionContext, UserProfile};
    use crate::config::AppConfig;
    use crate::controller::NoticeLog;
    use crate::model::session::SessionDraft;
    use crate::remote::RemoteClient;
    use crate::repo::Source;
    use crate::store::LocalStore;
    use chrono::Utc;
    use std::time::Duration;

    fn offline_app(context: SessionContext) -> FocusApp {
        let store = LocalStore::open_in_memory().unwrap();
        let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        FocusApp::from_parts(AppConfig::default(), store, client, context)
    }

    #[test]
    fn anonymous_app_routes_controllers_to_local_store() {
        let app = offline_app(SessionContext::anonymous());
        let notices = NoticeLog::new();
        let mut sessions = app.sessions(&notices);

        assert_eq!(sessions.resolve_source(), Source::Local);
        sessions
            .create(&SessionDraft::planned("Math", "Algebra", 25))
            .unwrap();
        assert_eq!(sessions.items().len(), 1);
        assert_eq!(sessions.source(), Some(Source::Local));
    }

    #[test]
    fn login_rejects_invalid_input_before_any_request() {
        let mut app = offline_app(SessionContext::anonymous());
        let err = app
            .login(&LoginRequest::new("not-an-email", "secret123"))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!app.context().is_logged_in());
    }

    #[test]
    fn logout_clears_persisted_session() {
        let auth = AuthSession::issued(
            "token-1".to_string(),
            UserProfile {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            Utc::now(),
            None,
        );
        let context = SessionContext::authenticated(auth);
        let mut app = offline_app(context.clone());
        context.persist(app.store()).unwrap();

        app.logout().unwrap();

        assert!(!app.context().is_logged_in());
        assert!(!SessionContext::restore(app.store()).unwrap().is_logged_in());
    }
}
