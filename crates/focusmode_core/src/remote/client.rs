//! Blocking HTTP client for the FocusMode API.

use crate::auth::{AuthSession, LoginRequest, RegisterRequest, SessionContext, UserProfile};
use crate::logging::sanitize_message;
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::session::Session;
use crate::service::stats::TodayStats;
use chrono::Utc;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_LOGGED_MESSAGE_CHARS: usize = 200;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error payload returned by the API for non-2xx answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Remote call failure.
#[derive(Debug)]
pub enum RemoteError {
    InvalidBaseUrl(String),
    /// No valid token, or the server rejected it (401/403).
    AuthRequired(String),
    /// Connect, timeout or body transfer failure.
    Transport(reqwest::Error),
    /// Non-2xx answer other than 401/403.
    Status {
        status: u16,
        error: String,
        message: String,
    },
    Decode(serde_json::Error),
}

impl RemoteError {
    /// HTTP status carried by this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired(_))
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseUrl(url) => {
                write!(f, "invalid API base URL `{url}`: must start with http:// or https://")
            }
            Self::AuthRequired(reason) => write!(f, "authentication required: {reason}"),
            Self::Transport(err) => write!(f, "remote service unreachable: {err}"),
            Self::Status {
                status,
                error,
                message,
            } => {
                if message.is_empty() {
                    write!(f, "remote service answered {status} {error}")
                } else {
                    write!(f, "remote service answered {status} {error}: {message}")
                }
            }
            Self::Decode(err) => write!(f, "unexpected remote response: {err}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: EntityId,
}

#[derive(Debug, Deserialize)]
struct AuthBody {
    token: String,
    user: UserProfile,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CompleteBody {
    duration: u32,
}

/// Client for the remote FocusMode service.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

impl RemoteClient {
    /// Builds a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::InvalidBaseUrl(base_url));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an account and returns the issued session.
    pub fn register(&self, request: &RegisterRequest) -> RemoteResult<AuthSession> {
        let body: AuthBody = self.send_json(
            self.http.post(self.url("/auth/register")).json(request),
            "POST",
            "/auth/register",
        )?;
        Ok(to_auth_session(body))
    }

    /// Signs in and returns the issued session.
    pub fn login(&self, request: &LoginRequest) -> RemoteResult<AuthSession> {
        let body: AuthBody = self.send_json(
            self.http.post(self.url("/auth/login")).json(request),
            "POST",
            "/auth/login",
        )?;
        Ok(to_auth_session(body))
    }

    /// Lists every entity of `E` owned by the signed-in user.
    pub fn list<E: Entity>(&self, context: &SessionContext) -> RemoteResult<Vec<E>> {
        let path = E::KIND.remote_path();
        self.send_json(self.authed(context, Method::GET, path)?, "GET", path)
    }

    /// Creates one entity and returns the server-assigned id.
    pub fn create<E: Entity>(
        &self,
        context: &SessionContext,
        draft: &E::Draft,
    ) -> RemoteResult<EntityId> {
        let path = E::KIND.remote_path();
        let created: CreatedBody = self.send_json(
            self.authed(context, Method::POST, path)?.json(draft),
            "POST",
            path,
        )?;
        Ok(created.id)
    }

    /// Replaces one entity's submitted fields.
    pub fn update<E: Entity>(
        &self,
        context: &SessionContext,
        id: &EntityId,
        draft: &E::Draft,
    ) -> RemoteResult<()> {
        let path = item_path(E::KIND, id, None);
        self.send_empty(
            self.authed(context, Method::PUT, &path)?.json(draft),
            "PUT",
            &path,
        )
    }

    pub fn delete<E: Entity>(&self, context: &SessionContext, id: &EntityId) -> RemoteResult<()> {
        let path = item_path(E::KIND, id, None);
        self.send_empty(self.authed(context, Method::DELETE, &path)?, "DELETE", &path)
    }

    /// Moves a session to `inprogress`.
    pub fn start_session(&self, context: &SessionContext, id: &EntityId) -> RemoteResult<()> {
        let path = item_path(Session::KIND, id, Some("start"));
        self.send_empty(self.authed(context, Method::POST, &path)?, "POST", &path)
    }

    /// Moves a session to `completed` with the minutes actually studied.
    pub fn complete_session(
        &self,
        context: &SessionContext,
        id: &EntityId,
        duration: u32,
    ) -> RemoteResult<()> {
        let path = item_path(Session::KIND, id, Some("complete"));
        self.send_empty(
            self.authed(context, Method::POST, &path)?
                .json(&CompleteBody { duration }),
            "POST",
            &path,
        )
    }

    /// Fetches the signed-in user's figures for today.
    pub fn today_stats(&self, context: &SessionContext) -> RemoteResult<TodayStats> {
        let path = "/stats/today";
        self.send_json(self.authed(context, Method::GET, path)?, "GET", path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(
        &self,
        context: &SessionContext,
        method: Method,
        path: &str,
    ) -> RemoteResult<RequestBuilder> {
        let token = context
            .token()
            .ok_or_else(|| RemoteError::AuthRequired("not signed in".to_string()))?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> RemoteResult<T> {
        let response = self.send(request, method, path)?;
        let text = response.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn send_empty(&self, request: RequestBuilder, method: &str, path: &str) -> RemoteResult<()> {
        self.send(request, method, path)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder, method: &str, path: &str) -> RemoteResult<Response> {
        let started_at = Instant::now();
        let response = match request.send() {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "event=remote_call module=remote status=error method={method} path={path} duration_ms={} error_code=transport error={}",
                    started_at.elapsed().as_millis(),
                    sanitize_message(&err.to_string(), MAX_LOGGED_MESSAGE_CHARS)
                );
                return Err(err.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(
                "event=remote_call module=remote status=ok method={method} path={path} http_status={} duration_ms={}",
                status.as_u16(),
                started_at.elapsed().as_millis()
            );
            return Ok(response);
        }

        let body = response
            .text()
            .ok()
            .and_then(|text| serde_json::from_str::<ApiErrorBody>(&text).ok())
            .unwrap_or_default();
        warn!(
            "event=remote_call module=remote status=error method={method} path={path} http_status={} duration_ms={} error_code={} message={}",
            status.as_u16(),
            started_at.elapsed().as_millis(),
            if body.error.is_empty() { "unknown" } else { body.error.as_str() },
            sanitize_message(&body.message, MAX_LOGGED_MESSAGE_CHARS)
        );

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let reason = if body.message.is_empty() {
                format!("server answered {}", status.as_u16())
            } else {
                body.message
            };
            return Err(RemoteError::AuthRequired(reason));
        }

        Err(RemoteError::Status {
            status: status.as_u16(),
            error: body.error,
            message: body.message,
        })
    }
}

fn item_path(kind: EntityKind, id: &EntityId, action: Option<&str>) -> String {
    match action {
        Some(action) => format!("{}/{id}/{action}", kind.remote_path()),
        None => format!("{}/{id}", kind.remote_path()),
    }
}

fn to_auth_session(body: AuthBody) -> AuthSession {
    AuthSession::issued(body.token, body.user, Utc::now(), body.expires_in)
}

#[cfg(test)]
mod tests {
    use super::{item_path, RemoteClient, RemoteError};
    use crate::auth::SessionContext;
    use crate::model::entity::{EntityId, EntityKind};
    use crate::model::note::Note;
    use std::time::Duration;

    #[test]
    fn rejects_non_http_base_url() {
        let err = RemoteClient::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidBaseUrl(_)));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = RemoteClient::new("http://localhost:9/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9/api");
    }

    #[test]
    fn item_paths_include_id_and_action() {
        assert_eq!(
            item_path(EntityKind::Session, &EntityId::Remote(3), Some("start")),
            "/sessions/3/start"
        );
        assert_eq!(
            item_path(EntityKind::Book, &EntityId::Remote(9), None),
            "/books/9"
        );
    }

    #[test]
    fn anonymous_calls_fail_before_sending() {
        // Port 9 (discard) is never contacted: the token check fails first.
        let client = RemoteClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client
            .list::<Note>(&SessionContext::anonymous())
            .unwrap_err();
        assert!(err.is_auth_required());
    }
}
