//! Authentication state and credential requests.
//!
//! # Responsibility
//! - Hold the explicit session context handed to controllers.
//! - Validate registration/login input before it reaches the network.
//! - Persist the signed-in session across restarts through the local store.
//!
//! # Invariants
//! - `is_logged_in` is true only with a token that has not expired.
//! - Tokens and passwords never appear in `Debug` output or logs.

use crate::model::entity::ValidationError;
use crate::store::{LocalStore, StoreResult};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

const AUTH_SESSION_SETTING: &str = "auth_session";
const DEFAULT_SESSION_DAYS: i64 = 7;
const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 128;
const EMAIL_MAX_CHARS: usize = 254;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").expect("valid username regex"));

/// Signed-in user as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Bearer token plus the user it was issued for.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Builds a session issued at `issued_at`.
    ///
    /// `expires_in_secs` comes from the server when it reports one; otherwise
    /// the session is assumed valid for seven days. A lifetime that does not
    /// fit in a timestamp is treated as missing.
    pub fn issued(
        token: String,
        user: UserProfile,
        issued_at: DateTime<Utc>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let reported = expires_in_secs
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));
        if reported.is_none() && expires_in_secs.is_some_and(|secs| secs > 0) {
            warn!("event=auth_expiry module=auth status=degraded reason=lifetime_out_of_range");
        }
        let expires_at = reported.or_else(|| {
            Duration::try_days(DEFAULT_SESSION_DAYS)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        });
        Self {
            token,
            user,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl Debug for AuthSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Explicit authentication context passed to controllers and remote calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    auth: Option<AuthSession>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(auth: AuthSession) -> Self {
        Self { auth: Some(auth) }
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in_at(Utc::now())
    }

    pub fn is_logged_in_at(&self, now: DateTime<Utc>) -> bool {
        self.auth
            .as_ref()
            .is_some_and(|auth| !auth.token.is_empty() && !auth.is_expired_at(now))
    }

    /// Returns the bearer token while the session is valid.
    pub fn token(&self) -> Option<&str> {
        if !self.is_logged_in() {
            return None;
        }
        self.auth.as_ref().map(|auth| auth.token.as_str())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.auth.as_ref().map(|auth| &auth.user)
    }

    pub fn auth(&self) -> Option<&AuthSession> {
        self.auth.as_ref()
    }

    /// Restores the persisted session; expired or unreadable entries are dropped.
    pub fn restore(store: &LocalStore) -> StoreResult<Self> {
        let Some(raw) = store.load_setting(AUTH_SESSION_SETTING)? else {
            return Ok(Self::anonymous());
        };

        match serde_json::from_str::<AuthSession>(&raw) {
            Ok(auth) if !auth.is_expired_at(Utc::now()) => {
                info!(
                    "event=auth_restore module=auth status=ok user_id={}",
                    auth.user.id
                );
                Ok(Self::authenticated(auth))
            }
            Ok(auth) => {
                info!(
                    "event=auth_restore module=auth status=expired user_id={}",
                    auth.user.id
                );
                store.clear_setting(AUTH_SESSION_SETTING)?;
                Ok(Self::anonymous())
            }
            Err(err) => {
                warn!("event=auth_restore module=auth status=error error_code=unreadable_session error={err}");
                store.clear_setting(AUTH_SESSION_SETTING)?;
                Ok(Self::anonymous())
            }
        }
    }

    /// Writes the current session to the store, or clears it when anonymous.
    pub fn persist(&self, store: &LocalStore) -> StoreResult<()> {
        match self.auth.as_ref() {
            Some(auth) => store.save_setting(AUTH_SESSION_SETTING, &serde_json::to_string(auth)?),
            None => store.clear_setting(AUTH_SESSION_SETTING),
        }
    }
}

/// New account request.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !USERNAME_RE.is_match(&self.username) {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                details: "expected 3-32 letters, digits, `_`, `.` or `-`".to_string(),
            });
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

impl Debug for RegisterRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-in request.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::EmptyField("password"));
        }
        Ok(())
    }
}

impl Debug for LoginRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidFormat {
            field: "email",
            details: "expected an address like `name@example.com`".to_string(),
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < PASSWORD_MIN_CHARS {
        return Err(ValidationError::InvalidFormat {
            field: "password",
            details: format!("must be at least {PASSWORD_MIN_CHARS} characters"),
        });
    }
    if length > PASSWORD_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "password",
            max_chars: PASSWORD_MAX_CHARS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AuthSession, LoginRequest, RegisterRequest, SessionContext, UserProfile};
    use crate::store::LocalStore;
    use chrono::{Duration, Utc};

    fn user() -> UserProfile {
        UserProfile {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn anonymous_context_is_not_logged_in() {
        let context = SessionContext::anonymous();
        assert!(!context.is_logged_in());
        assert_eq!(context.token(), None);
    }

    #[test]
    fn expired_session_is_not_logged_in() {
        let issued_at = Utc::now() - Duration::days(30);
        let auth = AuthSession::issued("token".to_string(), user(), issued_at, None);
        let context = SessionContext::authenticated(auth);
        assert!(!context.is_logged_in());
        assert!(context.is_logged_in_at(issued_at + Duration::days(1)));
    }

    #[test]
    fn oversized_server_lifetime_falls_back_to_default() {
        let issued_at = Utc::now();
        for secs in [i64::MAX, i64::MAX / 1_000, 10_000_000_000_000] {
            let auth = AuthSession::issued("token".to_string(), user(), issued_at, Some(secs));
            assert_eq!(auth.expires_at, Some(issued_at + Duration::days(7)));
        }

        let auth = AuthSession::issued("token".to_string(), user(), issued_at, Some(3_600));
        assert_eq!(auth.expires_at, Some(issued_at + Duration::hours(1)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let auth = AuthSession::issued("secret-token".to_string(), user(), Utc::now(), Some(60));
        assert!(!format!("{auth:?}").contains("secret-token"));

        let login = LoginRequest::new("ada@example.com", "hunter22");
        assert!(!format!("{login:?}").contains("hunter22"));
    }

    #[test]
    fn register_validation_checks_each_field() {
        assert!(RegisterRequest::new("ada", "Ada@Example.com", "secret1")
            .validate()
            .is_ok());
        assert!(RegisterRequest::new("a", "ada@example.com", "secret1")
            .validate()
            .is_err());
        assert!(RegisterRequest::new("ada", "not-an-email", "secret1")
            .validate()
            .is_err());
        assert!(RegisterRequest::new("ada", "ada@example.com", "123")
            .validate()
            .is_err());
    }

    #[test]
    fn persisted_session_restores_and_clears() {
        let store = LocalStore::open_in_memory().unwrap();
        let auth = AuthSession::issued("token".to_string(), user(), Utc::now(), None);
        SessionContext::authenticated(auth.clone())
            .persist(&store)
            .unwrap();

        let restored = SessionContext::restore(&store).unwrap();
        assert!(restored.is_logged_in());
        assert_eq!(restored.auth(), Some(&auth));

        SessionContext::anonymous().persist(&store).unwrap();
        assert!(!SessionContext::restore(&store).unwrap().is_logged_in());
    }

    #[test]
    fn expired_persisted_session_is_dropped() {
        let store = LocalStore::open_in_memory().unwrap();
        let auth = AuthSession::issued(
            "token".to_string(),
            user(),
            Utc::now() - Duration::days(10),
            None,
        );
        SessionContext::authenticated(auth).persist(&store).unwrap();

        let restored = SessionContext::restore(&store).unwrap();
        assert!(!restored.is_logged_in());
        assert_eq!(store.load_setting("auth_session").unwrap(), None);
    }
}
