//! Today's study statistics.
//!
//! # Responsibility
//! - Serve today's figures from the remote API when signed in.
//! - Compute the same figures from the local store otherwise.
//!
//! # Invariants
//! - "Today" is the caller's local calendar day.
//! - Remote failures degrade to the local figures with an error notice.

use crate::auth::SessionContext;
use crate::controller::{ControllerError, ControllerResult, Notice, Notifier};
use crate::logging::sanitize_message;
use crate::model::entity::EntityKind;
use crate::model::note::Note;
use crate::model::session::{Session, SessionStatus};
use crate::remote::RemoteClient;
use crate::repo::{EntityRepository, LocalRepository, Source, SourceError, SourceResult};
use crate::store::LocalStore;
use chrono::{Local, NaiveDate, TimeZone};
use log::{info, warn};
use serde::{Deserialize, Serialize};

const MAX_LOGGED_ERROR_CHARS: usize = 200;

/// Aggregated figures for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodayStats {
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub in_progress_sessions: u32,
    /// Sum of planned minutes over today's sessions.
    pub planned_minutes: u32,
    /// Minutes studied in today's completed sessions.
    pub focus_minutes: u32,
    pub notes_created: u32,
}

/// Computes figures for `day` in the time zone `tz`.
pub fn compute_today_stats<Tz: TimeZone>(
    sessions: &[Session],
    notes: &[Note],
    day: NaiveDate,
    tz: &Tz,
) -> TodayStats {
    let mut stats = TodayStats::default();
    for session in sessions
        .iter()
        .filter(|session| session.created_at.with_timezone(tz).date_naive() == day)
    {
        stats.total_sessions += 1;
        stats.planned_minutes += session.duration;
        match session.status {
            SessionStatus::Completed => {
                stats.completed_sessions += 1;
                stats.focus_minutes += session.focus_minutes();
            }
            SessionStatus::InProgress => stats.in_progress_sessions += 1,
            SessionStatus::Planned => {}
        }
    }
    stats.notes_created = notes
        .iter()
        .filter(|note| note.created_at.with_timezone(tz).date_naive() == day)
        .count() as u32;
    stats
}

/// One place today's figures can come from.
pub trait StatsSource {
    fn today_stats(&self) -> SourceResult<TodayStats>;
}

/// Figures reported by the remote API.
pub struct RemoteStats<'c> {
    client: &'c RemoteClient,
    context: &'c SessionContext,
}

impl<'c> RemoteStats<'c> {
    pub fn new(client: &'c RemoteClient, context: &'c SessionContext) -> Self {
        Self { client, context }
    }
}

impl StatsSource for RemoteStats<'_> {
    fn today_stats(&self) -> SourceResult<TodayStats> {
        Ok(self.client.today_stats(self.context)?)
    }
}

/// Figures computed from the local store for the current local day.
pub struct LocalStats<'s> {
    store: &'s LocalStore,
}

impl<'s> LocalStats<'s> {
    pub fn new(store: &'s LocalStore) -> Self {
        Self { store }
    }
}

impl StatsSource for LocalStats<'_> {
    fn today_stats(&self) -> SourceResult<TodayStats> {
        let sessions = LocalRepository::<Session>::new(self.store).list()?;
        let notes = LocalRepository::<Note>::new(self.store).list()?;
        Ok(compute_today_stats(
            &sessions,
            &notes,
            Local::now().date_naive(),
            &Local,
        ))
    }
}

/// Today's figures with the source that produced them.
#[derive(Debug)]
pub struct StatsReport {
    pub source: Source,
    pub stats: TodayStats,
    /// Remote failure that forced the local figures.
    pub degraded: Option<SourceError>,
}

impl StatsReport {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Picks a stats source the same way entity controllers pick theirs.
pub struct StatsService<'a> {
    context: &'a SessionContext,
    notifier: &'a dyn Notifier,
    remote: Box<dyn StatsSource + 'a>,
    local: Box<dyn StatsSource + 'a>,
}

impl<'a> StatsService<'a> {
    pub fn new(
        context: &'a SessionContext,
        notifier: &'a dyn Notifier,
        remote: Box<dyn StatsSource + 'a>,
        local: Box<dyn StatsSource + 'a>,
    ) -> Self {
        Self {
            context,
            notifier,
            remote,
            local,
        }
    }

    /// Returns today's figures; remote failures are reported in the report.
    pub fn today(&self) -> ControllerResult<StatsReport> {
        let mut degraded = None;
        if self.context.is_logged_in() {
            match self.remote.today_stats() {
                Ok(stats) => {
                    info!("event=stats_today module=stats status=ok source=remote");
                    return Ok(StatsReport {
                        source: Source::Remote,
                        stats,
                        degraded: None,
                    });
                }
                Err(err) => {
                    warn!(
                        "event=stats_today module=stats status=degraded source=remote error_code={} error={}",
                        err.failure_kind().as_str(),
                        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                    );
                    self.notifier.notify(&Notice::error(
                        "Could not load today's stats from the server; showing local data.",
                    ));
                    degraded = Some(err);
                }
            }
        }

        let stats = self.local.today_stats().map_err(|err| {
            warn!(
                "event=stats_today module=stats status=error source=local error_code={} error={}",
                err.failure_kind().as_str(),
                sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
            );
            self.notifier
                .notify(&Notice::error("Could not compute today's stats: local storage failed."));
            ControllerError::from_source(EntityKind::Session, err)
        })?;
        info!("event=stats_today module=stats status=ok source=local");
        Ok(StatsReport {
            source: Source::Local,
            stats,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_today_stats, StatsService, StatsSource, TodayStats};
    use crate::auth::{AuthSession, SessionContext, UserProfile};
    use crate::controller::{NoticeKind, NoticeLog};
    use crate::model::entity::EntityId;
    use crate::remote::RemoteError;
    use crate::repo::{Source, SourceError, SourceResult};
    use crate::model::note::Note;
    use crate::model::session::{Session, SessionStatus};
    use chrono::{TimeZone, Utc};

    fn session(day: u32, duration: u32, status: SessionStatus, actual: Option<u32>) -> Session {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
        Session {
            id: EntityId::new_local(),
            title: "Math".to_string(),
            subject: "Algebra".to_string(),
            duration,
            status,
            notes: None,
            actual_duration: actual,
            started_at: None,
            completed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    struct Fixed(Option<TodayStats>);

    impl StatsSource for Fixed {
        fn today_stats(&self) -> SourceResult<TodayStats> {
            self.0.clone().ok_or_else(|| {
                SourceError::Remote(RemoteError::Status {
                    status: 503,
                    error: "unavailable".to_string(),
                    message: "maintenance".to_string(),
                })
            })
        }
    }

    fn signed_in() -> SessionContext {
        SessionContext::authenticated(AuthSession::issued(
            "token".to_string(),
            UserProfile {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            Utc::now(),
            None,
        ))
    }

    fn local_figures() -> TodayStats {
        TodayStats {
            total_sessions: 2,
            ..TodayStats::default()
        }
    }

    #[test]
    fn remote_failure_reports_local_figures_as_degraded() {
        let context = signed_in();
        let notices = NoticeLog::new();
        let service = StatsService::new(
            &context,
            &notices,
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(local_figures()))),
        );

        let report = service.today().unwrap();

        assert!(report.is_degraded());
        assert_eq!(report.source, Source::Local);
        assert_eq!(report.stats, local_figures());
        assert_eq!(notices.last().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn anonymous_local_figures_are_not_degraded() {
        let context = SessionContext::anonymous();
        let notices = NoticeLog::new();
        let service = StatsService::new(
            &context,
            &notices,
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(local_figures()))),
        );

        let report = service.today().unwrap();

        assert!(!report.is_degraded());
        assert_eq!(report.source, Source::Local);
        assert!(notices.notices().is_empty());
    }

    fn note(day: u32) -> Note {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 18, 30, 0).unwrap();
        Note {
            id: EntityId::new_local(),
            title: "Recap".to_string(),
            content: "Quadratics".to_string(),
            category: "general".to_string(),
            session_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn counts_only_sessions_and_notes_from_the_day() {
        let sessions = vec![
            session(4, 25, SessionStatus::Completed, Some(30)),
            session(4, 50, SessionStatus::Completed, None),
            session(4, 45, SessionStatus::InProgress, None),
            session(4, 20, SessionStatus::Planned, None),
            session(3, 90, SessionStatus::Completed, Some(90)),
        ];
        let notes = vec![note(4), note(3)];
        let day = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap().date_naive();

        let stats = compute_today_stats(&sessions, &notes, day, &Utc);

        assert_eq!(
            stats,
            TodayStats {
                total_sessions: 4,
                completed_sessions: 2,
                in_progress_sessions: 1,
                planned_minutes: 140,
                focus_minutes: 80,
                notes_created: 1,
            }
        );
    }

    #[test]
    fn missing_remote_fields_default_to_zero() {
        let stats: TodayStats =
            serde_json::from_value(serde_json::json!({ "total_sessions": 3 })).unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.focus_minutes, 0);
    }
}
