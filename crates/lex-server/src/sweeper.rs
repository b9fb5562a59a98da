//! Abandoned-test sweeper.
//!
//! Starting a test stores `test-session:<submission id>` with a TTL of the
//! test duration plus a grace period; submitting deletes it. Entries that
//! expire are attempts nobody finished. The sweeper marks them abandoned,
//! mails the student once, and drops the entry.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use lex_core::entities::{Submission, Test};
use lex_db::error::DatabaseError;
use lex_db::service::LexService;

use crate::mailer::Mailer;
use crate::state::SharedState;

pub const SESSION_PREFIX: &str = "test-session:";
const NOTIFIED_PREFIX: &str = "abandoned-notified:";

/// How long the once-only notification marker is kept.
const NOTIFIED_TTL_DAYS: i64 = 30;

/// What a live test session remembers for the sweeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSession {
    pub submission_id: String,
    pub test_id: String,
    pub test_title: String,
    pub student_id: String,
    pub student_email: String,
}

#[must_use]
pub fn session_key(submission_id: &str) -> String {
    format!("{SESSION_PREFIX}{submission_id}")
}

fn notified_key(submission_id: &str) -> String {
    format!("{NOTIFIED_PREFIX}{submission_id}")
}

/// Make sure an attempt in progress is tracked. Returns its deadline.
///
/// The deadline counts from the attempt's start, so calling this again on a
/// resumed attempt restores a missing entry without extending the time.
/// An existing entry is left as it is.
///
/// # Errors
///
/// Returns `DatabaseError` if the entry cannot be written.
pub async fn track_session(
    svc: &LexService,
    submission: &Submission,
    test: &Test,
    student_email: &str,
    grace_secs: i64,
) -> Result<DateTime<Utc>, DatabaseError> {
    let ttl = Duration::minutes(test.duration_minutes) + Duration::seconds(grace_secs);
    let session = TestSession {
        submission_id: submission.id.clone(),
        test_id: test.id.clone(),
        test_title: test.title.clone(),
        student_id: submission.student_id.clone(),
        student_email: student_email.to_string(),
    };
    let deadline = submission.started_at + ttl;
    let stored = svc
        .kv_set_if_absent(
            &session_key(&submission.id),
            &session,
            Some(deadline - Utc::now()),
        )
        .await?;
    if stored {
        tracing::debug!(submission_id = %submission.id, %deadline, "test session tracked");
    }
    Ok(deadline)
}

/// Forget an attempt that was submitted in time.
///
/// # Errors
///
/// Returns `DatabaseError` if the delete fails.
pub async fn untrack_session(svc: &LexService, submission_id: &str) -> Result<(), DatabaseError> {
    svc.kv_delete(&session_key(submission_id)).await?;
    Ok(())
}

/// One pass over expired sessions. Returns how many attempts were abandoned.
///
/// # Errors
///
/// Returns `DatabaseError` when listing sessions fails. Failures on single
/// entries are logged and the entry is retried next pass.
pub async fn sweep_once(
    svc: &LexService,
    mailer: &dyn Mailer,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let expired = svc.kv_expired_with_prefix(SESSION_PREFIX, now).await?;
    let mut abandoned = 0;

    for entry in expired {
        let session: TestSession = match serde_json::from_value(entry.value) {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(key = %entry.key, %error, "dropping unreadable test session");
                svc.kv_delete(&entry.key).await?;
                continue;
            }
        };

        match abandon_and_notify(svc, mailer, &session).await {
            Ok(changed) => {
                if changed {
                    abandoned += 1;
                }
                svc.kv_delete(&entry.key).await?;
            }
            Err(error) => {
                tracing::warn!(submission_id = %session.submission_id, %error, "sweep of test session failed");
            }
        }
    }

    let purged = svc.kv_purge_expired(now, SESSION_PREFIX).await?;
    if abandoned > 0 || purged > 0 {
        tracing::info!(abandoned, purged, "sweep finished");
    }
    Ok(abandoned)
}

async fn abandon_and_notify(
    svc: &LexService,
    mailer: &dyn Mailer,
    session: &TestSession,
) -> Result<bool, DatabaseError> {
    if !svc.abandon_submission(&session.submission_id).await? {
        return Ok(false);
    }
    let first = svc
        .kv_set_if_absent(
            &notified_key(&session.submission_id),
            &true,
            Some(Duration::days(NOTIFIED_TTL_DAYS)),
        )
        .await?;
    if first {
        let body = format!(
            "Your attempt at \"{}\" ran past its time limit and was closed without a score. \
             You can start the test again at any time.",
            session.test_title
        );
        if let Err(error) = mailer
            .send(&session.student_email, "Test attempt closed", &body)
            .await
        {
            tracing::warn!(to = %session.student_email, %error, "abandoned-test mail failed");
        }
    }
    Ok(true)
}

/// Run [`sweep_once`] every `interval` until `shutdown` flips to true.
pub async fn run(state: SharedState, interval: StdDuration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval_secs = interval.as_secs(), "sweeper started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = sweep_once(&state.svc, state.mailer.as_ref(), Utc::now()).await {
                    tracing::error!(%error, "sweep failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::info!("sweeper stopped");
}
