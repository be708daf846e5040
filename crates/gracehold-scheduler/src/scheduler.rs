// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capture scheduler: one delayed job per order, upserted by
//! deterministic id.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use gracehold_config::CaptureConfig;
use gracehold_core::domain::{AuthorizationRef, JobState, OrderId};
use gracehold_core::GraceholdError;
use gracehold_storage::models::DeadLetter;
use gracehold_storage::queries::jobs::{self, RemoveOutcome, UpsertOutcome};
use gracehold_storage::queries::dead_letter;
use gracehold_storage::Database;

/// Scheduler failure modes the caller must distinguish.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job is mid-capture. The caller lost the race to the worker and
    /// must NOT treat the cancel as successful.
    #[error("capture job for order {0} is currently running")]
    JobActive(OrderId),

    /// Queue-store failure. The caller cannot know whether the job is
    /// stopped and must abort rather than proceed.
    #[error(transparent)]
    Storage(#[from] GraceholdError),
}

/// Schedules, replaces, and removes the one capture job per order.
#[derive(Clone)]
pub struct CaptureScheduler {
    db: Database,
    max_attempts: u32,
}

impl CaptureScheduler {
    pub fn new(db: Database, config: &CaptureConfig) -> Self {
        Self {
            db,
            max_attempts: config.max_attempts,
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Upsert the capture job for an order to run after `delay`.
    ///
    /// Re-scheduling an existing non-active job replaces its run time and
    /// resets its retry budget ("extend window", or "capture now" with a
    /// zero delay). Scheduling over an active job leaves it alone: the
    /// in-flight capture supersedes any new run time.
    pub async fn schedule(
        &self,
        order_id: &OrderId,
        authorization_ref: &AuthorizationRef,
        delay: Duration,
    ) -> Result<(), GraceholdError> {
        let run_at =
            Database::timestamp_after(chrono::Duration::milliseconds(delay.as_millis() as i64));
        let outcome = jobs::upsert_waiting(
            &self.db,
            &order_id.0,
            &authorization_ref.0,
            &run_at,
            self.max_attempts,
        )
        .await?;

        match outcome {
            UpsertOutcome::Created => {
                debug!(order_id = %order_id, run_at, "capture job scheduled");
            }
            UpsertOutcome::Replaced => {
                debug!(order_id = %order_id, run_at, "capture job re-scheduled");
            }
            UpsertOutcome::ActiveUntouched => {
                warn!(
                    order_id = %order_id,
                    "capture job already running; schedule request ignored"
                );
            }
        }
        Ok(())
    }

    /// Schedule an immediate capture (fulfillment-triggered path).
    pub async fn capture_now(
        &self,
        order_id: &OrderId,
        authorization_ref: &AuthorizationRef,
    ) -> Result<(), GraceholdError> {
        self.schedule(order_id, authorization_ref, Duration::ZERO)
            .await
    }

    /// Remove a not-yet-started job.
    ///
    /// Returns `Ok(true)` if a waiting job was removed, `Ok(false)` if no
    /// removable job exists. Fails with [`SchedulerError::JobActive`] when
    /// a capture is mid-flight -- deliberately loud, never a silent no-op.
    pub async fn cancel(&self, order_id: &OrderId) -> Result<bool, SchedulerError> {
        match jobs::remove_waiting(&self.db, &order_id.0).await? {
            RemoveOutcome::Removed => {
                debug!(order_id = %order_id, "capture job removed");
                Ok(true)
            }
            RemoveOutcome::NotFound => Ok(false),
            RemoveOutcome::Active => Err(SchedulerError::JobActive(order_id.clone())),
        }
    }

    /// Current state of the order's capture job, if one exists.
    pub async fn job_state(&self, order_id: &OrderId) -> Result<Option<JobState>, GraceholdError> {
        let job = jobs::get_job(&self.db, &order_id.0).await?;
        match job {
            Some(job) => {
                let state = JobState::from_str(&job.status).map_err(|_| {
                    GraceholdError::Internal(format!(
                        "unknown capture job status `{}` for order {}",
                        job.status, order_id
                    ))
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Push a dead-lettered job back to waiting with a fresh retry budget
    /// (operator intervention path). Returns false if the order has no
    /// failed job.
    pub async fn requeue_dead_letter(&self, order_id: &OrderId) -> Result<bool, GraceholdError> {
        let run_at = Database::now_timestamp();
        jobs::requeue_failed(&self.db, &order_id.0, &run_at).await
    }

    /// List dead letters, newest first.
    pub async fn dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, GraceholdError> {
        dead_letter::list(&self.db, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (CaptureScheduler, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let scheduler = CaptureScheduler::new(db, &CaptureConfig::default());
        (scheduler, dir)
    }

    fn order() -> (OrderId, AuthorizationRef) {
        (OrderId("ord_1".into()), AuthorizationRef("pi_1".into()))
    }

    #[tokio::test]
    async fn scheduling_twice_keeps_one_job_with_latest_run_time() {
        let (scheduler, _dir) = setup().await;
        let (oid, aref) = order();

        scheduler
            .schedule(&oid, &aref, Duration::from_secs(600))
            .await
            .unwrap();
        scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();

        let job = jobs::get_job(scheduler.database(), "ord_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, "waiting");
        // The zero-delay reschedule must have made the job due now.
        assert!(job.run_at <= Database::now_timestamp());
        assert_eq!(scheduler.job_state(&oid).await.unwrap(), Some(JobState::Waiting));
    }

    #[tokio::test]
    async fn cancel_removes_waiting_job() {
        let (scheduler, _dir) = setup().await;
        let (oid, aref) = order();

        scheduler
            .schedule(&oid, &aref, Duration::from_secs(600))
            .await
            .unwrap();
        assert!(scheduler.cancel(&oid).await.unwrap());
        assert_eq!(scheduler.job_state(&oid).await.unwrap(), None);

        // Nothing left to cancel.
        assert!(!scheduler.cancel(&oid).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_of_active_job_fails_loudly() {
        let (scheduler, _dir) = setup().await;
        let (oid, aref) = order();

        scheduler.schedule(&oid, &aref, Duration::ZERO).await.unwrap();
        let claimed = jobs::claim_due(
            scheduler.database(),
            &Database::now_timestamp(),
            &Database::timestamp_after(chrono::Duration::seconds(300)),
        )
        .await
        .unwrap();
        assert!(claimed.is_some());

        let err = scheduler.cancel(&oid).await.unwrap_err();
        assert!(matches!(err, SchedulerError::JobActive(_)));
        // The job is untouched.
        assert_eq!(
            scheduler.job_state(&oid).await.unwrap(),
            Some(JobState::Active)
        );
    }

    #[tokio::test]
    async fn requeue_dead_letter_only_applies_to_failed_jobs() {
        let (scheduler, _dir) = setup().await;
        let (oid, aref) = order();

        scheduler.schedule(&oid, &aref, Duration::ZERO).await.unwrap();
        assert!(!scheduler.requeue_dead_letter(&oid).await.unwrap());

        // Exhaust the job: claim and fail max_attempts times.
        for _ in 0..3 {
            jobs::claim_due(
                scheduler.database(),
                &Database::now_timestamp(),
                &Database::timestamp_after(chrono::Duration::seconds(300)),
            )
            .await
            .unwrap()
            .unwrap();
            jobs::fail(
                scheduler.database(),
                "ord_1",
                "boom",
                &Database::now_timestamp(),
            )
            .await
            .unwrap();
        }
        assert_eq!(
            scheduler.job_state(&oid).await.unwrap(),
            Some(JobState::Failed)
        );

        assert!(scheduler.requeue_dead_letter(&oid).await.unwrap());
        assert_eq!(
            scheduler.job_state(&oid).await.unwrap(),
            Some(JobState::Waiting)
        );
    }
}
