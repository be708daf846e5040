// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capture-job queue operations.
//!
//! One row per order, keyed by the deterministic job id `capture:{order_id}`,
//! so re-scheduling is an upsert rather than an insert. Claiming is done in
//! a transaction, marking the row `active` with a lock timeout so a crashed
//! worker's claim eventually becomes stale and reclaimable.

use gracehold_core::GraceholdError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::CaptureJob;

/// Deterministic job id for an order.
pub fn job_id_for(order_id: &str) -> String {
    format!("capture:{order_id}")
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No job existed; a new one was created.
    Created,
    /// An existing non-active job had its run time (and retry budget) reset.
    Replaced,
    /// The job is mid-capture; the row was left untouched.
    ActiveUntouched,
}

/// Outcome of a removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// A waiting job was deleted.
    Removed,
    /// The job is mid-capture and cannot be removed.
    Active,
    /// No removable job exists (missing, completed, or failed).
    NotFound,
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// The job went back to waiting with a new run time.
    Retrying { attempts: u32 },
    /// The retry budget is exhausted; the job is now failed.
    Exhausted { attempts: u32 },
}

const SELECT_COLUMNS: &str = "job_id, order_id, authorization_ref, status, run_at,
     attempts, max_attempts, last_error, created_at, updated_at";

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<CaptureJob, rusqlite::Error> {
    Ok(CaptureJob {
        job_id: row.get(0)?,
        order_id: row.get(1)?,
        authorization_ref: row.get(2)?,
        status: row.get(3)?,
        run_at: row.get(4)?,
        attempts: row.get(5)?,
        max_attempts: row.get(6)?,
        last_error: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Upsert the capture job for an order.
///
/// Creates the job if absent; otherwise replaces the run time and resets
/// the retry budget unless a capture attempt is currently in flight.
pub async fn upsert_waiting(
    db: &Database,
    order_id: &str,
    authorization_ref: &str,
    run_at: &str,
    max_attempts: u32,
) -> Result<UpsertOutcome, GraceholdError> {
    let order_id = order_id.to_string();
    let authorization_ref = authorization_ref.to_string();
    let run_at = run_at.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = {
                let result = tx.query_row(
                    "SELECT status FROM capture_jobs WHERE order_id = ?1",
                    params![order_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(status) => Some(status),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };

            let outcome = match existing.as_deref() {
                None => {
                    tx.execute(
                        "INSERT INTO capture_jobs
                             (job_id, order_id, authorization_ref, status, run_at, max_attempts)
                         VALUES (?1, ?2, ?3, 'waiting', ?4, ?5)",
                        params![
                            job_id_for(&order_id),
                            order_id,
                            authorization_ref,
                            run_at,
                            max_attempts,
                        ],
                    )?;
                    UpsertOutcome::Created
                }
                Some("active") => UpsertOutcome::ActiveUntouched,
                Some(_) => {
                    tx.execute(
                        "UPDATE capture_jobs
                         SET status = 'waiting', run_at = ?1, authorization_ref = ?2,
                             attempts = 0, max_attempts = ?3, last_error = NULL,
                             locked_until = NULL,
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE order_id = ?4",
                        params![run_at, authorization_ref, max_attempts, order_id],
                    )?;
                    UpsertOutcome::Replaced
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the capture job for an order, if any.
pub async fn get_job(db: &Database, order_id: &str) -> Result<Option<CaptureJob>, GraceholdError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM capture_jobs WHERE order_id = ?1"
            ))?;
            let result = stmt.query_row(params![order_id], row_to_job);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a waiting job. Fails distinctly when the job is mid-capture so
/// the caller can treat the race as lost rather than as success.
pub async fn remove_waiting(
    db: &Database,
    order_id: &str,
) -> Result<RemoveOutcome, GraceholdError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let status: Option<String> = {
                let result = tx.query_row(
                    "SELECT status FROM capture_jobs WHERE order_id = ?1",
                    params![order_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(status) => Some(status),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };

            let outcome = match status.as_deref() {
                Some("waiting") => {
                    tx.execute(
                        "DELETE FROM capture_jobs WHERE order_id = ?1",
                        params![order_id],
                    )?;
                    RemoveOutcome::Removed
                }
                Some("active") => RemoveOutcome::Active,
                _ => RemoveOutcome::NotFound,
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim the next due job, marking it `active` until
/// `locked_until`. Also reclaims active jobs whose lock has gone stale
/// (crashed worker). Returns `None` when nothing is due.
pub async fn claim_due(
    db: &Database,
    now: &str,
    locked_until: &str,
) -> Result<Option<CaptureJob>, GraceholdError> {
    let now = now.to_string();
    let locked_until = locked_until.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM capture_jobs
                     WHERE (status = 'waiting' AND run_at <= ?1)
                        OR (status = 'active' AND locked_until IS NOT NULL AND locked_until < ?1)
                     ORDER BY run_at ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![now], row_to_job)
            };

            match result {
                Ok(job) => {
                    tx.execute(
                        "UPDATE capture_jobs
                         SET status = 'active', locked_until = ?1,
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE job_id = ?2",
                        params![locked_until, job.job_id],
                    )?;
                    tx.commit()?;
                    Ok(Some(CaptureJob {
                        status: "active".to_string(),
                        ..job
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job completed and clear its lock.
pub async fn complete(db: &Database, order_id: &str) -> Result<(), GraceholdError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE capture_jobs
                 SET status = 'completed', locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE order_id = ?1",
                params![order_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// Increments attempts. At the retry cap the job becomes `failed`;
/// otherwise it goes back to `waiting` with `next_run_at` (backoff).
pub async fn fail(
    db: &Database,
    order_id: &str,
    error: &str,
    next_run_at: &str,
) -> Result<FailOutcome, GraceholdError> {
    let order_id = order_id.to_string();
    let error = error.to_string();
    let next_run_at = next_run_at.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let (attempts, max_attempts): (u32, u32) = tx.query_row(
                "SELECT attempts, max_attempts FROM capture_jobs WHERE order_id = ?1",
                params![order_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let outcome = if new_attempts >= max_attempts {
                tx.execute(
                    "UPDATE capture_jobs
                     SET status = 'failed', attempts = ?1, last_error = ?2,
                         locked_until = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE order_id = ?3",
                    params![new_attempts, error, order_id],
                )?;
                FailOutcome::Exhausted {
                    attempts: new_attempts,
                }
            } else {
                tx.execute(
                    "UPDATE capture_jobs
                     SET status = 'waiting', attempts = ?1, last_error = ?2,
                         run_at = ?3, locked_until = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE order_id = ?4",
                    params![new_attempts, error, next_run_at, order_id],
                )?;
                FailOutcome::Retrying {
                    attempts: new_attempts,
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Push a failed job back to waiting with a fresh retry budget.
///
/// Operator path for dead-lettered jobs. Returns false if no failed job
/// exists for the order.
pub async fn requeue_failed(
    db: &Database,
    order_id: &str,
    run_at: &str,
) -> Result<bool, GraceholdError> {
    let order_id = order_id.to_string();
    let run_at = run_at.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE capture_jobs
                 SET status = 'waiting', attempts = 0, last_error = NULL,
                     run_at = ?1, locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE order_id = ?2 AND status = 'failed'",
                params![run_at, order_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
