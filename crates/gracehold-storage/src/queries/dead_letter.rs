// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter list operations.
//!
//! Append-only. One entry per exhausted capture job, written by the worker
//! when a job runs out of attempts and read by operator tooling.

use gracehold_core::GraceholdError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::DeadLetter;

/// Append a dead-letter entry.
pub async fn insert(
    db: &Database,
    order_id: &str,
    authorization_ref: &str,
    attempts: u32,
    last_error: &str,
) -> Result<i64, GraceholdError> {
    let order_id = order_id.to_string();
    let authorization_ref = authorization_ref.to_string();
    let last_error = last_error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO dead_letters (order_id, authorization_ref, attempts, last_error)
                 VALUES (?1, ?2, ?3, ?4)",
                params![order_id, authorization_ref, attempts, last_error],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// List dead letters, newest first.
pub async fn list(db: &Database, limit: i64) -> Result<Vec<DeadLetter>, GraceholdError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, order_id, authorization_ref, attempts, last_error, created_at
                 FROM dead_letters ORDER BY id DESC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![limit], |row| {
                    Ok(DeadLetter {
                        id: row.get(0)?,
                        order_id: row.get(1)?,
                        authorization_ref: row.get(2)?,
                        attempts: row.get(3)?,
                        last_error: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<DeadLetter>, rusqlite::Error>>()?;
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
