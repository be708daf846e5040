// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use gracehold_core::GraceholdError;

/// Convert a tokio-rusqlite error into GraceholdError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GraceholdError {
    GraceholdError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the queue database. The single writer for the whole process.
///
/// Query modules accept `&Database` and call through `connection().call()`.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, GraceholdError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| GraceholdError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| GraceholdError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(crate::migrations::run_pending)
            .await
            .map_err(|e| GraceholdError::Storage {
                source: Box::new(e),
            })?;

        tracing::debug!(path, "queue database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL. The background thread stops when the last clone
    /// of this handle is dropped.
    pub async fn close(&self) -> Result<(), GraceholdError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        tracing::debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Current UTC timestamp in the stored string format.
    ///
    /// Matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` so stored
    /// timestamps compare lexicographically regardless of which side
    /// generated them.
    pub fn now_timestamp() -> String {
        chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    /// UTC timestamp `delta` from now, in the stored string format.
    pub fn timestamp_after(delta: chrono::Duration) -> String {
        (chrono::Utc::now() + delta)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }
}
