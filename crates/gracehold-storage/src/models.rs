// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the queue store.
//!
//! Timestamps are RFC 3339 UTC strings with millisecond precision, stored
//! and compared as text.

/// A scheduled capture job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureJob {
    /// Deterministic id, `capture:{order_id}`.
    pub job_id: String,
    pub order_id: String,
    pub authorization_ref: String,
    /// One of `waiting`, `active`, `completed`, `failed`.
    pub status: String,
    /// When the job becomes due. A future `run_at` makes the job delayed.
    pub run_at: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An exhausted capture job awaiting manual handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub id: i64,
    pub order_id: String,
    pub authorization_ref: String,
    pub attempts: u32,
    pub last_error: String,
    pub created_at: String,
}
