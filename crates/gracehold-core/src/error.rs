// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gracehold orchestrator.

use thiserror::Error;

use crate::domain::DeclineCode;

/// The primary infrastructure error type used across collaborator traits and
/// core operations.
///
/// Domain-level failures (bad token, insufficient stock, lost races) are
/// modeled separately by the saga layer; this enum covers the plumbing:
/// configuration, storage, external-provider transport, and internal bugs.
#[derive(Debug, Error)]
pub enum GraceholdError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Queue-store errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External collaborator errors (order store, inventory, payment transport).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error type for payment-provider operations.
///
/// Declines are business outcomes the sagas branch on (typed code plus a
/// retryable flag); everything else is transport-level and wraps
/// [`GraceholdError`].
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider declined the operation (e.g. an authorization increment).
    #[error("payment declined: {code}")]
    Declined { code: DeclineCode },

    /// Transport or provider-infrastructure failure.
    #[error(transparent)]
    Infra(#[from] GraceholdError),
}

impl PaymentError {
    /// Whether the failed operation is worth retrying with the same inputs.
    ///
    /// Only declines carry retry semantics; transport failures are retried
    /// by the caller's own backoff policy.
    pub fn retryable(&self) -> bool {
        match self {
            PaymentError::Declined { code } => code.retryable(),
            PaymentError::Infra(_) => false,
        }
    }
}
