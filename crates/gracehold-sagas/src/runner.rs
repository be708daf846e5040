// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compensation stack for saga steps.
//!
//! Each saga step with an external side effect registers its compensating
//! action before the saga proceeds. On failure at step N, compensations for
//! steps N-1..1 run in reverse order. Compensation is best-effort: failures
//! are logged and counted, never propagated, so a compensation failure can
//! never mask the original error.

use futures::future::BoxFuture;
use tracing::{debug, error};

use gracehold_core::GraceholdError;

type CompensationFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), GraceholdError>> + Send>;

/// Ordered stack of (label, compensating action) pairs.
#[derive(Default)]
pub struct CompensationStack {
    steps: Vec<(&'static str, CompensationFn)>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Register the compensation for a step that just succeeded.
    pub fn push<F, Fut>(&mut self, label: &'static str, compensation: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), GraceholdError>> + Send + 'static,
    {
        self.steps
            .push((label, Box::new(move || Box::pin(compensation()))));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run all registered compensations in reverse order.
    ///
    /// Returns the number of compensations that FAILED. Never returns an
    /// error and never panics past a single compensation.
    pub async fn unwind(mut self) -> usize {
        let mut failures = 0;
        while let Some((label, compensation)) = self.steps.pop() {
            match compensation().await {
                Ok(()) => debug!(step = label, "compensation applied"),
                Err(e) => {
                    failures += 1;
                    error!(step = label, error = %e, "compensation failed");
                }
            }
        }
        failures
    }

    /// Drop all registered compensations without running them (saga
    /// succeeded; the side effects stand).
    pub fn discard(mut self) {
        self.steps.clear();
    }
}
