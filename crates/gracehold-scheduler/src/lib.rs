// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed-capture scheduling for the Gracehold orchestrator.
//!
//! The [`CaptureScheduler`] owns the durable one-job-per-order queue; the
//! [`CaptureWorker`] consumes it on a timer, re-validating order and payment
//! state before every capture attempt. Together they enforce "this order is
//! eventually captured" without depending on any client calling back.

pub mod backoff;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

pub use backoff::BackoffPolicy;
pub use scheduler::{CaptureScheduler, SchedulerError};
pub use shutdown::install_signal_handler;
pub use worker::CaptureWorker;
