// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compensating modification sagas for the Gracehold orchestrator.
//!
//! Each saga coordinates three independently-failing systems -- the
//! order's line items, the held payment authorization, and the delayed
//! capture job -- so the customer is never charged more than they are
//! shown, never charged for a canceled order, and never left with an
//! order whose payment silently goes uncaptured.

pub mod cancel;
pub mod error;
pub mod modify;
pub mod preconditions;
pub mod runner;
pub mod service;

pub use error::{ModificationError, StockShortage};
pub use runner::CompensationStack;
pub use service::{
    AddItemRequest, BatchModifyRequest, ModificationService, ServiceDeps,
    TokenValidationResult, UpdateQuantityRequest,
};
