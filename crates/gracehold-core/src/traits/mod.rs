// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the orchestrator's external collaborators.
//!
//! The orchestrator never owns the order, inventory, pricing, or payment
//! systems; it coordinates them through these interfaces. Production
//! implementations live with the embedding commerce platform; the workspace
//! only ships test doubles.

pub mod inventory;
pub mod notify;
pub mod order;
pub mod payment;
pub mod pricing;

pub use inventory::InventoryStore;
pub use notify::NotificationSink;
pub use order::OrderStore;
pub use payment::PaymentProvider;
pub use pricing::PricingCatalog;
