// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators and an end-to-end test harness for the Gracehold
//! workspace.
//!
//! The mocks are deterministic, in-memory stand-ins for the external
//! systems the orchestrator coordinates. Each supports scripted failures
//! (`fail_op`) so tests can force any saga step to break, and records its
//! calls so tests can assert exactly which external effects happened.

pub mod harness;
pub mod mock_inventory;
pub mod mock_notify;
pub mod mock_order;
pub mod mock_payment;
pub mod mock_pricing;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_inventory::MockInventoryStore;
pub use mock_notify::MockNotificationSink;
pub use mock_order::{MockOrderStore, OrderFixture};
pub use mock_payment::{MockPaymentProvider, PaymentCall};
pub use mock_pricing::MockPricingCatalog;
