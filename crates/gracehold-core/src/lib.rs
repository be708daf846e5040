// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gracehold modification-window orchestrator.
//!
//! This crate provides the domain types, error types, and collaborator
//! trait definitions used throughout the Gracehold workspace. The order,
//! inventory, pricing, payment, and notification systems are external;
//! all access goes through the traits defined here.

pub mod domain;
pub mod error;
pub mod traits;

// Re-export key items at crate root for ergonomic imports.
pub use domain::{
    AuthorizationRef, ItemOperation, JobState, LineItem, LineItemId,
    ModificationResult, OrderId, OrderRecord, OrderStatus, PaymentCollection,
    PaymentCollectionId, PaymentCollectionStatus, PaymentStatusTag,
    ProviderAuthStatus, VariantId,
};
pub use error::{GraceholdError, PaymentError};
pub use traits::{
    InventoryStore, NotificationSink, OrderStore, PaymentProvider, PricingCatalog,
};
