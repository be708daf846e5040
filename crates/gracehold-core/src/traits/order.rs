// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order store collaborator trait.

use async_trait::async_trait;

use crate::domain::{ItemOperation, OrderId, OrderRecord, PaymentCollectionId};
use crate::error::GraceholdError;

/// Read and mutate orders held by the commerce platform.
///
/// Every mutation is an order-edit that the platform confirms immediately;
/// there is no separate customer-approval step for modification-window
/// changes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load an order with its items, payment collections, metadata, and
    /// fulfillments. Returns `None` if the order does not exist.
    async fn load(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, GraceholdError>;

    /// Apply a batch of item operations as one confirmed order edit,
    /// all-or-nothing.
    async fn apply_item_ops(
        &self,
        order_id: &OrderId,
        ops: &[ItemOperation],
    ) -> Result<(), GraceholdError>;

    /// Cancel the order.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), GraceholdError>;

    /// Set or clear the `locked_for_capture` metadata flag.
    async fn set_locked_for_capture(
        &self,
        order_id: &OrderId,
        locked: bool,
    ) -> Result<(), GraceholdError>;

    /// Update the recorded amount on a payment collection to match a new
    /// order total.
    async fn set_payment_collection_amount(
        &self,
        order_id: &OrderId,
        collection_id: &PaymentCollectionId,
        amount: i64,
    ) -> Result<(), GraceholdError>;

    /// Mark a payment collection as fully captured for the given amount.
    async fn mark_payment_captured(
        &self,
        order_id: &OrderId,
        collection_id: &PaymentCollectionId,
        amount: i64,
    ) -> Result<(), GraceholdError>;
}
