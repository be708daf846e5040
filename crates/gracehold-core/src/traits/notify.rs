// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification pipeline collaborator trait.

use async_trait::async_trait;

use crate::domain::OrderId;
use crate::error::GraceholdError;

/// Fire-and-forget customer notifications.
///
/// The sagas dispatch these on a spawned task and never await them on the
/// success path; a notification failure must not fail a modification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// The order was modified; `new_total` is in minor units.
    async fn order_updated(
        &self,
        order_id: &OrderId,
        new_total: i64,
    ) -> Result<(), GraceholdError>;

    /// The order was canceled. `refunded` distinguishes the past-window
    /// refund outcome from a within-window void.
    async fn order_canceled(
        &self,
        order_id: &OrderId,
        refunded: bool,
    ) -> Result<(), GraceholdError>;
}
