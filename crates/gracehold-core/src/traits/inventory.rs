// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory store collaborator trait.

use async_trait::async_trait;

use crate::domain::{LineItemId, VariantId};
use crate::error::GraceholdError;

/// Read stock levels and release reservations.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Units available for sale: stocked minus reserved.
    async fn available(&self, variant_id: &VariantId) -> Result<i64, GraceholdError>;

    /// Release the inventory reservations held for the given line items.
    async fn release_reservations(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), GraceholdError>;
}
