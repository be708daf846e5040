// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mock inventory store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use gracehold_core::domain::{LineItemId, VariantId};
use gracehold_core::{GraceholdError, InventoryStore};

/// In-memory [`InventoryStore`].
///
/// Variants without an explicit level are treated as plentiful, so tests
/// only set levels for the variants whose stock matters.
pub struct MockInventoryStore {
    available: Mutex<HashMap<String, i64>>,
    released: Mutex<Vec<LineItemId>>,
}

impl MockInventoryStore {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(HashMap::new()),
            released: Mutex::new(Vec::new()),
        }
    }

    /// Set the available (stocked minus reserved) level for a variant.
    pub async fn set_available(&self, variant_id: &str, quantity: i64) {
        self.available
            .lock()
            .await
            .insert(variant_id.to_string(), quantity);
    }

    /// Line items whose reservations were released, in call order.
    pub async fn released(&self) -> Vec<LineItemId> {
        self.released.lock().await.clone()
    }
}

impl Default for MockInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for MockInventoryStore {
    async fn available(&self, variant_id: &VariantId) -> Result<i64, GraceholdError> {
        Ok(self
            .available
            .lock()
            .await
            .get(&variant_id.0)
            .copied()
            .unwrap_or(i64::MAX))
    }

    async fn release_reservations(
        &self,
        line_item_ids: &[LineItemId],
    ) -> Result<(), GraceholdError> {
        self.released
            .lock()
            .await
            .extend(line_item_ids.iter().cloned());
        Ok(())
    }
}
