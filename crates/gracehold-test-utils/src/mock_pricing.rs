// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mock pricing catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use gracehold_core::domain::{VariantId, VariantPrice};
use gracehold_core::{GraceholdError, PricingCatalog};

/// In-memory [`PricingCatalog`]. Unknown variants error, matching a real
/// catalog lookup for a variant with no price list entry.
pub struct MockPricingCatalog {
    prices: Mutex<HashMap<String, i64>>,
}

impl MockPricingCatalog {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
        }
    }

    pub async fn set_price(&self, variant_id: &str, unit_price: i64) {
        self.prices
            .lock()
            .await
            .insert(variant_id.to_string(), unit_price);
    }
}

impl Default for MockPricingCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PricingCatalog for MockPricingCatalog {
    async fn variant_price(
        &self,
        variant_id: &VariantId,
        currency: &str,
    ) -> Result<VariantPrice, GraceholdError> {
        self.prices
            .lock()
            .await
            .get(&variant_id.0)
            .map(|unit_price| VariantPrice {
                unit_price: *unit_price,
                currency: currency.to_string(),
            })
            .ok_or_else(|| GraceholdError::Provider {
                message: format!("no price for variant {variant_id} in {currency}"),
                source: None,
            })
    }
}
