// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing/catalog collaborator trait.

use async_trait::async_trait;

use crate::domain::{VariantId, VariantPrice};
use crate::error::GraceholdError;

/// Resolve a variant's current price.
#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Current unit price of a variant in the given currency.
    async fn variant_price(
        &self,
        variant_id: &VariantId,
        currency: &str,
    ) -> Result<VariantPrice, GraceholdError>;
}
