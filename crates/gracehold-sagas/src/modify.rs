// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The money-moving sagas: Add-Item, Update-Quantity, Batch-Modify.
//!
//! Shared shape: validate stock (collecting every failure) -> compute the
//! signed total delta in minor units -> increment the held authorization
//! if the delta is positive -> apply the order edit -> sync the payment
//! collection's recorded amount. The authorization increment is the only
//! step with a compensation: rolling the held amount back to its
//! pre-increment value.
//!
//! If that rollback itself fails, the customer is authorized for more than
//! the order reflects. This is logged at the highest severity as
//! AUTH_MISMATCH_OVERSOLD and surfaced as an opaque internal error --
//! deliberately not retried, because a blind retry risks a double
//! authorization change.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use gracehold_core::domain::{
    ItemOperation, JobState, LineItemId, ModificationResult, OrderId, PaymentStatusTag,
    VariantId,
};
use gracehold_token::TokenValidation;

use crate::error::{map_payment_error, ModificationError, StockShortage};
use crate::preconditions::{self, SagaKind};
use crate::runner::CompensationStack;
use crate::service::ModificationService;

/// A requested item change, before price resolution.
#[derive(Debug, Clone)]
pub(crate) enum ItemOp {
    Add {
        variant_id: VariantId,
        quantity: u32,
    },
    SetQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
}

/// Idempotency key for the authorization adjustment of one logical request.
/// A client or network retry carries the same request id, so the provider
/// replays instead of double-applying.
pub(crate) fn auth_idempotency_key(order_id: &OrderId, request_id: &str) -> String {
    format!("{order_id}:{request_id}:auth-adjust")
}

impl ModificationService {
    /// Run a money-moving modification saga.
    pub(crate) async fn run_modification(
        &self,
        order_id: &OrderId,
        validation: &TokenValidation,
        ops: Vec<ItemOp>,
        request_id: &str,
    ) -> Result<ModificationResult, ModificationError> {
        preconditions::check_token(order_id, validation, SagaKind::Mutating)?;
        let snapshot = self.reader.read(order_id).await?;
        preconditions::check_mutable(&snapshot)?;

        // Plan: resolve prices, compute deltas, and collect net quantity
        // increases per variant for the stock check.
        let mut confirmed_ops: Vec<ItemOperation> = Vec::new();
        let mut total_delta: i64 = 0;
        let mut quantity_diff: i64 = 0;
        let mut increases: BTreeMap<String, i64> = BTreeMap::new();

        for op in ops {
            match op {
                ItemOp::Add {
                    variant_id,
                    quantity,
                } => {
                    if quantity == 0 {
                        continue;
                    }
                    let price = self
                        .pricing
                        .variant_price(&variant_id, &snapshot.currency)
                        .await?;
                    total_delta += i64::from(quantity) * price.unit_price;
                    quantity_diff += i64::from(quantity);
                    *increases.entry(variant_id.0.clone()).or_default() +=
                        i64::from(quantity);
                    confirmed_ops.push(ItemOperation::Add {
                        variant_id,
                        quantity,
                        unit_price: price.unit_price,
                    });
                }
                ItemOp::SetQuantity {
                    line_item_id,
                    quantity,
                } => {
                    let item = snapshot
                        .items
                        .iter()
                        .find(|i| i.id == line_item_id)
                        .ok_or_else(|| ModificationError::ItemNotFound(line_item_id.clone()))?;
                    let diff = i64::from(quantity) - i64::from(item.quantity);
                    if diff == 0 {
                        continue;
                    }
                    total_delta += diff * item.unit_price;
                    quantity_diff += diff;
                    if diff > 0 {
                        *increases.entry(item.variant_id.0.clone()).or_default() += diff;
                    }
                    confirmed_ops.push(ItemOperation::SetQuantity {
                        line_item_id,
                        quantity,
                    });
                }
            }
        }

        // Stock: validate every increase against available (stocked minus
        // reserved) inventory, reporting ALL shortages at once.
        let mut shortages: Vec<StockShortage> = Vec::new();
        for (variant_key, requested) in &increases {
            let variant_id = VariantId(variant_key.clone());
            let available = self.inventory.available(&variant_id).await?;
            if available < *requested {
                shortages.push(StockShortage {
                    variant_id,
                    requested: *requested,
                    available,
                });
            }
        }
        if !shortages.is_empty() {
            return Err(ModificationError::InsufficientStock { shortages });
        }

        // Zero-delta short-circuit: no effective change, no external calls.
        if confirmed_ops.is_empty() {
            debug!(order_id = %order_id, "modification is a no-op");
            return Ok(ModificationResult {
                order_id: order_id.clone(),
                new_total: snapshot.total,
                currency: snapshot.currency.clone(),
                quantity_diff: 0,
                payment_status: PaymentStatusTag::Unchanged,
                capture_job: self.current_job_state(order_id).await,
                message: Some("no update needed".to_string()),
                warning: None,
            });
        }

        let new_total = snapshot.total + total_delta;
        let mut stack = CompensationStack::new();
        let mut payment_status = PaymentStatusTag::Unchanged;

        // Money first: grow the hold before the order grows, so the
        // customer is never shown a total the hold cannot cover.
        if total_delta > 0 {
            let authorization_ref = snapshot
                .authorization_ref
                .clone()
                .ok_or_else(|| ModificationError::MissingAuthorization(order_id.clone()))?;
            let prior_amount = snapshot
                .provider_amount
                .ok_or_else(|| ModificationError::MissingAuthorization(order_id.clone()))?;
            let key = auth_idempotency_key(order_id, request_id);

            self.payments
                .set_authorization_amount(&authorization_ref, prior_amount + total_delta, &key)
                .await
                .map_err(map_payment_error)?;
            payment_status = PaymentStatusTag::Succeeded;

            let payments = self.payments.clone();
            let rollback_key = format!("{key}:rollback");
            stack.push("restore-authorization-amount", move || async move {
                payments
                    .set_authorization_amount(&authorization_ref, prior_amount, &rollback_key)
                    .await
                    .map_err(|e| gracehold_core::GraceholdError::Provider {
                        message: e.to_string(),
                        source: None,
                    })
            });
        }

        // Order edit: one confirmed change carrying the whole batch.
        if let Err(e) = self.orders.apply_item_ops(order_id, &confirmed_ops).await {
            return Err(self.unwind_modification(order_id, stack, e.into()).await);
        }

        // Bookkeeping: the payment collection's recorded amount tracks the
        // new total.
        if let Err(e) = self
            .orders
            .set_payment_collection_amount(order_id, &snapshot.payment_collection_id, new_total)
            .await
        {
            return Err(self.unwind_modification(order_id, stack, e.into()).await);
        }

        stack.discard();

        info!(
            order_id = %order_id,
            new_total,
            total_delta,
            quantity_diff,
            "order modification applied"
        );
        Ok(ModificationResult {
            order_id: order_id.clone(),
            new_total,
            currency: snapshot.currency,
            quantity_diff,
            payment_status,
            capture_job: self.current_job_state(order_id).await,
            message: None,
            warning: None,
        })
    }

    /// Unwind a failed modification saga.
    ///
    /// A successful rollback re-raises the original error. A FAILED
    /// rollback means the held authorization exceeds what the order
    /// reflects: logged at top severity for operator escalation, and the
    /// caller gets an opaque internal error instead of something that
    /// invites a retry.
    pub(crate) async fn unwind_modification(
        &self,
        order_id: &OrderId,
        stack: CompensationStack,
        original: ModificationError,
    ) -> ModificationError {
        let failures = stack.unwind().await;
        if failures > 0 {
            error!(
                order_id = %order_id,
                alert = "AUTH_MISMATCH_OVERSOLD",
                original_error = %original,
                "authorization rollback failed: customer is authorized for more than \
                 the order reflects; operator escalation required"
            );
            return ModificationError::Internal {
                detail: format!(
                    "authorization rollback failed for order {order_id} after: {original}"
                ),
            };
        }
        original
    }

    /// Fetch the capture-job state for a result, downgrading storage
    /// errors to `None` -- the modification already succeeded or failed on
    /// its own merits.
    pub(crate) async fn current_job_state(&self, order_id: &OrderId) -> Option<JobState> {
        match self.scheduler.job_state(order_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "could not read capture job state");
                None
            }
        }
    }
}
