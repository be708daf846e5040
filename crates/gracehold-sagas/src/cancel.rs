// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancel-With-Refund-Or-Void.
//!
//! Within the modification window the authorization is voided; past the
//! window (expired-but-valid token, payment already captured) the captured
//! amount is refunded. Cancellation after shipment is never allowed.
//!
//! The ordering is deliberate: the capture job is removed BEFORE any order
//! mutation, and every later failure re-schedules the job with zero delay
//! so an authorization is never silently left uncaptured. A failed void or
//! refund after the order is canceled is a success-with-warning: the
//! customer must see their order as canceled even when the money-side
//! cleanup needs a human.

use std::time::Duration;

use tracing::{debug, error, info};

use gracehold_core::domain::{
    ModificationResult, OrderId, OrderStatus, PaymentCollectionStatus, PaymentStatusTag,
};
use gracehold_scheduler::SchedulerError;
use gracehold_token::TokenValidation;

use crate::error::ModificationError;
use crate::preconditions::{self, SagaKind};
use crate::runner::CompensationStack;
use crate::service::ModificationService;

/// Internal cancel outcome; the service layer decides on notifications.
pub(crate) struct CancelOutcome {
    pub result: ModificationResult,
    pub newly_canceled: bool,
    pub refunded: bool,
}

enum MoneyPlan {
    Void,
    Refund(i64),
    /// Payment already canceled provider-side; nothing to release.
    Skip,
}

impl ModificationService {
    /// Run the cancellation saga.
    pub(crate) async fn run_cancel(
        &self,
        order_id: &OrderId,
        validation: &TokenValidation,
        request_id: &str,
    ) -> Result<CancelOutcome, ModificationError> {
        preconditions::check_token(order_id, validation, SagaKind::Cancel)?;
        let snapshot = self.reader.read(order_id).await?;

        // Idempotent: cancelling a canceled order succeeds without effects.
        if snapshot.order_status == OrderStatus::Canceled {
            debug!(order_id = %order_id, "order already canceled");
            return Ok(CancelOutcome {
                result: ModificationResult {
                    order_id: order_id.clone(),
                    new_total: 0,
                    currency: snapshot.currency,
                    quantity_diff: 0,
                    payment_status: PaymentStatusTag::Unchanged,
                    capture_job: self.current_job_state(order_id).await,
                    message: Some("order already canceled".to_string()),
                    warning: None,
                },
                newly_canceled: false,
                refunded: false,
            });
        }

        // Shipped orders are never cancelable, token or no token.
        if snapshot.any_shipped {
            return Err(ModificationError::OrderShipped(order_id.clone()));
        }

        // Stop the capture job before touching anything else. An active
        // job means the worker won the race; a removal failure means we
        // cannot prove the job is stopped, and proceeding would risk a
        // capture against a canceled order.
        match self.scheduler.cancel(order_id).await {
            Ok(removed) => {
                debug!(order_id = %order_id, removed, "capture job removal");
            }
            Err(SchedulerError::JobActive(_)) => {
                return Err(ModificationError::LateCancel(order_id.clone()));
            }
            Err(SchedulerError::Storage(e)) => {
                return Err(ModificationError::QueueRemovalFailed {
                    order_id: order_id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        // From here on, any failure must put the capture job back with
        // zero delay so the payment is not permanently lost.
        let mut stack = CompensationStack::new();
        if let Some(authorization_ref) = snapshot.authorization_ref.clone() {
            let scheduler = self.scheduler.clone();
            let compensate_order = order_id.clone();
            stack.push("re-schedule-capture-job", move || async move {
                scheduler
                    .schedule(&compensate_order, &authorization_ref, Duration::ZERO)
                    .await
            });
        }

        // Re-validate payment state under the window branch.
        let within_window = !validation.expired;
        if snapshot.payment_status == PaymentCollectionStatus::PartiallyCaptured {
            return Err(self
                .unwind_cancel(
                    order_id,
                    stack,
                    ModificationError::PartialCapture {
                        order_id: order_id.clone(),
                        captured_amount: snapshot.captured_amount,
                    },
                )
                .await);
        }

        let captured = snapshot.payment_status == PaymentCollectionStatus::Completed
            || snapshot.provider_captured();
        let plan = if captured {
            if within_window {
                // Capture happened while the window was still open: the
                // worker (or fulfillment) won the race.
                return Err(self
                    .unwind_cancel(order_id, stack, ModificationError::LateCancel(order_id.clone()))
                    .await);
            }
            let amount = snapshot
                .provider_captured_amount
                .filter(|amount| *amount > 0)
                .unwrap_or(snapshot.captured_amount);
            MoneyPlan::Refund(amount)
        } else if snapshot.payment_status == PaymentCollectionStatus::Canceled {
            MoneyPlan::Skip
        } else {
            MoneyPlan::Void
        };

        // Release the inventory reservations held for the order's items.
        let line_item_ids: Vec<_> = snapshot.items.iter().map(|i| i.id.clone()).collect();
        if let Err(e) = self.inventory.release_reservations(&line_item_ids).await {
            return Err(self.unwind_cancel(order_id, stack, e.into()).await);
        }

        // Cancel the order itself.
        if let Err(e) = self.orders.cancel_order(order_id).await {
            return Err(self.unwind_cancel(order_id, stack, e.into()).await);
        }

        // Money release: void within the window, refund past it. Failure
        // here is a warning, not an error -- the order IS canceled.
        let mut warning = None;
        let mut payment_status = PaymentStatusTag::Unchanged;
        let mut refunded = false;
        if let Some(authorization_ref) = &snapshot.authorization_ref {
            let money_result = match &plan {
                MoneyPlan::Void => {
                    let key = format!("{order_id}:{request_id}:void");
                    self.payments.void(authorization_ref, &key).await.map(|()| {
                        payment_status = PaymentStatusTag::Succeeded;
                    })
                }
                MoneyPlan::Refund(amount) => {
                    let key = format!("{order_id}:{request_id}:refund");
                    self.payments
                        .refund(authorization_ref, *amount, &key)
                        .await
                        .map(|()| {
                            payment_status = PaymentStatusTag::Succeeded;
                            refunded = true;
                        })
                }
                MoneyPlan::Skip => Ok(()),
            };

            if let Err(e) = money_result {
                error!(
                    order_id = %order_id,
                    authorization_ref = %authorization_ref,
                    error = %e,
                    "order canceled but payment release failed; manual follow-up required"
                );
                warning =
                    Some("payment release failed; flagged for manual follow-up".to_string());
            }
        }

        // The order is canceled: the capture job must NOT come back.
        stack.discard();

        info!(
            order_id = %order_id,
            within_window,
            refunded,
            "order canceled"
        );
        let quantity_diff: i64 = -snapshot
            .items
            .iter()
            .map(|i| i64::from(i.quantity))
            .sum::<i64>();
        Ok(CancelOutcome {
            result: ModificationResult {
                order_id: order_id.clone(),
                new_total: 0,
                currency: snapshot.currency,
                quantity_diff,
                payment_status,
                capture_job: None,
                message: Some("order canceled".to_string()),
                warning,
            },
            newly_canceled: true,
            refunded,
        })
    }

    /// Unwind a failed cancellation: best-effort re-add of the capture job.
    ///
    /// The original error always propagates; a failed re-add is logged at
    /// top severity (the authorization would otherwise never be captured)
    /// but never masks the original failure.
    async fn unwind_cancel(
        &self,
        order_id: &OrderId,
        stack: CompensationStack,
        original: ModificationError,
    ) -> ModificationError {
        let failures = stack.unwind().await;
        if failures > 0 {
            error!(
                order_id = %order_id,
                alert = "CAPTURE_JOB_READD_FAILED",
                original_error = %original,
                "failed to re-schedule capture job after aborted cancellation; \
                 authorization may never be captured without operator action"
            );
        }
        original
    }
}
