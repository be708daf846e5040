// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common precondition chain shared by every saga.
//!
//! Checks run in a fixed order and each failure is a distinct typed error:
//! token-order mismatch (checked even for expired tokens), expiry, order
//! cancellation, payment-status gate, partial capture, cooperative capture
//! lock.

use gracehold_core::domain::{OrderId, OrderStatus, PaymentCollectionStatus};
use gracehold_snapshot::OrderSnapshot;
use gracehold_token::TokenValidation;

use crate::error::ModificationError;

/// Which saga is running; cancel accepts states the mutating sagas reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaKind {
    Mutating,
    Cancel,
}

/// Token checks against the route's order id.
///
/// The mismatch check runs before the expiry check, and runs for expired
/// tokens too: a token for a DIFFERENT order is a security signal, distinct
/// from mere expiry. Expired tokens pass for `Cancel` -- an expired token
/// still proves order ownership for the post-window cancellation path.
pub fn check_token(
    route_order: &OrderId,
    validation: &TokenValidation,
    kind: SagaKind,
) -> Result<(), ModificationError> {
    if validation.claims.order_id != *route_order {
        return Err(ModificationError::TokenMismatch {
            token_order: validation.claims.order_id.clone(),
            route_order: route_order.clone(),
        });
    }
    if validation.expired && kind == SagaKind::Mutating {
        return Err(ModificationError::TokenExpired);
    }
    Ok(())
}

/// Order and payment gates for the money-moving sagas.
///
/// `partially_captured` is always rejected (needs manual handling);
/// `completed` and `canceled` fall through to the general gate. The
/// `locked_for_capture` flag is the cooperative lock against the capture
/// worker.
pub fn check_mutable(snapshot: &OrderSnapshot) -> Result<(), ModificationError> {
    if snapshot.order_status == OrderStatus::Canceled {
        return Err(ModificationError::OrderAlreadyCanceled(
            snapshot.order_id.clone(),
        ));
    }
    if snapshot.payment_status == PaymentCollectionStatus::PartiallyCaptured {
        return Err(ModificationError::PartialCapture {
            order_id: snapshot.order_id.clone(),
            captured_amount: snapshot.captured_amount,
        });
    }
    if !snapshot.payment_status.is_modifiable() {
        return Err(ModificationError::PaymentNotModifiable {
            order_id: snapshot.order_id.clone(),
            status: snapshot.payment_status,
        });
    }
    if snapshot.locked_for_capture {
        return Err(ModificationError::OrderLocked(snapshot.order_id.clone()));
    }
    Ok(())
}
