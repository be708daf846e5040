// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed saga failures with stable machine-readable codes.
//!
//! The boundary layer maps [`ModificationError::code`] 1:1 to HTTP status
//! codes without inspecting message text. Variants carry enough structured
//! detail (shortages, decline codes, order ids) for the caller to explain
//! the failure; the `Internal` variant is deliberately opaque -- its detail
//! goes to the operator log, and the user is told to contact support.

use thiserror::Error;

use gracehold_core::domain::{
    DeclineCode, LineItemId, OrderId, PaymentCollectionStatus, VariantId,
};
use gracehold_core::error::{GraceholdError, PaymentError};
use gracehold_snapshot::SnapshotError;
use gracehold_token::TokenError;

/// One variant with not enough stock for a requested increase.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StockShortage {
    pub variant_id: VariantId,
    pub requested: i64,
    pub available: i64,
}

/// A saga failure the boundary layer can map deterministically.
#[derive(Debug, Error)]
pub enum ModificationError {
    #[error("token signature or format invalid")]
    TokenInvalid,

    #[error("modification window has closed")]
    TokenExpired,

    /// Token order doesn't match the requested order. Checked even for
    /// expired tokens: a mismatch is a security signal, not mere expiry.
    #[error("token order {token_order} does not match requested order {route_order}")]
    TokenMismatch {
        token_order: OrderId,
        route_order: OrderId,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} is already canceled")]
    OrderAlreadyCanceled(OrderId),

    /// The capture worker holds the cooperative lock on this order.
    #[error("order {0} is locked for payment capture")]
    OrderLocked(OrderId),

    #[error("payment is partially captured ({captured_amount} minor units); manual handling required")]
    PartialCapture {
        order_id: OrderId,
        captured_amount: i64,
    },

    #[error("payment status `{status}` does not allow modification of order {order_id}")]
    PaymentNotModifiable {
        order_id: OrderId,
        status: PaymentCollectionStatus,
    },

    /// Every failing line is reported, not just the first.
    #[error("insufficient stock for {} variant(s)", shortages.len())]
    InsufficientStock { shortages: Vec<StockShortage> },

    #[error("payment declined: {code}")]
    PaymentDeclined { code: DeclineCode, retryable: bool },

    #[error("line item {0} not found on order")]
    ItemNotFound(LineItemId),

    /// Cancellation after shipment is never allowed, token or no token.
    #[error("order {0} has shipped and can no longer be canceled")]
    OrderShipped(OrderId),

    /// The capture worker won the race; the payment is (being) captured.
    #[error("too late to cancel order {0}: payment capture already started")]
    LateCancel(OrderId),

    /// The capture job could not be confirmed stopped; proceeding would
    /// risk capturing a payment for a canceled order.
    #[error("could not remove capture job for order {order_id}: {reason}")]
    QueueRemovalFailed { order_id: OrderId, reason: String },

    #[error("order {order_id} has {collections} payment collections, expected exactly 1")]
    PaymentStateAnomaly {
        order_id: OrderId,
        collections: usize,
    },

    #[error("no payment authorization resolved for order {0}")]
    MissingAuthorization(OrderId),

    /// Generic 500-class failure. The detail is logged, never shown.
    #[error("internal error; please contact support")]
    Internal { detail: String },
}

impl ModificationError {
    /// Stable machine-readable code for the boundary layer.
    pub fn code(&self) -> &'static str {
        match self {
            ModificationError::TokenInvalid => "TOKEN_INVALID",
            ModificationError::TokenExpired => "TOKEN_EXPIRED",
            ModificationError::TokenMismatch { .. } => "TOKEN_MISMATCH",
            ModificationError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ModificationError::OrderAlreadyCanceled(_) => "ORDER_ALREADY_CANCELED",
            ModificationError::OrderLocked(_) => "ORDER_LOCKED",
            ModificationError::PartialCapture { .. } => "PARTIAL_CAPTURE",
            ModificationError::PaymentNotModifiable { .. } => "PAYMENT_NOT_MODIFIABLE",
            ModificationError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ModificationError::PaymentDeclined { .. } => "PAYMENT_DECLINED",
            ModificationError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            ModificationError::OrderShipped(_) => "ORDER_SHIPPED",
            ModificationError::LateCancel(_) => "LATE_CANCEL",
            ModificationError::QueueRemovalFailed { .. } => "QUEUE_REMOVAL_FAILED",
            ModificationError::PaymentStateAnomaly { .. } => "PAYMENT_STATE_ANOMALY",
            ModificationError::MissingAuthorization(_) => "MISSING_AUTHORIZATION",
            ModificationError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<TokenError> for ModificationError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => ModificationError::TokenInvalid,
        }
    }
}

impl From<GraceholdError> for ModificationError {
    fn from(e: GraceholdError) -> Self {
        ModificationError::Internal {
            detail: e.to_string(),
        }
    }
}

impl From<SnapshotError> for ModificationError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::OrderNotFound(order_id) => {
                ModificationError::OrderNotFound(order_id)
            }
            SnapshotError::PaymentStateAnomaly {
                order_id,
                collections,
            } => ModificationError::PaymentStateAnomaly {
                order_id,
                collections,
            },
            SnapshotError::Infra(inner) => inner.into(),
        }
    }
}

/// Map a provider failure from a money-moving call.
pub(crate) fn map_payment_error(e: PaymentError) -> ModificationError {
    match e {
        PaymentError::Declined { code } => ModificationError::PaymentDeclined {
            retryable: code.retryable(),
            code,
        },
        PaymentError::Infra(inner) => inner.into(),
    }
}
