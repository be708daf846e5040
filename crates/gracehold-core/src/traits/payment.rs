// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment authorization provider collaborator trait.

use async_trait::async_trait;

use crate::domain::{AuthorizationRef, ProviderAuthorization};
use crate::error::PaymentError;

/// The external payment processor holding the order's authorization.
///
/// Every money-moving call takes an idempotency key; replaying a call with
/// the same key must not apply the effect a second time. Keys are derived
/// from `(order_id, request_id)` by the caller, so a client or network retry
/// of the same logical request is safe.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Retrieve the current state of a held authorization.
    async fn get_authorization(
        &self,
        authorization_ref: &AuthorizationRef,
    ) -> Result<ProviderAuthorization, PaymentError>;

    /// Set the held amount to `new_amount` minor units (increment or
    /// restore). Declines surface as [`PaymentError::Declined`].
    async fn set_authorization_amount(
        &self,
        authorization_ref: &AuthorizationRef,
        new_amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError>;

    /// Capture `amount` minor units of the held authorization.
    async fn capture(
        &self,
        authorization_ref: &AuthorizationRef,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError>;

    /// Cancel the hold without charging.
    async fn void(
        &self,
        authorization_ref: &AuthorizationRef,
        idempotency_key: &str,
    ) -> Result<(), PaymentError>;

    /// Refund `amount` minor units of a captured payment.
    async fn refund(
        &self,
        authorization_ref: &AuthorizationRef,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError>;
}
