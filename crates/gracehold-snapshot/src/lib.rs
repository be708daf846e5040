// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only aggregation of order, payment-collection, and provider state.
//!
//! Every saga and every capture attempt starts from a fresh snapshot; the
//! orchestrator never acts on cached state. A snapshot with zero or more
//! than one payment collection is an anomaly and aborts the caller rather
//! than guessing which collection holds the money.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use gracehold_core::domain::{
    AuthorizationRef, LineItem, OrderId, OrderStatus, PaymentCollectionId,
    PaymentCollectionStatus, ProviderAuthStatus,
};
use gracehold_core::error::{GraceholdError, PaymentError};
use gracehold_core::{OrderStore, PaymentProvider};

/// Point-in-time view of an order and its payment state.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub order_status: OrderStatus,
    pub currency: String,
    pub items: Vec<LineItem>,
    /// Current order total in minor units.
    pub total: i64,
    pub payment_collection_id: PaymentCollectionId,
    pub payment_status: PaymentCollectionStatus,
    /// Amount recorded on the payment collection, in minor units.
    pub collection_amount: i64,
    /// Amount the collection records as captured, in minor units.
    pub captured_amount: i64,
    pub authorization_ref: Option<AuthorizationRef>,
    /// Raw provider authorization state, when an authorization reference
    /// resolved. Used for partial-capture and lost-race detection.
    pub provider_status: Option<ProviderAuthStatus>,
    /// Amount currently held by the provider, in minor units.
    pub provider_amount: Option<i64>,
    /// Amount the provider reports as captured, in minor units.
    pub provider_captured_amount: Option<i64>,
    pub locked_for_capture: bool,
    pub any_shipped: bool,
    pub order_created_at: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Whether the provider reports the authorization as fully captured.
    pub fn provider_captured(&self) -> bool {
        matches!(self.provider_status, Some(ProviderAuthStatus::Succeeded))
    }
}

/// Snapshot assembly failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Zero or multiple payment collections; the saga must abort rather
    /// than guess which one holds the authorization.
    #[error("order {order_id} has {collections} payment collections, expected exactly 1")]
    PaymentStateAnomaly {
        order_id: OrderId,
        collections: usize,
    },

    #[error(transparent)]
    Infra(#[from] GraceholdError),
}

/// Assembles [`OrderSnapshot`]s from the order store and payment provider.
pub struct SnapshotReader {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentProvider>,
}

impl SnapshotReader {
    pub fn new(orders: Arc<dyn OrderStore>, payments: Arc<dyn PaymentProvider>) -> Self {
        Self { orders, payments }
    }

    /// Read a fresh snapshot for an order.
    ///
    /// The authorization reference resolves in priority order: the order's
    /// metadata cache first, then the payment record's provider-assigned
    /// id -- the metadata cache may be stale relative to the provider of
    /// record, but it is the id the token was minted against.
    pub async fn read(&self, order_id: &OrderId) -> Result<OrderSnapshot, SnapshotError> {
        let order = self
            .orders
            .load(order_id)
            .await?
            .ok_or_else(|| SnapshotError::OrderNotFound(order_id.clone()))?;

        if order.payment_collections.len() != 1 {
            return Err(SnapshotError::PaymentStateAnomaly {
                order_id: order_id.clone(),
                collections: order.payment_collections.len(),
            });
        }
        let collection = order.payment_collections[0].clone();

        let authorization_ref = order
            .metadata
            .authorization_ref
            .clone()
            .or_else(|| collection.authorization_ref.clone());

        let (provider_status, provider_amount, provider_captured_amount) =
            match &authorization_ref {
                Some(auth_ref) => {
                    let auth = self
                        .payments
                        .get_authorization(auth_ref)
                        .await
                        .map_err(|e| match e {
                            PaymentError::Infra(inner) => SnapshotError::Infra(inner),
                            PaymentError::Declined { code } => SnapshotError::Infra(
                                GraceholdError::Internal(format!(
                                    "authorization lookup declined unexpectedly: {code}"
                                )),
                            ),
                        })?;
                    (
                        Some(auth.status),
                        Some(auth.amount),
                        Some(auth.captured_amount),
                    )
                }
                None => (None, None, None),
            };

        debug!(
            order_id = %order_id,
            payment_status = %collection.status,
            provider_status = ?provider_status,
            "snapshot assembled"
        );

        let total = order.total();
        let any_shipped = order.any_shipped();
        Ok(OrderSnapshot {
            order_id: order_id.clone(),
            order_status: order.status,
            currency: order.currency.clone(),
            total,
            items: order.items,
            payment_collection_id: collection.id,
            payment_status: collection.status,
            collection_amount: collection.amount,
            captured_amount: collection.captured_amount,
            authorization_ref,
            provider_status,
            provider_amount,
            provider_captured_amount,
            locked_for_capture: order.metadata.locked_for_capture,
            any_shipped,
            order_created_at: order.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gracehold_test_utils::{MockOrderStore, MockPaymentProvider, OrderFixture};

    fn reader(
        orders: &Arc<MockOrderStore>,
        payments: &Arc<MockPaymentProvider>,
    ) -> SnapshotReader {
        SnapshotReader::new(orders.clone(), payments.clone())
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let orders = Arc::new(MockOrderStore::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let err = reader(&orders, &payments)
            .read(&OrderId("ord_missing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn snapshot_joins_order_and_provider_state() {
        let orders = Arc::new(MockOrderStore::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let fixture = OrderFixture::new("ord_1", "pi_1")
            .with_item("var_a", 2, 1500)
            .with_item("var_b", 1, 2000);
        orders.insert(fixture.build()).await;
        payments.hold_authorization("pi_1", 5000).await;

        let snapshot = reader(&orders, &payments)
            .read(&OrderId("ord_1".into()))
            .await
            .unwrap();

        assert_eq!(snapshot.total, 5000);
        assert_eq!(snapshot.payment_status, PaymentCollectionStatus::Authorized);
        assert_eq!(
            snapshot.authorization_ref,
            Some(AuthorizationRef("pi_1".into()))
        );
        assert_eq!(
            snapshot.provider_status,
            Some(ProviderAuthStatus::RequiresCapture)
        );
        assert_eq!(snapshot.provider_amount, Some(5000));
        assert!(!snapshot.provider_captured());
        assert!(!snapshot.locked_for_capture);
        assert!(!snapshot.any_shipped);
    }

    #[tokio::test]
    async fn metadata_cache_wins_over_payment_record() {
        let orders = Arc::new(MockOrderStore::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let mut order = OrderFixture::new("ord_1", "pi_cached")
            .with_item("var_a", 1, 1000)
            .build();
        // Payment record carries a different (newer) provider id.
        order.payment_collections[0].authorization_ref =
            Some(AuthorizationRef("pi_record".into()));
        orders.insert(order).await;
        payments.hold_authorization("pi_cached", 1000).await;

        let snapshot = reader(&orders, &payments)
            .read(&OrderId("ord_1".into()))
            .await
            .unwrap();
        assert_eq!(
            snapshot.authorization_ref,
            Some(AuthorizationRef("pi_cached".into()))
        );
    }

    #[tokio::test]
    async fn multiple_payment_collections_abort() {
        let orders = Arc::new(MockOrderStore::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let mut order = OrderFixture::new("ord_1", "pi_1")
            .with_item("var_a", 1, 1000)
            .build();
        let duplicate = order.payment_collections[0].clone();
        order.payment_collections.push(duplicate);
        orders.insert(order).await;

        let err = reader(&orders, &payments)
            .read(&OrderId("ord_1".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::PaymentStateAnomaly { collections: 2, .. }
        ));
    }
}
