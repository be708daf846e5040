// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mock order store with scriptable failures.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use gracehold_core::domain::{
    AuthorizationRef, Fulfillment, ItemOperation, LineItem, LineItemId, OrderId,
    OrderMetadata, OrderRecord, OrderStatus, PaymentCollection, PaymentCollectionId,
    PaymentCollectionStatus, VariantId,
};
use gracehold_core::{GraceholdError, OrderStore};

/// Builder for order records used in tests.
///
/// Produces an order with exactly one payment collection whose recorded
/// amount matches the item total, and the authorization reference cached
/// in order metadata -- the shape a just-placed order has.
pub struct OrderFixture {
    order_id: String,
    authorization_ref: String,
    items: Vec<(String, u32, i64)>,
    payment_status: PaymentCollectionStatus,
    captured_amount: i64,
    shipped: bool,
    locked_for_capture: bool,
    created_at: chrono::DateTime<Utc>,
}

impl OrderFixture {
    pub fn new(order_id: &str, authorization_ref: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            authorization_ref: authorization_ref.to_string(),
            items: Vec::new(),
            payment_status: PaymentCollectionStatus::Authorized,
            captured_amount: 0,
            shipped: false,
            locked_for_capture: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_item(mut self, variant_id: &str, quantity: u32, unit_price: i64) -> Self {
        self.items.push((variant_id.to_string(), quantity, unit_price));
        self
    }

    pub fn with_payment_status(mut self, status: PaymentCollectionStatus) -> Self {
        self.payment_status = status;
        self
    }

    pub fn with_captured_amount(mut self, amount: i64) -> Self {
        self.captured_amount = amount;
        self
    }

    pub fn with_shipped_fulfillment(mut self) -> Self {
        self.shipped = true;
        self
    }

    pub fn with_locked_for_capture(mut self) -> Self {
        self.locked_for_capture = true;
        self
    }

    pub fn with_created_at(mut self, created_at: chrono::DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn build(self) -> OrderRecord {
        let items: Vec<LineItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, (variant_id, quantity, unit_price))| LineItem {
                id: LineItemId(format!("li_{}_{}", self.order_id, i + 1)),
                variant_id: VariantId(variant_id.clone()),
                quantity: *quantity,
                unit_price: *unit_price,
            })
            .collect();
        let total: i64 = items.iter().map(LineItem::subtotal).sum();

        OrderRecord {
            id: OrderId(self.order_id.clone()),
            status: OrderStatus::Pending,
            currency: "usd".to_string(),
            items,
            payment_collections: vec![PaymentCollection {
                id: PaymentCollectionId(format!("paycol_{}", self.order_id)),
                status: self.payment_status,
                amount: total,
                authorization_ref: Some(AuthorizationRef(self.authorization_ref.clone())),
                captured_amount: self.captured_amount,
            }],
            metadata: OrderMetadata {
                authorization_ref: Some(AuthorizationRef(self.authorization_ref)),
                locked_for_capture: self.locked_for_capture,
            },
            fulfillments: if self.shipped {
                vec![Fulfillment {
                    id: format!("ful_{}", self.order_id),
                    shipped_at: Some(Utc::now()),
                }]
            } else {
                vec![]
            },
            created_at: self.created_at,
        }
    }
}

/// In-memory [`OrderStore`] with per-operation scripted failures.
pub struct MockOrderStore {
    orders: Mutex<HashMap<String, OrderRecord>>,
    failing_ops: Mutex<HashSet<&'static str>>,
}

impl MockOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            failing_ops: Mutex::new(HashSet::new()),
        }
    }

    /// Insert or replace an order.
    pub async fn insert(&self, order: OrderRecord) {
        self.orders.lock().await.insert(order.id.0.clone(), order);
    }

    /// Read back an order.
    pub async fn order(&self, order_id: &OrderId) -> Option<OrderRecord> {
        self.orders.lock().await.get(&order_id.0).cloned()
    }

    /// Make the named operation fail until [`clear_failures`] is called.
    /// Operation names match the trait methods (`add_item`,
    /// `set_item_quantity`, `cancel_order`, `set_locked_for_capture`,
    /// `set_payment_collection_amount`, `mark_payment_captured`, `load`).
    pub async fn fail_op(&self, op: &'static str) {
        self.failing_ops.lock().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.failing_ops.lock().await.clear();
    }

    async fn check_fail(&self, op: &str) -> Result<(), GraceholdError> {
        if self.failing_ops.lock().await.contains(op) {
            return Err(GraceholdError::Provider {
                message: format!("simulated {op} failure"),
                source: None,
            });
        }
        Ok(())
    }

    async fn with_order<F>(&self, order_id: &OrderId, f: F) -> Result<(), GraceholdError>
    where
        F: FnOnce(&mut OrderRecord),
    {
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(&order_id.0).ok_or_else(|| {
            GraceholdError::Provider {
                message: format!("order {order_id} not found"),
                source: None,
            }
        })?;
        f(order);
        Ok(())
    }
}

impl Default for MockOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn load(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, GraceholdError> {
        self.check_fail("load").await?;
        Ok(self.orders.lock().await.get(&order_id.0).cloned())
    }

    async fn apply_item_ops(
        &self,
        order_id: &OrderId,
        ops: &[ItemOperation],
    ) -> Result<(), GraceholdError> {
        self.check_fail("apply_item_ops").await?;
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(&order_id.0).ok_or_else(|| {
            GraceholdError::Provider {
                message: format!("order {order_id} not found"),
                source: None,
            }
        })?;

        // All-or-nothing: validate every op before touching the order.
        for op in ops {
            if let ItemOperation::SetQuantity { line_item_id, .. } = op
                && !order.items.iter().any(|i| i.id == *line_item_id)
            {
                return Err(GraceholdError::Provider {
                    message: format!("line item {line_item_id} not found"),
                    source: None,
                });
            }
        }

        for op in ops {
            match op {
                ItemOperation::Add {
                    variant_id,
                    quantity,
                    unit_price,
                } => {
                    order.items.push(LineItem {
                        id: LineItemId(format!("li_{}", uuid::Uuid::new_v4())),
                        variant_id: variant_id.clone(),
                        quantity: *quantity,
                        unit_price: *unit_price,
                    });
                }
                ItemOperation::SetQuantity {
                    line_item_id,
                    quantity,
                } => {
                    if let Some(item) =
                        order.items.iter_mut().find(|i| i.id == *line_item_id)
                    {
                        item.quantity = *quantity;
                    }
                }
            }
        }
        Ok(())
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), GraceholdError> {
        self.check_fail("cancel_order").await?;
        self.with_order(order_id, |order| {
            order.status = OrderStatus::Canceled;
        })
        .await
    }

    async fn set_locked_for_capture(
        &self,
        order_id: &OrderId,
        locked: bool,
    ) -> Result<(), GraceholdError> {
        self.check_fail("set_locked_for_capture").await?;
        self.with_order(order_id, move |order| {
            order.metadata.locked_for_capture = locked;
        })
        .await
    }

    async fn set_payment_collection_amount(
        &self,
        order_id: &OrderId,
        collection_id: &PaymentCollectionId,
        amount: i64,
    ) -> Result<(), GraceholdError> {
        self.check_fail("set_payment_collection_amount").await?;
        let collection_id = collection_id.clone();
        self.with_order(order_id, move |order| {
            if let Some(collection) = order
                .payment_collections
                .iter_mut()
                .find(|c| c.id == collection_id)
            {
                collection.amount = amount;
            }
        })
        .await
    }

    async fn mark_payment_captured(
        &self,
        order_id: &OrderId,
        collection_id: &PaymentCollectionId,
        amount: i64,
    ) -> Result<(), GraceholdError> {
        self.check_fail("mark_payment_captured").await?;
        let collection_id = collection_id.clone();
        self.with_order(order_id, move |order| {
            if let Some(collection) = order
                .payment_collections
                .iter_mut()
                .find(|c| c.id == collection_id)
            {
                collection.status = PaymentCollectionStatus::Completed;
                collection.captured_amount = amount;
                collection.amount = amount;
            }
        })
        .await
    }
}
