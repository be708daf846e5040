// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The modification service facade.
//!
//! Owns every dependency the sagas need -- token service, capture
//! scheduler, snapshot reader, and the external collaborator handles --
//! injected explicitly at construction. There is no process-wide mutable
//! state beyond the queue's own persistence.
//!
//! The boundary (routing) layer calls the public methods with the route's
//! order id, the presented capability token, a typed payload, and the
//! client-supplied request id used for idempotency-key derivation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use gracehold_config::GraceholdConfig;
use gracehold_core::domain::{
    AuthorizationRef, LineItemId, ModificationResult, OrderId, VariantId,
};
use gracehold_core::{
    InventoryStore, NotificationSink, OrderStore, PaymentProvider, PricingCatalog,
};
use gracehold_scheduler::CaptureScheduler;
use gracehold_snapshot::SnapshotReader;
use gracehold_token::{SignedToken, TokenService};

use crate::error::ModificationError;
use crate::modify::ItemOp;

/// Add one item to the order.
#[derive(Debug, Clone)]
pub struct AddItemRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Change the quantity of an existing line item.
#[derive(Debug, Clone)]
pub struct UpdateQuantityRequest {
    pub line_item_id: LineItemId,
    pub quantity: u32,
}

/// Add several items in one confirmed edit.
#[derive(Debug, Clone)]
pub struct BatchModifyRequest {
    pub items: Vec<AddItemRequest>,
}

/// Outcome of token validation, for the boundary layer.
#[derive(Debug, Clone, Serialize)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub expired: bool,
    pub matches_order: bool,
    pub remaining_seconds: i64,
}

/// External collaborator handles, bundled to keep construction readable.
pub struct ServiceDeps {
    pub orders: Arc<dyn OrderStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub pricing: Arc<dyn PricingCatalog>,
    pub notifications: Arc<dyn NotificationSink>,
}

/// Entry point for every modification-window operation.
pub struct ModificationService {
    pub(crate) tokens: TokenService,
    pub(crate) scheduler: CaptureScheduler,
    pub(crate) reader: SnapshotReader,
    pub(crate) orders: Arc<dyn OrderStore>,
    pub(crate) inventory: Arc<dyn InventoryStore>,
    pub(crate) payments: Arc<dyn PaymentProvider>,
    pub(crate) pricing: Arc<dyn PricingCatalog>,
    pub(crate) notifications: Arc<dyn NotificationSink>,
    pub(crate) capture_delay: Duration,
}

impl ModificationService {
    pub fn new(config: &GraceholdConfig, scheduler: CaptureScheduler, deps: ServiceDeps) -> Self {
        Self {
            tokens: TokenService::new(&config.window),
            scheduler,
            reader: SnapshotReader::new(deps.orders.clone(), deps.payments.clone()),
            orders: deps.orders,
            inventory: deps.inventory,
            payments: deps.payments,
            pricing: deps.pricing,
            notifications: deps.notifications,
            capture_delay: Duration::from_secs(config.window.capture_delay_seconds),
        }
    }

    /// Hook for order placement: schedules the delayed capture job and
    /// mints the capability token returned to the buyer.
    pub async fn on_order_placed(
        &self,
        order_id: OrderId,
        authorization_ref: AuthorizationRef,
        order_created_at: DateTime<Utc>,
    ) -> Result<SignedToken, ModificationError> {
        self.scheduler
            .schedule(&order_id, &authorization_ref, self.capture_delay)
            .await?;
        Ok(self
            .tokens
            .issue(order_id, authorization_ref, order_created_at))
    }

    /// Hook for fulfillment creation: the order is leaving the warehouse,
    /// so the authorization must be captured immediately.
    pub async fn capture_now(&self, order_id: &OrderId) -> Result<(), ModificationError> {
        let snapshot = self.reader.read(order_id).await?;
        let authorization_ref = snapshot
            .authorization_ref
            .ok_or_else(|| ModificationError::MissingAuthorization(order_id.clone()))?;
        self.scheduler
            .capture_now(order_id, &authorization_ref)
            .await?;
        Ok(())
    }

    /// Validate a presented token against the route's order id without
    /// performing any modification.
    pub fn validate_token(&self, order_id: &OrderId, token: &str) -> TokenValidationResult {
        match self.tokens.verify(token) {
            Ok(validation) => TokenValidationResult {
                valid: true,
                expired: validation.expired,
                matches_order: validation.claims.order_id == *order_id,
                remaining_seconds: validation.remaining_seconds(),
            },
            Err(_) => TokenValidationResult {
                valid: false,
                expired: false,
                matches_order: false,
                remaining_seconds: 0,
            },
        }
    }

    /// Add a single item to the order.
    pub async fn add_item(
        &self,
        order_id: &OrderId,
        token: &str,
        request: AddItemRequest,
        request_id: &str,
    ) -> Result<ModificationResult, ModificationError> {
        let validation = self.tokens.verify(token)?;
        let result = self
            .run_modification(
                order_id,
                &validation,
                vec![ItemOp::Add {
                    variant_id: request.variant_id,
                    quantity: request.quantity,
                }],
                request_id,
            )
            .await?;
        self.notify_updated(&result);
        Ok(result)
    }

    /// Set an existing line item's quantity.
    pub async fn update_quantity(
        &self,
        order_id: &OrderId,
        token: &str,
        request: UpdateQuantityRequest,
        request_id: &str,
    ) -> Result<ModificationResult, ModificationError> {
        let validation = self.tokens.verify(token)?;
        let result = self
            .run_modification(
                order_id,
                &validation,
                vec![ItemOp::SetQuantity {
                    line_item_id: request.line_item_id,
                    quantity: request.quantity,
                }],
                request_id,
            )
            .await?;
        self.notify_updated(&result);
        Ok(result)
    }

    /// Add several items as one confirmed edit.
    pub async fn batch_modify(
        &self,
        order_id: &OrderId,
        token: &str,
        request: BatchModifyRequest,
        request_id: &str,
    ) -> Result<ModificationResult, ModificationError> {
        let validation = self.tokens.verify(token)?;
        let ops = request
            .items
            .into_iter()
            .map(|item| ItemOp::Add {
                variant_id: item.variant_id,
                quantity: item.quantity,
            })
            .collect();
        let result = self
            .run_modification(order_id, &validation, ops, request_id)
            .await?;
        self.notify_updated(&result);
        Ok(result)
    }

    /// Cancel the order, voiding or refunding the payment depending on
    /// whether the modification window is still open.
    pub async fn cancel(
        &self,
        order_id: &OrderId,
        token: &str,
        request_id: &str,
    ) -> Result<ModificationResult, ModificationError> {
        let validation = self.tokens.verify(token)?;
        let outcome = self.run_cancel(order_id, &validation, request_id).await?;
        if outcome.newly_canceled {
            self.notify_canceled(order_id, outcome.refunded);
        }
        Ok(outcome.result)
    }

    /// Dispatch an order-updated notification, fire-and-forget.
    fn notify_updated(&self, result: &ModificationResult) {
        if result.quantity_diff == 0 {
            return;
        }
        let sink = self.notifications.clone();
        let order_id = result.order_id.clone();
        let new_total = result.new_total;
        tokio::spawn(async move {
            if let Err(e) = sink.order_updated(&order_id, new_total).await {
                warn!(order_id = %order_id, error = %e, "order-updated notification failed");
            }
        });
    }

    /// Dispatch an order-canceled notification, fire-and-forget.
    fn notify_canceled(&self, order_id: &OrderId, refunded: bool) {
        let sink = self.notifications.clone();
        let order_id = order_id.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.order_canceled(&order_id, refunded).await {
                warn!(order_id = %order_id, error = %e, "order-canceled notification failed");
            }
        });
    }
}
