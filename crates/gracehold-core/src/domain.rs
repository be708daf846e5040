// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Gracehold workspace.
//!
//! All monetary amounts are integer minor currency units (cents). Statuses
//! serialize as snake_case strings, matching their stored form in SQLite and
//! the wire form expected by boundary layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-assigned identifier for a held payment authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizationRef(pub String);

impl std::fmt::Display for AuthorizationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

impl std::fmt::Display for LineItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentCollectionId(pub String);

impl std::fmt::Display for PaymentCollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order lifecycle status as seen by the orchestrator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Canceled,
}

/// Canonical payment-collection status.
///
/// Every saga gates on this single status rather than inspecting raw
/// provider state first; the provider status is a cross-check, not the
/// source of truth for preconditions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentCollectionStatus {
    NotPaid,
    Awaiting,
    Authorized,
    RequiresAction,
    PartiallyCaptured,
    Completed,
    Canceled,
}

impl PaymentCollectionStatus {
    /// Statuses under which a money-moving modification is still allowed.
    pub fn is_modifiable(&self) -> bool {
        matches!(
            self,
            PaymentCollectionStatus::NotPaid
                | PaymentCollectionStatus::Awaiting
                | PaymentCollectionStatus::Authorized
                | PaymentCollectionStatus::RequiresAction
        )
    }
}

/// Raw authorization status reported by the external payment processor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderAuthStatus {
    RequiresCapture,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
}

/// Typed decline code returned by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineCode {
    InsufficientFunds,
    ProcessingError,
    AuthorizationExpired,
    Fraudulent,
    Other(String),
}

impl DeclineCode {
    /// Insufficient funds and transient processing errors may succeed on a
    /// later attempt; every other decline is final.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            DeclineCode::InsufficientFunds | DeclineCode::ProcessingError
        )
    }
}

impl std::fmt::Display for DeclineCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineCode::InsufficientFunds => write!(f, "insufficient_funds"),
            DeclineCode::ProcessingError => write!(f, "processing_error"),
            DeclineCode::AuthorizationExpired => write!(f, "authorization_expired"),
            DeclineCode::Fraudulent => write!(f, "fraudulent"),
            DeclineCode::Other(code) => write!(f, "{code}"),
        }
    }
}

/// A single order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price in minor currency units.
    pub unit_price: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price
    }
}

/// A single entry in a confirmed order edit.
///
/// The order store applies a slice of these as one edit, all-or-nothing,
/// confirmed immediately (no separate customer-approval step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOperation {
    Add {
        variant_id: VariantId,
        quantity: u32,
        /// Unit price in minor units, resolved by the caller.
        unit_price: i64,
    },
    SetQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
}

/// A payment collection attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub id: PaymentCollectionId,
    pub status: PaymentCollectionStatus,
    /// Recorded amount in minor units; kept in sync with the order total.
    pub amount: i64,
    /// Provider-assigned authorization reference, when known.
    pub authorization_ref: Option<AuthorizationRef>,
    /// Amount already captured, in minor units.
    pub captured_amount: i64,
}

/// Orchestrator-owned metadata flags on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMetadata {
    /// Cached authorization reference written at order placement. May be
    /// stale relative to the payment record's provider-assigned id.
    pub authorization_ref: Option<AuthorizationRef>,
    /// Cooperative lock set by the capture worker while a capture is in
    /// flight. Modification sagas abort when this is set.
    pub locked_for_capture: bool,
}

/// A fulfillment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub id: String,
    /// Set once the shipment has left the warehouse.
    pub shipped_at: Option<DateTime<Utc>>,
}

/// An order as read from the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub status: OrderStatus,
    /// ISO 4217 currency code, lowercase.
    pub currency: String,
    pub items: Vec<LineItem>,
    pub payment_collections: Vec<PaymentCollection>,
    pub metadata: OrderMetadata,
    pub fulfillments: Vec<Fulfillment>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Current order total in minor units.
    pub fn total(&self) -> i64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Whether any shipment has left the warehouse.
    pub fn any_shipped(&self) -> bool {
        self.fulfillments.iter().any(|f| f.shipped_at.is_some())
    }
}

/// A held authorization as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAuthorization {
    pub authorization_ref: AuthorizationRef,
    pub status: ProviderAuthStatus,
    /// Currently held amount in minor units.
    pub amount: i64,
    /// Amount captured so far in minor units.
    pub captured_amount: i64,
}

/// Resolved price for a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPrice {
    /// Unit price in minor units.
    pub unit_price: i64,
    pub currency: String,
}

/// State of a scheduled capture job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Scheduled and not yet started; a future `run_at` makes it delayed.
    Waiting,
    /// A capture attempt is in flight.
    Active,
    Completed,
    Failed,
}

/// Payment outcome tag carried on every saga result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatusTag {
    /// The held authorization was adjusted (or voided/refunded) successfully.
    Succeeded,
    /// No external payment call was needed.
    Unchanged,
    /// The provider declined the adjustment.
    Declined,
}

/// Output of a modification saga.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationResult {
    pub order_id: OrderId,
    /// Order total after the modification, in minor units.
    pub new_total: i64,
    pub currency: String,
    /// Net change in item quantity (+1 for one added unit, negative for
    /// removals, 0 for no-ops and cancellation bookkeeping).
    pub quantity_diff: i64,
    pub payment_status: PaymentStatusTag,
    /// State of the order's capture job after the saga, if one exists.
    pub capture_job: Option<JobState>,
    /// Human-readable note for no-op and idempotent outcomes.
    pub message: Option<String>,
    /// Set when the order-side outcome succeeded but money-side cleanup
    /// needs manual follow-up (e.g. a failed void after cancellation).
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn order_total_sums_line_items() {
        let order = OrderRecord {
            id: OrderId("ord_1".into()),
            status: OrderStatus::Pending,
            currency: "usd".into(),
            items: vec![
                LineItem {
                    id: LineItemId("li_1".into()),
                    variant_id: VariantId("var_1".into()),
                    quantity: 2,
                    unit_price: 1500,
                },
                LineItem {
                    id: LineItemId("li_2".into()),
                    variant_id: VariantId("var_2".into()),
                    quantity: 1,
                    unit_price: 2000,
                },
            ],
            payment_collections: vec![],
            metadata: OrderMetadata::default(),
            fulfillments: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(order.total(), 5000);
    }

    #[test]
    fn modifiable_statuses() {
        assert!(PaymentCollectionStatus::NotPaid.is_modifiable());
        assert!(PaymentCollectionStatus::Awaiting.is_modifiable());
        assert!(PaymentCollectionStatus::Authorized.is_modifiable());
        assert!(PaymentCollectionStatus::RequiresAction.is_modifiable());
        assert!(!PaymentCollectionStatus::PartiallyCaptured.is_modifiable());
        assert!(!PaymentCollectionStatus::Completed.is_modifiable());
        assert!(!PaymentCollectionStatus::Canceled.is_modifiable());
    }

    #[test]
    fn job_state_round_trips_through_strings() {
        for state in [
            JobState::Waiting,
            JobState::Active,
            JobState::Completed,
            JobState::Failed,
        ] {
            let s = state.to_string();
            assert_eq!(JobState::from_str(&s).unwrap(), state);
        }
    }

    #[test]
    fn shipped_detection_requires_a_departed_fulfillment() {
        let mut order = OrderRecord {
            id: OrderId("ord_1".into()),
            status: OrderStatus::Pending,
            currency: "usd".into(),
            items: vec![],
            payment_collections: vec![],
            metadata: OrderMetadata::default(),
            fulfillments: vec![Fulfillment {
                id: "ful_1".into(),
                shipped_at: None,
            }],
            created_at: Utc::now(),
        };
        assert!(!order.any_shipped());

        order.fulfillments[0].shipped_at = Some(Utc::now());
        assert!(order.any_shipped());
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentCollectionStatus::PartiallyCaptured).unwrap(),
            "\"partially_captured\""
        );
        assert_eq!(serde_json::to_string(&JobState::Waiting).unwrap(), "\"waiting\"");

        let parsed: PaymentCollectionStatus =
            serde_json::from_str("\"requires_action\"").unwrap();
        assert_eq!(parsed, PaymentCollectionStatus::RequiresAction);
    }

    #[test]
    fn decline_code_display_and_retryability() {
        assert_eq!(DeclineCode::InsufficientFunds.to_string(), "insufficient_funds");
        assert!(DeclineCode::ProcessingError.retryable());
        assert!(!DeclineCode::AuthorizationExpired.retryable());
        assert!(!DeclineCode::Other("card_velocity_exceeded".into()).retryable());
    }
}
