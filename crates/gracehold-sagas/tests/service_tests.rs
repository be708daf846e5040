// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end saga tests over the full orchestrator stack: modification
//! service, capture scheduler, capture worker, and mock collaborators.

use std::time::Duration;

use gracehold_core::domain::{
    DeclineCode, JobState, LineItemId, OrderId, OrderStatus, PaymentCollectionStatus,
    PaymentStatusTag, VariantId,
};
use gracehold_sagas::{
    AddItemRequest, BatchModifyRequest, ModificationError, UpdateQuantityRequest,
};
use gracehold_storage::queries::jobs;
use gracehold_storage::Database;
use gracehold_test_utils::{OrderFixture, PaymentCall, TestHarness};

fn base_order() -> OrderFixture {
    // Total 5000: 2 x 1500 + 1 x 2000.
    OrderFixture::new("ord_1", "pi_1")
        .with_item("var_a", 2, 1500)
        .with_item("var_b", 1, 2000)
}

fn oid() -> OrderId {
    OrderId("ord_1".into())
}

fn add_request(variant: &str, quantity: u32) -> AddItemRequest {
    AddItemRequest {
        variant_id: VariantId(variant.into()),
        quantity,
    }
}

/// Claim the order's capture job so it is mid-flight, like a worker that
/// started capturing.
async fn make_job_active(db: &Database) {
    jobs::claim_due(
        db,
        &Database::timestamp_after(chrono::Duration::seconds(3600)),
        &Database::timestamp_after(chrono::Duration::seconds(300)),
    )
    .await
    .unwrap()
    .expect("a job to claim");
}

// --- Add item ---

#[tokio::test]
async fn add_item_grows_total_and_authorization() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;

    let result = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap();

    assert_eq!(result.new_total, 6500);
    assert_eq!(result.quantity_diff, 1);
    assert_eq!(result.payment_status, PaymentStatusTag::Succeeded);
    assert_eq!(result.capture_job, Some(JobState::Waiting));

    // The hold grew by exactly the delta.
    let auth = h.payments.authorization("pi_1").await.unwrap();
    assert_eq!(auth.amount, 6500);

    // The order and its payment collection reflect the new total.
    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.total(), 6500);
    assert_eq!(order.payment_collections[0].amount, 6500);
}

#[tokio::test]
async fn add_item_replay_does_not_double_authorize() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;

    h.service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap();

    // Client retry of the same logical request: same request id.
    let _ = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await;

    let auth = h.payments.authorization("pi_1").await.unwrap();
    assert_eq!(auth.amount, 6500, "authorization must not grow twice");

    let set_amount_calls: Vec<_> = h
        .payments
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, PaymentCall::SetAmount { .. }))
        .collect();
    assert_eq!(set_amount_calls.len(), 1, "provider applied the increment once");
}

#[tokio::test]
async fn declined_increment_aborts_before_touching_the_order() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;
    h.payments
        .script_decline(DeclineCode::InsufficientFunds)
        .await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();

    assert_eq!(err.code(), "PAYMENT_DECLINED");
    assert!(matches!(
        err,
        ModificationError::PaymentDeclined {
            retryable: true,
            code: DeclineCode::InsufficientFunds,
        }
    ));

    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.total(), 5000, "order untouched after decline");
    assert_eq!(
        h.payments.authorization("pi_1").await.unwrap().amount,
        5000
    );
}

#[tokio::test]
async fn failed_order_edit_rolls_the_authorization_back() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;
    h.orders.fail_op("apply_item_ops").await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INTERNAL_ERROR");

    // Compensation symmetry: the hold is back at its pre-call amount.
    let auth = h.payments.authorization("pi_1").await.unwrap();
    assert_eq!(auth.amount, 5000);

    let calls = h.payments.calls().await;
    assert!(matches!(
        calls.as_slice(),
        [
            PaymentCall::SetAmount { amount: 6500, .. },
            PaymentCall::SetAmount { amount: 5000, .. },
        ]
    ));
}

#[tokio::test]
async fn failed_rollback_is_surfaced_as_opaque_internal_error() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;
    h.orders.fail_op("apply_item_ops").await;
    // Forward increment succeeds; the rollback fails.
    h.payments.fail_op_after("set_amount", 1).await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();

    assert_eq!(err.code(), "INTERNAL_ERROR");
    assert_eq!(err.to_string(), "internal error; please contact support");

    // The oversold hold is left in place for the operator, not retried.
    let auth = h.payments.authorization("pi_1").await.unwrap();
    assert_eq!(auth.amount, 6500);
}

#[tokio::test]
async fn insufficient_stock_reports_every_shortage() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1000).await;
    h.pricing.set_price("var_d", 2000).await;
    h.inventory.set_available("var_c", 1).await;
    h.inventory.set_available("var_d", 0).await;

    let err = h
        .service
        .batch_modify(
            &oid(),
            &token,
            BatchModifyRequest {
                items: vec![add_request("var_c", 3), add_request("var_d", 2)],
            },
            "req_1",
        )
        .await
        .unwrap_err();

    let ModificationError::InsufficientStock { shortages } = err else {
        panic!("expected InsufficientStock, got {err:?}");
    };
    assert_eq!(shortages.len(), 2, "both failing lines reported at once");
    assert_eq!(shortages[0].variant_id, VariantId("var_c".into()));
    assert_eq!(shortages[0].requested, 3);
    assert_eq!(shortages[0].available, 1);
    assert_eq!(shortages[1].variant_id, VariantId("var_d".into()));

    // No external calls were made.
    assert!(h.payments.calls().await.is_empty());
    assert_eq!(h.orders.order(&oid()).await.unwrap().total(), 5000);
}

// --- Update quantity ---

#[tokio::test]
async fn setting_quantity_to_current_value_is_a_no_op_with_no_external_calls() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let result = h
        .service
        .update_quantity(
            &oid(),
            &token,
            UpdateQuantityRequest {
                line_item_id: LineItemId("li_ord_1_1".into()),
                quantity: 2,
            },
            "req_1",
        )
        .await
        .unwrap();

    assert_eq!(result.message.as_deref(), Some("no update needed"));
    assert_eq!(result.payment_status, PaymentStatusTag::Unchanged);
    assert_eq!(result.quantity_diff, 0);
    assert_eq!(result.new_total, 5000);
    assert!(h.payments.calls().await.is_empty(), "zero external calls");
}

#[tokio::test]
async fn quantity_increase_charges_only_the_delta() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let result = h
        .service
        .update_quantity(
            &oid(),
            &token,
            UpdateQuantityRequest {
                line_item_id: LineItemId("li_ord_1_1".into()),
                quantity: 3,
            },
            "req_1",
        )
        .await
        .unwrap();

    assert_eq!(result.new_total, 6500);
    assert_eq!(result.quantity_diff, 1);
    assert_eq!(h.payments.authorization("pi_1").await.unwrap().amount, 6500);
}

#[tokio::test]
async fn quantity_decrease_leaves_the_authorization_for_capture_time() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let result = h
        .service
        .update_quantity(
            &oid(),
            &token,
            UpdateQuantityRequest {
                line_item_id: LineItemId("li_ord_1_1".into()),
                quantity: 1,
            },
            "req_1",
        )
        .await
        .unwrap();

    assert_eq!(result.new_total, 3500);
    assert_eq!(result.quantity_diff, -1);
    // The hold is reconciled at capture time, not decremented now.
    assert_eq!(result.payment_status, PaymentStatusTag::Unchanged);
    assert_eq!(h.payments.authorization("pi_1").await.unwrap().amount, 5000);

    // Fulfillment demands immediate capture: the worker captures the
    // CURRENT (reduced) total.
    h.service.capture_now(&oid()).await.unwrap();
    h.worker.drain_due().await.unwrap();

    let capture_calls: Vec<_> = h
        .payments
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, PaymentCall::Capture { .. }))
        .collect();
    assert!(matches!(
        capture_calls.as_slice(),
        [PaymentCall::Capture { amount: 3500, .. }]
    ));
}

#[tokio::test]
async fn unknown_line_item_is_rejected() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let err = h
        .service
        .update_quantity(
            &oid(),
            &token,
            UpdateQuantityRequest {
                line_item_id: LineItemId("li_nope".into()),
                quantity: 1,
            },
            "req_1",
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ITEM_NOT_FOUND");
}

// --- Batch modify ---

#[tokio::test]
async fn batch_adds_apply_as_one_edit_with_one_authorization_change() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1000).await;
    h.pricing.set_price("var_d", 2000).await;

    let result = h
        .service
        .batch_modify(
            &oid(),
            &token,
            BatchModifyRequest {
                items: vec![add_request("var_c", 2), add_request("var_d", 1)],
            },
            "req_1",
        )
        .await
        .unwrap();

    assert_eq!(result.new_total, 9000);
    assert_eq!(result.quantity_diff, 3);

    let set_amount_calls: Vec<_> = h
        .payments
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, PaymentCall::SetAmount { .. }))
        .collect();
    assert!(matches!(
        set_amount_calls.as_slice(),
        [PaymentCall::SetAmount { amount: 9000, .. }]
    ));
}

// --- Common preconditions ---

#[tokio::test]
async fn garbage_token_is_invalid() {
    let h = TestHarness::builder().build().await.unwrap();
    h.place_order(base_order()).await;

    let err = h
        .service
        .add_item(&oid(), "not-a-token", add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn token_for_another_order_is_a_mismatch_even_when_expired() {
    let h = TestHarness::builder().build().await.unwrap();
    h.place_order(base_order()).await;
    let foreign = h.expired_token_for("ord_other", "pi_other");

    let err = h
        .service
        .add_item(&oid(), &foreign, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOKEN_MISMATCH");

    let err = h.service.cancel(&oid(), &foreign, "req_2").await.unwrap_err();
    assert_eq!(err.code(), "TOKEN_MISMATCH");
}

#[tokio::test]
async fn expired_token_blocks_mutation() {
    let h = TestHarness::builder().build().await.unwrap();
    h.place_order(base_order()).await;
    let expired = h.expired_token_for("ord_1", "pi_1");

    let err = h
        .service
        .add_item(&oid(), &expired, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOKEN_EXPIRED");
}

#[tokio::test]
async fn locked_order_rejects_mutation() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h
        .place_order(base_order().with_locked_for_capture())
        .await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORDER_LOCKED");
}

#[tokio::test]
async fn partially_captured_payment_always_rejects() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h
        .place_order(
            base_order()
                .with_payment_status(PaymentCollectionStatus::PartiallyCaptured)
                .with_captured_amount(2000),
        )
        .await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PARTIAL_CAPTURE");

    let err = h.service.cancel(&oid(), &token, "req_2").await.unwrap_err();
    assert_eq!(err.code(), "PARTIAL_CAPTURE");
}

#[tokio::test]
async fn completed_payment_rejects_mutation_with_distinct_code() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h
        .place_order(base_order().with_payment_status(PaymentCollectionStatus::Completed))
        .await;

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PAYMENT_NOT_MODIFIABLE");
}

#[tokio::test]
async fn canceled_order_rejects_mutation_but_cancel_stays_idempotent() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.service.cancel(&oid(), &token, "req_1").await.unwrap();

    let err = h
        .service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_2")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORDER_ALREADY_CANCELED");

    assert!(h.service.cancel(&oid(), &token, "req_3").await.is_ok());
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.token_for("ord_ghost", "pi_ghost");

    let err = h
        .service
        .add_item(
            &OrderId("ord_ghost".into()),
            &token,
            add_request("var_c", 1),
            "req_1",
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORDER_NOT_FOUND");
}

// --- Cancel ---

#[tokio::test]
async fn cancel_within_window_voids_the_authorization() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let result = h.service.cancel(&oid(), &token, "req_1").await.unwrap();

    assert_eq!(result.payment_status, PaymentStatusTag::Succeeded);
    assert!(result.warning.is_none());
    assert_eq!(result.capture_job, None);
    assert_eq!(result.quantity_diff, -3);

    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);

    let calls = h.payments.calls().await;
    assert!(matches!(calls.as_slice(), [PaymentCall::Void { .. }]));

    // Inventory reservations for every line item were released.
    assert_eq!(h.inventory.released().await.len(), 2);

    // The capture job is gone for good.
    assert_eq!(h.scheduler.job_state(&oid()).await.unwrap(), None);
}

#[tokio::test]
async fn cancel_past_window_refunds_the_captured_amount() {
    let h = TestHarness::builder().build().await.unwrap();
    h.place_order(
        base_order().with_payment_status(PaymentCollectionStatus::Completed),
    )
    .await;
    h.payments.mark_captured("pi_1").await;
    let expired = h.expired_token_for("ord_1", "pi_1");

    let result = h.service.cancel(&oid(), &expired, "req_1").await.unwrap();

    assert_eq!(result.payment_status, PaymentStatusTag::Succeeded);
    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);

    let refunds: Vec<_> = h
        .payments
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, PaymentCall::Refund { .. }))
        .collect();
    assert!(matches!(
        refunds.as_slice(),
        [PaymentCall::Refund { amount: 5000, .. }]
    ));
}

#[tokio::test]
async fn cancel_within_window_on_captured_payment_is_a_lost_race() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    // Provider captured (immediate-capture path won) but the collection
    // still reads authorized.
    h.payments.mark_captured("pi_1").await;

    let err = h.service.cancel(&oid(), &token, "req_1").await.unwrap_err();
    assert_eq!(err.code(), "LATE_CANCEL");

    // Order untouched; the capture job came back via compensation.
    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(
        h.scheduler.job_state(&oid()).await.unwrap(),
        Some(JobState::Waiting)
    );
}

#[tokio::test]
async fn cancel_while_capture_job_is_active_is_a_lost_race() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    make_job_active(&h.db).await;

    let err = h.service.cancel(&oid(), &token, "req_1").await.unwrap_err();
    assert_eq!(err.code(), "LATE_CANCEL");

    // Order remains uncancelled and the job is untouched.
    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(
        h.scheduler.job_state(&oid()).await.unwrap(),
        Some(JobState::Active)
    );
    assert!(h.payments.calls().await.is_empty());
}

#[tokio::test]
async fn shipped_orders_never_cancel_regardless_of_token_state() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h
        .place_order(base_order().with_shipped_fulfillment())
        .await;

    let err = h.service.cancel(&oid(), &token, "req_1").await.unwrap_err();
    assert_eq!(err.code(), "ORDER_SHIPPED");

    let expired = h.expired_token_for("ord_1", "pi_1");
    let err = h
        .service
        .cancel(&oid(), &expired, "req_2")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORDER_SHIPPED");
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    h.service.cancel(&oid(), &token, "req_1").await.unwrap();
    let second = h.service.cancel(&oid(), &token, "req_2").await.unwrap();

    assert_eq!(second.message.as_deref(), Some("order already canceled"));
    assert_eq!(second.payment_status, PaymentStatusTag::Unchanged);

    // Exactly one void despite two cancel calls.
    let voids: Vec<_> = h
        .payments
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, PaymentCall::Void { .. }))
        .collect();
    assert_eq!(voids.len(), 1);
}

#[tokio::test]
async fn failed_void_is_success_with_warning() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.payments.fail_op("void").await;

    let result = h.service.cancel(&oid(), &token, "req_1").await.unwrap();

    // The customer sees their order as canceled either way.
    assert!(result.warning.is_some());
    assert_eq!(result.payment_status, PaymentStatusTag::Unchanged);
    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);

    // The capture job must NOT come back after a successful cancel.
    assert_eq!(h.scheduler.job_state(&oid()).await.unwrap(), None);
}

#[tokio::test]
async fn failed_cancel_step_restores_the_capture_job() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.orders.fail_op("cancel_order").await;

    let err = h.service.cancel(&oid(), &token, "req_1").await.unwrap_err();
    assert_eq!(err.code(), "INTERNAL_ERROR");

    // Compensation re-scheduled the capture with zero delay: the payment
    // is not lost.
    assert_eq!(
        h.scheduler.job_state(&oid()).await.unwrap(),
        Some(JobState::Waiting)
    );
    let job = jobs::get_job(&h.db, "ord_1").await.unwrap().unwrap();
    assert!(job.run_at <= Database::now_timestamp());

    // No void happened for the still-live order.
    assert!(h.payments.calls().await.is_empty());
}

// --- Token validation endpoint ---

#[tokio::test]
async fn validate_token_reports_each_dimension() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    let ok = h.service.validate_token(&oid(), &token);
    assert!(ok.valid && !ok.expired && ok.matches_order);
    assert!(ok.remaining_seconds > 0);

    let mismatched = h.service.validate_token(&OrderId("ord_other".into()), &token);
    assert!(mismatched.valid && !mismatched.matches_order);

    let expired = h.expired_token_for("ord_1", "pi_1");
    let expired_result = h.service.validate_token(&oid(), &expired);
    assert!(expired_result.valid && expired_result.expired);
    assert_eq!(expired_result.remaining_seconds, 0);

    let garbage = h.service.validate_token(&oid(), "junk");
    assert!(!garbage.valid);
}

// --- Notifications ---

#[tokio::test]
async fn successful_modification_notifies_fire_and_forget() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;
    h.pricing.set_price("var_c", 1500).await;

    h.service
        .add_item(&oid(), &token, add_request("var_c", 1), "req_1")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = h.notifications.events().await;
    assert_eq!(events, vec!["order_updated:ord_1:6500".to_string()]);
}

#[tokio::test]
async fn no_op_modification_does_not_notify() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    h.service
        .update_quantity(
            &oid(),
            &token,
            UpdateQuantityRequest {
                line_item_id: LineItemId("li_ord_1_1".into()),
                quantity: 2,
            },
            "req_1",
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.notifications.events().await.is_empty());
}

#[tokio::test]
async fn cancel_notifies_with_refund_flag() {
    let h = TestHarness::builder().build().await.unwrap();
    h.place_order(
        base_order().with_payment_status(PaymentCollectionStatus::Completed),
    )
    .await;
    h.payments.mark_captured("pi_1").await;
    let expired = h.expired_token_for("ord_1", "pi_1");

    h.service.cancel(&oid(), &expired, "req_1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = h.notifications.events().await;
    assert_eq!(events, vec!["order_canceled:ord_1:refunded=true".to_string()]);
}

// --- Placement-to-capture round trip ---

#[tokio::test]
async fn placement_schedules_capture_and_worker_completes_it() {
    let h = TestHarness::builder().build().await.unwrap();
    let token = h.place_order(base_order()).await;

    // The token is live and bound to this order.
    let validation = h.service.validate_token(&oid(), &token);
    assert!(validation.valid && validation.matches_order);

    // The window job is delayed; nothing is due yet.
    assert_eq!(
        h.scheduler.job_state(&oid()).await.unwrap(),
        Some(JobState::Waiting)
    );
    assert_eq!(h.worker.drain_due().await.unwrap(), 0);

    // Fulfillment forces immediate capture.
    h.service.capture_now(&oid()).await.unwrap();
    assert_eq!(h.worker.drain_due().await.unwrap(), 1);

    let order = h.orders.order(&oid()).await.unwrap();
    assert_eq!(
        order.payment_collections[0].status,
        PaymentCollectionStatus::Completed
    );
    assert_eq!(order.payment_collections[0].captured_amount, 5000);
}
