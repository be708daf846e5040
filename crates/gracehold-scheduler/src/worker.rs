// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capture worker: consumes due capture jobs and converts held
//! authorizations into charges.
//!
//! Every attempt re-fetches a fresh order snapshot -- the job payload is
//! never trusted, because the order may have been modified or canceled
//! since scheduling. The capture amount is the order's CURRENT total, not
//! the total at placement time.
//!
//! Failures are retried with exponential backoff up to the configured
//! attempt cap; an exhausted job is written to the durable dead-letter
//! list with a high-severity log. Nothing propagates past the worker loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gracehold_config::CaptureConfig;
use gracehold_core::domain::{AuthorizationRef, OrderId, OrderStatus, PaymentCollectionStatus};
use gracehold_core::error::GraceholdError;
use gracehold_core::{OrderStore, PaymentProvider};
use gracehold_snapshot::{OrderSnapshot, SnapshotReader};
use gracehold_storage::models::CaptureJob;
use gracehold_storage::queries::{dead_letter, jobs};
use gracehold_storage::Database;

use crate::backoff::BackoffPolicy;
use crate::scheduler::CaptureScheduler;

/// Stable idempotency key for capturing an order's authorization. A retried
/// capture after a network blip replays on the provider instead of charging
/// twice.
fn capture_idempotency_key(order_id: &str) -> String {
    format!("capture:{order_id}")
}

/// Long-lived consumer of the capture-job queue.
pub struct CaptureWorker {
    db: Database,
    reader: SnapshotReader,
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentProvider>,
    backoff: BackoffPolicy,
    poll_interval: Duration,
    claim_timeout: chrono::Duration,
}

impl CaptureWorker {
    pub fn new(
        scheduler: &CaptureScheduler,
        config: &CaptureConfig,
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            db: scheduler.database().clone(),
            reader: SnapshotReader::new(orders.clone(), payments.clone()),
            orders,
            payments,
            backoff: BackoffPolicy::from_config(config),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            claim_timeout: chrono::Duration::seconds(config.claim_timeout_seconds as i64),
        }
    }

    /// Run the poll loop until `shutdown` is cancelled.
    ///
    /// The in-flight pass finishes before the loop exits, so a job is never
    /// abandoned mid-capture by a graceful shutdown.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "capture worker started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("capture worker shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain_due().await {
                        error!(error = %e, "capture worker pass failed");
                    }
                }
            }
        }
    }

    /// Claim and process every currently-due job. Returns the number of
    /// jobs processed. Exposed so tests can drive the worker without timers.
    pub async fn drain_due(&self) -> Result<usize, GraceholdError> {
        let mut processed = 0;
        loop {
            let now = Database::now_timestamp();
            let locked_until = Database::timestamp_after(self.claim_timeout);
            let Some(job) = jobs::claim_due(&self.db, &now, &locked_until).await? else {
                break;
            };
            self.process(job).await;
            processed += 1;
        }
        Ok(processed)
    }

    /// Process one claimed job. Handles its own failure recording; never
    /// returns an error.
    async fn process(&self, job: CaptureJob) {
        let order_id = OrderId(job.order_id.clone());
        debug!(order_id = %order_id, attempt = job.attempts + 1, "capture attempt");

        let snapshot = match self.reader.read(&order_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.record_failure(&job, format!("snapshot read failed: {e}"))
                    .await;
                return;
            }
        };

        // Never trust the job payload alone: skip work that became moot
        // since scheduling.
        if snapshot.order_status == OrderStatus::Canceled
            || snapshot.payment_status == PaymentCollectionStatus::Canceled
        {
            info!(order_id = %order_id, "order canceled since scheduling; capture skipped");
            self.complete_quietly(&job).await;
            return;
        }
        if snapshot.payment_status == PaymentCollectionStatus::Completed
            || snapshot.provider_captured()
        {
            info!(order_id = %order_id, "authorization already captured; capture skipped");
            self.complete_quietly(&job).await;
            return;
        }
        if snapshot.payment_status == PaymentCollectionStatus::PartiallyCaptured {
            error!(
                order_id = %order_id,
                captured_amount = snapshot.captured_amount,
                "partially captured payment requires manual handling"
            );
            self.record_failure(&job, "payment is partially captured".to_string())
                .await;
            return;
        }

        let Some(auth_ref) = snapshot.authorization_ref.clone() else {
            self.record_failure(&job, "no authorization reference resolved".to_string())
                .await;
            return;
        };

        // Cooperative lock against concurrent modification sagas.
        if let Err(e) = self.orders.set_locked_for_capture(&order_id, true).await {
            self.record_failure(&job, format!("failed to lock order: {e}"))
                .await;
            return;
        }

        let outcome = self.capture(&order_id, &auth_ref, &snapshot).await;

        if let Err(e) = self.orders.set_locked_for_capture(&order_id, false).await {
            warn!(order_id = %order_id, error = %e, "failed to clear capture lock");
        }

        match outcome {
            Ok(()) => {
                if let Err(e) = jobs::complete(&self.db, &job.order_id).await {
                    error!(order_id = %order_id, error = %e, "captured but failed to complete job");
                } else {
                    info!(
                        order_id = %order_id,
                        amount = snapshot.total,
                        currency = %snapshot.currency,
                        "authorization captured"
                    );
                }
            }
            Err(message) => self.record_failure(&job, message).await,
        }
    }

    async fn capture(
        &self,
        order_id: &OrderId,
        auth_ref: &AuthorizationRef,
        snapshot: &OrderSnapshot,
    ) -> Result<(), String> {
        let key = capture_idempotency_key(&order_id.0);

        self.payments
            .capture(auth_ref, snapshot.total, &key)
            .await
            .map_err(|e| format!("capture failed: {e}"))?;

        // Bookkeeping: the payment collection must reflect the charge. If
        // this fails the job retries; the idempotency key makes the repeated
        // capture a provider-side replay.
        self.orders
            .mark_payment_captured(order_id, &snapshot.payment_collection_id, snapshot.total)
            .await
            .map_err(|e| format!("captured but failed to mark payment: {e}"))?;

        Ok(())
    }

    async fn complete_quietly(&self, job: &CaptureJob) {
        if let Err(e) = jobs::complete(&self.db, &job.order_id).await {
            error!(order_id = %job.order_id, error = %e, "failed to complete capture job");
        }
    }

    /// Record a failed attempt: backoff retry, or dead-letter at the cap.
    async fn record_failure(&self, job: &CaptureJob, message: String) {
        let next_run_at = Database::timestamp_after(self.backoff.delay_for(job.attempts));
        match jobs::fail(&self.db, &job.order_id, &message, &next_run_at).await {
            Ok(jobs::FailOutcome::Retrying { attempts }) => {
                warn!(
                    order_id = %job.order_id,
                    attempts,
                    max_attempts = job.max_attempts,
                    error = %message,
                    "capture attempt failed; will retry"
                );
            }
            Ok(jobs::FailOutcome::Exhausted { attempts }) => {
                if let Err(e) = dead_letter::insert(
                    &self.db,
                    &job.order_id,
                    &job.authorization_ref,
                    attempts,
                    &message,
                )
                .await
                {
                    error!(order_id = %job.order_id, error = %e, "failed to write dead letter");
                }
                error!(
                    order_id = %job.order_id,
                    authorization_ref = %job.authorization_ref,
                    attempts,
                    error = %message,
                    "capture job exhausted; operator intervention required"
                );
            }
            Err(e) => {
                error!(order_id = %job.order_id, error = %e, "failed to record capture failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gracehold_core::domain::AuthorizationRef;
    use gracehold_test_utils::{MockOrderStore, MockPaymentProvider, OrderFixture, PaymentCall};
    use tempfile::tempdir;

    struct Fixture {
        scheduler: CaptureScheduler,
        worker: CaptureWorker,
        orders: Arc<MockOrderStore>,
        payments: Arc<MockPaymentProvider>,
        _dir: tempfile::TempDir,
    }

    async fn setup(config: CaptureConfig) -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let scheduler = CaptureScheduler::new(db, &config);
        let orders = Arc::new(MockOrderStore::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let worker = CaptureWorker::new(
            &scheduler,
            &config,
            orders.clone() as Arc<dyn OrderStore>,
            payments.clone() as Arc<dyn PaymentProvider>,
        );
        Fixture {
            scheduler,
            worker,
            orders,
            payments,
            _dir: dir,
        }
    }

    fn fast_retry_config() -> CaptureConfig {
        CaptureConfig {
            backoff_base_ms: 0,
            ..CaptureConfig::default()
        }
    }

    fn ids() -> (OrderId, AuthorizationRef) {
        (OrderId("ord_1".into()), AuthorizationRef("pi_1".into()))
    }

    #[tokio::test]
    async fn due_job_captures_current_total_and_completes() {
        let f = setup(CaptureConfig::default()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 2, 2500).build())
            .await;
        f.payments.hold_authorization("pi_1", 5000).await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();

        let processed = f.worker.drain_due().await.unwrap();
        assert_eq!(processed, 1);

        let calls = f.payments.calls().await;
        assert!(matches!(
            calls.as_slice(),
            [PaymentCall::Capture { amount: 5000, .. }]
        ));

        let order = f.orders.order(&oid).await.unwrap();
        assert_eq!(
            order.payment_collections[0].status,
            PaymentCollectionStatus::Completed
        );
        assert_eq!(order.payment_collections[0].captured_amount, 5000);
        assert!(!order.metadata.locked_for_capture);

        assert_eq!(
            f.scheduler.job_state(&oid).await.unwrap(),
            Some(gracehold_core::domain::JobState::Completed)
        );
    }

    #[tokio::test]
    async fn capture_uses_total_after_modification_not_scheduled_amount() {
        let f = setup(CaptureConfig::default()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 2, 2500).build())
            .await;
        f.payments.hold_authorization("pi_1", 5000).await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();

        // An add-item saga ran after scheduling.
        f.orders
            .apply_item_ops(
                &oid,
                &[gracehold_core::domain::ItemOperation::Add {
                    variant_id: gracehold_core::domain::VariantId("var_b".into()),
                    quantity: 1,
                    unit_price: 1500,
                }],
            )
            .await
            .unwrap();
        f.payments
            .set_authorization_amount(&aref, 6500, "ord_1:req_1:auth")
            .await
            .unwrap();
        f.payments.clear_calls().await;

        f.worker.drain_due().await.unwrap();

        let calls = f.payments.calls().await;
        assert!(matches!(
            calls.as_slice(),
            [PaymentCall::Capture { amount: 6500, .. }]
        ));
    }

    #[tokio::test]
    async fn canceled_order_is_skipped_and_job_completed() {
        let f = setup(CaptureConfig::default()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 1, 1000).build())
            .await;
        f.payments.hold_authorization("pi_1", 1000).await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();
        f.orders.cancel_order(&oid).await.unwrap();

        f.worker.drain_due().await.unwrap();

        assert!(f.payments.calls().await.is_empty());
        assert_eq!(
            f.scheduler.job_state(&oid).await.unwrap(),
            Some(gracehold_core::domain::JobState::Completed)
        );
    }

    #[tokio::test]
    async fn already_captured_authorization_is_not_charged_again() {
        let f = setup(CaptureConfig::default()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 1, 1000).build())
            .await;
        f.payments.hold_authorization("pi_1", 1000).await;
        f.payments.mark_captured("pi_1").await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();

        f.worker.drain_due().await.unwrap();

        assert!(f.payments.calls().await.is_empty());
        assert_eq!(
            f.scheduler.job_state(&oid).await.unwrap(),
            Some(gracehold_core::domain::JobState::Completed)
        );
    }

    #[tokio::test]
    async fn repeated_failures_dead_letter_with_alert() {
        let f = setup(fast_retry_config()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 1, 1000).build())
            .await;
        f.payments.hold_authorization("pi_1", 1000).await;
        f.payments.fail_op("capture").await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();

        // Zero backoff: each pass retries immediately until exhausted.
        for _ in 0..3 {
            f.worker.drain_due().await.unwrap();
        }

        assert_eq!(
            f.scheduler.job_state(&oid).await.unwrap(),
            Some(gracehold_core::domain::JobState::Failed)
        );
        let dead = f.scheduler.dead_letters(10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].order_id, "ord_1");
        assert_eq!(dead[0].authorization_ref, "pi_1");
        assert_eq!(dead[0].attempts, 3);
        assert!(dead[0].last_error.contains("capture failed"));
    }

    #[tokio::test]
    async fn run_exits_promptly_on_shutdown() {
        let f = setup(CaptureConfig::default()).await;
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();

        // With a pre-cancelled token the loop must return immediately.
        tokio::time::timeout(Duration::from_secs(1), f.worker.run(token))
            .await
            .expect("worker loop should exit on cancellation");
    }

    #[tokio::test]
    async fn exhausted_job_can_be_requeued_and_then_succeed() {
        let f = setup(fast_retry_config()).await;
        let (oid, aref) = ids();

        f.orders
            .insert(OrderFixture::new("ord_1", "pi_1").with_item("var_a", 1, 1000).build())
            .await;
        f.payments.hold_authorization("pi_1", 1000).await;
        f.payments.fail_op("capture").await;
        f.scheduler
            .schedule(&oid, &aref, Duration::ZERO)
            .await
            .unwrap();
        for _ in 0..3 {
            f.worker.drain_due().await.unwrap();
        }

        f.payments.clear_failures().await;
        assert!(f.scheduler.requeue_dead_letter(&oid).await.unwrap());
        f.worker.drain_due().await.unwrap();

        assert_eq!(
            f.scheduler.job_state(&oid).await.unwrap(),
            Some(gracehold_core::domain::JobState::Completed)
        );
    }
}
