// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end saga and worker testing.
//!
//! `TestHarness` assembles the full orchestrator stack -- temp SQLite
//! queue, capture scheduler and worker, token service, modification
//! service -- over mock collaborators. `place_order()` drives the same
//! path order placement does: insert the order, hold the authorization,
//! schedule the capture job, mint the buyer's token.

use std::sync::Arc;

use chrono::{Duration, Utc};

use gracehold_config::GraceholdConfig;
use gracehold_core::domain::{AuthorizationRef, OrderId};
use gracehold_core::{GraceholdError, OrderStore, PaymentProvider};
use gracehold_sagas::{ModificationService, ServiceDeps};
use gracehold_scheduler::{CaptureScheduler, CaptureWorker};
use gracehold_storage::Database;
use gracehold_token::TokenService;

use crate::mock_inventory::MockInventoryStore;
use crate::mock_notify::MockNotificationSink;
use crate::mock_order::{MockOrderStore, OrderFixture};
use crate::mock_payment::MockPaymentProvider;
use crate::mock_pricing::MockPricingCatalog;

/// Builder for test environments with configurable window and retry
/// settings.
pub struct TestHarnessBuilder {
    capture_delay_seconds: u64,
    max_token_age_seconds: u64,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            capture_delay_seconds: 600,
            max_token_age_seconds: 900,
            max_attempts: 3,
            backoff_base_ms: 2000,
        }
    }

    pub fn with_capture_delay(mut self, seconds: u64) -> Self {
        self.capture_delay_seconds = seconds;
        self
    }

    pub fn with_max_token_age(mut self, seconds: u64) -> Self {
        self.max_token_age_seconds = seconds;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Zero retry backoff, so failed jobs are immediately due again.
    pub fn with_zero_backoff(mut self) -> Self {
        self.backoff_base_ms = 0;
        self
    }

    pub async fn build(self) -> Result<TestHarness, GraceholdError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| GraceholdError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = GraceholdConfig::default();
        config.window.capture_delay_seconds = self.capture_delay_seconds;
        config.window.max_token_age_seconds = self.max_token_age_seconds;
        config.window.token_secret = "test-secret".to_string();
        config.capture.max_attempts = self.max_attempts;
        config.capture.backoff_base_ms = self.backoff_base_ms;
        config.storage.database_path = db_path.to_string_lossy().to_string();

        let db = Database::open(&config.storage.database_path).await?;
        let scheduler = CaptureScheduler::new(db.clone(), &config.capture);

        let orders = Arc::new(MockOrderStore::new());
        let inventory = Arc::new(MockInventoryStore::new());
        let payments = Arc::new(MockPaymentProvider::new());
        let pricing = Arc::new(MockPricingCatalog::new());
        let notifications = Arc::new(MockNotificationSink::new());

        let worker = CaptureWorker::new(
            &scheduler,
            &config.capture,
            orders.clone() as Arc<dyn OrderStore>,
            payments.clone() as Arc<dyn PaymentProvider>,
        );

        let service = ModificationService::new(
            &config,
            scheduler.clone(),
            ServiceDeps {
                orders: orders.clone(),
                inventory: inventory.clone(),
                payments: payments.clone(),
                pricing: pricing.clone(),
                notifications: notifications.clone(),
            },
        );

        let tokens = TokenService::new(&config.window);

        Ok(TestHarness {
            service,
            scheduler,
            worker,
            tokens,
            db,
            orders,
            inventory,
            payments,
            pricing,
            notifications,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// Fully assembled orchestrator over mock collaborators.
pub struct TestHarness {
    pub service: ModificationService,
    pub scheduler: CaptureScheduler,
    pub worker: CaptureWorker,
    pub tokens: TokenService,
    /// Raw handle to the queue database, for tests that drive job states
    /// directly.
    pub db: Database,
    pub orders: Arc<MockOrderStore>,
    pub inventory: Arc<MockInventoryStore>,
    pub payments: Arc<MockPaymentProvider>,
    pub pricing: Arc<MockPricingCatalog>,
    pub notifications: Arc<MockNotificationSink>,
    pub config: GraceholdConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Place an order end-to-end: insert the record, hold the
    /// authorization for its total, schedule the capture job, and return
    /// the buyer's capability token.
    pub async fn place_order(&self, fixture: OrderFixture) -> String {
        let order = fixture.build();
        let order_id = order.id.clone();
        let authorization_ref = order
            .metadata
            .authorization_ref
            .clone()
            .expect("fixture orders carry an authorization ref");
        let total = order.total();
        let created_at = order.created_at;

        self.orders.insert(order).await;
        self.payments
            .hold_authorization(&authorization_ref.0, total)
            .await;

        self.service
            .on_order_placed(order_id, authorization_ref, created_at)
            .await
            .expect("order placement")
            .encoded
    }

    /// Mint a valid token for an order without going through placement.
    pub fn token_for(&self, order_id: &str, authorization_ref: &str) -> String {
        self.tokens
            .issue(
                OrderId(order_id.to_string()),
                AuthorizationRef(authorization_ref.to_string()),
                Utc::now(),
            )
            .encoded
    }

    /// Mint a well-formed but expired token (backdated past the window).
    pub fn expired_token_for(&self, order_id: &str, authorization_ref: &str) -> String {
        let window = self
            .config
            .window
            .capture_delay_seconds
            .min(self.config.window.max_token_age_seconds) as i64;
        self.tokens
            .issue(
                OrderId(order_id.to_string()),
                AuthorizationRef(authorization_ref.to_string()),
                Utc::now() - Duration::seconds(window + 60),
            )
            .encoded
    }
}
