// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording mock notification sink.

use async_trait::async_trait;
use tokio::sync::Mutex;

use gracehold_core::domain::OrderId;
use gracehold_core::{GraceholdError, NotificationSink};

/// Records notification events as readable strings.
pub struct MockNotificationSink {
    events: Mutex<Vec<String>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }
}

impl Default for MockNotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    async fn order_updated(
        &self,
        order_id: &OrderId,
        new_total: i64,
    ) -> Result<(), GraceholdError> {
        self.events
            .lock()
            .await
            .push(format!("order_updated:{order_id}:{new_total}"));
        Ok(())
    }

    async fn order_canceled(
        &self,
        order_id: &OrderId,
        refunded: bool,
    ) -> Result<(), GraceholdError> {
        self.events
            .lock()
            .await
            .push(format!("order_canceled:{order_id}:refunded={refunded}"));
        Ok(())
    }
}
