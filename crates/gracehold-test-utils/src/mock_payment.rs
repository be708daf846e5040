// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mock payment provider with idempotency-key replay semantics,
//! scripted declines, and a call journal.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gracehold_core::domain::{
    AuthorizationRef, DeclineCode, ProviderAuthStatus, ProviderAuthorization,
};
use gracehold_core::error::{GraceholdError, PaymentError};
use gracehold_core::PaymentProvider;

/// One applied (non-replayed) provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCall {
    SetAmount {
        authorization_ref: String,
        amount: i64,
        idempotency_key: String,
    },
    Capture {
        authorization_ref: String,
        amount: i64,
        idempotency_key: String,
    },
    Void {
        authorization_ref: String,
        idempotency_key: String,
    },
    Refund {
        authorization_ref: String,
        amount: i64,
        idempotency_key: String,
    },
}

/// In-memory [`PaymentProvider`].
///
/// Mimics real provider idempotency: a call whose key was already seen is
/// acknowledged without being applied or journaled, so replay tests can
/// assert on the journal. Declines are scripted FIFO per operation via
/// [`script_decline`]; hard failures via [`fail_op`].
pub struct MockPaymentProvider {
    auths: Mutex<HashMap<String, ProviderAuthorization>>,
    calls: Mutex<Vec<PaymentCall>>,
    seen_keys: Mutex<HashSet<String>>,
    scripted_declines: Mutex<VecDeque<DeclineCode>>,
    /// op -> number of successful calls still allowed before failing.
    failing_ops: Mutex<HashMap<&'static str, u32>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            auths: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            seen_keys: Mutex::new(HashSet::new()),
            scripted_declines: Mutex::new(VecDeque::new()),
            failing_ops: Mutex::new(HashMap::new()),
        }
    }

    /// Register a held authorization.
    pub async fn hold_authorization(&self, authorization_ref: &str, amount: i64) {
        self.auths.lock().await.insert(
            authorization_ref.to_string(),
            ProviderAuthorization {
                authorization_ref: AuthorizationRef(authorization_ref.to_string()),
                status: ProviderAuthStatus::RequiresCapture,
                amount,
                captured_amount: 0,
            },
        );
    }

    /// Flip an authorization to fully captured (simulates a lost race).
    pub async fn mark_captured(&self, authorization_ref: &str) {
        if let Some(auth) = self.auths.lock().await.get_mut(authorization_ref) {
            auth.status = ProviderAuthStatus::Succeeded;
            auth.captured_amount = auth.amount;
        }
    }

    /// Current provider-side view of an authorization.
    pub async fn authorization(&self, authorization_ref: &str) -> Option<ProviderAuthorization> {
        self.auths.lock().await.get(authorization_ref).cloned()
    }

    /// Journal of applied calls, in order. Replayed calls are not recorded.
    pub async fn calls(&self) -> Vec<PaymentCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Queue a decline for the next money-moving call.
    pub async fn script_decline(&self, code: DeclineCode) {
        self.scripted_declines.lock().await.push_back(code);
    }

    /// Make the named operation fail with an infrastructure error until
    /// [`clear_failures`]. Names: `get_authorization`, `set_amount`,
    /// `capture`, `void`, `refund`.
    pub async fn fail_op(&self, op: &'static str) {
        self.fail_op_after(op, 0).await;
    }

    /// Let the named operation succeed `allowed` more times, then fail
    /// persistently. Lets a test break a rollback while the forward call
    /// succeeds.
    pub async fn fail_op_after(&self, op: &'static str, allowed: u32) {
        self.failing_ops.lock().await.insert(op, allowed);
    }

    pub async fn clear_failures(&self) {
        self.failing_ops.lock().await.clear();
        self.scripted_declines.lock().await.clear();
    }

    async fn check_fail(&self, op: &'static str) -> Result<(), PaymentError> {
        let mut failing = self.failing_ops.lock().await;
        if let Some(allowed) = failing.get_mut(op) {
            if *allowed == 0 {
                return Err(PaymentError::Infra(GraceholdError::Provider {
                    message: format!("simulated {op} failure"),
                    source: None,
                }));
            }
            *allowed -= 1;
        }
        Ok(())
    }

    async fn check_decline(&self) -> Result<(), PaymentError> {
        if let Some(code) = self.scripted_declines.lock().await.pop_front() {
            return Err(PaymentError::Declined { code });
        }
        Ok(())
    }

    /// Returns true if the key is new (the call must be applied).
    async fn first_use(&self, idempotency_key: &str) -> bool {
        self.seen_keys
            .lock()
            .await
            .insert(idempotency_key.to_string())
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_authorization(
        &self,
        authorization_ref: &AuthorizationRef,
    ) -> Result<ProviderAuthorization, PaymentError> {
        self.check_fail("get_authorization").await?;
        self.auths
            .lock()
            .await
            .get(&authorization_ref.0)
            .cloned()
            .ok_or_else(|| {
                PaymentError::Infra(GraceholdError::Provider {
                    message: format!("no such authorization {authorization_ref}"),
                    source: None,
                })
            })
    }

    async fn set_authorization_amount(
        &self,
        authorization_ref: &AuthorizationRef,
        new_amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError> {
        self.check_fail("set_amount").await?;
        self.check_decline().await?;
        if !self.first_use(idempotency_key).await {
            return Ok(());
        }

        let mut auths = self.auths.lock().await;
        let auth = auths.get_mut(&authorization_ref.0).ok_or_else(|| {
            PaymentError::Infra(GraceholdError::Provider {
                message: format!("no such authorization {authorization_ref}"),
                source: None,
            })
        })?;
        auth.amount = new_amount;
        drop(auths);

        self.calls.lock().await.push(PaymentCall::SetAmount {
            authorization_ref: authorization_ref.0.clone(),
            amount: new_amount,
            idempotency_key: idempotency_key.to_string(),
        });
        Ok(())
    }

    async fn capture(
        &self,
        authorization_ref: &AuthorizationRef,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError> {
        self.check_fail("capture").await?;
        self.check_decline().await?;
        if !self.first_use(idempotency_key).await {
            return Ok(());
        }

        let mut auths = self.auths.lock().await;
        let auth = auths.get_mut(&authorization_ref.0).ok_or_else(|| {
            PaymentError::Infra(GraceholdError::Provider {
                message: format!("no such authorization {authorization_ref}"),
                source: None,
            })
        })?;
        auth.status = ProviderAuthStatus::Succeeded;
        auth.captured_amount = amount;
        drop(auths);

        self.calls.lock().await.push(PaymentCall::Capture {
            authorization_ref: authorization_ref.0.clone(),
            amount,
            idempotency_key: idempotency_key.to_string(),
        });
        Ok(())
    }

    async fn void(
        &self,
        authorization_ref: &AuthorizationRef,
        idempotency_key: &str,
    ) -> Result<(), PaymentError> {
        self.check_fail("void").await?;
        self.check_decline().await?;
        if !self.first_use(idempotency_key).await {
            return Ok(());
        }

        let mut auths = self.auths.lock().await;
        let auth = auths.get_mut(&authorization_ref.0).ok_or_else(|| {
            PaymentError::Infra(GraceholdError::Provider {
                message: format!("no such authorization {authorization_ref}"),
                source: None,
            })
        })?;
        auth.status = ProviderAuthStatus::Canceled;
        drop(auths);

        self.calls.lock().await.push(PaymentCall::Void {
            authorization_ref: authorization_ref.0.clone(),
            idempotency_key: idempotency_key.to_string(),
        });
        Ok(())
    }

    async fn refund(
        &self,
        authorization_ref: &AuthorizationRef,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), PaymentError> {
        self.check_fail("refund").await?;
        self.check_decline().await?;
        if !self.first_use(idempotency_key).await {
            return Ok(());
        }

        let mut auths = self.auths.lock().await;
        if let Some(auth) = auths.get_mut(&authorization_ref.0) {
            auth.captured_amount -= amount;
        }
        drop(auths);

        self.calls.lock().await.push(PaymentCall::Refund {
            authorization_ref: authorization_ref.0.clone(),
            amount,
            idempotency_key: idempotency_key.to_string(),
        });
        Ok(())
    }
}
