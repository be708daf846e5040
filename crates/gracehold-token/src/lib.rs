// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless capability tokens gating order modification.
//!
//! A token binds an order id and an authorization reference for a bounded
//! window after checkout. It is minted once at order placement, never
//! persisted, and verified on every modification request. There is no
//! revocation list; the short window is the trade-off.
//!
//! Wire form: `base64url(json claims) . base64url(hmac_sha256(claims))`.
//!
//! Verification distinguishes a malformed or tampered token (rejected
//! outright) from an expired-but-well-formed one: an expired token still
//! proves order ownership, which the post-window cancellation path relies
//! on.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use gracehold_config::WindowConfig;
use gracehold_core::domain::{AuthorizationRef, OrderId};

type HmacSha256 = Hmac<Sha256>;

/// Signed claims carried by a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub order_id: OrderId,
    pub authorization_ref: AuthorizationRef,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token: claims plus their encoded wire form.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub claims: CapabilityToken,
    pub encoded: String,
}

impl std::fmt::Display for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encoded)
    }
}

/// Outcome of verifying a well-formed token.
#[derive(Debug, Clone)]
pub struct TokenValidation {
    pub claims: CapabilityToken,
    /// True when the token is past its expiry. Expired tokens are still
    /// returned (not rejected) because callers branch on this: the
    /// post-window cancel path accepts them as proof of ownership.
    pub expired: bool,
}

impl TokenValidation {
    /// Seconds left in the modification window, clamped to zero.
    pub fn remaining_seconds(&self) -> i64 {
        (self.claims.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Token verification failure: bad signature or unparseable form.
///
/// Expiry is NOT an error; see [`TokenValidation::expired`].
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature or format invalid")]
    Invalid,
}

/// Issues and verifies capability tokens with a symmetric secret.
pub struct TokenService {
    secret: Vec<u8>,
    capture_delay_seconds: u64,
    max_token_age_seconds: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("capture_delay_seconds", &self.capture_delay_seconds)
            .field("max_token_age_seconds", &self.max_token_age_seconds)
            .finish()
    }
}

impl TokenService {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            secret: config.token_secret.as_bytes().to_vec(),
            capture_delay_seconds: config.capture_delay_seconds,
            max_token_age_seconds: config.max_token_age_seconds,
        }
    }

    /// Effective token window in seconds.
    ///
    /// The ceiling is recomputed per issuance from both configured values:
    /// a token can never outlive the capture delay even if the max age is
    /// misconfigured larger.
    pub fn window_seconds(&self) -> u64 {
        self.capture_delay_seconds.min(self.max_token_age_seconds)
    }

    /// Mint the token for a just-placed order.
    ///
    /// The token's clock starts at order creation: `issued_at` is
    /// `order_created_at`, and `expires_at = issued_at + window_seconds`.
    pub fn issue(
        &self,
        order_id: OrderId,
        authorization_ref: AuthorizationRef,
        order_created_at: DateTime<Utc>,
    ) -> SignedToken {
        let issued_at = order_created_at;
        let expires_at = issued_at + Duration::seconds(self.window_seconds() as i64);
        let claims = CapabilityToken {
            order_id,
            authorization_ref,
            issued_at,
            expires_at,
        };
        let encoded = self.encode(&claims);
        SignedToken { claims, encoded }
    }

    fn encode(&self, claims: &CapabilityToken) -> String {
        let payload = serde_json::to_vec(claims).expect("token claims serialize");
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key size");
        mac.update(&payload);
        let sig = mac.finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        )
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// Returns [`TokenError::Invalid`] on any malformed or tampered input;
    /// an expired token verifies successfully with `expired: true`.
    pub fn verify(&self, encoded: &str) -> Result<TokenValidation, TokenError> {
        let (payload_b64, sig_b64) = encoded.split_once('.').ok_or(TokenError::Invalid)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key size");
        mac.update(&payload);
        // Constant-time comparison.
        mac.verify_slice(&sig).map_err(|_| TokenError::Invalid)?;

        let claims: CapabilityToken =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;
        let expired = Utc::now() >= claims.expires_at;
        Ok(TokenValidation { claims, expired })
    }
}
