//! One-time codes stored in the shared cache under `otp:{email}`.
//!
//! Only a SHA-256 digest of the code is stored. Submissions are counted with
//! the cache's atomic counter under `otp_attempts:{email}:{nonce}`, and a
//! matching code is consumed by winning `otp_claim:{email}:{nonce}`, so
//! concurrent submissions cannot exceed the attempt limit or verify twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cache::CacheStore;
use crate::config::OtpConfig;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct OtpRecord {
    digest: String,
    nonce: u64,
    expires_at_ms: i64,
}

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    /// Code matched and has been consumed.
    Verified,
    /// Code did not match.
    Mismatch {
        /// Guesses left before the code is burned.
        remaining_attempts: u32,
    },
    /// No live code for this address.
    Expired,
    /// Too many wrong guesses; the code was discarded.
    Locked,
}

/// Issues and verifies one-time codes.
#[derive(Clone)]
pub struct OtpStore {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    max_attempts: u32,
}

impl OtpStore {
    /// Creates a store from configuration.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, config: &OtpConfig) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(config.ttl_secs),
            max_attempts: config.max_attempts,
        }
    }

    /// How long an issued code stays valid.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(email: &str) -> String {
        format!("otp:{}", email.trim().to_lowercase())
    }

    fn attempts_key(email: &str, nonce: u64) -> String {
        format!("otp_attempts:{}:{nonce:016x}", email.trim().to_lowercase())
    }

    fn claim_key(email: &str, nonce: u64) -> String {
        format!("otp_claim:{}:{nonce:016x}", email.trim().to_lowercase())
    }

    fn digest(email: &str, code: &str) -> String {
        let input = format!("{}:{code}", email.trim().to_lowercase());
        format!("{:x}", Sha256::digest(input.as_bytes()))
    }

    fn backend_error(err: &crate::cache::CacheError) -> AppError {
        AppError::ExternalService(format!("otp store unavailable: {err}"))
    }

    /// Issues a fresh six-digit code, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot store the code.
    pub async fn issue(&self, email: &str) -> Result<String, AppError> {
        let (code, nonce) = {
            let mut rng = rand::rng();
            (format!("{:06}", rng.random_range(0..1_000_000)), rng.random::<u64>())
        };
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let record = OtpRecord {
            digest: Self::digest(email, &code),
            nonce,
            expires_at_ms: Utc::now().timestamp_millis().saturating_add(ttl_ms),
        };
        self.store(email, &record, self.ttl).await?;
        Ok(code)
    }

    async fn store(&self, email: &str, record: &OtpRecord, ttl: Duration) -> Result<(), AppError> {
        let raw = serde_json::to_string(record).map_err(|e| AppError::Internal(e.to_string()))?;
        self.cache
            .set_raw(&Self::key(email), raw, ttl)
            .await
            .map_err(|e| Self::backend_error(&e))
    }

    /// Checks a submitted code.
    ///
    /// Every submission against a live code takes one slot of the attempt
    /// counter before it is compared. Submissions past the limit are never
    /// compared, and only the first matching submission is `Verified`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unavailable.
    pub async fn verify(&self, email: &str, code: &str) -> Result<OtpOutcome, AppError> {
        let key = Self::key(email);
        let raw = self
            .cache
            .get_raw(&key)
            .await
            .map_err(|e| Self::backend_error(&e))?;
        let Some(record) = raw.and_then(|raw| serde_json::from_str::<OtpRecord>(&raw).ok()) else {
            return Ok(OtpOutcome::Expired);
        };

        let remaining_ms = record.expires_at_ms - Utc::now().timestamp_millis();
        if remaining_ms <= 0 {
            return Ok(OtpOutcome::Expired);
        }
        let window = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0));

        let attempt = self
            .cache
            .incr(&Self::attempts_key(email, record.nonce), window)
            .await
            .map_err(|e| Self::backend_error(&e))?
            .count;
        let max_attempts = u64::from(self.max_attempts);
        if attempt > max_attempts {
            self.burn(&key).await?;
            return Ok(OtpOutcome::Locked);
        }

        if record.digest == Self::digest(email, code) {
            let claim = self
                .cache
                .incr(&Self::claim_key(email, record.nonce), window)
                .await
                .map_err(|e| Self::backend_error(&e))?;
            if claim.count > 1 {
                return Ok(OtpOutcome::Expired);
            }
            self.cache.del(&key).await.map_err(|e| Self::backend_error(&e))?;
            return Ok(OtpOutcome::Verified);
        }

        if attempt == max_attempts {
            self.burn(&key).await?;
            tracing::warn!(email, "otp locked after repeated wrong guesses");
            return Ok(OtpOutcome::Locked);
        }
        Ok(OtpOutcome::Mismatch {
            remaining_attempts: u32::try_from(max_attempts - attempt).unwrap_or(0),
        })
    }

    async fn burn(&self, key: &str) -> Result<(), AppError> {
        self.cache.del(key).await.map_err(|e| Self::backend_error(&e))
    }
}
