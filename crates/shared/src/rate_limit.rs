//! Fixed-window rate limiting on top of the shared cache counter.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::AppError;

/// Limits how often one subject may hit an action inside a window.
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    action: &'static str,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` hits per `window` for `action`.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, action: &'static str, limit: u64, window: Duration) -> Self {
        Self {
            cache,
            action,
            limit,
            window,
        }
    }

    fn key(&self, subject: &str) -> String {
        format!("rate_limit:{}:{subject}", self.action)
    }

    /// Records one hit for `subject`.
    ///
    /// Fails open when the cache is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::RateLimited` once the window's limit is exceeded.
    pub async fn check(&self, subject: &str) -> Result<(), AppError> {
        let counter = match self.cache.incr(&self.key(subject), self.window).await {
            Ok(counter) => counter,
            Err(err) => {
                tracing::warn!(action = self.action, error = %err, "rate limiter unavailable, allowing request");
                return Ok(());
            }
        };
        if counter.count > self.limit {
            let retry_after_secs = counter.resets_in.as_secs().max(1);
            tracing::info!(
                action = self.action,
                subject,
                count = counter.count,
                retry_after_secs,
                "rate limit exceeded"
            );
            return Err(AppError::RateLimited { retry_after_secs });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaCacheStore;

    #[tokio::test]
    async fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(
            Arc::new(MokaCacheStore::new(100)),
            "payout_request",
            2,
            Duration::from_secs(60),
        );
        assert!(limiter.check("instructor-1").await.is_ok());
        assert!(limiter.check("instructor-1").await.is_ok());
        let err = limiter.check("instructor-1").await.unwrap_err();
        assert_eq!(err.error_code(), "RATE_LIMIT_EXCEEDED");
        assert!(matches!(err, AppError::RateLimited { retry_after_secs } if (1..=60).contains(&retry_after_secs)));
    }

    #[tokio::test]
    async fn test_subjects_are_counted_separately() {
        let limiter = RateLimiter::new(
            Arc::new(MokaCacheStore::new(100)),
            "payout_request",
            1,
            Duration::from_secs(60),
        );
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("b").await.is_ok());
        assert!(limiter.check("a").await.is_err());
    }
}
