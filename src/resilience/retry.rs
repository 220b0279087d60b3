use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind, Result};

const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Decides whether a failure is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Retry policy: how many times, how long between attempts, and for which errors.
#[derive(Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the computed delay added or removed at random, in `0.0..=1.0`.
    pub jitter: f64,
    /// `None` uses [`default_retryable`].
    pub retryable: Option<RetryPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: DEFAULT_MULTIPLIER,
            jitter: 0.1,
            retryable: None,
        }
    }
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .field("retryable", &self.retryable.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Connection and send failures are retried; everything else is returned at once.
#[must_use]
pub fn default_retryable(err: &Error) -> bool {
    matches!(err.kind(), ErrorKind::Connection | ErrorKind::Send)
}

impl RetryConfig {
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn with_retryable<F>(mut self, retryable: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retryable = Some(Arc::new(retryable));
        self
    }

    fn is_retryable(&self, err: &Error) -> bool {
        self.retryable
            .as_ref()
            .map_or_else(|| default_retryable(err), |retryable| retryable(err))
    }

    /// `min(max_delay, base_delay * multiplier^attempt)`, without jitter. A
    /// negative or non-finite multiplier falls back to the default of 2.0.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 0.0 {
            self.multiplier
        } else {
            DEFAULT_MULTIPLIER
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_secs_f64() * multiplier.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// [`RetryConfig::backoff`] moved by a random amount within `±jitter`,
    /// kept within `0..=max_delay`. A non-finite jitter means none.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if !self.jitter.is_finite() {
            return delay;
        }
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || delay.is_zero() {
            return delay;
        }
        let secs = delay.as_secs_f64();
        let spread = secs * jitter;
        let jittered = secs + rand::rng().random_range(-spread..=spread);
        Duration::try_from_secs_f64(jittered.clamp(0.0, self.max_delay.as_secs_f64()))
            .unwrap_or(delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out of
/// attempts. Backoff waits end early when `cancel` fires.
///
/// # Errors
/// - [`Error::NonRetryable`] wrapping the first error the policy rejects.
/// - [`Error::RetryExhausted`] wrapping the last error once every attempt failed.
/// - [`Error::RetryCancelled`] wrapping the last error if `cancel` fired during a wait.
pub async fn with_retry<T, F, Fut>(
    cancel: &CancellationToken,
    config: &RetryConfig,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !config.is_retryable(&err) {
            return Err(Error::NonRetryable(Box::new(err)));
        }
        if attempt >= config.max_retries {
            return Err(Error::RetryExhausted {
                attempts: attempt + 1,
                source: Box::new(err),
            });
        }

        let delay = config.delay_for(attempt);
        tracing::warn!(attempt = attempt + 1, ?delay, error = %err, "retrying after failure");
        tokio::select! {
            () = cancel.cancelled() => {
                return Err(Error::RetryCancelled { source: Box::new(err) });
            }
            () = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
