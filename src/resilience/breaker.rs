use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time after the last failure before a probe is let through.
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct Counters {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// Stops calling a failing operation until it has had time to recover.
///
/// A failure while half-open reopens the circuit at once and restarts the
/// recovery timer.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    counters: Mutex<Counters>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(Counters {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.counters.lock().state
    }

    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `op` unless the circuit is open.
    ///
    /// # Errors
    /// Returns [`Error::CircuitOpen`] without calling `op` while open, otherwise
    /// whatever `op` returns.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.allow() {
            return Err(Error::CircuitOpen);
        }
        let result = op().await;
        match &result {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }
        result
    }

    fn allow(&self) -> bool {
        let mut counters = self.counters.lock();
        match counters.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = counters
                    .last_failure
                    .is_none_or(|at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    counters.state = CircuitState::HalfOpen;
                    counters.successes = 0;
                    tracing::info!("circuit half-open");
                }
                recovered
            }
        }
    }

    fn on_failure(&self) {
        let mut counters = self.counters.lock();
        counters.failures = counters.failures.saturating_add(1);
        counters.successes = 0;
        counters.last_failure = Some(Instant::now());
        let reopen = counters.state == CircuitState::HalfOpen
            || (counters.state == CircuitState::Closed
                && counters.failures >= self.config.failure_threshold);
        if reopen {
            counters.state = CircuitState::Open;
            counters.failures = 0;
            tracing::warn!(
                recovery_timeout = ?self.config.recovery_timeout,
                "circuit opened"
            );
        }
    }

    fn on_success(&self) {
        let mut counters = self.counters.lock();
        counters.failures = 0;
        counters.successes = counters.successes.saturating_add(1);
        if counters.state == CircuitState::HalfOpen
            && counters.successes >= self.config.success_threshold
        {
            counters.state = CircuitState::Closed;
            counters.successes = 0;
            tracing::info!("circuit closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
            success_threshold: 2,
        })
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<()> {
        breaker.execute(|| async { Err(Error::Closed) }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<()> {
        breaker.execute(|| async { Ok(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_rejects_without_calling() {
        let breaker = breaker();
        for _ in 0..2 {
            assert!(fail(&breaker).await.is_err());
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        assert!(fail(&breaker).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);

        let calls = &AtomicU32::new(0);
        let err = breaker
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CircuitOpen));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_the_failure_count() {
        let breaker = breaker();
        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        succeed(&breaker).await.unwrap();
        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_through_half_open() {
        let breaker = breaker();
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(matches!(succeed(&breaker).await, Err(Error::CircuitOpen)));

        tokio::time::advance(Duration::from_secs(1)).await;
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens_and_restarts_the_timer() {
        let breaker = breaker();
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(matches!(fail(&breaker).await, Err(Error::Closed)));
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(succeed(&breaker).await, Err(Error::CircuitOpen)));
        tokio::time::advance(Duration::from_secs(5)).await;
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
}
