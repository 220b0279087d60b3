//! Retry with exponential backoff, a circuit breaker, and a client wrapper that
//! composes the two.

mod breaker;
mod client;
mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{RetryingClient, connect_resilient, connect_with_retry, connect_with_retry_via};
pub use retry::{RetryConfig, RetryPredicate, default_retryable, with_retry};
