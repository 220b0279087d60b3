use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::retry::{RetryConfig, with_retry};
use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::models::{ConversationItem, ResponseOptions, SessionConfig};
use crate::transport::Connector;
use crate::transport::ws::WsConnector;

/// A [`Client`] whose commands are retried, and optionally guarded by a
/// [`CircuitBreaker`] that sits outside the retry loop.
///
/// Handlers are registered on the wrapped client via [`RetryingClient::client`].
#[derive(Debug)]
pub struct RetryingClient {
    client: Arc<Client>,
    retry: RetryConfig,
    breaker: Option<Arc<CircuitBreaker>>,
    cancel: CancellationToken,
}

impl RetryingClient {
    #[must_use]
    pub fn new(client: impl Into<Arc<Client>>, retry: RetryConfig) -> Self {
        Self {
            client: client.into(),
            retry,
            breaker: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_circuit_breaker(mut self, breaker: impl Into<Arc<CircuitBreaker>>) -> Self {
        self.breaker = Some(breaker.into());
        self
    }

    /// Use `cancel` to abort backoff waits instead of the token created by [`RetryingClient::new`].
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn client(&self) -> &Arc<Client> {
        &self.client
    }

    #[must_use]
    pub const fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    #[must_use]
    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_deref()
    }

    /// Cancelling this token aborts every pending backoff wait.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.breaker {
            Some(breaker) => {
                breaker
                    .execute(|| with_retry(&self.cancel, &self.retry, op))
                    .await
            }
            None => with_retry(&self.cancel, &self.retry, op).await,
        }
    }

    /// # Errors
    /// See [`Client::session_update`] and [`with_retry`].
    pub async fn session_update(&self, session: &SessionConfig) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.session_update(session)).await
    }

    /// # Errors
    /// See [`Client::create_response`] and [`with_retry`].
    pub async fn create_response(&self, options: &ResponseOptions) -> Result<String> {
        let client: &Client = &self.client;
        self.run(move || client.create_response(options)).await
    }

    /// # Errors
    /// See [`Client::cancel_response`] and [`with_retry`].
    pub async fn cancel_response(&self) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.cancel_response()).await
    }

    /// # Errors
    /// See [`Client::append_pcm16`] and [`with_retry`].
    pub async fn append_pcm16(&self, pcm: &[u8]) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.append_pcm16(pcm)).await
    }

    /// # Errors
    /// See [`Client::append_pcm16_samples`] and [`with_retry`].
    pub async fn append_pcm16_samples(&self, samples: &[i16]) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.append_pcm16_samples(samples)).await
    }

    /// # Errors
    /// See [`Client::input_commit`] and [`with_retry`].
    pub async fn input_commit(&self) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.input_commit()).await
    }

    /// # Errors
    /// See [`Client::input_clear`] and [`with_retry`].
    pub async fn input_clear(&self) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.input_clear()).await
    }

    /// # Errors
    /// See [`Client::create_conversation_item`] and [`with_retry`].
    pub async fn create_conversation_item(
        &self,
        item: &ConversationItem,
        previous_item_id: Option<&str>,
    ) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.create_conversation_item(item, previous_item_id))
            .await
    }

    /// # Errors
    /// See [`Client::truncate_conversation_item`] and [`with_retry`].
    pub async fn truncate_conversation_item(
        &self,
        item_id: &str,
        content_index: u32,
        audio_end_ms: i64,
    ) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.truncate_conversation_item(item_id, content_index, audio_end_ms))
            .await
    }

    /// # Errors
    /// See [`Client::delete_conversation_item`] and [`with_retry`].
    pub async fn delete_conversation_item(&self, item_id: &str) -> Result<()> {
        let client: &Client = &self.client;
        self.run(move || client.delete_conversation_item(item_id)).await
    }

    /// Abort pending retries, then close the client.
    ///
    /// # Errors
    /// See [`Client::close`].
    pub async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        self.client.close().await
    }
}

/// Dial over WebSocket, retrying connection failures under `retry`.
///
/// # Errors
/// A configuration error is returned at once wrapped in
/// [`Error::NonRetryable`](crate::Error::NonRetryable); see [`with_retry`] for the rest.
pub async fn connect_with_retry(
    config: &Config,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<Client> {
    connect_with_retry_via(config, &WsConnector, retry, cancel).await
}

/// Like [`connect_with_retry`], through a custom [`Connector`].
///
/// # Errors
/// Same as [`connect_with_retry`].
pub async fn connect_with_retry_via(
    config: &Config,
    connector: &dyn Connector,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<Client> {
    with_retry(cancel, retry, move || Client::connect_with(config, connector)).await
}

/// Dial with the default retry policy and return a [`RetryingClient`] guarded
/// by a default [`CircuitBreaker`].
///
/// # Errors
/// Same as [`connect_with_retry`].
pub async fn connect_resilient(config: &Config) -> Result<RetryingClient> {
    let retry = RetryConfig::default();
    let cancel = CancellationToken::new();
    let client = connect_with_retry(config, &retry, &cancel).await?;
    Ok(RetryingClient::new(client, retry)
        .with_circuit_breaker(CircuitBreaker::new(CircuitBreakerConfig::default()))
        .with_cancellation(cancel))
}
