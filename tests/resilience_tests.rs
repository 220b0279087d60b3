use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use azure_rt_rs::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig, RetryingClient,
    connect_with_retry_via,
};
use azure_rt_rs::transport::memory::{self, MemoryConnector, MemoryPeer};
use azure_rt_rs::transport::{BoxFuture, Connection, Connector, TransportError};
use azure_rt_rs::{Client, Config, Credential, Error, ErrorKind, ResponseOptions};
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_util::sync::CancellationToken;

fn config() -> Config {
    Config::new(
        "https://unit-test.openai.azure.com",
        "gpt-4o-realtime",
        Credential::ApiKey("secret-key".to_string()),
    )
}

fn quick_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::default()
        .with_max_retries(max_retries)
        .with_delays(Duration::from_millis(10), Duration::from_millis(50))
}

async fn connected() -> (Client, MemoryPeer) {
    let (connector, peer) = memory::pair();
    let client = Client::connect_with(&config(), &connector).await.unwrap();
    (client, peer)
}

/// Refuses the first `failures` dials, then hands out the memory connection.
struct Flaky {
    failures: AtomicU32,
    calls: AtomicU32,
    inner: MemoryConnector,
}

impl Flaky {
    fn new(failures: u32) -> (Self, MemoryPeer) {
        let (inner, peer) = memory::pair();
        let flaky = Self {
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            inner,
        };
        (flaky, peer)
    }
}

impl Connector for Flaky {
    fn connect(&self, request: Request) -> BoxFuture<'_, Result<Connection, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Box::pin(async { Err(TransportError::from("connection refused")) });
        }
        self.inner.connect(request)
    }
}

// =============================================================================
// Dial
// =============================================================================

#[tokio::test(start_paused = true)]
async fn dial_is_retried_until_it_succeeds() {
    let (connector, peer) = Flaky::new(2);
    let client = connect_with_retry_via(
        &config(),
        &connector,
        &RetryConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    assert!(peer.handshake().is_some());
    assert!(!client.is_closed());
}

#[tokio::test(start_paused = true)]
async fn dial_gives_up_after_max_retries() {
    let (connector, _peer) = Flaky::new(10);
    let err = connect_with_retry_via(
        &config(),
        &connector,
        &quick_retry(2),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn invalid_config_is_not_retried() {
    let (connector, _peer) = Flaky::new(0);
    let mut bad = config();
    bad.credential = None;
    let err = connect_with_retry_via(&bad, &connector, &quick_retry(5), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NonRetryable(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn successful_command_passes_through() {
    let (client, mut peer) = connected().await;
    let retrying = RetryingClient::new(client, quick_retry(3));
    let id = retrying.create_response(&ResponseOptions::new()).await.unwrap();
    let sent = peer.next_json().await.unwrap();
    assert_eq!(sent["type"], "response.create");
    assert_eq!(sent["event_id"], id);
}

#[tokio::test(start_paused = true)]
async fn failing_writes_exhaust_retries() {
    let (client, peer) = connected().await;
    peer.fail_writes(true);
    let retrying = RetryingClient::new(client, quick_retry(2));
    let err = retrying.input_commit().await.unwrap_err();
    assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Send);
}

#[tokio::test]
async fn validation_errors_are_not_retried() {
    let (client, mut peer) = connected().await;
    let retrying = RetryingClient::new(client, quick_retry(3));
    let err = retrying.append_pcm16(&[1, 2, 3]).await.unwrap_err();
    assert!(matches!(err, Error::NonRetryable(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(peer.drain().is_empty());
}

#[tokio::test]
async fn closed_client_is_not_retried() {
    let (client, _peer) = connected().await;
    let retrying = RetryingClient::new(client, quick_retry(3));
    retrying.close().await.unwrap();
    let err = retrying.input_clear().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    assert!(retrying.cancellation_token().is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn breaker_guards_the_retry_loop() {
    let (client, peer) = connected().await;
    peer.fail_writes(true);
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 1,
        recovery_timeout: Duration::from_secs(60),
        success_threshold: 1,
    }));
    let retrying =
        RetryingClient::new(client, quick_retry(1)).with_circuit_breaker(Arc::clone(&breaker));

    let first = retrying.input_commit().await.unwrap_err();
    assert!(matches!(first, Error::RetryExhausted { attempts: 2, .. }));
    assert_eq!(breaker.state(), CircuitState::Open);

    let second = retrying.input_commit().await.unwrap_err();
    assert_eq!(second.kind(), ErrorKind::CircuitOpen);

    peer.fail_writes(false);
    tokio::time::advance(Duration::from_secs(60)).await;
    retrying.input_commit().await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn cancellation_aborts_a_pending_backoff() {
    let (client, peer) = connected().await;
    peer.fail_writes(true);
    let retrying = Arc::new(RetryingClient::new(
        client,
        RetryConfig::default()
            .with_delays(Duration::from_secs(3_600), Duration::from_secs(3_600)),
    ));
    let cancel = retrying.cancellation_token();

    let task = {
        let retrying = Arc::clone(&retrying);
        tokio::spawn(async move { retrying.input_commit().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("retry did not observe cancellation")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::RetryCancelled { .. }));
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(err.to_string().contains("retry cancelled"));
}
