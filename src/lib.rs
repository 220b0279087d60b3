#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Event-driven client for the Azure `OpenAI` Realtime API.
//!
//! A [`Client`] owns one WebSocket connection. Inbound events are decoded and
//! handed, in arrival order, to the handler registered for their type; outbound
//! commands are validated, stamped with a correlation id and written under a
//! per-call deadline. [`resilience`] adds retry and circuit breaking on top.

pub mod assembler;
pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod resilience;
pub mod transport;
pub mod validate;

pub use assembler::{AudioAssembler, TextAssembler};
pub use client::{Client, ConnectionState, EventHandler};
pub use config::{Config, Credential};
pub use error::{ConfigError, Error, ErrorKind, Result, SendFailure, ServerError};
pub use protocol::client_events::ClientEvent;
pub use protocol::models::{
    AudioFormat, ContentPart, ConversationItem, Eagerness, InputAudioTranscription, ItemType,
    Modality, ResponseOptions, Role, SessionConfig, Tool, TurnDetection, TurnDetectionType, Voice,
};
pub use protocol::server_events::{EventType, ServerEvent};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig, RetryingClient,
    connect_resilient, connect_with_retry, with_retry,
};
