use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Opaque failure reported by a transport implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    RateLimitError,
    AuthenticationError,
    ServerError,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Error object carried by the server's `error` event.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerError {
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    pub code: Option<String>,
    pub message: String,
    pub param: Option<String>,
    pub event_id: Option<String>,
}

/// Coarse classification used by retry predicates and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Send,
    EventProcessing,
    Closed,
    Cancelled,
    CircuitOpen,
    Http,
}

/// A rejected configuration field or command argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config field {field:?}{}: {message}", value_suffix(.value))]
pub struct ConfigError {
    pub field: &'static str,
    pub value: Option<String>,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            value: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

fn value_suffix(value: &Option<String>) -> String {
    value
        .as_ref()
        .map(|value| format!(" (value: {value:?})"))
        .unwrap_or_default()
}

fn id_suffix(event_id: &Option<String>) -> String {
    event_id
        .as_ref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default()
}

/// Why an outbound command did not reach the wire.
#[derive(Error, Debug)]
pub enum SendFailure {
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport write failed: {0}")]
    Transport(#[source] TransportError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{operation} failed for {url:?}: {source}")]
    Connection {
        url: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("failed to send {event_type}{}: {source}", id_suffix(.event_id))]
    Send {
        event_type: &'static str,
        event_id: Option<String>,
        #[source]
        source: SendFailure,
    },

    #[error("failed to process {event_type} event: {source}")]
    Event {
        event_type: String,
        raw: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    #[error("connection is closed")]
    Closed,

    #[error("non-retryable error: {0}")]
    NonRetryable(#[source] Box<Error>),

    #[error("operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("retry cancelled: {source}")]
    RetryCancelled {
        #[source]
        source: Box<Error>,
    },

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("HTTP protocol error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Classify the failure. Retry wrappers report the kind of the error they wrap.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Send { .. } => ErrorKind::Send,
            Self::Event { .. } => ErrorKind::EventProcessing,
            Self::Closed => ErrorKind::Closed,
            Self::NonRetryable(inner) | Self::RetryExhausted { source: inner, .. } => inner.kind(),
            Self::RetryCancelled { .. } => ErrorKind::Cancelled,
            Self::CircuitOpen => ErrorKind::CircuitOpen,
            Self::Http(_) => ErrorKind::Http,
        }
    }

    /// True when a send did not complete within its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Send {
                source: SendFailure::Timeout(_),
                ..
            } => true,
            Self::NonRetryable(inner)
            | Self::RetryExhausted { source: inner, .. }
            | Self::RetryCancelled { source: inner } => inner.is_timeout(),
            _ => false,
        }
    }

    #[must_use]
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(err) => Some(err),
            Self::NonRetryable(inner)
            | Self::RetryExhausted { source: inner, .. }
            | Self::RetryCancelled { source: inner } => inner.config_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_field_and_value() {
        let err = ConfigError::new("voice", "must be one of: alloy").with_value("robot");
        assert_eq!(
            err.to_string(),
            r#"invalid config field "voice" (value: "robot"): must be one of: alloy"#
        );
        let bare = ConfigError::new("credential", "cannot be empty");
        assert_eq!(bare.to_string(), r#"invalid config field "credential": cannot be empty"#);
    }

    #[test]
    fn wrappers_delegate_kind_and_timeout() {
        let timeout = Error::Send {
            event_type: "response.create",
            event_id: Some("evt_1".to_string()),
            source: SendFailure::Timeout(Duration::from_secs(15)),
        };
        assert!(timeout.to_string().contains("evt_1"));
        let exhausted = Error::RetryExhausted {
            attempts: 4,
            source: Box::new(timeout),
        };
        assert_eq!(exhausted.kind(), ErrorKind::Send);
        assert!(exhausted.is_timeout());
        assert!(exhausted.to_string().starts_with("operation failed after 4 attempts"));

        let fatal = Error::NonRetryable(Box::new(
            ConfigError::new("deployment", "cannot be empty").into(),
        ));
        assert_eq!(fatal.kind(), ErrorKind::Configuration);
        assert_eq!(fatal.config_error().map(|e| e.field), Some("deployment"));

        let cancelled = Error::RetryCancelled {
            source: Box::new(Error::Closed),
        };
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn server_error_tolerates_unknown_type() {
        let err: ServerError =
            serde_json::from_str(r#"{"type":"brand_new_error","message":"nope"}"#).unwrap();
        assert_eq!(err.error_type, ApiErrorType::Unknown);
        assert_eq!(err.message, "nope");
    }
}
