use std::time::Duration;

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{ConfigError, Error, Result};

pub const DEFAULT_API_VERSION: &str = "2025-04-01-preview";
pub const REALTIME_PATH: &str = "/openai/realtime";

pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_REALTIME_DEPLOYMENT";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

const API_KEY_HEADER: &str = "api-key";

/// Secret used to authenticate the WebSocket handshake.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as the `api-key` header.
    ApiKey(String),
    /// Sent as `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Credential {
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::ApiKey(secret) | Self::Bearer(secret) => secret,
        }
    }

    fn header(&self) -> Option<(HeaderName, HeaderValue)> {
        let value = match self {
            Self::ApiKey(key) if !key.is_empty() => HeaderValue::from_str(key).ok()?,
            Self::Bearer(token) if !token.is_empty() => {
                HeaderValue::from_str(&format!("Bearer {token}")).ok()?
            }
            _ => return None,
        };
        let name = match self {
            Self::ApiKey(_) => HeaderName::from_static(API_KEY_HEADER),
            Self::Bearer(_) => AUTHORIZATION,
        };
        Some((name, value))
    }

    /// Add this credential's header to `headers`. An empty secret adds nothing.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some((name, mut value)) = self.header() {
            value.set_sensitive(true);
            headers.insert(name, value);
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Connection settings for a realtime session.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Resource base URL, e.g. `https://my-resource.openai.azure.com`.
    pub resource_endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub credential: Option<Credential>,
    /// Upper bound on the connection handshake. `None` waits indefinitely.
    pub dial_timeout: Option<Duration>,
    /// Extra headers sent with the handshake. The credential header wins on conflict.
    pub handshake_headers: HeaderMap,
    /// Subscriber for this client's diagnostics. Falls back to the global default.
    pub dispatch: Option<tracing::Dispatch>,
}

impl Config {
    pub fn new(
        resource_endpoint: impl Into<String>,
        deployment: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            resource_endpoint: resource_endpoint.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credential: Some(credential),
            ..Self::default()
        }
    }

    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or the result fails validation.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::new(name, "environment variable is not set"))
        };
        let mut config = Self::new(
            required(ENV_ENDPOINT)?,
            required(ENV_DEPLOYMENT)?,
            Credential::ApiKey(required(ENV_API_KEY)?),
        );
        if let Some(version) = lookup(ENV_API_VERSION).filter(|v| !v.trim().is_empty()) {
            config.api_version = version;
        }
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub const fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.handshake_headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Check every field, reporting the first offending one.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the field that failed.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.endpoint_url()?;
        if self.deployment.trim().is_empty() {
            return Err(ConfigError::new("deployment", "cannot be empty"));
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::new("api_version", "cannot be empty"));
        }
        let Some(credential) = &self.credential else {
            return Err(ConfigError::new("credential", "is required"));
        };
        if credential.secret().is_empty() {
            return Err(ConfigError::new("credential", "cannot be empty"));
        }
        if credential.header().is_none() {
            return Err(ConfigError::new(
                "credential",
                "contains characters that are not valid in an HTTP header",
            ));
        }
        Ok(())
    }

    fn endpoint_url(&self) -> std::result::Result<Url, ConfigError> {
        if self.resource_endpoint.trim().is_empty() {
            return Err(ConfigError::new("resource_endpoint", "cannot be empty"));
        }
        let url = Url::parse(&self.resource_endpoint).map_err(|err| {
            ConfigError::new("resource_endpoint", format!("invalid URL: {err}"))
                .with_value(&self.resource_endpoint)
        })?;
        if !matches!(url.scheme(), "https" | "wss" | "http" | "ws") {
            return Err(ConfigError::new(
                "resource_endpoint",
                format!("unsupported scheme {:?}, expected https or http", url.scheme()),
            )
            .with_value(&self.resource_endpoint));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::new("resource_endpoint", "URL has no host")
                .with_value(&self.resource_endpoint));
        }
        Ok(url)
    }

    /// WebSocket URL of the realtime endpoint.
    ///
    /// Secure schemes map to `wss`, plain ones to `ws`. Existing query parameters
    /// are kept; `api-version` and `deployment` are set from this config.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a usable URL.
    pub fn realtime_url(&self) -> std::result::Result<Url, ConfigError> {
        let mut url = self.endpoint_url()?;
        let scheme = if matches!(url.scheme(), "https" | "wss") { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| {
            ConfigError::new("resource_endpoint", "cannot be converted to a WebSocket URL")
                .with_value(&self.resource_endpoint)
        })?;
        url.set_path(REALTIME_PATH);

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "api-version" && key != "deployment")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("api-version", &self.api_version)
            .append_pair("deployment", &self.deployment);
        Ok(url)
    }

    /// Handshake request carrying the caller's headers and the credential.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the request cannot be built.
    pub fn handshake_request(&self) -> Result<Request> {
        self.validate()?;
        let url = self.realtime_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| Error::Connection {
                url: url.to_string(),
                operation: "handshake",
                source: Box::new(err),
            })?;
        let headers = request.headers_mut();
        for (name, value) in &self.handshake_headers {
            headers.append(name.clone(), value.clone());
        }
        if let Some(credential) = &self.credential {
            credential.apply(headers);
        }
        Ok(request)
    }
}
