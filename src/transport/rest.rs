use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Credential, DEFAULT_API_VERSION};
use crate::error::{ConfigError, Result};

const SESSIONS_PATH: &str = "/openai/realtimeapi/sessions";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize)]
struct CreateSessionRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSecret {
    pub value: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Short-lived session minted for browser or device clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EphemeralSession {
    pub id: String,
    pub client_secret: ClientSecret,
}

impl EphemeralSession {
    /// Bearer credential carrying the ephemeral secret.
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::Bearer(self.client_secret.value.clone())
    }
}

/// `<endpoint>/openai/realtimeapi/sessions?api-version=<version>`, with the
/// default version when `api_version` is empty.
#[must_use]
pub fn sessions_url(resource_endpoint: &str, api_version: &str) -> String {
    let version = if api_version.is_empty() {
        DEFAULT_API_VERSION
    } else {
        api_version
    };
    format!(
        "{}{SESSIONS_PATH}?api-version={version}",
        resource_endpoint.trim_end_matches('/')
    )
}

/// Mints ephemeral session keys over the REST sessions endpoint.
#[derive(Clone, Debug)]
pub struct EphemeralKeyIssuer {
    client: Client,
    url: String,
    api_key: HeaderValue,
}

impl EphemeralKeyIssuer {
    /// # Errors
    /// Returns an error if the key is not a valid header value or the HTTP client fails to build.
    pub fn new(resource_endpoint: &str, api_version: &str, api_key: &str) -> Result<Self> {
        Self::new_with_timeout(resource_endpoint, api_version, api_key, DEFAULT_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the key is not a valid header value or the HTTP client fails to build.
    pub fn new_with_timeout(
        resource_endpoint: &str,
        api_version: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if resource_endpoint.trim().is_empty() {
            return Err(ConfigError::new("resource_endpoint", "cannot be empty").into());
        }
        let mut api_key = HeaderValue::from_str(api_key)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::new("api_key", "must be a non-empty header value"))?;
        api_key.set_sensitive(true);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: sessions_url(resource_endpoint, api_version),
            api_key,
        })
    }

    /// Create a session for `deployment` and return its ephemeral secret.
    ///
    /// # Errors
    /// Returns an error if the request fails or the service answers with a non-success status.
    pub async fn mint(&self, deployment: &str, voice: Option<&str>) -> Result<EphemeralSession> {
        let res = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&CreateSessionRequest {
                model: deployment,
                voice,
            })
            .send()
            .await?
            .error_for_status()?;

        let session: EphemeralSession = res.json().await?;
        tracing::debug!(session_id = %session.id, "minted ephemeral session");
        Ok(session)
    }
}

/// One-shot minting with the default timeout.
///
/// # Errors
/// Same as [`EphemeralKeyIssuer::new`] and [`EphemeralKeyIssuer::mint`].
pub async fn mint_ephemeral_key(
    resource_endpoint: &str,
    api_version: &str,
    api_key: &str,
    deployment: &str,
    voice: Option<&str>,
) -> Result<EphemeralSession> {
    EphemeralKeyIssuer::new(resource_endpoint, api_version, api_key)?
        .mint(deployment, voice)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_url_uses_default_version() {
        assert_eq!(
            sessions_url("https://res.openai.azure.com/", ""),
            "https://res.openai.azure.com/openai/realtimeapi/sessions?api-version=2025-04-01-preview"
        );
        assert_eq!(
            sessions_url("https://res.openai.azure.com", "2024-10-01-preview"),
            "https://res.openai.azure.com/openai/realtimeapi/sessions?api-version=2024-10-01-preview"
        );
    }

    #[test]
    fn ephemeral_session_decodes_and_yields_bearer() {
        let session: EphemeralSession = serde_json::from_str(
            r#"{"id":"sess_1","model":"gpt-4o-realtime","client_secret":{"value":"ek_abc","expires_at":1700000000}}"#,
        )
        .unwrap();
        assert_eq!(session.credential(), Credential::Bearer("ek_abc".to_string()));
        assert_eq!(session.client_secret.expires_at, Some(1_700_000_000));
    }

    #[test]
    fn issuer_rejects_empty_key() {
        let err = EphemeralKeyIssuer::new("https://res.openai.azure.com", "", "").unwrap_err();
        assert_eq!(err.config_error().map(|e| e.field), Some("api_key"));
    }
}
