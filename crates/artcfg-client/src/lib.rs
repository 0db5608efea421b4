// # Artifactory HTTP Client
//
// This crate provides the shared HTTP client used by every resource handler.
//
// ## Responsibilities
//
// - Base URL handling and request construction
// - Authentication (access token, API key, basic)
// - Uniform HTTP-status-to-error mapping
// - The YAML system-configuration PATCH, including its single retry on a
//   409 merge conflict
//
// ## What does NOT live here
//
// - ❌ NO general retry/backoff logic (errors propagate to the engine)
// - ❌ NO caching (state is owned by the StateStore)
// - ❌ NO background tasks
// - ❌ NO resource payload knowledge (owned by the handlers)
//
// ## Security
//
// Credentials are provided via configuration, never logged, and redacted
// from the Debug implementation.
//
// ## API Reference
//
// - System configuration: GET/PATCH `artifactory/api/system/configuration`
//   (PATCH body is a partial YAML document merged server-side)
// - REST entities: JSON under `artifactory/api/...`

pub mod yaml;

use artcfg_core::config::{AuthConfig, EndpointConfig};
use artcfg_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Path of the system configuration endpoint, relative to the base URL
pub const SYSTEM_CONFIGURATION_PATH: &str = "artifactory/api/system/configuration";

/// Shared client for the Artifactory REST and YAML configuration APIs
///
/// # Thread Safety
///
/// The client is cheap to clone (reqwest clients share their connection
/// pool) and safe to use across async tasks.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose credentials.
#[derive(Clone)]
pub struct ArtifactoryClient {
    /// Base URL without trailing slash
    base_url: String,

    /// Authentication credentials
    /// ⚠️ NEVER log this value
    auth: AuthConfig,

    /// HTTP client for API requests
    http: reqwest::Client,
}

impl std::fmt::Debug for ArtifactoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactoryClient")
            .field("base_url", &self.base_url)
            .field("auth", &"<REDACTED>")
            .finish()
    }
}

impl ArtifactoryClient {
    /// Create a client bound to the given endpoint
    ///
    /// Validates the endpoint configuration and builds the underlying HTTP
    /// client with the configured timeout.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        endpoint.validate()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.http_timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: endpoint.base_url_trimmed().to_string(),
            auth: endpoint.auth.clone(),
            http,
        })
    }

    /// The base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for an API path
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach credentials to a request
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthConfig::AccessToken { token } => request.bearer_auth(token),
            AuthConfig::ApiKey { key } => request.header("X-JFrog-Art-Api", key),
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    /// GET a JSON entity
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Value))`: The entity exists
    /// - `Ok(None)`: The server returned 404
    /// - `Err(Error)`: Any other failure
    pub async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .authorize(self.http.get(&url))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("GET {} failed: {}", path, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response, path).await?;
        let value = response
            .json()
            .await
            .map_err(|e| Error::http(format!("Failed to parse response from {}: {}", path, e)))?;

        Ok(Some(value))
    }

    /// POST a JSON payload
    pub async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .authorize(self.http.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("POST {} failed: {}", path, e)))?;

        Self::check(response, path).await?;
        Ok(())
    }

    /// PUT a JSON payload
    pub async fn put_json(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let url = self.url(path);
        tracing::debug!("PUT {}", url);

        let response = self
            .authorize(self.http.put(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("PUT {} failed: {}", path, e)))?;

        Self::check(response, path).await?;
        Ok(())
    }

    /// DELETE an entity
    ///
    /// A 404 is tolerated: deleting something that is already gone succeeds.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| Error::http(format!("DELETE {} failed: {}", path, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("DELETE {}: already absent", path);
            return Ok(());
        }

        Self::check(response, path).await?;
        Ok(())
    }

    /// GET the full system configuration document as YAML
    pub async fn get_system_yaml(&self) -> Result<serde_yaml_ng::Value> {
        let url = self.url(SYSTEM_CONFIGURATION_PATH);
        tracing::debug!("GET {}", url);

        let response = self
            .authorize(self.http.get(&url))
            .header("Accept", "application/yaml")
            .send()
            .await
            .map_err(|e| Error::http(format!("System configuration GET failed: {}", e)))?;

        let response = Self::check(response, SYSTEM_CONFIGURATION_PATH).await?;
        let body = response.text().await.map_err(|e| {
            Error::http(format!("Failed to read system configuration: {}", e))
        })?;

        Ok(serde_yaml_ng::from_str(&body)?)
    }

    /// PATCH a partial YAML document into the system configuration
    ///
    /// Artifactory merges the body into its global configuration state. A
    /// concurrent merge surfaces as a 409; that conflict is retried exactly
    /// once, which is the only retry in the whole system.
    pub async fn patch_system_yaml(&self, body: &str) -> Result<()> {
        match self.try_patch_system_yaml(body).await {
            Err(Error::Conflict(msg)) => {
                tracing::warn!(
                    "System configuration PATCH conflicted, retrying once: {}",
                    msg
                );
                self.try_patch_system_yaml(body).await
            }
            other => other,
        }
    }

    /// Single PATCH attempt against the system configuration
    async fn try_patch_system_yaml(&self, body: &str) -> Result<()> {
        let url = self.url(SYSTEM_CONFIGURATION_PATH);
        tracing::debug!("PATCH {}", url);

        let response = self
            .authorize(self.http.patch(&url))
            .header("Content-Type", "application/yaml")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| Error::http(format!("System configuration PATCH failed: {}", e)))?;

        Self::check(response, SYSTEM_CONFIGURATION_PATH).await?;
        Ok(())
    }

    /// Map a non-success response to an error
    async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(map_status(status.as_u16(), path, &body))
    }
}

/// Map an HTTP status code to the uniform error taxonomy
///
/// - 401/403: authentication or permission error
/// - 404: not found
/// - 409: merge conflict
/// - 429: rate limited
/// - 5xx: server error (transient)
/// - anything else: API error with status and body
pub(crate) fn map_status(status: u16, path: &str, body: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient permissions for {} (status {})",
            path, status
        )),
        404 => Error::not_found(format!("{} does not exist", path)),
        409 => Error::conflict(format!("{}: {}", path, body)),
        429 => Error::rate_limited(format!("{}: retry later (status 429)", path)),
        500..=599 => Error::api(status, format!("Server error (transient) on {}: {}", path, body)),
        _ => Error::api(status, format!("{}: {}", path, body)),
    }
}
