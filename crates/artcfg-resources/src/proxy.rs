//! Outbound proxy handler
//!
//! Proxies live in the `proxies` block of the system configuration, keyed by
//! proxy name. The password is write-only: the server accepts it but never
//! echoes it back, so it is excluded from drift comparison.

use async_trait::async_trait;

use artcfg_client::{yaml, ArtifactoryClient};
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{ProxySpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const ROOT: &str = "proxies";

/// YAML payload of one proxy entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyPayload {
    host: String,
    port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nt_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nt_domain: Option<String>,
    platform_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    redirect_to_hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<String>,
}

impl From<&ProxySpec> for ProxyPayload {
    fn from(spec: &ProxySpec) -> Self {
        Self {
            host: spec.host.clone(),
            port: spec.port,
            username: spec.username.clone(),
            password: spec.password.clone(),
            nt_host: spec.nt_host.clone(),
            nt_domain: spec.nt_domain.clone(),
            platform_default: spec.platform_default,
            redirect_to_hosts: spec.redirect_to_hosts.clone(),
            services: spec.services.clone(),
        }
    }
}

fn expect_proxy(spec: &ResourceSpec) -> Result<&ProxySpec> {
    match spec {
        ResourceSpec::Proxy(proxy) => Ok(proxy),
        other => Err(Error::resource(
            "proxy",
            format!("expected a proxy spec, got '{}'", other.type_name()),
        )),
    }
}

/// Handler for outbound proxy definitions
pub struct ProxyHandler {
    client: ArtifactoryClient,
}

impl ProxyHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let proxy = expect_proxy(spec)?;
        proxy.validate()?;

        let body = yaml::keyed_block(ROOT, &proxy.key, &ProxyPayload::from(proxy))?;
        self.client.patch_system_yaml(&body).await?;

        self.read(&proxy.key).await?.ok_or_else(|| {
            Error::resource(
                "proxy",
                format!("proxy '{}' not present after write", proxy.key),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for ProxyHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>> {
        let document = self.client.get_system_yaml().await?;
        match yaml::lookup(&document, &[ROOT, key]) {
            Some(block) => Ok(Some(ObservedState {
                key: key.to_string(),
                attributes: yaml::yaml_to_json(block)?,
            })),
            None => Ok(None),
        }
    }

    async fn update(&self, _key: &str, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let body = yaml::keyed_block_reset(ROOT, key)?;
        self.client.patch_system_yaml(&body).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let proxy = expect_proxy(spec)?;
        Ok(serde_json::to_value(ProxyPayload::from(proxy))?)
    }

    fn write_only_fields(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn resource_type(&self) -> &'static str {
        "proxy"
    }
}

/// Factory for creating ProxyHandler instances
pub struct ProxyHandlerFactory;

impl ResourceHandlerFactory for ProxyHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(ProxyHandler::new(endpoint)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artcfg_core::config::AuthConfig;

    fn handler() -> ProxyHandler {
        let endpoint = EndpointConfig {
            base_url: "https://artifactory.example.com".to_string(),
            auth: AuthConfig::AccessToken {
                token: "token".to_string(),
            },
            http_timeout_secs: 30,
        };
        ProxyHandler::new(&endpoint).unwrap()
    }

    #[test]
    fn test_desired_payload_omits_unset_optionals() {
        let spec = ResourceSpec::Proxy(ProxySpec::new("corp", "proxy.example.com", 8080));
        let payload = handler().desired_payload(&spec).unwrap();

        assert_eq!(payload["host"], "proxy.example.com");
        assert_eq!(payload["port"], 8080);
        assert!(payload.get("username").is_none());
        assert!(payload.get("ntHost").is_none());
        assert!(payload.get("services").is_none());
    }

    #[test]
    fn test_password_is_write_only() {
        let mut spec = ProxySpec::new("corp", "proxy.example.com", 8080);
        spec.username = Some("svc-proxy".to_string());
        spec.password = Some("hunter2".to_string());
        let spec = ResourceSpec::Proxy(spec);

        let h = handler();
        // Sent in the payload, skipped in drift comparison
        let payload = h.desired_payload(&spec).unwrap();
        assert_eq!(payload["password"], "hunter2");
        assert!(h.write_only_fields().contains(&"password"));
    }
}
