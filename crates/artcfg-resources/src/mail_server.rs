//! Mail server handler
//!
//! The mail server is a singleton `mailServer` block of the system
//! configuration. There is at most one per instance, addressed by the fixed
//! key `mail_server`; the key argument to read/delete is ignored. The SMTP
//! password is write-only.

use async_trait::async_trait;

use artcfg_client::{yaml, ArtifactoryClient};
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{MailServerSpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const ROOT: &str = "mailServer";

/// Fixed address key of the singleton
pub const MAIL_SERVER_KEY: &str = "mail_server";

/// YAML payload of the mail server block
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailServerPayload {
    enabled: bool,
    host: String,
    port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_prefix: Option<String>,
    tls: bool,
    ssl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifactory_url: Option<String>,
}

impl From<&MailServerSpec> for MailServerPayload {
    fn from(spec: &MailServerSpec) -> Self {
        Self {
            enabled: spec.enabled,
            host: spec.host.clone(),
            port: spec.port,
            username: spec.username.clone(),
            password: spec.password.clone(),
            from: spec.from.clone(),
            subject_prefix: spec.subject_prefix.clone(),
            tls: spec.tls,
            ssl: spec.ssl,
            artifactory_url: spec.artifactory_url.clone(),
        }
    }
}

fn expect_mail_server(spec: &ResourceSpec) -> Result<&MailServerSpec> {
    match spec {
        ResourceSpec::MailServer(mail) => Ok(mail),
        other => Err(Error::resource(
            "mail_server",
            format!("expected a mail server spec, got '{}'", other.type_name()),
        )),
    }
}

/// Handler for the singleton mail server
pub struct MailServerHandler {
    client: ArtifactoryClient,
}

impl MailServerHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let mail = expect_mail_server(spec)?;
        mail.validate()?;

        let body = yaml::singleton_block(ROOT, &MailServerPayload::from(mail))?;
        self.client.patch_system_yaml(&body).await?;

        self.read(MAIL_SERVER_KEY).await?.ok_or_else(|| {
            Error::resource("mail_server", "mail server not present after write")
        })
    }
}

#[async_trait]
impl ResourceHandler for MailServerHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn read(&self, _key: &str) -> Result<Option<ObservedState>> {
        let document = self.client.get_system_yaml().await?;
        match yaml::lookup(&document, &[ROOT]) {
            Some(block) => Ok(Some(ObservedState {
                key: MAIL_SERVER_KEY.to_string(),
                attributes: yaml::yaml_to_json(block)?,
            })),
            None => Ok(None),
        }
    }

    async fn update(&self, _key: &str, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        let body = yaml::singleton_reset(ROOT)?;
        self.client.patch_system_yaml(&body).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let mail = expect_mail_server(spec)?;
        Ok(serde_json::to_value(MailServerPayload::from(mail))?)
    }

    fn write_only_fields(&self) -> &'static [&'static str] {
        &["password"]
    }

    fn resource_type(&self) -> &'static str {
        "mail_server"
    }
}

/// Factory for creating MailServerHandler instances
pub struct MailServerHandlerFactory;

impl ResourceHandlerFactory for MailServerHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(MailServerHandler::new(endpoint)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artcfg_core::config::AuthConfig;

    fn handler() -> MailServerHandler {
        let endpoint = EndpointConfig {
            base_url: "https://artifactory.example.com".to_string(),
            auth: AuthConfig::AccessToken {
                token: "token".to_string(),
            },
            http_timeout_secs: 30,
        };
        MailServerHandler::new(&endpoint).unwrap()
    }

    #[test]
    fn test_desired_payload_shape() {
        let mut spec = MailServerSpec::new("smtp.example.com");
        spec.from = Some("artifactory@example.com".to_string());
        spec.subject_prefix = Some("[Artifactory]".to_string());
        spec.tls = true;
        let spec = ResourceSpec::MailServer(spec);

        let payload = handler().desired_payload(&spec).unwrap();
        assert_eq!(payload["host"], "smtp.example.com");
        assert_eq!(payload["port"], 25);
        assert_eq!(payload["subjectPrefix"], "[Artifactory]");
        assert_eq!(payload["tls"], true);
        assert!(payload.get("username").is_none());
    }

    #[test]
    fn test_singleton_patch_body() {
        let spec = MailServerSpec::new("smtp.example.com");
        let body = yaml::singleton_block(ROOT, &MailServerPayload::from(&spec)).unwrap();
        let parsed: serde_yaml_ng::Value = serde_yaml_ng::from_str(&body).unwrap();
        assert!(yaml::lookup(&parsed, &["mailServer"]).is_some());
        assert!(yaml::lookup(&parsed, &["mailServer", "host"]).is_some());
    }
}
