//! LDAP authentication and group synchronization handlers
//!
//! Both resources live under the `security` block of the system
//! configuration: settings in `security.ldapSettings`, group settings in
//! `security.ldapGroupSettings`. The manager password is write-only and is
//! excluded from drift comparison.

use async_trait::async_trait;

use artcfg_client::{yaml, ArtifactoryClient};
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{LdapGroupSettingSpec, LdapGroupStrategy, LdapSettingSpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const SECURITY_ROOT: &str = "security";
const SETTINGS_BLOCK: &str = "ldapSettings";
const GROUP_SETTINGS_BLOCK: &str = "ldapGroupSettings";

/// YAML payload of one LDAP setting entry
///
/// Search-related fields sit in a nested `search` block, matching the shape
/// of the configuration document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LdapSettingPayload {
    enabled: bool,
    ldap_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_dn_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<LdapSearchPayload>,
    auto_create_user: bool,
    email_attribute: String,
    ldap_poisoning_protection: bool,
    allow_user_to_access_profile: bool,
    paging_support_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LdapSearchPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    search_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_base: Option<String>,
    search_sub_tree: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    manager_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manager_password: Option<String>,
}

impl From<&LdapSettingSpec> for LdapSettingPayload {
    fn from(spec: &LdapSettingSpec) -> Self {
        let has_search = spec.search_filter.is_some()
            || spec.search_base.is_some()
            || spec.manager_dn.is_some()
            || spec.search_sub_tree;

        let search = has_search.then(|| LdapSearchPayload {
            search_filter: spec.search_filter.clone(),
            search_base: spec.search_base.clone(),
            search_sub_tree: spec.search_sub_tree,
            manager_dn: spec.manager_dn.clone(),
            manager_password: spec.manager_password.clone(),
        });

        Self {
            enabled: spec.enabled,
            ldap_url: spec.ldap_url.clone(),
            user_dn_pattern: spec.user_dn_pattern.clone(),
            search,
            auto_create_user: spec.auto_create_user,
            email_attribute: spec.email_attribute.clone(),
            ldap_poisoning_protection: spec.ldap_poisoning_protection,
            allow_user_to_access_profile: spec.allow_user_to_access_profile,
            paging_support_enabled: spec.paging_support_enabled,
        }
    }
}

/// YAML payload of one LDAP group setting entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LdapGroupSettingPayload {
    enabled_ldap: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_base_dn: Option<String>,
    group_name_attribute: String,
    group_member_attribute: String,
    sub_tree: bool,
    filter: String,
    description_attribute: String,
    strategy: LdapGroupStrategy,
}

impl From<&LdapGroupSettingSpec> for LdapGroupSettingPayload {
    fn from(spec: &LdapGroupSettingSpec) -> Self {
        Self {
            enabled_ldap: spec.enabled_ldap.clone(),
            group_base_dn: spec.group_base_dn.clone(),
            group_name_attribute: spec.group_name_attribute.clone(),
            group_member_attribute: spec.group_member_attribute.clone(),
            sub_tree: spec.sub_tree,
            filter: spec.filter.clone(),
            description_attribute: spec.description_attribute.clone(),
            strategy: spec.strategy,
        }
    }
}

fn expect_ldap_setting(spec: &ResourceSpec) -> Result<&LdapSettingSpec> {
    match spec {
        ResourceSpec::LdapSetting(setting) => Ok(setting),
        other => Err(Error::resource(
            "ldap_setting",
            format!("expected an LDAP setting spec, got '{}'", other.type_name()),
        )),
    }
}

fn expect_ldap_group_setting(spec: &ResourceSpec) -> Result<&LdapGroupSettingSpec> {
    match spec {
        ResourceSpec::LdapGroupSetting(setting) => Ok(setting),
        other => Err(Error::resource(
            "ldap_group_setting",
            format!(
                "expected an LDAP group setting spec, got '{}'",
                other.type_name()
            ),
        )),
    }
}

/// Handler for LDAP authentication settings
pub struct LdapSettingHandler {
    client: ArtifactoryClient,
}

impl LdapSettingHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let setting = expect_ldap_setting(spec)?;
        setting.validate()?;

        let body = yaml::nested_keyed_block(
            SECURITY_ROOT,
            SETTINGS_BLOCK,
            &setting.key,
            &LdapSettingPayload::from(setting),
        )?;
        self.client.patch_system_yaml(&body).await?;

        self.read(&setting.key).await?.ok_or_else(|| {
            Error::resource(
                "ldap_setting",
                format!("LDAP setting '{}' not present after write", setting.key),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for LdapSettingHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>> {
        let document = self.client.get_system_yaml().await?;
        match yaml::lookup(&document, &[SECURITY_ROOT, SETTINGS_BLOCK, key]) {
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
        let body = yaml::nested_keyed_block_reset(SECURITY_ROOT, SETTINGS_BLOCK, key)?;
        self.client.patch_system_yaml(&body).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let setting = expect_ldap_setting(spec)?;
        Ok(serde_json::to_value(LdapSettingPayload::from(setting))?)
    }

    fn write_only_fields(&self) -> &'static [&'static str] {
        &["managerPassword"]
    }

    fn resource_type(&self) -> &'static str {
        "ldap_setting"
    }
}

/// Handler for LDAP group synchronization settings
pub struct LdapGroupSettingHandler {
    client: ArtifactoryClient,
}

impl LdapGroupSettingHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let setting = expect_ldap_group_setting(spec)?;
        setting.validate()?;

        let body = yaml::nested_keyed_block(
            SECURITY_ROOT,
            GROUP_SETTINGS_BLOCK,
            &setting.name,
            &LdapGroupSettingPayload::from(setting),
        )?;
        self.client.patch_system_yaml(&body).await?;

        self.read(&setting.name).await?.ok_or_else(|| {
            Error::resource(
                "ldap_group_setting",
                format!(
                    "LDAP group setting '{}' not present after write",
                    setting.name
                ),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for LdapGroupSettingHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>> {
        let document = self.client.get_system_yaml().await?;
        match yaml::lookup(&document, &[SECURITY_ROOT, GROUP_SETTINGS_BLOCK, key]) {
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
        let body = yaml::nested_keyed_block_reset(SECURITY_ROOT, GROUP_SETTINGS_BLOCK, key)?;
        self.client.patch_system_yaml(&body).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let setting = expect_ldap_group_setting(spec)?;
        Ok(serde_json::to_value(LdapGroupSettingPayload::from(setting))?)
    }

    fn resource_type(&self) -> &'static str {
        "ldap_group_setting"
    }
}

/// Factory for creating LdapSettingHandler instances
pub struct LdapSettingHandlerFactory;

impl ResourceHandlerFactory for LdapSettingHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(LdapSettingHandler::new(endpoint)?))
    }
}

/// Factory for creating LdapGroupSettingHandler instances
pub struct LdapGroupSettingHandlerFactory;

impl ResourceHandlerFactory for LdapGroupSettingHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(LdapGroupSettingHandler::new(endpoint)?))
    }
}
