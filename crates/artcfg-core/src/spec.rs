//! Declared resource specifications
//!
//! Each variant of [`ResourceSpec`] is a flat configuration DTO mirroring one
//! Artifactory configuration entity. Validation here is declarative field
//! validation only (non-empty strings, numeric ranges, enum membership);
//! deeper validation is owned by the Artifactory server.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Valid proxy service targets accepted by Artifactory
pub const PROXY_SERVICES: &[&str] = &["jfrt", "jfxr", "jfmc", "jfds"];

/// Package types accepted by the cleanup policy API
pub const CLEANUP_PACKAGE_TYPES: &[&str] = &[
    "cargo", "conan", "debian", "docker", "gems", "generic", "go", "gradle", "helm", "helmoci",
    "huggingfaceml", "maven", "npm", "nuget", "oci", "pypi", "yum",
];

/// A declared Artifactory configuration resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    /// Scheduled backup job (system configuration block)
    Backup(BackupSpec),
    /// Outbound proxy definition (system configuration block)
    Proxy(ProxySpec),
    /// Property set (system configuration block)
    PropertySet(PropertySetSpec),
    /// LDAP authentication setting (system configuration block)
    LdapSetting(LdapSettingSpec),
    /// LDAP group synchronization setting (system configuration block)
    LdapGroupSetting(LdapGroupSettingSpec),
    /// The global mail server (singleton system configuration block)
    MailServer(MailServerSpec),
    /// Package cleanup policy (REST JSON entity)
    PackageCleanupPolicy(PackageCleanupPolicySpec),
}

impl ResourceSpec {
    /// The resource type name, as used for registry lookup and addresses
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceSpec::Backup(_) => "backup",
            ResourceSpec::Proxy(_) => "proxy",
            ResourceSpec::PropertySet(_) => "property_set",
            ResourceSpec::LdapSetting(_) => "ldap_setting",
            ResourceSpec::LdapGroupSetting(_) => "ldap_group_setting",
            ResourceSpec::MailServer(_) => "mail_server",
            ResourceSpec::PackageCleanupPolicy(_) => "package_cleanup_policy",
        }
    }

    /// The key identifying this resource within its type
    ///
    /// Singleton resources (the mail server) use a fixed key.
    pub fn key(&self) -> &str {
        match self {
            ResourceSpec::Backup(s) => &s.key,
            ResourceSpec::Proxy(s) => &s.key,
            ResourceSpec::PropertySet(s) => &s.name,
            ResourceSpec::LdapSetting(s) => &s.key,
            ResourceSpec::LdapGroupSetting(s) => &s.name,
            ResourceSpec::MailServer(_) => "mail_server",
            ResourceSpec::PackageCleanupPolicy(s) => &s.key,
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        match self {
            ResourceSpec::Backup(s) => s.validate(),
            ResourceSpec::Proxy(s) => s.validate(),
            ResourceSpec::PropertySet(s) => s.validate(),
            ResourceSpec::LdapSetting(s) => s.validate(),
            ResourceSpec::LdapGroupSetting(s) => s.validate(),
            ResourceSpec::MailServer(s) => s.validate(),
            ResourceSpec::PackageCleanupPolicy(s) => s.validate(),
        }
    }
}

/// Validate an identifier key (backup key, proxy key, policy key, ...)
fn validate_key(context: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_input(format!("{} key cannot be empty", context)));
    }
    if key.len() > 64 {
        return Err(Error::invalid_input(format!(
            "{} key too long: {} chars (max 64)",
            context,
            key.len()
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(Error::invalid_input(format!(
            "{} key contains invalid characters: '{}'. \
            Valid: alphanumeric, hyphen, underscore, dot.",
            context, key
        )));
    }
    Ok(())
}

/// Scheduled backup job
///
/// Maps to the `backups` block of the Artifactory system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSpec {
    /// Unique backup key
    pub key: String,

    /// Whether the backup job is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression controlling the backup schedule
    pub cron_exp: String,

    /// How long backups are retained, in hours (0 = forever)
    #[serde(default = "default_retention_hours")]
    pub retention_period_hours: u32,

    /// Repositories excluded from this backup
    #[serde(default)]
    pub excluded_repositories: Vec<String>,

    /// Create a single archive instead of a directory tree
    #[serde(default)]
    pub create_archive: bool,

    /// Exclude repositories created after this backup was configured
    #[serde(default)]
    pub exclude_new_repositories: bool,

    /// Notify administrators by mail when a backup fails
    #[serde(default = "default_true")]
    pub send_mail_on_error: bool,

    /// Verify that enough free disk space is available before running
    #[serde(default)]
    pub verify_disk_space: bool,
}

impl BackupSpec {
    /// Create a backup spec with defaults
    pub fn new(key: impl Into<String>, cron_exp: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            cron_exp: cron_exp.into(),
            retention_period_hours: default_retention_hours(),
            excluded_repositories: Vec::new(),
            create_archive: false,
            exclude_new_repositories: false,
            send_mail_on_error: true,
            verify_disk_space: false,
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("Backup", &self.key)?;
        if self.cron_exp.trim().is_empty() {
            return Err(Error::invalid_input("Backup cron expression cannot be empty"));
        }
        Ok(())
    }
}

/// Outbound proxy definition
///
/// Maps to the `proxies` block of the Artifactory system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySpec {
    /// Unique proxy key
    pub key: String,

    /// Proxy host name or IP
    pub host: String,

    /// Proxy port
    pub port: u16,

    /// Optional username for proxy authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Optional password for proxy authentication (write-only)
    #[serde(default)]
    pub password: Option<String>,

    /// NT host name, for NTLM proxies
    #[serde(default)]
    pub nt_host: Option<String>,

    /// NT domain, for NTLM proxies
    #[serde(default)]
    pub nt_domain: Option<String>,

    /// Make this the platform-wide default proxy
    #[serde(default)]
    pub platform_default: bool,

    /// Hosts to which requests may be redirected through this proxy
    #[serde(default)]
    pub redirect_to_hosts: Vec<String>,

    /// Platform services that use this proxy (jfrt, jfxr, jfmc, jfds)
    #[serde(default)]
    pub services: Vec<String>,
}

impl ProxySpec {
    /// Create a proxy spec with defaults
    pub fn new(key: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            key: key.into(),
            host: host.into(),
            port,
            username: None,
            password: None,
            nt_host: None,
            nt_domain: None,
            platform_default: false,
            redirect_to_hosts: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("Proxy", &self.key)?;
        if self.host.is_empty() {
            return Err(Error::invalid_input("Proxy host cannot be empty"));
        }
        if self.port == 0 {
            return Err(Error::invalid_input("Proxy port must be between 1 and 65535"));
        }
        for service in &self.services {
            if !PROXY_SERVICES.contains(&service.as_str()) {
                return Err(Error::invalid_input(format!(
                    "Proxy service '{}' is not valid. Valid services: {}",
                    service,
                    PROXY_SERVICES.join(", ")
                )));
            }
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(Error::invalid_input(
                "Proxy password requires a username",
            ));
        }
        Ok(())
    }
}

/// A single property within a property set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name
    pub name: String,

    /// Predefined values for this property
    #[serde(default)]
    pub predefined_values: Vec<PredefinedValue>,

    /// Restrict the property to the predefined values
    #[serde(default)]
    pub closed_predefined_values: bool,

    /// Allow selecting multiple predefined values
    #[serde(default)]
    pub multiple_choice: bool,
}

/// A predefined value of a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredefinedValue {
    /// Value name
    pub name: String,

    /// Whether this value is selected by default
    #[serde(default)]
    pub default_value: bool,
}

/// Property set
///
/// Maps to the `propertySets` block of the Artifactory system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySetSpec {
    /// Unique property set name
    pub name: String,

    /// Whether the set is visible in the UI
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Properties in this set
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl PropertySetSpec {
    /// Create a property set spec with defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            properties: Vec::new(),
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("Property set", &self.name)?;
        for property in &self.properties {
            if property.name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Property set '{}' contains a property with an empty name",
                    self.name
                )));
            }
            if property.closed_predefined_values && property.predefined_values.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Property '{}' is closed but has no predefined values",
                    property.name
                )));
            }
            for value in &property.predefined_values {
                if value.name.is_empty() {
                    return Err(Error::invalid_input(format!(
                        "Property '{}' contains a predefined value with an empty name",
                        property.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// LDAP authentication setting
///
/// Maps to the `security.ldapSettings` block of the system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapSettingSpec {
    /// Unique LDAP setting key
    pub key: String,

    /// Whether this LDAP setting is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// LDAP server URL (ldap:// or ldaps://)
    pub ldap_url: String,

    /// DN pattern used for direct user binding
    #[serde(default)]
    pub user_dn_pattern: Option<String>,

    /// Search filter for locating users
    #[serde(default)]
    pub search_filter: Option<String>,

    /// Base DN for user searches
    #[serde(default)]
    pub search_base: Option<String>,

    /// Search the entire subtree under the base DN
    #[serde(default)]
    pub search_sub_tree: bool,

    /// Manager DN used for searches
    #[serde(default)]
    pub manager_dn: Option<String>,

    /// Manager password (write-only)
    #[serde(default)]
    pub manager_password: Option<String>,

    /// Automatically create users on first login
    #[serde(default = "default_true")]
    pub auto_create_user: bool,

    /// LDAP attribute holding the user's email address
    #[serde(default = "default_email_attribute")]
    pub email_attribute: String,

    /// Protect against LDAP poisoning by filtering out untrusted users
    #[serde(default = "default_true")]
    pub ldap_poisoning_protection: bool,

    /// Allow LDAP users to access their profile page
    #[serde(default)]
    pub allow_user_to_access_profile: bool,

    /// Enable paged result retrieval
    #[serde(default = "default_true")]
    pub paging_support_enabled: bool,
}

impl LdapSettingSpec {
    /// Create an LDAP setting spec with defaults
    pub fn new(key: impl Into<String>, ldap_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            ldap_url: ldap_url.into(),
            user_dn_pattern: None,
            search_filter: None,
            search_base: None,
            search_sub_tree: false,
            manager_dn: None,
            manager_password: None,
            auto_create_user: true,
            email_attribute: default_email_attribute(),
            ldap_poisoning_protection: true,
            allow_user_to_access_profile: false,
            paging_support_enabled: true,
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("LDAP setting", &self.key)?;
        if !self.ldap_url.starts_with("ldap://") && !self.ldap_url.starts_with("ldaps://") {
            return Err(Error::invalid_input(format!(
                "LDAP URL must use ldap:// or ldaps:// scheme. Got: {}",
                self.ldap_url
            )));
        }
        if self.user_dn_pattern.is_none() && self.search_filter.is_none() {
            return Err(Error::invalid_input(
                "LDAP setting requires a user DN pattern or a search filter",
            ));
        }
        if self.manager_password.is_some() && self.manager_dn.is_none() {
            return Err(Error::invalid_input(
                "LDAP manager password requires a manager DN",
            ));
        }
        Ok(())
    }
}

/// LDAP group synchronization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LdapGroupStrategy {
    /// Group objects list their members
    Static,
    /// User objects list their groups
    Dynamic,
    /// Groups are derived from the user DN hierarchy
    Hierarchical,
}

/// LDAP group synchronization setting
///
/// Maps to the `security.ldapGroupSettings` block of the system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapGroupSettingSpec {
    /// Unique group setting name
    pub name: String,

    /// Key of the LDAP setting this group setting belongs to
    pub enabled_ldap: String,

    /// Base DN for group searches
    #[serde(default)]
    pub group_base_dn: Option<String>,

    /// LDAP attribute holding the group name
    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,

    /// LDAP attribute holding group membership
    pub group_member_attribute: String,

    /// Search the entire subtree under the base DN
    #[serde(default)]
    pub sub_tree: bool,

    /// Search filter for locating groups
    pub filter: String,

    /// LDAP attribute holding the group description
    #[serde(default = "default_description_attribute")]
    pub description_attribute: String,

    /// Group synchronization strategy
    pub strategy: LdapGroupStrategy,
}

impl LdapGroupSettingSpec {
    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("LDAP group setting", &self.name)?;
        if self.enabled_ldap.is_empty() {
            return Err(Error::invalid_input(
                "LDAP group setting requires the key of its LDAP setting (enabled_ldap)",
            ));
        }
        if self.group_member_attribute.is_empty() {
            return Err(Error::invalid_input(
                "LDAP group member attribute cannot be empty",
            ));
        }
        if self.filter.is_empty() {
            return Err(Error::invalid_input("LDAP group filter cannot be empty"));
        }
        Ok(())
    }
}

/// The global mail server (singleton)
///
/// Maps to the `mailServer` block of the system configuration. There is at
/// most one mail server per Artifactory instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailServerSpec {
    /// Whether mail notifications are enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SMTP host
    pub host: String,

    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Optional SMTP username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional SMTP password (write-only)
    #[serde(default)]
    pub password: Option<String>,

    /// From address for outgoing mail
    #[serde(default)]
    pub from: Option<String>,

    /// Prefix added to mail subjects
    #[serde(default)]
    pub subject_prefix: Option<String>,

    /// Use STARTTLS
    #[serde(default)]
    pub tls: bool,

    /// Use SSL
    #[serde(default)]
    pub ssl: bool,

    /// Artifactory URL used in mail links
    #[serde(default)]
    pub artifactory_url: Option<String>,
}

impl MailServerSpec {
    /// Create a mail server spec with defaults
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            enabled: true,
            host: host.into(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
            subject_prefix: None,
            tls: false,
            ssl: false,
            artifactory_url: None,
        }
    }

    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::invalid_input("Mail server host cannot be empty"));
        }
        if self.port == 0 {
            return Err(Error::invalid_input(
                "Mail server port must be between 1 and 65535",
            ));
        }
        if self.tls && self.ssl {
            return Err(Error::invalid_input(
                "Mail server cannot enable both TLS and SSL",
            ));
        }
        Ok(())
    }
}

/// Search criteria of a package cleanup policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupSearchCriteria {
    /// Package types the policy applies to
    pub package_types: Vec<String>,

    /// Repositories included in the policy ("**" for all)
    pub repos: Vec<String>,

    /// Repositories excluded from the policy
    #[serde(default)]
    pub excluded_repos: Vec<String>,

    /// Projects included in the policy
    #[serde(default)]
    pub included_projects: Vec<String>,

    /// Delete versions created more than this many months ago
    #[serde(default)]
    pub created_before_in_months: Option<u32>,

    /// Delete versions not downloaded for this many months
    #[serde(default)]
    pub last_downloaded_before_in_months: Option<u32>,
}

/// Package cleanup policy
///
/// Unlike the system configuration blocks, cleanup policies are a plain REST
/// JSON entity under `artifactory/api/cleanup/packages/policies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageCleanupPolicySpec {
    /// Unique policy key
    pub key: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Cron expression controlling when the policy runs
    #[serde(default)]
    pub cron_exp: Option<String>,

    /// Maximum run duration in minutes (0 = unlimited)
    #[serde(default)]
    pub duration_in_minutes: u32,

    /// Whether the policy is enabled
    #[serde(default)]
    pub enabled: bool,

    /// What the policy matches
    pub search_criteria: CleanupSearchCriteria,

    /// Delete permanently instead of moving to the trashcan
    #[serde(default)]
    pub skip_trashcan: bool,
}

impl PackageCleanupPolicySpec {
    /// Validate the declared fields
    pub fn validate(&self) -> Result<()> {
        validate_key("Cleanup policy", &self.key)?;
        if self.search_criteria.package_types.is_empty() {
            return Err(Error::invalid_input(
                "Cleanup policy requires at least one package type",
            ));
        }
        for package_type in &self.search_criteria.package_types {
            if !CLEANUP_PACKAGE_TYPES.contains(&package_type.as_str()) {
                return Err(Error::invalid_input(format!(
                    "Cleanup package type '{}' is not valid. Valid types: {}",
                    package_type,
                    CLEANUP_PACKAGE_TYPES.join(", ")
                )));
            }
        }
        if self.search_criteria.repos.is_empty() {
            return Err(Error::invalid_input(
                "Cleanup policy requires at least one repository pattern",
            ));
        }
        let has_age_condition = self.search_criteria.created_before_in_months.is_some()
            || self
                .search_criteria
                .last_downloaded_before_in_months
                .is_some();
        if !has_age_condition {
            return Err(Error::invalid_input(
                "Cleanup policy requires created_before_in_months or \
                last_downloaded_before_in_months",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_retention_hours() -> u32 {
    168
}

fn default_email_attribute() -> String {
    "mail".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

fn default_description_attribute() -> String {
    "description".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_validation() {
        let backup = BackupSpec::new("nightly", "0 0 2 * * ?");
        assert!(backup.validate().is_ok());

        let mut bad = backup.clone();
        bad.cron_exp = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = backup;
        bad.key = "has spaces".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_proxy_validation() {
        let mut proxy = ProxySpec::new("corp-proxy", "proxy.example.com", 8080);
        assert!(proxy.validate().is_ok());

        proxy.services = vec!["jfrt".to_string(), "bogus".to_string()];
        assert!(proxy.validate().is_err());

        proxy.services.clear();
        proxy.password = Some("secret".to_string());
        assert!(proxy.validate().is_err(), "password without username");
    }

    #[test]
    fn test_ldap_setting_validation() {
        let ldap = LdapSettingSpec::new("corp-ldap", "ldaps://ldap.example.com");
        // Neither DN pattern nor search filter set yet
        assert!(ldap.validate().is_err());

        let mut ldap = ldap;
        ldap.user_dn_pattern = Some("uid={0},ou=people".to_string());
        assert!(ldap.validate().is_ok());

        ldap.ldap_url = "https://ldap.example.com".to_string();
        assert!(ldap.validate().is_err());
    }

    #[test]
    fn test_mail_server_validation() {
        let mut mail = MailServerSpec::new("smtp.example.com");
        assert!(mail.validate().is_ok());

        mail.tls = true;
        mail.ssl = true;
        assert!(mail.validate().is_err());
    }

    #[test]
    fn test_cleanup_policy_validation() {
        let mut policy = PackageCleanupPolicySpec {
            key: "old-dockers".to_string(),
            description: None,
            cron_exp: None,
            duration_in_minutes: 0,
            enabled: true,
            search_criteria: CleanupSearchCriteria {
                package_types: vec!["docker".to_string()],
                repos: vec!["**".to_string()],
                excluded_repos: Vec::new(),
                included_projects: Vec::new(),
                created_before_in_months: Some(12),
                last_downloaded_before_in_months: None,
            },
            skip_trashcan: false,
        };
        assert!(policy.validate().is_ok());

        policy.search_criteria.package_types = vec!["floppy".to_string()];
        assert!(policy.validate().is_err());

        policy.search_criteria.package_types = vec!["docker".to_string()];
        policy.search_criteria.created_before_in_months = None;
        assert!(policy.validate().is_err(), "no age condition");
    }

    #[test]
    fn test_resource_spec_addressing() {
        let spec = ResourceSpec::Backup(BackupSpec::new("nightly", "0 0 2 * * ?"));
        assert_eq!(spec.type_name(), "backup");
        assert_eq!(spec.key(), "nightly");

        let mail = ResourceSpec::MailServer(MailServerSpec::new("smtp.example.com"));
        assert_eq!(mail.key(), "mail_server");
    }

    #[test]
    fn test_resource_spec_yaml_round_trip() {
        let yaml = r#"
type: proxy
key: corp-proxy
host: proxy.example.com
port: 8080
platform_default: true
services: [jfrt, jfxr]
"#;
        let spec: ResourceSpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(spec.type_name(), "proxy");
        assert_eq!(spec.key(), "corp-proxy");
        assert!(spec.validate().is_ok());
    }
}
