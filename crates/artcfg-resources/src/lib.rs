// # Artifactory Resource Handlers
//
// One CRUD adapter per supported configuration resource. Two API families:
//
// ## YAML system-configuration family
//
// `backup`, `proxy`, `property_set`, `ldap_setting`, `ldap_group_setting`,
// and the `mail_server` singleton live inside Artifactory's global system
// configuration. Create, update, and delete all go through the same YAML
// PATCH; reads navigate the full configuration document.
//
// - Create/update: PATCH a partial document containing just this block
// - Delete: PATCH the block to null
// - Read: GET the configuration, look the block up, absent/null means gone
//
// ## REST JSON family
//
// `package_cleanup_policy` is a plain JSON entity under
// `artifactory/api/cleanup/packages/policies`, with a separate enablement
// sub-resource.
//
// Handlers are pass-throughs: no retries, no caching, no background tasks.
// Sequencing and drift detection belong to the engine.

pub mod backup;
pub mod cleanup_policy;
pub mod ldap;
pub mod mail_server;
pub mod property_set;
pub mod proxy;

use artcfg_core::HandlerRegistry;

pub use backup::{BackupHandler, BackupHandlerFactory};
pub use cleanup_policy::{CleanupPolicyHandler, CleanupPolicyHandlerFactory};
pub use ldap::{
    LdapGroupSettingHandler, LdapGroupSettingHandlerFactory, LdapSettingHandler,
    LdapSettingHandlerFactory,
};
pub use mail_server::{MailServerHandler, MailServerHandlerFactory};
pub use property_set::{PropertySetHandler, PropertySetHandlerFactory};
pub use proxy::{ProxyHandler, ProxyHandlerFactory};

/// Register every handler factory this crate provides
pub fn register(registry: &HandlerRegistry) {
    registry.register_handler("backup", Box::new(BackupHandlerFactory));
    registry.register_handler("proxy", Box::new(ProxyHandlerFactory));
    registry.register_handler("property_set", Box::new(PropertySetHandlerFactory));
    registry.register_handler("ldap_setting", Box::new(LdapSettingHandlerFactory));
    registry.register_handler(
        "ldap_group_setting",
        Box::new(LdapGroupSettingHandlerFactory),
    );
    registry.register_handler("mail_server", Box::new(MailServerHandlerFactory));
    registry.register_handler(
        "package_cleanup_policy",
        Box::new(CleanupPolicyHandlerFactory),
    );
}
