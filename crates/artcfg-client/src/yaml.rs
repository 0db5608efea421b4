//! YAML PATCH body construction and system-configuration navigation
//!
//! The system configuration PATCH merges a partial YAML document into
//! Artifactory's global configuration. Keyed blocks live under a root key
//! (`backups`, `proxies`, `propertySets`), security blocks nest one level
//! deeper (`security.ldapSettings`), and singletons sit directly under their
//! root (`mailServer`). A block is removed by patching it to null.

use serde::Serialize;
use serde_yaml_ng::{Mapping, Value};

use artcfg_core::Result;

/// Serialize `{root: value}` to a YAML PATCH body
pub fn singleton_block<T: Serialize>(root: &str, value: &T) -> Result<String> {
    wrap(root, serde_yaml_ng::to_value(value)?)
}

/// Serialize `{root: null}` to a YAML PATCH body (removes the block)
pub fn singleton_reset(root: &str) -> Result<String> {
    wrap(root, Value::Null)
}

/// Serialize `{root: {key: value}}` to a YAML PATCH body
pub fn keyed_block<T: Serialize>(root: &str, key: &str, value: &T) -> Result<String> {
    wrap(root, keyed(key, serde_yaml_ng::to_value(value)?))
}

/// Serialize `{root: {key: null}}` to a YAML PATCH body (removes the entry)
pub fn keyed_block_reset(root: &str, key: &str) -> Result<String> {
    wrap(root, keyed(key, Value::Null))
}

/// Serialize `{outer: {inner: {key: value}}}` to a YAML PATCH body
pub fn nested_keyed_block<T: Serialize>(
    outer: &str,
    inner: &str,
    key: &str,
    value: &T,
) -> Result<String> {
    wrap(outer, keyed(inner, keyed(key, serde_yaml_ng::to_value(value)?)))
}

/// Serialize `{outer: {inner: {key: null}}}` to a YAML PATCH body
pub fn nested_keyed_block_reset(outer: &str, inner: &str, key: &str) -> Result<String> {
    wrap(outer, keyed(inner, keyed(key, Value::Null)))
}

/// Navigate a YAML document along a key path
///
/// Returns `None` if any segment is missing or explicitly null, which the
/// handlers treat the same way as a 404.
pub fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = document;
    for segment in path {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Convert a YAML value to JSON for drift comparison
///
/// The system configuration only uses string keys, so the conversion is
/// lossless for every document this crate reads.
pub fn yaml_to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn keyed(key: &str, value: Value) -> Value {
    let mut mapping = Mapping::new();
    mapping.insert(Value::String(key.to_string()), value);
    Value::Mapping(mapping)
}

fn wrap(root: &str, value: Value) -> Result<String> {
    Ok(serde_yaml_ng::to_string(&keyed(root, value))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct TestPayload {
        enabled: bool,
        cron_exp: String,
    }

    fn payload() -> TestPayload {
        TestPayload {
            enabled: true,
            cron_exp: "0 0 2 * * ?".to_string(),
        }
    }

    #[test]
    fn test_keyed_block_structure() {
        let body = keyed_block("backups", "nightly", &payload()).unwrap();
        let parsed: Value = serde_yaml_ng::from_str(&body).unwrap();

        let block = lookup(&parsed, &["backups", "nightly"]).unwrap();
        assert_eq!(block.get("enabled"), Some(&Value::Bool(true)));
        assert_eq!(
            block.get("cronExp"),
            Some(&Value::String("0 0 2 * * ?".to_string()))
        );
    }

    #[test]
    fn test_keyed_block_reset_is_null() {
        let body = keyed_block_reset("backups", "nightly").unwrap();
        let parsed: Value = serde_yaml_ng::from_str(&body).unwrap();

        // The entry must exist and be explicitly null
        let backups = parsed.get("backups").unwrap();
        assert!(backups.get("nightly").unwrap().is_null());
        // lookup treats null as absent
        assert!(lookup(&parsed, &["backups", "nightly"]).is_none());
    }

    #[test]
    fn test_nested_keyed_block_structure() {
        let body = nested_keyed_block("security", "ldapSettings", "corp", &payload()).unwrap();
        let parsed: Value = serde_yaml_ng::from_str(&body).unwrap();

        assert!(lookup(&parsed, &["security", "ldapSettings", "corp"]).is_some());
        assert!(lookup(&parsed, &["security", "ldapSettings", "other"]).is_none());
    }

    #[test]
    fn test_singleton_block_structure() {
        let body = singleton_block("mailServer", &payload()).unwrap();
        let parsed: Value = serde_yaml_ng::from_str(&body).unwrap();

        assert!(lookup(&parsed, &["mailServer"]).is_some());

        let reset = singleton_reset("mailServer").unwrap();
        let parsed: Value = serde_yaml_ng::from_str(&reset).unwrap();
        assert!(lookup(&parsed, &["mailServer"]).is_none());
        assert!(parsed.get("mailServer").unwrap().is_null());
    }

    #[test]
    fn test_yaml_to_json_conversion() {
        let yaml: Value = serde_yaml_ng::from_str("enabled: true\nretentionPeriodHours: 168\n")
            .unwrap();
        let json = yaml_to_json(&yaml).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"enabled": true, "retentionPeriodHours": 168})
        );
    }
}
