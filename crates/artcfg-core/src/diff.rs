//! Drift comparison between desired payloads and observed state
//!
//! Artifactory responses carry server-computed fields that were never
//! declared (timestamps, derived defaults, encrypted secrets). Drift is
//! therefore a subset comparison: every declared field must match the
//! observed value; extra observed fields are ignored.

use serde_json::Value;

/// Check whether `desired` is contained in `observed`.
///
/// - Objects: every key of `desired` must be present in `observed` with a
///   matching value (recursively). Keys listed in `write_only` are skipped at
///   every nesting level.
/// - Arrays and scalars: compared for equality.
/// - A `null` desired value matches an absent observed key, since the server
///   omits unset fields rather than returning them as null.
pub fn is_subset(desired: &Value, observed: &Value, write_only: &[&str]) -> bool {
    match (desired, observed) {
        (Value::Object(desired_map), Value::Object(observed_map)) => {
            desired_map.iter().all(|(key, desired_value)| {
                if write_only.contains(&key.as_str()) {
                    return true;
                }
                match observed_map.get(key) {
                    Some(observed_value) => is_subset(desired_value, observed_value, write_only),
                    None => desired_value.is_null(),
                }
            })
        }
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_objects_match() {
        let desired = json!({"key": "nightly", "enabled": true});
        let observed = json!({"key": "nightly", "enabled": true});
        assert!(is_subset(&desired, &observed, &[]));
    }

    #[test]
    fn test_extra_observed_fields_ignored() {
        let desired = json!({"key": "nightly"});
        let observed = json!({"key": "nightly", "createdMillis": 123456});
        assert!(is_subset(&desired, &observed, &[]));
    }

    #[test]
    fn test_changed_scalar_detected() {
        let desired = json!({"retentionPeriodHours": 72});
        let observed = json!({"retentionPeriodHours": 168});
        assert!(!is_subset(&desired, &observed, &[]));
    }

    #[test]
    fn test_nested_objects_compared_recursively() {
        let desired = json!({"searchCriteria": {"repos": ["**"]}});
        let observed = json!({"searchCriteria": {"repos": ["**"], "itemsFound": 7}});
        assert!(is_subset(&desired, &observed, &[]));

        let drifted = json!({"searchCriteria": {"repos": ["libs-release"], "itemsFound": 7}});
        assert!(!is_subset(&desired, &drifted, &[]));
    }

    #[test]
    fn test_write_only_fields_skipped() {
        let desired = json!({"username": "proxy-user", "password": "secret"});
        let observed = json!({"username": "proxy-user"});
        assert!(is_subset(&desired, &observed, &["password"]));
        assert!(!is_subset(&desired, &observed, &[]));
    }

    #[test]
    fn test_null_desired_matches_absent_key() {
        let desired = json!({"ntHost": null, "host": "proxy.example.com"});
        let observed = json!({"host": "proxy.example.com"});
        assert!(is_subset(&desired, &observed, &[]));
    }

    #[test]
    fn test_array_order_matters() {
        let desired = json!({"services": ["jfrt", "jfxr"]});
        let observed = json!({"services": ["jfxr", "jfrt"]});
        assert!(!is_subset(&desired, &observed, &[]));
    }
}
