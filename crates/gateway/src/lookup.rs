//! Dot-notation lookup over structured values.
//!
//! A key such as `files.max_edit_size` is walked one segment at a time
//! through nested objects. The walk stops with the caller's default as soon
//! as a segment is missing or the current value is not an object. A key that
//! is present but holds `null` counts as found.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Look up `key` in `value`, returning `default` when any segment is absent.
///
/// A missing or blank key returns `value` itself.
///
/// ```
/// use gateway::lookup::get_strict;
/// use serde_json::json;
///
/// let doc = json!({"files": {"max_edit_size": 1024, "mode": null}});
/// let fallback = json!("n/a");
///
/// assert_eq!(get_strict(&doc, Some("files.max_edit_size"), &fallback), &json!(1024));
/// assert_eq!(get_strict(&doc, Some("files.mode"), &fallback), &json!(null));
/// assert_eq!(get_strict(&doc, Some("files.owner"), &fallback), &fallback);
/// ```
pub fn get_strict<'a>(value: &'a Value, key: Option<&str>, default: &'a Value) -> &'a Value {
    find(value, key.unwrap_or_default()).unwrap_or(default)
}

/// Like [`get_strict`], but returns an owned value of type `T`.
///
/// A hit that does not deserialize into `T` also yields `default`.
pub fn get_strict_as<T: DeserializeOwned>(value: &Value, key: &str, default: T) -> T {
    match find(value, key) {
        Some(hit) => T::deserialize(hit).unwrap_or(default),
        None => default,
    }
}

/// Look up `key`, returning `None` when any segment is absent.
pub fn find<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    if key.trim().is_empty() {
        return Some(value);
    }

    let mut current = value;
    for segment in key.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "daemon": {"address": "10.0.0.5:8080", "timeout_ms": 5000},
            "files": {"max_edit_size": 4194304, "use_binary_prefix": true, "owner": null},
            "tags": ["a", "b"]
        })
    }

    #[test]
    fn test_nested_hit() {
        let doc = sample();
        let fallback = Value::Null;
        assert_eq!(
            get_strict(&doc, Some("daemon.address"), &fallback),
            &json!("10.0.0.5:8080")
        );
    }

    #[test]
    fn test_null_is_a_hit() {
        let doc = sample();
        let fallback = json!("default");
        assert_eq!(get_strict(&doc, Some("files.owner"), &fallback), &Value::Null);
    }

    #[test]
    fn test_missing_segment_returns_default() {
        let doc = sample();
        let fallback = json!(42);
        assert_eq!(get_strict(&doc, Some("files.nope"), &fallback), &fallback);
        assert_eq!(get_strict(&doc, Some("nope.deeper.still"), &fallback), &fallback);
    }

    #[test]
    fn test_walk_through_scalar_returns_default() {
        let doc = sample();
        let fallback = json!(false);
        assert_eq!(
            get_strict(&doc, Some("daemon.timeout_ms.secs"), &fallback),
            &fallback
        );
    }

    #[test]
    fn test_arrays_are_not_indexed() {
        let doc = sample();
        let fallback = json!("x");
        assert_eq!(get_strict(&doc, Some("tags.0"), &fallback), &fallback);
    }

    #[test]
    fn test_blank_key_returns_whole_value() {
        let doc = sample();
        let fallback = Value::Null;
        assert_eq!(get_strict(&doc, None, &fallback), &doc);
        assert_eq!(get_strict(&doc, Some("   "), &fallback), &doc);
    }

    #[test]
    fn test_find_distinguishes_null_from_missing() {
        let doc = sample();
        assert_eq!(find(&doc, "files.owner"), Some(&Value::Null));
        assert_eq!(find(&doc, "files.group"), None);
    }

    #[test]
    fn test_typed_lookup() {
        let doc = sample();
        assert_eq!(get_strict_as::<u64>(&doc, "files.max_edit_size", 0), 4194304);
        assert!(get_strict_as::<bool>(&doc, "files.use_binary_prefix", false));
        assert_eq!(get_strict_as::<u64>(&doc, "files.missing", 7), 7);
    }

    #[test]
    fn test_typed_lookup_type_mismatch_returns_default() {
        let doc = sample();
        assert_eq!(get_strict_as::<u64>(&doc, "daemon.address", 1), 1);
    }

    #[test]
    fn test_typed_lookup_null_into_option() {
        let doc = sample();
        let owner: Option<String> = get_strict_as(&doc, "files.owner", Some("x".to_string()));
        assert_eq!(owner, None);
    }
}
