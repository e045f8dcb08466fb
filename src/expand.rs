//! Dict-boundary expansion.
//!
//! A flat key such as `logging__loggers__app__level` addresses a path into
//! nested mappings. Expansion turns every such key of one source into real
//! nesting so it can be deep-merged against other sources.

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Default token separating nesting levels within a flat key.
pub const DEFAULT_DICT_BOUNDARY: &str = "__";

/// Split `key` on `boundary`, skipping empty components.
pub fn split_path(key: &str, boundary: &str) -> Vec<String> {
    key.split(boundary)
        .filter(|component| !component.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand every key of `map` (and of mappings nested in it) into nested
/// mappings.
///
/// Fails with [`ConfigError::InvalidConfig`] when a key is used both as a
/// leaf and as a nesting prefix, or when a key has no path components at all.
pub fn expand_boundaries(map: Map<String, Value>, boundary: &str) -> Result<Map<String, Value>, ConfigError> {
    let mut result = Map::with_capacity(map.len());
    expand_into(&mut result, map, boundary, &[])?;
    Ok(result)
}

fn expand_into(
    target: &mut Map<String, Value>,
    map: Map<String, Value>,
    boundary: &str,
    parent: &[String],
) -> Result<(), ConfigError> {
    for (key, value) in map {
        let path = split_path(&key, boundary);
        let mut full_path = parent.to_vec();
        full_path.extend(path.iter().cloned());

        if path.is_empty() {
            full_path.push(key);
            return Err(ConfigError::invalid_config(&full_path, "key has no path components"));
        }

        let value = match value {
            Value::Object(nested) => {
                let mut expanded = Map::with_capacity(nested.len());
                expand_into(&mut expanded, nested, boundary, &full_path)?;
                Value::Object(expanded)
            }
            other => other,
        };

        insert_path(target, &path, value, &full_path)?;
    }
    Ok(())
}

fn insert_path(
    target: &mut Map<String, Value>,
    path: &[String],
    value: Value,
    full_path: &[String],
) -> Result<(), ConfigError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(());
    };

    if !rest.is_empty() {
        let child = target
            .entry(first.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        return match child {
            Value::Object(child_map) => insert_path(child_map, rest, value, full_path),
            _ => Err(ConfigError::invalid_config(
                full_path,
                format!("'{}' is a leaf value and cannot also be a nesting prefix", first),
            )),
        };
    }

    if !target.contains_key(first) {
        target.insert(first.clone(), value);
        return Ok(());
    }

    match (target.get_mut(first), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (key, nested) in incoming {
                let mut nested_path = full_path.to_vec();
                nested_path.push(key.clone());
                insert_path(existing, &[key], nested, &nested_path)?;
            }
            Ok(())
        }
        (Some(Value::Object(_)), _) => Err(ConfigError::invalid_config(
            full_path,
            format!("'{}' is a nesting prefix and cannot also be a leaf value", first),
        )),
        (Some(_), Value::Object(_)) => Err(ConfigError::invalid_config(
            full_path,
            format!("'{}' is a leaf value and cannot also be a nesting prefix", first),
        )),
        (Some(slot), value) => {
            tracing::warn!(path = %full_path.join("."), "duplicate key within one source, later value wins");
            *slot = value;
            Ok(())
        }
        (None, _) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn expand(value: Value) -> Result<Value, ConfigError> {
        expand_boundaries(as_map(value), DEFAULT_DICT_BOUNDARY).map(Value::Object)
    }

    #[test]
    fn test_split_path_skips_empty_components() {
        assert_eq!(split_path("log__level", "__"), vec!["log", "level"]);
        assert_eq!(split_path("__log____level__", "__"), vec!["log", "level"]);
        assert!(split_path("____", "__").is_empty());
    }

    #[test]
    fn test_simple_expansion() {
        let result = expand(json!({"log__level": "debug"})).unwrap();
        assert_eq!(result, json!({"log": {"level": "debug"}}));
    }

    #[test]
    fn test_sibling_paths_share_parent() {
        let result = expand(json!({
            "logging__loggers__app__level": "INFO",
            "logging__version": 2,
            "endpoint": "http://localhost"
        }))
        .unwrap();

        assert_eq!(result["logging"]["loggers"]["app"]["level"], "INFO");
        assert_eq!(result["logging"]["version"], 2);
        assert_eq!(result["endpoint"], "http://localhost");
    }

    #[test]
    fn test_keys_inside_nested_mappings_expand() {
        let result = expand(json!({"logging": {"loggers__app": {"level": "INFO"}}})).unwrap();
        assert_eq!(result, json!({"logging": {"loggers": {"app": {"level": "INFO"}}}}));
    }

    #[test]
    fn test_literal_mapping_and_path_merge() {
        let result = expand(json!({
            "log": {"format": "json"},
            "log__level": "debug"
        }))
        .unwrap();
        assert_eq!(result, json!({"log": {"format": "json", "level": "debug"}}));
    }

    #[test]
    fn test_path_then_literal_mapping_merge() {
        let result = expand(json!({
            "log__level": "debug",
            "log": {"format": "json"}
        }))
        .unwrap();
        assert_eq!(result, json!({"log": {"level": "debug", "format": "json"}}));
    }

    #[test]
    fn test_leaf_then_path_collides() {
        let err = expand(json!({"LOG": "x", "LOG__LEVEL": "debug"})).unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("LOG.LEVEL"));
    }

    #[test]
    fn test_path_then_leaf_collides() {
        let err = expand(json!({"log__level": "debug", "log": "x"})).unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_deeper_collision() {
        let err = expand(json!({
            "a__b": 1,
            "a__b__c": 2
        }))
        .unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("a.b.c"));
    }

    #[test]
    fn test_collision_via_nested_literal() {
        let err = expand(json!({
            "log__level": "debug",
            "log": {"level": {"root": "info"}}
        }))
        .unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_duplicate_leaf_later_wins() {
        let result = expand(json!({
            "log__level": "debug",
            "log": {"level": "info"}
        }))
        .unwrap();
        assert_eq!(result["log"]["level"], "info");
    }

    #[test]
    fn test_key_without_components_rejected() {
        let err = expand(json!({"____": 1})).unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_custom_boundary() {
        let result = expand_boundaries(as_map(json!({"log.level": "debug"})), ".").unwrap();
        assert_eq!(Value::Object(result), json!({"log": {"level": "debug"}}));
    }

    #[test]
    fn test_arrays_are_leaves() {
        let result = expand(json!({"handlers": [{"a__b": 1}]})).unwrap();
        assert_eq!(result, json!({"handlers": [{"a__b": 1}]}));
    }
}
