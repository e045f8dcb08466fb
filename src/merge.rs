//! Deep-merge of prepared sources
//!
//! - Mappings: deep-merge by key
//! - Sequences: REPLACE (last wins)
//! - Scalars and null: override (last wins)
//! - Type mismatches: override, never an error

use serde_json::{Map, Value};

/// Deep merge two values, `overlay` taking precedence.
///
/// Merge semantics:
/// - Both mappings: deep-merge by key (recursive)
/// - Anything else: overlay replaces base entirely
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map))
        }
        // Sequences, scalars, null and mismatched types: overlay wins
        (_, overlay) => overlay,
    }
}

/// Deep merge two mappings, keeping the key order of `base` and appending
/// keys that only `overlay` defines.
pub fn merge_maps(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        match base.get_mut(&key) {
            Some(base_value) => {
                let taken = std::mem::take(base_value);
                *base_value = deep_merge(taken, overlay_value);
            }
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
    base
}

/// Merge multiple layers in order (first is base, last has highest precedence)
pub fn merge_layers<I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    layers.into_iter().fold(Map::new(), merge_maps)
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

    #[test]
    fn test_scalar_override() {
        let base = json!({"timeout": 100});
        let overlay = json!({"timeout": 200});
        let result = deep_merge(base, overlay);
        assert_eq!(result["timeout"], 200);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({
            "handlers": {
                "syslog": "DEBUG",
                "stderr": "DEBUG"
            }
        });
        let overlay = json!({
            "handlers": {
                "syslog": "INFO"
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["handlers"]["syslog"], "INFO");
        assert_eq!(result["handlers"]["stderr"], "DEBUG");
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"handlers": ["syslog", "stderr", "file"]});
        let overlay = json!({"handlers": ["stderr"]});
        let result = deep_merge(base, overlay);

        assert_eq!(result["handlers"], json!(["stderr"]));
    }

    #[test]
    fn test_null_override() {
        let base = json!({"value": 100});
        let overlay = json!({"value": null});
        let result = deep_merge(base, overlay);

        assert!(result["value"].is_null());
    }

    #[test]
    fn test_mapping_replaced_by_scalar() {
        let base = json!({"log": {"level": "debug"}});
        let overlay = json!({"log": "off"});
        let result = deep_merge(base, overlay);

        assert_eq!(result["log"], "off");
    }

    #[test]
    fn test_scalar_replaced_by_mapping() {
        let base = json!({"log": "off"});
        let overlay = json!({"log": {"level": "debug"}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["log"], json!({"level": "debug"}));
    }

    #[test]
    fn test_merge_layers() {
        let defaults = as_map(json!({
            "timeout": 100,
            "cache": {"mode": "off", "size": 10}
        }));
        let file = as_map(json!({"timeout": 200}));
        let env = as_map(json!({"cache": {"mode": "on"}}));
        let cli = as_map(json!({"timeout": 50}));

        let result = Value::Object(merge_layers(vec![defaults, file, env, cli]));

        assert_eq!(result["timeout"], 50);
        assert_eq!(result["cache"]["mode"], "on");
        assert_eq!(result["cache"]["size"], 10);
    }

    #[test]
    fn test_merge_layers_empty() {
        assert!(merge_layers(Vec::new()).is_empty());
    }

    #[test]
    fn test_key_order_preserved() {
        let base = as_map(json!({"b": 1, "a": {"y": 1, "x": 2}}));
        let overlay = as_map(json!({"c": 3, "a": {"z": 3, "y": 4}}));
        let result = merge_maps(base, overlay);

        let keys: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        let nested: Vec<&str> = result["a"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(nested, vec!["y", "x", "z"]);
    }
}
