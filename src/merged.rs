//! The merged configuration object.
//!
//! Sources are prepared (normalized, filtered, expanded) when they are added
//! and deep-merged in registration order every time the merged view is read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::expand::{expand_boundaries, split_path, DEFAULT_DICT_BOUNDARY};
use crate::key::{self, KeyNormalizer, DEFAULT_ALTERNATE_SEPARATORS};
use crate::merge::merge_layers;
use crate::source::{PreparedSource, Source, SourceInfo, SourceOrigin};

/// Construction settings for [`MergedConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeSettings {
    /// Prefix namespacing this application's keys in shared sources
    pub app_name: Option<String>,

    /// Token marking nesting levels inside a flat key (default: "__")
    pub dict_boundary: String,

    /// Separators rewritten to `_` during key normalization (default: ["-"])
    pub alternate_separators: Vec<String>,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            app_name: None,
            dict_boundary: DEFAULT_DICT_BOUNDARY.to_string(),
            alternate_separators: DEFAULT_ALTERNATE_SEPARATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Ordered collection of configuration sources, later ones taking precedence.
///
/// ```
/// use serde_json::json;
/// use zenconf::MergedConfig;
///
/// let mut config = MergedConfig::new(Some("MYAPP"));
/// config
///     .add_value(json!({"log": {"level": "info", "format": "json"}}), false, false)?
///     .add_value(json!({"MYAPP_LOG__LEVEL": "debug", "HOME": "/root"}), true, true)?;
///
/// assert_eq!(config.get_str("log__level").as_deref(), Some("debug"));
/// assert_eq!(config.get_str("log__format").as_deref(), Some("json"));
/// assert!(config.get("home").is_none());
/// # Ok::<(), zenconf::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MergedConfig {
    app_prefix: Option<String>,
    dict_boundary: String,
    normalizer: KeyNormalizer,
    sources: Vec<PreparedSource>,
}

impl Default for MergedConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MergedConfig {
    /// Create an instance with the default boundary and separators.
    pub fn new(app_name: Option<&str>) -> Self {
        let normalizer = KeyNormalizer::default();
        Self {
            app_prefix: app_name.map(|name| normalizer.app_prefix(name)),
            dict_boundary: DEFAULT_DICT_BOUNDARY.to_string(),
            normalizer,
            sources: Vec::new(),
        }
    }

    pub fn from_settings(settings: MergeSettings) -> Result<Self, ConfigError> {
        if settings.dict_boundary.is_empty() {
            return Err(ConfigError::InvalidSettings(
                "dict boundary must not be empty".to_string(),
            ));
        }
        if settings.alternate_separators.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidSettings(
                "alternate separators must not be empty".to_string(),
            ));
        }
        if settings.dict_boundary.to_lowercase() != settings.dict_boundary {
            return Err(ConfigError::InvalidSettings(format!(
                "dict boundary '{}' can never match lower-cased keys",
                settings.dict_boundary
            )));
        }
        if let Some(sep) = settings
            .alternate_separators
            .iter()
            .find(|sep| settings.dict_boundary.contains(sep.as_str()))
        {
            return Err(ConfigError::InvalidSettings(format!(
                "dict boundary '{}' contains alternate separator '{}' and would be rewritten during normalization",
                settings.dict_boundary, sep
            )));
        }

        let normalizer = KeyNormalizer::new(settings.alternate_separators);
        Ok(Self {
            app_prefix: settings
                .app_name
                .as_deref()
                .map(|name| normalizer.app_prefix(name)),
            dict_boundary: settings.dict_boundary,
            normalizer,
            sources: Vec::new(),
        })
    }

    /// Normalized app-name prefix, including its trailing `_`.
    pub fn app_prefix(&self) -> Option<&str> {
        self.app_prefix.as_deref()
    }

    pub fn dict_boundary(&self) -> &str {
        &self.dict_boundary
    }

    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Register `mapping` as the highest-precedence source so far.
    ///
    /// `prefix_filter` keeps only keys carrying the app-name prefix and strips
    /// it; `namespace` expands dict-boundary tokens into nesting.
    pub fn add(
        &mut self,
        mapping: Map<String, Value>,
        prefix_filter: bool,
        namespace: bool,
    ) -> Result<&mut Self, ConfigError> {
        self.add_source(
            Source::new(mapping)
                .filter_by_app_name(prefix_filter)
                .strip_app_name(prefix_filter)
                .expand_boundaries(namespace),
        )
    }

    /// Like [`MergedConfig::add`] for an arbitrary value; non-mappings
    /// contribute an empty source.
    pub fn add_value(
        &mut self,
        value: Value,
        prefix_filter: bool,
        namespace: bool,
    ) -> Result<&mut Self, ConfigError> {
        let mapping = match value {
            Value::Object(map) => map,
            other => {
                tracing::debug!(kind = value_kind(&other), "ignoring non-mapping source");
                Map::new()
            }
        };
        self.add(mapping, prefix_filter, namespace)
    }

    /// Register a fully described source.
    pub fn add_source(&mut self, source: Source) -> Result<&mut Self, ConfigError> {
        let prepared = self.prepare(source)?;
        tracing::debug!(
            origin = %prepared.info.origin,
            path = prepared.info.path.as_deref().unwrap_or("-"),
            keys_in = prepared.info.keys_in,
            keys_kept = prepared.info.keys_kept,
            precedence = self.sources.len(),
            "registered config source"
        );
        self.sources.push(prepared);
        Ok(self)
    }

    fn prepare(&self, source: Source) -> Result<PreparedSource, ConfigError> {
        let Source {
            mapping,
            filter_by_app_name,
            strip_app_name,
            expand_boundaries: expand,
            normalize,
            origin,
            path,
        } = source;
        let keys_in = mapping.len();

        let mut mapping = match &normalize {
            Some(custom) => key::normalize_keys(mapping, &|k: &str| custom.apply(k)),
            None => key::normalize_keys(mapping, &|k: &str| self.normalizer.normalize(k)),
        };

        match &self.app_prefix {
            Some(prefix) => {
                if filter_by_app_name {
                    mapping = key::filter_by_prefix(mapping, prefix);
                }
                if strip_app_name {
                    mapping = key::strip_prefix(mapping, prefix);
                }
            }
            None if filter_by_app_name || strip_app_name => {
                tracing::debug!(origin = %origin, "no app name configured, prefix handling skipped");
            }
            None => {}
        }

        if expand {
            mapping = expand_boundaries(mapping, &self.dict_boundary)?;
        }

        Ok(PreparedSource {
            info: SourceInfo {
                origin,
                path,
                keys_in,
                keys_kept: mapping.len(),
            },
            mapping,
        })
    }

    /// Registered sources, lowest precedence first.
    pub fn sources(&self) -> impl Iterator<Item = &SourceInfo> {
        self.sources.iter().map(|s| &s.info)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Deep-merge every registered source, in registration order.
    ///
    /// Computed fresh on each call; registered sources are left untouched.
    pub fn get_merged_config(&self) -> Map<String, Value> {
        let merged = merge_layers(self.sources.iter().map(|s| s.mapping.clone()));
        tracing::debug!(sources = self.sources.len(), keys = merged.len(), "merged config");
        merged
    }

    /// Normalize `key` and split it on the dict boundary.
    pub fn key_path(&self, key: &str) -> Vec<String> {
        split_path(&self.normalizer.normalize(key), &self.dict_boundary)
    }

    /// Look up a (possibly nested) key in the merged config.
    pub fn get(&self, key: &str) -> Option<Value> {
        let path = self.key_path(key);
        let merged = self.get_merged_config();
        lookup(&merged, &path).cloned()
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Deserialize the value at `key`, `Ok(None)` when it is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|value| serde_json::from_value(value).map_err(ConfigError::from))
            .transpose()
    }

    /// Deserialize the whole merged config into `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(serde_json::from_value(Value::Object(self.get_merged_config()))?)
    }

    /// The highest-precedence source defining the value merged at `key`.
    pub fn origin_of(&self, key: &str) -> Option<&SourceInfo> {
        let path = self.key_path(key);
        let merged = self.get_merged_config();
        lookup(&merged, &path)?;

        self.sources
            .iter()
            .rev()
            .find(|source| lookup(&source.mapping, &path).is_some())
            .map(|source| &source.info)
    }

    /// Origins of all sources, lowest precedence first.
    pub fn origins(&self) -> Vec<&SourceOrigin> {
        self.sources.iter().map(|s| &s.info.origin).collect()
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(first)?;
    for part in rest {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
