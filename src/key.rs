//! Key normalization and app-name prefix handling.
//!
//! Keys arriving from different sources spell the same setting differently
//! (`--log-level`, `LOG_LEVEL`, `log-level`). Normalization maps them onto one
//! canonical form before any filtering, expansion or merging happens.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Separator every alternate separator is rewritten to.
pub const CANONICAL_SEPARATOR: &str = "_";

/// Alternate separators used when none are configured.
pub const DEFAULT_ALTERNATE_SEPARATORS: &[&str] = &["-"];

/// Custom key normalization function attached to a single source.
#[derive(Clone)]
pub struct NormalizeFn(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl NormalizeFn {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, key: &str) -> String {
        (self.0)(key)
    }
}

impl fmt::Debug for NormalizeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NormalizeFn(..)")
    }
}

/// Default key normalizer.
///
/// Lower-cases the key, rewrites every alternate separator to `_`, then strips
/// leading underscores so that CLI-style keys such as `--log-level` come out as
/// `log_level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNormalizer {
    alternate_separators: Vec<String>,
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ALTERNATE_SEPARATORS.iter().copied())
    }
}

impl KeyNormalizer {
    pub fn new<I, S>(alternate_separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alternate_separators: alternate_separators
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn alternate_separators(&self) -> &[String] {
        &self.alternate_separators
    }

    /// Normalize a single raw key.
    pub fn normalize(&self, key: &str) -> String {
        let mut normalized = key.to_lowercase();
        for sep in &self.alternate_separators {
            normalized = normalized.replace(sep.as_str(), CANONICAL_SEPARATOR);
        }
        normalized.trim_start_matches('_').to_string()
    }

    /// The normalized form of an app name, always ending in `_`.
    pub fn app_prefix(&self, app_name: &str) -> String {
        let mut prefix = self.normalize(app_name);
        if !prefix.ends_with(CANONICAL_SEPARATOR) {
            prefix.push_str(CANONICAL_SEPARATOR);
        }
        prefix
    }
}

/// Apply `normalize` to every key of `map` and of any mapping nested in it.
///
/// Mappings inside sequences keep their keys. When two raw keys collapse onto
/// the same normalized key, the one seen later wins.
pub fn normalize_keys(map: Map<String, Value>, normalize: &dyn Fn(&str) -> String) -> Map<String, Value> {
    let mut result = Map::with_capacity(map.len());
    for (key, value) in map {
        let normalized = normalize(&key);
        let value = match value {
            Value::Object(nested) => Value::Object(normalize_keys(nested, normalize)),
            other => other,
        };
        if result.contains_key(&normalized) {
            tracing::warn!(key = %key, normalized = %normalized, "duplicate key after normalization, later value wins");
            // Re-insert at the end so iteration order reflects the winning key.
            result.remove(&normalized);
        }
        result.insert(normalized, value);
    }
    result
}

/// Keep only the keys starting with `prefix`.
pub fn filter_by_prefix(map: Map<String, Value>, prefix: &str) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}

/// Remove `prefix` from keys that carry it; other keys pass through.
///
/// Leading underscores left behind by the prefix are trimmed, so
/// `myapp__log` becomes `log`. When a stripped key lands on a key already
/// present, the one seen later wins.
pub fn strip_prefix(map: Map<String, Value>, prefix: &str) -> Map<String, Value> {
    let mut result = Map::with_capacity(map.len());
    for (key, value) in map {
        let stripped = match key.strip_prefix(prefix) {
            Some(rest) => rest.trim_start_matches('_').to_string(),
            None => key.clone(),
        };
        if result.contains_key(&stripped) {
            tracing::warn!(key = %key, stripped = %stripped, "duplicate key after app-name strip, later value wins");
            result.remove(&stripped);
        }
        result.insert(stripped, value);
    }
    result
}
