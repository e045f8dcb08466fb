//! Registered sources and their provenance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::key::NormalizeFn;

/// Where a source's mapping came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Defaults,
    File,
    Env,
    Cli,
    Custom(String),
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::Defaults => f.write_str("defaults"),
            SourceOrigin::File => f.write_str("file"),
            SourceOrigin::Env => f.write_str("env"),
            SourceOrigin::Cli => f.write_str("cli"),
            SourceOrigin::Custom(name) => f.write_str(name),
        }
    }
}

/// A raw mapping plus the rules used to prepare it before merging.
///
/// ```
/// use serde_json::json;
/// use zenconf::{Source, SourceOrigin};
///
/// let env = json!({"MYAPP_LOG__LEVEL": "debug"});
/// let source = Source::from_value(env)
///     .unwrap()
///     .filter_by_app_name(true)
///     .strip_app_name(true)
///     .expand_boundaries(true)
///     .origin(SourceOrigin::Env);
/// assert_eq!(source.get_origin(), &SourceOrigin::Env);
/// ```
#[derive(Debug, Clone)]
pub struct Source {
    pub(crate) mapping: Map<String, Value>,
    pub(crate) filter_by_app_name: bool,
    pub(crate) strip_app_name: bool,
    pub(crate) expand_boundaries: bool,
    pub(crate) normalize: Option<NormalizeFn>,
    pub(crate) origin: SourceOrigin,
    pub(crate) path: Option<String>,
}

impl Source {
    pub fn new(mapping: Map<String, Value>) -> Self {
        Self {
            mapping,
            filter_by_app_name: false,
            strip_app_name: false,
            expand_boundaries: false,
            normalize: None,
            origin: SourceOrigin::Custom("source".to_string()),
            path: None,
        }
    }

    /// Build a source from any value; only mappings are accepted.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            _ => None,
        }
    }

    /// Drop top-level keys that lack the app-name prefix.
    pub fn filter_by_app_name(mut self, enabled: bool) -> Self {
        self.filter_by_app_name = enabled;
        self
    }

    /// Remove the app-name prefix from top-level keys that carry it.
    pub fn strip_app_name(mut self, enabled: bool) -> Self {
        self.strip_app_name = enabled;
        self
    }

    /// Treat the dict boundary inside keys as nesting.
    pub fn expand_boundaries(mut self, enabled: bool) -> Self {
        self.expand_boundaries = enabled;
        self
    }

    /// Replace the instance-wide key normalizer for this source only.
    pub fn normalize_with(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.normalize = Some(NormalizeFn::new(f));
        self
    }

    pub fn origin(mut self, origin: SourceOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn get_origin(&self) -> &SourceOrigin {
        &self.origin
    }
}

/// A source after normalization, filtering and expansion.
#[derive(Debug, Clone)]
pub(crate) struct PreparedSource {
    pub(crate) mapping: Map<String, Value>,
    pub(crate) info: SourceInfo,
}

/// Summary of a registered source, in precedence order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    /// Origin of this source
    pub origin: SourceOrigin,

    /// File path, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Top-level keys supplied before filtering
    pub keys_in: usize,

    /// Top-level keys kept after filtering and expansion
    pub keys_kept: usize,
}
