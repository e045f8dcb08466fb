//! Source loading for the `zenconf` binary.
//!
//! The library only accepts parsed mappings; reading files, the environment
//! and `--set` overrides happens here.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zenconf::{ConfigError, MergeSettings, MergedConfig, Source, SourceOrigin};

/// Errors raised while loading sources for the CLI
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported config extension '.{ext}' for file {path}")]
    UnsupportedFormat { ext: String, path: String },

    #[error("{0} does not contain a mapping at the top level")]
    NotAMapping(String),

    #[error("Environment variables can only be merged with an app name to filter them by")]
    EnvWithoutAppName,

    #[error("Invalid override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A parsed config file with the digest of its raw bytes
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub mapping: Map<String, Value>,
    pub path: String,
    pub digest: String,
}

/// Which sources to read, lowest precedence first
#[derive(Debug, Clone, Default)]
pub struct SourcePlan {
    pub defaults: Option<PathBuf>,
    pub configs: Vec<PathBuf>,
    /// Environment snapshot; `None` leaves the environment out
    pub env: Option<Vec<(String, String)>>,
    pub overrides: Vec<String>,
}

/// The merged config plus the file digest of each source (`None` for
/// sources that are not files)
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: MergedConfig,
    pub digests: Vec<Option<String>>,
}

/// Register every planned source on a fresh [`MergedConfig`].
pub fn load(settings: MergeSettings, plan: SourcePlan) -> Result<LoadedConfig, CliError> {
    let mut config = MergedConfig::from_settings(settings)?;
    let mut digests = Vec::new();

    if let Some(path) = &plan.defaults {
        let file = load_file(path)?;
        config.add_source(
            Source::new(file.mapping)
                .origin(SourceOrigin::Defaults)
                .path(file.path),
        )?;
        digests.push(Some(file.digest));
    }

    for path in &plan.configs {
        let file = load_file(path)?;
        config.add_source(
            Source::new(file.mapping)
                .origin(SourceOrigin::File)
                .path(file.path),
        )?;
        digests.push(Some(file.digest));
    }

    if let Some(vars) = plan.env {
        if config.app_prefix().is_none() {
            return Err(CliError::EnvWithoutAppName);
        }
        config.add_source(
            Source::new(env_mapping(vars))
                .filter_by_app_name(true)
                .strip_app_name(true)
                .expand_boundaries(true)
                .origin(SourceOrigin::Env),
        )?;
        digests.push(None);
    }

    if !plan.overrides.is_empty() {
        config.add_source(
            Source::new(parse_overrides(&plan.overrides)?)
                .strip_app_name(true)
                .expand_boundaries(true)
                .origin(SourceOrigin::Cli),
        )?;
        digests.push(None);
    }

    Ok(LoadedConfig { config, digests })
}

/// Load a TOML or JSON file, chosen by extension.
pub fn load_file(path: &Path) -> Result<LoadedFile, CliError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: display.clone(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| CliError::Parse {
        path: display.clone(),
        message: format!("Invalid UTF-8: {}", e),
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let value = match ext.as_str() {
        "toml" => {
            let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| CliError::Parse {
                path: display.clone(),
                message: format!("TOML parse error: {}", e),
            })?;
            toml_to_json(toml_value)
        }
        "json" => serde_json::from_str(&contents).map_err(|e| CliError::Parse {
            path: display.clone(),
            message: format!("JSON parse error: {}", e),
        })?,
        other => {
            return Err(CliError::UnsupportedFormat {
                ext: other.to_string(),
                path: display,
            })
        }
    };

    match value {
        Value::Object(mapping) => Ok(LoadedFile {
            mapping,
            path: display,
            digest,
        }),
        _ => Err(CliError::NotAMapping(display)),
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Environment variables as a flat mapping of strings.
pub fn env_mapping<I>(vars: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}

/// Parse `KEY=VALUE` pairs. Values are read as JSON when they parse, and as
/// plain strings otherwise.
pub fn parse_overrides(pairs: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut mapping = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::InvalidOverride(pair.clone()))?;
        if key.trim().is_empty() {
            return Err(CliError::InvalidOverride(pair.clone()));
        }
        mapping.insert(key.trim().to_string(), parse_scalar(raw));
    }
    Ok(mapping)
}

/// Read a command-line value as JSON, falling back to a string.
pub fn parse_scalar(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
