//! Error types for source registration and value extraction.

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A single source uses one key both as a leaf and as a nesting prefix.
    #[error("Invalid config at '{path}': {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid_config(path: &[String], reason: impl Into<String>) -> Self {
        ConfigError::InvalidConfig {
            path: path.join("."),
            reason: reason.into(),
        }
    }

    /// True for the path/leaf collision condition raised during expansion.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, ConfigError::InvalidConfig { .. })
    }
}
