//! zenconf - layered configuration merging
//!
//! Callers parse their own sources (defaults, config files, environment
//! variables, command-line arguments) into mappings and register them in
//! precedence order. Keys are normalized per source, optionally filtered by an
//! app-name prefix and expanded on a dict boundary (`LOG__LEVEL` addresses
//! `log.level`), then deep-merged with later sources winning.

mod error;
mod expand;
mod key;
mod merge;
mod merged;
mod source;

pub use error::ConfigError;
pub use expand::{expand_boundaries, split_path, DEFAULT_DICT_BOUNDARY};
pub use key::{KeyNormalizer, NormalizeFn, CANONICAL_SEPARATOR, DEFAULT_ALTERNATE_SEPARATORS};
pub use merge::{deep_merge, merge_layers, merge_maps};
pub use merged::{MergeSettings, MergedConfig};
pub use source::{Source, SourceInfo, SourceOrigin};

/// A configuration mapping: string keys to scalars, sequences or mappings.
pub type Mapping = serde_json::Map<String, serde_json::Value>;
