//! zenconf CLI
//!
//! Entry point for the `zenconf` command-line tool: merges a defaults file,
//! config files, app-prefixed environment variables and `--set` overrides,
//! in that order of precedence.

mod loader;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loader::{LoadedConfig, SourcePlan};
use zenconf::{MergeSettings, DEFAULT_ALTERNATE_SEPARATORS, DEFAULT_DICT_BOUNDARY};

#[derive(Parser)]
#[command(name = "zenconf")]
#[command(about = "Merge layered configuration sources", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration
    Show {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print a single merged value (exit code 1 when missing)
    Get {
        /// Key to look up; the dict boundary separates nesting levels
        key: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// Value printed when the key is missing
        #[arg(long)]
        default: Option<String>,
    },

    /// List the registered sources in precedence order
    Sources {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// App name; environment variables must start with it
    #[arg(long)]
    app_name: Option<String>,

    /// Token marking nesting levels inside flat keys
    #[arg(long, default_value = DEFAULT_DICT_BOUNDARY)]
    boundary: String,

    /// Alternate key separator rewritten to `_` (repeatable, default: "-")
    #[arg(long = "separator", value_name = "SEP")]
    separators: Vec<String>,

    /// Defaults file (TOML or JSON), lowest precedence
    #[arg(long)]
    defaults: Option<PathBuf>,

    /// Config file (TOML or JSON), repeatable
    #[arg(long = "config", short = 'c')]
    configs: Vec<PathBuf>,

    /// Include environment variables prefixed with the app name
    #[arg(long, requires = "app_name")]
    env: bool,

    /// Override a value, highest precedence (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

impl SourceArgs {
    fn settings(&self) -> MergeSettings {
        let alternate_separators = if self.separators.is_empty() {
            DEFAULT_ALTERNATE_SEPARATORS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.separators.clone()
        };

        MergeSettings {
            app_name: self.app_name.clone(),
            dict_boundary: self.boundary.clone(),
            alternate_separators,
        }
    }

    fn plan(&self) -> SourcePlan {
        SourcePlan {
            defaults: self.defaults.clone(),
            configs: self.configs.clone(),
            env: self.env.then(|| std::env::vars().collect()),
            overrides: self.overrides.clone(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Toml,
}

fn main() {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(rust_log.as_deref(), cli.verbose))
        .try_init();

    match cli.command {
        Commands::Show { sources, format } => {
            run_show(&sources, format);
        }
        Commands::Get {
            key,
            sources,
            default,
        } => {
            run_get(&key, &sources, default);
        }
        Commands::Sources { sources, json } => {
            run_sources(&sources, json);
        }
    }
}

/// A valid RUST_LOG replaces the default level entirely; otherwise
/// `--verbose` selects DEBUG over WARN.
fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level.as_str()))
}

fn load_or_exit(args: &SourceArgs) -> LoadedConfig {
    match loader::load(args.settings(), args.plan()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn run_show(args: &SourceArgs, format: OutputFormat) {
    let loaded = load_or_exit(args);
    let merged = Value::Object(loaded.config.get_merged_config());

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&merged).map_err(|e| e.to_string()),
        OutputFormat::Toml => toml::to_string_pretty(&merged).map_err(|e| e.to_string()),
    };

    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_get(key: &str, args: &SourceArgs, default: Option<String>) {
    let loaded = load_or_exit(args);

    let value = match loaded.config.get(key) {
        Some(value) => value,
        None => match default {
            Some(raw) => loader::parse_scalar(&raw),
            None => {
                eprintln!("Key not found: {}", key);
                process::exit(1);
            }
        },
    };

    match value {
        Value::String(s) => println!("{}", s),
        other => match serde_json::to_string_pretty(&other) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        },
    }
}

fn run_sources(args: &SourceArgs, json_output: bool) {
    let loaded = load_or_exit(args);
    let entries: Vec<_> = loaded
        .config
        .sources()
        .zip(loaded.digests.iter())
        .collect();

    if json_output {
        let output: Vec<Value> = entries
            .iter()
            .enumerate()
            .map(|(precedence, (info, digest))| {
                serde_json::json!({
                    "precedence": precedence,
                    "origin": info.origin,
                    "path": info.path,
                    "digest": digest,
                    "keys_in": info.keys_in,
                    "keys_kept": info.keys_kept,
                })
            })
            .collect();

        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if entries.is_empty() {
        println!("No sources registered.");
        return;
    }

    for (precedence, (info, digest)) in entries.iter().enumerate() {
        println!(
            "{:>2}  {:<8}  {}/{} keys  {}{}",
            precedence,
            info.origin.to_string(),
            info.keys_kept,
            info.keys_in,
            info.path.as_deref().unwrap_or("-"),
            digest
                .as_deref()
                .map(|d| format!("  sha256:{}", &d[..12.min(d.len())]))
                .unwrap_or_default(),
        );
    }
}
