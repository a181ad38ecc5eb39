//! Settings file support
//!
//! Run settings can be kept in a `depwright.toml` file next to the job:
//!
//! ```toml
//! api_url = "http://localhost:3000"
//! max_retries = 2
//! timeout_secs = 10
//! format = "json"
//! color = false
//! ```
//!
//! Command line values always win over the file.

use crate::cli::CliArgs;
use crate::output::{OutputConfig, OutputFormat};
use crate::service::MAX_RETRIES;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const CONFIG_FILENAME: &str = "depwright.toml";

/// Upper bound for the retry budget
const RETRY_LIMIT: u32 = 10;

/// Default timeout for API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level settings file schema
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub format: Option<String>,
    pub color: Option<bool>,
    /// Captures unknown fields for warnings
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, toml::Value>,
}

/// Load settings from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover settings in a directory. Returns `None` if there are none.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    load_config_from_path(&config_path).map(Some)
}

fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(url) = &config.api_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("Invalid config: api_url must be an http(s) URL, got '{}'", url);
        }
    }
    if let Some(retries) = config.max_retries {
        if retries > RETRY_LIMIT {
            bail!(
                "Invalid config: max_retries must be at most {}, got {}",
                RETRY_LIMIT,
                retries
            );
        }
    }
    if config.timeout_secs == Some(0) {
        bail!("Invalid config: timeout_secs must be greater than zero");
    }
    if let Some(format) = &config.format {
        if !matches!(format.as_str(), "text" | "json") {
            bail!("Invalid config: format must be 'text' or 'json', got '{}'", format);
        }
    }
    Ok(())
}

fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        warn!("Unknown config field '{}' will be ignored", key);
    }
}

/// Where to post events, when reporting to the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget {
    pub api_url: String,
    pub job_id: Option<String>,
    pub token: Option<String>,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// Settings for one run, from the command line and the settings file
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output: OutputConfig,
    pub api: Option<ApiTarget>,
}

impl RunSettings {
    pub fn resolve(args: &CliArgs, config: &ConfigFile) -> Self {
        let mut output = OutputConfig::from_cli(args.json, args.verbose, args.quiet);
        if !args.json && config.format.as_deref() == Some("json") {
            output.format = OutputFormat::Json;
        }
        if let Some(color) = config.color {
            output.color = color;
        }

        let api = args
            .api_url
            .clone()
            .or_else(|| config.api_url.clone())
            .map(|api_url| ApiTarget {
                api_url,
                job_id: args.job_id.clone(),
                token: args.token.clone(),
                max_retries: config.max_retries.unwrap_or(MAX_RETRIES),
                timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            });

        Self { output, api }
    }
}
