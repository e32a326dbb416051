//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.salesdash.toml` files.

use crate::cli::OutputFormat;
use crate::store::{FileStore, HttpStore, Store};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".salesdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write reports to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Which store backend to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Http,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: Backend,

    /// JSON export path for the file backend.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Base URL for the HTTP backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Data source (cluster) name sent to the HTTP backend.
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Environment variable holding the HTTP API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Query timeout in seconds. Unset keeps the client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            path: default_path(),
            url: None,
            data_source: default_data_source(),
            database: default_database(),
            collection: default_collection(),
            api_key_env: default_api_key_env(),
            timeout_seconds: None,
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("sales.json")
}

fn default_data_source() -> String {
    "Cluster0".to_string()
}

fn default_database() -> String {
    "STUDENTGUIDE".to_string()
}

fn default_collection() -> String {
    "Collection".to_string()
}

fn default_api_key_env() -> String {
    "SALESDASH_API_KEY".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Show each customer's share of spending in the top customers report.
    #[serde(default = "default_true")]
    pub show_share: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            show_share: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.store.backend = Backend::File;
            self.store.path = data.clone();
        }
        // A URL wins over a data file
        if let Some(ref url) = args.url {
            self.store.backend = Backend::Http;
            self.store.url = Some(url.clone());
        }
        if let Some(ref database) = args.database {
            self.store.database = database.clone();
        }
        if let Some(ref collection) = args.collection {
            self.store.collection = collection.clone();
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = Some(timeout);
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Build the configured store handle.
    pub fn build_store(&self) -> Result<Store> {
        match self.store.backend {
            Backend::File => Ok(Store::File(FileStore::new(&self.store.path))),
            Backend::Http => {
                let Some(ref url) = self.store.url else {
                    bail!("The http store backend needs a URL (--url or store.url)");
                };
                Ok(Store::Http(HttpStore {
                    url: url.clone(),
                    data_source: self.store.data_source.clone(),
                    database: self.store.database.clone(),
                    collection: self.store.collection.clone(),
                    api_key: std::env::var(&self.store.api_key_env).ok(),
                    timeout_seconds: self.store.timeout_seconds,
                }))
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
