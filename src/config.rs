//! TOML configuration.
//!
//! ```toml
//! [store]
//! backend = "sanity"
//! project_id = "abc123"
//! dataset = "production"
//!
//! [import]
//! rate_limit = "fixed"
//! delay_ms = 500
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! ```
//!
//! The store API token is read from `SANITY_API_TOKEN`, never from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Overrides `https://<project_id>.api.sanity.io`.
    #[serde(default)]
    pub api_host: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries on HTTP 429.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            project_id: None,
            dataset: default_dataset(),
            api_version: default_api_version(),
            api_host: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_backend() -> String {
    "sanity".to_string()
}
fn default_dataset() -> String {
    "production".to_string()
}
fn default_api_version() -> String {
    "2024-01-01".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_rate_limit")]
    pub rate_limit: String,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_error_samples")]
    pub max_error_samples: usize,
    #[serde(default = "default_image_delimiters")]
    pub image_delimiters: Vec<String>,
    #[serde(default)]
    pub strict_images: bool,
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            delay_ms: default_delay_ms(),
            burst: default_burst(),
            concurrency: default_concurrency(),
            max_error_samples: default_max_error_samples(),
            image_delimiters: default_image_delimiters(),
            strict_images: false,
            fetch_timeout_secs: default_timeout_secs(),
            deadline_secs: None,
        }
    }
}

fn default_rate_limit() -> String {
    "fixed".to_string()
}
fn default_delay_ms() -> u64 {
    500
}
fn default_burst() -> u32 {
    1
}
fn default_concurrency() -> usize {
    1
}
fn default_max_error_samples() -> usize {
    catalog_import_core::report::DEFAULT_MAX_ERROR_SAMPLES
}
fn default_image_delimiters() -> Vec<String> {
    vec![",".to_string(), "|".to_string()]
}

impl ImportConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Delimiter characters for the `More images` column.
    pub fn delimiter_chars(&self) -> Vec<char> {
        self.image_delimiters
            .iter()
            .filter_map(|d| d.chars().next())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// In-memory store, no throttling. Used when no config file is needed.
    pub fn minimal() -> Self {
        Self {
            store: StoreConfig {
                backend: "memory".to_string(),
                ..StoreConfig::default()
            },
            import: ImportConfig {
                rate_limit: "none".to_string(),
                ..ImportConfig::default()
            },
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate store
    match config.store.backend.as_str() {
        "sanity" => {
            let missing = config
                .store
                .project_id
                .as_deref()
                .map(str::trim)
                .map_or(true, str::is_empty);
            if missing && config.store.api_host.is_none() {
                anyhow::bail!("store.project_id must be set when backend is 'sanity'");
            }
        }
        "memory" => {}
        other => anyhow::bail!(
            "Unknown store backend: '{}'. Must be sanity or memory.",
            other
        ),
    }

    // Validate import
    let import = &config.import;
    match import.rate_limit.as_str() {
        "fixed" | "token_bucket" | "none" => {}
        other => anyhow::bail!(
            "Unknown import.rate_limit: '{}'. Must be fixed, token_bucket, or none.",
            other
        ),
    }
    if !(1..=16).contains(&import.concurrency) {
        anyhow::bail!("import.concurrency must be in [1, 16]");
    }
    if import.max_error_samples < 1 {
        anyhow::bail!("import.max_error_samples must be >= 1");
    }
    if import.burst < 1 {
        anyhow::bail!("import.burst must be >= 1");
    }
    if import.rate_limit == "token_bucket" && import.delay_ms == 0 {
        anyhow::bail!("import.delay_ms must be > 0 for token_bucket");
    }
    if import.image_delimiters.is_empty() {
        anyhow::bail!("import.image_delimiters must not be empty");
    }
    for d in &import.image_delimiters {
        if d.chars().count() != 1 {
            anyhow::bail!(
                "import.image_delimiters entries must be a single character, got '{}'",
                d
            );
        }
    }

    Ok(())
}
