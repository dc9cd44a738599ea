//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(path, &content)
    }

    /// Parse config contents; the format follows the file extension.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Check the config for values the CLI cannot use.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.store.catalog.trim().is_empty() {
            errors.push("store.catalog is required".to_string());
        }

        if !["trace", "debug", "info", "warn", "error", "off"].contains(&self.log.level.as_str()) {
            errors.push(format!("log.level '{}' is not a tracing level", self.log.level));
        }

        if !self.store.cdn_url.is_empty()
            && !self.store.cdn_url.starts_with("http://")
            && !self.store.cdn_url.starts_with("https://")
        {
            errors.push(format!("store.cdn_url '{}' must be an http(s) URL", self.store.cdn_url));
        }

        errors
    }
}

/// Where the catalog comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to a catalog JSON file (`{"total": n, "items": [...]}`).
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// Base URL for product images.
    #[serde(default)]
    pub cdn_url: String,
}

fn default_catalog() -> String {
    "catalog.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            cdn_url: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level for storefront logs (overridden by `RUST_LOG`).
    #[serde(default = "default_level")]
    pub level: String,

    /// Log every event that flows through the bus.
    #[serde(default)]
    pub audit: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            audit: false,
        }
    }
}

/// Generate a default larek.toml config file.
pub fn generate_default_config() -> String {
    r#"# Larek storefront configuration

[store]
catalog = "catalog.json"
# cdn_url = "https://larek-api.nomoreparties.co/content/weblarek"

[log]
level = "info"
audit = false
"#
    .to_string()
}
