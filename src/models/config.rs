//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `index.url`.
pub const ENV_INDEX_URL: &str = "HARVESTER_INDEX_URL";

/// Environment variable overriding `output.directory`.
pub const ENV_OUTPUT_DIR: &str = "HARVESTER_OUTPUT_DIR";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Search index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// File sink settings
    #[serde(default)]
    pub output: OutputConfig,

    /// THREDDS catalog settings
    #[serde(default)]
    pub thredds: ThreddsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `HARVESTER_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_INDEX_URL).ok(),
            std::env::var(ENV_OUTPUT_DIR).ok(),
        );
    }

    fn apply_overrides(&mut self, index_url: Option<String>, output_dir: Option<String>) {
        if let Some(url) = index_url.filter(|u| !u.trim().is_empty()) {
            self.index.url = url;
        }
        if let Some(dir) = output_dir.filter(|d| !d.trim().is_empty()) {
            self.output.directory = Some(PathBuf::from(dir));
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.index.url)
            .map_err(|e| AppError::config(format!("index.url '{}': {}", self.index.url, e)))?;
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Search index (Solr) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the index core, without the `/update` suffix
    #[serde(default = "defaults::index_url")]
    pub url: String,

    /// Ask the index to commit after every update
    #[serde(default = "defaults::enabled")]
    pub commit: bool,

    /// Whether published records are sent to the index
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: defaults::index_url(),
            commit: defaults::enabled(),
            enabled: defaults::enabled(),
        }
    }
}

/// File sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one XML file per record (default: temp dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Whether published records are also written to disk
    #[serde(default)]
    pub enabled: bool,
}

impl OutputConfig {
    /// Configured directory, or the platform temp directory.
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Strategy used to build the `url` field of a top-level dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStrategy {
    /// `<catalog>#<dataset id>`
    #[default]
    CatalogUrl,
    /// `<catalog>.html?dataset=<dataset id>`
    CatalogView,
}

/// THREDDS catalog settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreddsConfig {
    #[serde(default)]
    pub url_strategy: UrlStrategy,
}

mod defaults {
    pub fn user_agent() -> String {
        concat!("harvester/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn index_url() -> String {
        "http://localhost:8983/solr".into()
    }
    pub fn enabled() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_index_url_even_when_index_disabled() {
        let mut config = Config::default();
        config.index.url = "not a url".to_string();
        assert!(config.validate().is_err());

        // Removals always go to the index.
        config.index.enabled = false;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [index]
            url = "http://search.example.org/solr"

            [thredds]
            url_strategy = "catalog_view"
            "#,
        )
        .unwrap();

        assert_eq!(config.index.url, "http://search.example.org/solr");
        assert!(config.index.commit);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.thredds.url_strategy, UrlStrategy::CatalogView);
        assert!(!config.output.enabled);
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(Some(" ".to_string()), Some("/data/records".to_string()));
        assert_eq!(config.index.url, "http://localhost:8983/solr");
        assert_eq!(
            config.output.resolved_directory(),
            PathBuf::from("/data/records")
        );
    }
}
