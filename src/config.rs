use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::db::{DEFAULT_CAPACITY, StoreOptions};
use crate::engines::ScrapeOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,

    pub scraper: ScraperConfig,

    pub engines: EnginesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the database file. Parent directories are created on open.
    pub path: String,

    /// Storage quota in bytes (default: 10 MiB). The quota grows on demand
    /// once writes start bouncing off it.
    pub capacity_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/rankarr.redb".to_string(),
            capacity_bytes: DEFAULT_CAPACITY,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    #[must_use]
    pub const fn options(&self) -> StoreOptions {
        StoreOptions { capacity: self.capacity_bytes }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Pause between result pages in seconds (default: 13). Keeps the crawl
    /// under engine rate limits.
    pub page_delay_seconds: u64,

    /// Result positions scanned before recording a not-found (default: 100).
    pub scan_limit: i32,

    /// Timeout for one page fetch in seconds (default: 30).
    pub request_timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            page_delay_seconds: 13,
            scan_limit: 100,
            request_timeout_seconds: 30,
        }
    }
}

impl ScraperConfig {
    #[must_use]
    pub const fn options(&self) -> ScrapeOptions {
        ScrapeOptions {
            page_delay: Duration::from_secs(self.page_delay_seconds),
            scan_limit: self.scan_limit,
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub google_base_url: String,

    pub google_uk_base_url: String,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            google_base_url: "https://www.google.com".to_string(),
            google_uk_base_url: "https://www.google.co.uk".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            scraper: ScraperConfig::default(),
            engines: EnginesConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("rankarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rankarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.path.is_empty() {
            anyhow::bail!("Store path cannot be empty");
        }

        if self.store.capacity_bytes == 0 {
            anyhow::bail!("Store capacity must be > 0");
        }

        if self.scraper.scan_limit <= 0 {
            anyhow::bail!("Scraper scan limit must be > 0");
        }

        Url::parse(&self.engines.google_base_url)
            .with_context(|| format!("Invalid google base URL: {}", self.engines.google_base_url))?;
        Url::parse(&self.engines.google_uk_base_url).with_context(|| {
            format!("Invalid google.uk base URL: {}", self.engines.google_uk_base_url)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.capacity_bytes, 10 * 1024 * 1024);
        assert_eq!(config.scraper.page_delay_seconds, 13);
        assert_eq!(config.scraper.scan_limit, 100);
        assert_eq!(config.engines.google_base_url, "https://www.google.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[scraper]"));
        assert!(toml_str.contains("[engines]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [scraper]
            page_delay_seconds = 0
            scan_limit = 20

            [engines]
            google_base_url = "http://127.0.0.1:8080"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scraper.page_delay_seconds, 0);
        assert_eq!(config.scraper.scan_limit, 20);
        assert_eq!(config.engines.google_base_url, "http://127.0.0.1:8080");

        assert_eq!(config.store.capacity_bytes, 10 * 1024 * 1024);
        assert_eq!(config.engines.google_uk_base_url, "https://www.google.co.uk");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scraper.scan_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engines.google_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
