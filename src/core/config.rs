use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use super::comparator::DEFAULT_DEADLINE;

pub const FREECURRENCY_BASE_URL: &str = "https://api.freecurrencyapi.com";
pub const CURRENCYFREAKS_BASE_URL: &str = "https://api.currencyfreaks.com";
pub const FIXER_BASE_URL: &str = "https://data.fixer.io/api";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl ProviderConfig {
    fn with_base_url(base_url: &str) -> Self {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub freecurrency: Option<ProviderConfig>,
    pub currencyfreaks: Option<ProviderConfig>,
    pub fixer: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            freecurrency: Some(ProviderConfig::with_base_url(FREECURRENCY_BASE_URL)),
            currencyfreaks: Some(ProviderConfig::with_base_url(CURRENCYFREAKS_BASE_URL)),
            fixer: Some(ProviderConfig::with_base_url(FIXER_BASE_URL)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Seconds a comparison waits for providers, 10 when unset.
    pub deadline_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxcmp", "fxcmp")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn deadline(&self) -> Duration {
        self.deadline_secs
            .map_or(DEFAULT_DEADLINE, Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  freecurrency:
    base_url: "http://example.com/free"
    api_key: "free-key"
  fixer:
    base_url: "http://example.com/fixer"
server:
  bind: "0.0.0.0:9000"
deadline_secs: 3
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let free = config.providers.freecurrency.as_ref().unwrap();
        assert_eq!(free.base_url, "http://example.com/free");
        assert_eq!(free.api_key, "free-key");
        assert!(config.providers.currencyfreaks.is_none());
        let fixer = config.providers.fixer.as_ref().unwrap();
        assert_eq!(fixer.base_url, "http://example.com/fixer");
        assert!(fixer.api_key.is_empty());
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.deadline(), Duration::from_secs(3));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(
            config.providers.freecurrency.as_ref().unwrap().base_url,
            FREECURRENCY_BASE_URL
        );
        assert_eq!(
            config.providers.currencyfreaks.as_ref().unwrap().base_url,
            CURRENCYFREAKS_BASE_URL
        );
        assert_eq!(
            config.providers.fixer.as_ref().unwrap().base_url,
            FIXER_BASE_URL
        );
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.deadline(), DEFAULT_DEADLINE);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/definitely/not/here/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
