use crate::error::{LoadoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HubConfig {
    /// Root URL artifact paths are resolved against
    #[serde(default = "default_hub_root")]
    pub root: String,
    /// Name of the environment variable holding an optional bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CacheConfig {
    /// Cache directory; defaults to `$XDG_CACHE_HOME/loadout`
    pub dir: Option<PathBuf>,
    /// Named bucket within the cache directory
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

/// Overrides for environment probing. Unset fields are auto-detected.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProbeConfig {
    pub accelerator: Option<bool>,
    pub threads: Option<usize>,
    pub simd: Option<bool>,
    /// Memory budget override in MB (skips the accelerator handshake)
    pub memory_budget_mb: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ManifestConfig {
    /// Default manifest URL used by the CLI when none is given
    pub url: Option<String>,
}

// Default value functions
fn default_hub_root() -> String {
    "https://huggingface.co".to_string()
}
fn default_token_env() -> String {
    "HF_TOKEN".to_string()
}
fn default_bucket() -> String {
    "default".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            root: default_hub_root(),
            token_env: default_token_env(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            bucket: default_bucket(),
        }
    }
}

impl Config {
    /// Load config from the XDG config path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| LoadoutError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else {
            dirs::config_dir()
                .ok_or_else(|| LoadoutError::Config("Cannot determine config directory".to_string()))?
        };

        Ok(config_dir.join("loadout").join("config.toml"))
    }

    /// Resolve the cache directory, falling back to the XDG cache path
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| LoadoutError::Config("Cannot determine cache directory".to_string()))?;

        Ok(cache_dir.join("loadout"))
    }

    /// Read the hub bearer token from the configured environment variable
    #[must_use]
    pub fn hub_token(&self) -> Option<String> {
        std::env::var(&self.hub.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hub.root, "https://huggingface.co");
        assert_eq!(config.hub.token_env, "HF_TOKEN");
        assert_eq!(config.cache.bucket, "default");
        assert!(config.cache.dir.is_none());
        assert!(config.probe.accelerator.is_none());
    }

    #[test]
    fn test_partial_config_merges_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            bucket = "models"

            [probe]
            accelerator = true
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.bucket, "models");
        assert_eq!(config.probe.accelerator, Some(true));
        // Untouched sections keep their defaults
        assert_eq!(config.hub.root, "https://huggingface.co");
    }

    #[test]
    fn test_cache_dir_override() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            dir = "/tmp/loadout-test"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.cache_dir().unwrap(),
            PathBuf::from("/tmp/loadout-test")
        );
    }
}
