use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound for remote documents (20 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration structure for the file type server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limit used by `validate_file_size` when the caller does not pass one
    pub max_file_size: u64,
    /// Timeout for the outbound HEAD request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(anyhow::anyhow!("max_file_size must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

/// Get the platform-specific configuration file path
///
/// # Returns
/// * Unix/macOS: `~/.config/docu-filetype/config.json`
/// * Windows: `%APPDATA%\docu-filetype\config.json`
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?;

    Ok(config_path_in(&config_dir))
}

/// Location of the config file under a base configuration directory
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join("docu-filetype").join("config.json")
}

/// Load configuration from the platform path, falling back to defaults if missing
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from `config_path`
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - Error if file exists but cannot be read, parsed or validated
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        tracing::debug!("No config at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

    Ok(config)
}

/// Save configuration to `config_path`, creating parent directories
pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(config)
        .context("Failed to serialize config")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    Ok(())
}
