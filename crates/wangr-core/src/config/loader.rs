//! Configuration loader for TOML files and environment overrides
//!
//! Resolution order is: built-in defaults, then the TOML file (explicit path or
//! the per-user default location), then environment overrides. The result is
//! validated before it is handed out.

use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::types::DashboardConfig;
use crate::errors::ConfigError;

pub const REFRESH_INTERVAL_ENV: &str = "WANGR_REFRESH_INTERVAL";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default per-user config location, e.g. `~/.config/wangr/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wangr").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// An explicitly requested path that does not exist is an error; a missing
    /// default-location file is not.
    pub async fn load(path: Option<&Path>) -> Result<DashboardConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => match Self::default_path() {
                Some(default_path) if default_path.exists() => {
                    Self::from_file(&default_path).await?
                }
                _ => {
                    log::debug!("No config file found, using built-in defaults");
                    DashboardConfig::default()
                }
            },
        };

        Self::apply_env_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<DashboardConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        log::info!("Loading configuration from file: {}", path.display());
        Self::from_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_str(content: &str) -> Result<DashboardConfig, ConfigError> {
        let config: DashboardConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Applies overrides looked up through `lookup`. Taking the lookup as a
    /// parameter keeps tests away from the process environment.
    pub fn apply_env_overrides<F>(config: &mut DashboardConfig, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(REFRESH_INTERVAL_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    REFRESH_INTERVAL_ENV, raw
                ))
            })?;
            log::debug!("Refresh interval overridden from environment: {}s", secs);
            config.refresh.interval_secs = secs;
        }
        Ok(())
    }
}
