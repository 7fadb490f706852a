use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::theme::Theme;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat backend
    pub endpoint: String,

    /// Timeout applied to every reply fetch, in seconds
    pub request_timeout_secs: u64,

    /// Light/dark preference, written back on every toggle
    pub theme: Theme,

    /// Parley home directory
    #[serde(skip)]
    pub parley_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            endpoint: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            theme: Theme::default(),
            parley_home: home.join(".parley"),
        }
    }
}

impl Config {
    /// Load configuration from ~/.parley/config.toml, creating the directory
    /// on first run
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let parley_home = home.join(".parley");
        let config_path = parley_home.join("config.toml");

        fs::create_dir_all(&parley_home).context("Failed to create .parley directory")?;

        let mut config: Config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.parley_home = parley_home;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.parley_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_backend() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost:5000");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.theme, Theme::Dark);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.theme = Theme::Light;
        config.endpoint = "http://example.org:8080".to_string();

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.endpoint, config.endpoint);
        assert_eq!(parsed.theme, Theme::Light);
    }
}
