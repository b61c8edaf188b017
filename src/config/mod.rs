use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Player configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Directory the playlist is populated from
    pub music_dir: PathBuf,
    /// Optional HTTP base URL; when set, tracks are fetched from it instead
    /// of the local music directory
    pub source_url: Option<String>,
    /// Output gain applied at startup
    pub default_gain: f32,
    /// Preferred output device name
    pub preferred_device: Option<String>,
    /// Cadence of the position poll in the interactive loop
    pub poll_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("./music"),
            source_url: None,
            default_gain: 1.0,
            preferred_device: None,
            poll_interval_ms: 250,
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: PlayerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path).unwrap_or_default();

        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut PlayerConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<(), ConfigError> {
        self.config.default_gain = gain;
        self.save_config()
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.config.preferred_device = device;
        self.save_config()
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("trackdeck");

        std::fs::create_dir_all(&config_dir).map_err(ConfigError::IoError)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<PlayerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlayerConfig::default());
        }

        let config_content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: PlayerConfig =
            toml::from_str(&config_content).map_err(ConfigError::DeserializationError)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }

        let content =
            toml::to_string_pretty(&self.config).map_err(ConfigError::SerializationError)?;

        std::fs::write(&self.config_path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.music_dir, PathBuf::from("./music"));
        assert!(config.source_url.is_none());
        assert_eq!(config.default_gain, 1.0);
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(manager.get_config().default_gain, 1.0);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.set_gain(0.5).unwrap();
        manager
            .set_preferred_device(Some("USB DAC".to_string()))
            .unwrap();

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(reloaded.get_config().default_gain, 0.5);
        assert_eq!(
            reloaded.get_config().preferred_device.as_deref(),
            Some("USB DAC")
        );
    }

    #[test]
    fn test_update_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut manager = ConfigManager::with_path(path.clone()).unwrap();
        manager
            .update_config(|config| {
                config.music_dir = PathBuf::from("/srv/music");
                config.poll_interval_ms = 100;
            })
            .unwrap();

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(reloaded.get_config().music_dir, PathBuf::from("/srv/music"));
        assert_eq!(reloaded.get_config().poll_interval_ms, 100);
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();

        let manager = ConfigManager::with_path(path).unwrap();
        assert_eq!(manager.get_config().default_gain, 1.0);
    }
}
