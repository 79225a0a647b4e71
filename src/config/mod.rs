pub mod sensor_config;

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::sensor_config::SensorConfig;
use crate::error::BridgeError;

const CONFIG_FILE_NAME: &str = "soil_sensor_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    /// Where the saved-package list is persisted.
    pub packages_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sensor: SensorConfig::default(),
            packages_file: PathBuf::from("soil_sensor_packages.json"),
        }
    }
}

impl AppConfig {
    /// Default location of the config file inside `config_dir`.
    pub fn default_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads the config from a configuration file. A missing file is not an
    /// error; defaults are used.
    pub async fn load_config(file_path: &Path) -> Result<Self, BridgeError> {
        if !file_path.exists() {
            warn!("Config file not found at {:?}, using default.", file_path);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path);
        Ok(config)
    }

    /// Saves the current config to a configuration file.
    pub async fn save_config(&self, file_path: &Path) -> Result<(), BridgeError> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;

        info!("Config saved to {:?}.", file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::FramingStrategy;

    #[tokio::test]
    async fn missing_config_file_falls_back_to_default() {
        let path = std::env::temp_dir().join("soil_sensor_config_missing.json");
        let config = AppConfig::load_config(&path).await.unwrap();
        assert_eq!(config.sensor.framing, FramingStrategy::Split);
    }

    #[tokio::test]
    async fn config_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!(
            "soil_sensor_config_{}.json",
            uuid::Uuid::new_v4()
        ));
        let mut config = AppConfig::default();
        config.sensor.framing = FramingStrategy::Combined;
        config.sensor.debounce_ms = 250;
        config.save_config(&path).await.unwrap();

        let loaded = AppConfig::load_config(&path).await.unwrap();
        assert_eq!(loaded.sensor.framing, FramingStrategy::Combined);
        assert_eq!(loaded.sensor.debounce_ms, 250);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
