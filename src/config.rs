//! Configuration management
//!
//! Defaults, overlaid by an optional TOML file
//! (`~/.config/pot-sim/config.toml`), overlaid by `POT_SIM_*` environment
//! variables. All file fields are optional; the file is a partial overlay.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::Result;
use crate::protocol::SensorSnapshot;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL
    pub backend_url: String,

    /// Device identifier the backend files everything under
    pub device_id: String,

    /// Default environment snapshot (adjustable at runtime)
    pub sensors: SensorSnapshot,

    /// Total history polls per cycle before giving up on finalization
    pub finalize_attempts: u8,

    /// Backoff between consecutive history polls, in milliseconds
    pub finalize_backoff_ms: u64,

    /// Delay before a secondary notification clip starts, in milliseconds
    pub notification_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            device_id: "pot_simulator_001".to_string(),
            sensors: SensorSnapshot { temperature: 22.0, moisture: 40.0, light: 60.0 },
            finalize_attempts: 3,
            finalize_backoff_ms: 500,
            notification_delay_ms: 1500,
        }
    }
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            tracing::debug!(path = %path.display(), "loading config file");
            let raw = std::fs::read_to_string(&path)?;
            let file: ConfigFile = toml::from_str(&raw)?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }

    /// Location of the optional config file
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "omni", "pot-sim")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.backend_url {
            self.backend_url = url;
        }
        if let Some(id) = file.device_id {
            self.device_id = id;
        }
        if let Some(v) = file.sensors.temperature {
            self.sensors.temperature = v;
        }
        if let Some(v) = file.sensors.moisture {
            self.sensors.moisture = v;
        }
        if let Some(v) = file.sensors.light {
            self.sensors.light = v;
        }
        if let Some(v) = file.cycle.finalize_attempts {
            self.finalize_attempts = v;
        }
        if let Some(v) = file.cycle.finalize_backoff_ms {
            self.finalize_backoff_ms = v;
        }
        if let Some(v) = file.cycle.notification_delay_ms {
            self.notification_delay_ms = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("POT_SIM_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(id) = std::env::var("POT_SIM_DEVICE_ID") {
            self.device_id = id;
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    /// Backend base URL
    backend_url: Option<String>,

    /// Device identifier
    device_id: Option<String>,

    /// Default sensor values
    #[serde(default)]
    sensors: SensorFileConfig,

    /// Interaction cycle tuning
    #[serde(default)]
    cycle: CycleFileConfig,
}

/// Sensor defaults from the config file
#[derive(Debug, Default, Deserialize)]
struct SensorFileConfig {
    temperature: Option<f32>,
    moisture: Option<f32>,
    light: Option<f32>,
}

/// Cycle tuning from the config file
#[derive(Debug, Default, Deserialize)]
struct CycleFileConfig {
    finalize_attempts: Option<u8>,
    finalize_backoff_ms: Option<u64>,
    notification_delay_ms: Option<u64>,
}
