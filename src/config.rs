use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};
use serde::Deserialize;

use crate::{app::Cli, utils::round_to_tenth};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub min_speed: f64,
    pub max_speed: f64,
    pub interval: f64,
    pub default_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_speed: 0.5,
            max_speed: 3.5,
            interval: 0.1,
            default_speed: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn in_range(&self, speed: f64) -> bool {
        speed >= self.min_speed && speed <= self.max_speed
    }

    // All selectable speeds, ascending, on the tenth grid.
    pub fn steps(&self) -> Vec<f64> {
        let count = ((self.max_speed - self.min_speed) / self.interval).round() as u32;
        (0..=count)
            .map(|i| round_to_tenth(self.min_speed + self.interval * f64::from(i)))
            .collect()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.interval > 0.0, "playback.interval must be positive");
        ensure!(
            self.min_speed <= self.max_speed,
            "playback.min_speed must not exceed playback.max_speed"
        );
        ensure!(
            self.in_range(self.default_speed),
            "playback.default_speed must lie between playback.min_speed and playback.max_speed"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "speed-store.json".to_string(),
            persist: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 3000,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub storage: StorageConfig,
    pub load: LoadConfig,
}

impl Config {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.playback.validate()?;
        Ok(config)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut file = File::open(path).context("Failed to open config file")?;
        Self::read(&mut file)
    }

    pub fn from_cli_args(args: &Cli) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(config_path) => Self::read_path(config_path)?,
            None => {
                let default_config = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_config.exists() {
                    log::info!("Using default config file {DEFAULT_CONFIG_PATH}");
                    Self::read_path(default_config)?
                } else {
                    log::info!("No config file found; using default config");
                    Config::default()
                }
            }
        };
        if let Some(store_path) = &args.store {
            config.storage.path = store_path.clone();
        }
        Ok(config)
    }
}
