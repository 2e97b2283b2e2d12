use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::warn;

use crate::{config::PlaybackConfig, storage::Storage, utils::round_to_tenth};

pub const STORAGE_KEY: &str = "playback_speed";

// The single owner of the persisted playback speed.
pub struct SpeedStore {
    storage: Arc<dyn Storage>,
    playback: PlaybackConfig,
    read_failure_logged: AtomicBool,
    write_failure_logged: AtomicBool,
}

impl SpeedStore {
    pub fn new(storage: Arc<dyn Storage>, playback: PlaybackConfig) -> Self {
        Self {
            storage,
            playback,
            read_failure_logged: AtomicBool::new(false),
            write_failure_logged: AtomicBool::new(false),
        }
    }

    // A missing, invalid, or unreadable entry yields the default, which is
    // also written back.
    pub fn get(&self) -> f64 {
        let raw = match self.storage.read(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                if !self.read_failure_logged.swap(true, Ordering::Relaxed) {
                    warn!("Failed to read the playback speed from storage; falling back to the default: {err:?}");
                }
                self.set(self.playback.default_speed);
                return self.playback.default_speed;
            }
        };
        if let Some(speed) = raw.as_deref().and_then(|raw| self.parse(raw)) {
            return speed;
        }
        self.set(self.playback.default_speed);
        self.playback.default_speed
    }

    pub fn set(&self, speed: f64) {
        if let Err(err) = self.storage.write(STORAGE_KEY, &speed.to_string()) {
            if !self.write_failure_logged.swap(true, Ordering::Relaxed) {
                warn!("Failed to persist the playback speed: {err:?}");
            }
        }
    }

    fn parse(&self, raw: &str) -> Option<f64> {
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() || !self.playback.in_range(value) {
            return None;
        }
        Some(round_to_tenth(value))
    }
}
