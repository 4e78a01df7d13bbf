use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

const SETTINGS_PATH_VAR: &str = "MASKWATCH_SETTINGS";
const DEBUG_VAR: &str = "MASKWATCH_DEBUG";
const DEFAULT_SETTINGS_FILE: &str = "maskwatch.json";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetectorMode {
    /// Randomised demo detector.
    #[default]
    Synthetic,
    /// Recorded detector responses from `replay_path`, one JSON document per line.
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub idle_interval_ms: u64,
    pub detect_timeout_ms: u64,
    pub failure_threshold: u32,
    pub system_alert_cooldown_secs: u64,
    pub detector: DetectorMode,
    pub synthetic_seed: Option<u64>,
    pub replay_path: Option<PathBuf>,
    pub relay_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            idle_interval_ms: 100,
            detect_timeout_ms: 5_000,
            failure_threshold: 3,
            system_alert_cooldown_secs: 60,
            detector: DetectorMode::Synthetic,
            synthetic_seed: None,
            replay_path: None,
            relay_capacity: 64,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unparsable settings in {}: {err}", path.display());
                MonitorSettings::default()
            })
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Settings path from `MASKWATCH_SETTINGS`, or `maskwatch.json` in the working directory.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(SETTINGS_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::new(path)
    }

    pub fn settings(&self) -> MonitorSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: MonitorSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &MonitorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MonitorSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_VAR)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
