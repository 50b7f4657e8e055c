use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::error::SamplerError;
use crate::models::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnabledMetrics {
    pub processor: bool,
    pub graphics: bool,
    pub battery: bool,
    pub enclosure: bool,
}

impl Default for EnabledMetrics {
    fn default() -> Self {
        Self::all()
    }
}

impl EnabledMetrics {
    pub fn all() -> Self {
        Self {
            processor: true,
            graphics: true,
            battery: true,
            enclosure: true,
        }
    }

    pub fn none() -> Self {
        Self {
            processor: false,
            graphics: false,
            battery: false,
            enclosure: false,
        }
    }

    pub fn contains(&self, metric: MetricKind) -> bool {
        match metric {
            MetricKind::Processor => self.processor,
            MetricKind::Graphics => self.graphics,
            MetricKind::Battery => self.battery,
            MetricKind::Enclosure => self.enclosure,
        }
    }

    pub fn with(mut self, metric: MetricKind, enabled: bool) -> Self {
        match metric {
            MetricKind::Processor => self.processor = enabled,
            MetricKind::Graphics => self.graphics = enabled,
            MetricKind::Battery => self.battery = enabled,
            MetricKind::Enclosure => self.enclosure = enabled,
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        !MetricKind::ALL.iter().any(|metric| self.contains(*metric))
    }
}

pub const MIN_INTERVAL_SECS: u64 = 1;
/// One day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingConfig {
    pub interval_secs: u64,
    pub enabled: EnabledMetrics,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            enabled: EnabledMetrics::all(),
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(SamplerError::InvalidConfig(format!(
                "interval must be {MIN_INTERVAL_SECS}..={MAX_INTERVAL_SECS} seconds, got {}",
                self.interval_secs
            )));
        }
        Ok(())
    }
}

/// Process-wide sampling configuration, optionally backed by a JSON file.
///
/// The sampler takes a fresh [`SettingsStore::current`] snapshot at the
/// start of every tick, so an update never affects a tick in flight.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<SamplingConfig>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::in_memory(SamplingConfig::default())
    }
}

impl SettingsStore {
    /// Load settings from `path`, keeping defaults if the file is missing
    /// or unreadable as JSON.
    pub fn new(path: PathBuf) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<SamplingConfig>(&contents) {
                Ok(config) if config.validate().is_ok() => config,
                Ok(config) => {
                    warn!(
                        "Ignoring stored settings with interval {}s; using defaults",
                        config.interval_secs
                    );
                    SamplingConfig::default()
                }
                Err(err) => {
                    warn!("Ignoring corrupt settings file {}: {err}", path.display());
                    SamplingConfig::default()
                }
            }
        } else {
            SamplingConfig::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory(config: SamplingConfig) -> Self {
        Self {
            path: None,
            data: RwLock::new(config),
        }
    }

    pub fn current(&self) -> SamplingConfig {
        *self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the configuration. Invalid configs and failed writes leave
    /// the previous configuration in effect.
    pub fn update(&self, config: SamplingConfig) -> Result<(), SamplerError> {
        config.validate()?;

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    fn persist(&self, config: &SamplingConfig) -> Result<(), SamplerError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
        fs::write(path, serialized)?;
        Ok(())
    }
}
