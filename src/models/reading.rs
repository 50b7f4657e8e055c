use chrono::{DateTime, Local};
use serde::Serialize;

use super::MetricKind;

/// Which acquisition path produced a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TempSource {
    /// Metric was not requested this tick.
    Disabled,
    ThermalService,
    HardwareProperties,
    SensorFile { index: u32 },
    BatteryStatus,
    DerivedFromBattery,
    /// Placeholder generated because every real source failed.
    Synthetic,
}

impl TempSource {
    pub fn describe(&self) -> String {
        match self {
            TempSource::Disabled => "disabled".into(),
            TempSource::ThermalService => "thermal service".into(),
            TempSource::HardwareProperties => "hardware properties".into(),
            TempSource::SensorFile { index } => format!("thermal_zone{index}"),
            TempSource::BatteryStatus => "battery status".into(),
            TempSource::DerivedFromBattery => "derived from battery".into(),
            TempSource::Synthetic => "synthetic".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Temperature {
    pub celsius: f32,
    pub source: TempSource,
}

impl Temperature {
    pub fn disabled() -> Self {
        Self {
            celsius: 0.0,
            source: TempSource::Disabled,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == TempSource::Synthetic
    }

    pub fn is_disabled(&self) -> bool {
        self.source == TempSource::Disabled
    }

    /// A positive value that came from an actual sensor path.
    pub fn is_measured(&self) -> bool {
        !self.is_synthetic() && !self.is_disabled() && self.celsius > 0.0
    }
}

/// One resolved sample, produced once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Local>,
    pub processor: Temperature,
    pub graphics: Temperature,
    pub battery: Temperature,
    pub enclosure: Temperature,
    /// 0..=100, 0 when unreadable.
    pub battery_level_percent: i32,
    /// Negative while discharging on most platforms, 0 when unreadable.
    pub battery_current_ma: i32,
    /// Platform scale, -1 when unknown.
    pub screen_brightness: i32,
}

impl Reading {
    pub fn temperature(&self, metric: MetricKind) -> &Temperature {
        match metric {
            MetricKind::Processor => &self.processor,
            MetricKind::Graphics => &self.graphics,
            MetricKind::Battery => &self.battery,
            MetricKind::Enclosure => &self.enclosure,
        }
    }

    pub fn synthetic_count(&self) -> usize {
        MetricKind::ALL
            .iter()
            .filter(|metric| self.temperature(**metric).is_synthetic())
            .count()
    }
}

/// What the live subscriber receives for every tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleEvent {
    pub session_id: String,
    /// Session point counter, 1 for the first tick.
    pub sequence: u64,
    pub reading: Reading,
}
