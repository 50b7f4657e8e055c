use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// One of the four temperatures a reading tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Processor,
    Graphics,
    Battery,
    /// Device shell ("skin") temperature.
    Enclosure,
}

/// Acquisition strategy for a metric, in the order it is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    /// Typed thermal service returning every metric in one query.
    ThermalService,
    /// Structured hardware-properties query for a single metric.
    HardwareProperties,
    /// Kernel sensor files `thermal_zone<start..end>`, first positive wins.
    SensorFiles { start: u32, end: u32 },
    /// Battery status report, tenths of a degree.
    BatteryStatus,
    /// Enclosure derived from a real battery temperature.
    DerivedFromBattery,
}

const PROCESSOR_TIERS: &[SourceTier] = &[
    SourceTier::ThermalService,
    SourceTier::HardwareProperties,
    SourceTier::SensorFiles { start: 0, end: 5 },
];

const GRAPHICS_TIERS: &[SourceTier] = &[
    SourceTier::ThermalService,
    SourceTier::HardwareProperties,
    SourceTier::SensorFiles { start: 5, end: 10 },
];

const BATTERY_TIERS: &[SourceTier] = &[
    SourceTier::ThermalService,
    SourceTier::HardwareProperties,
    SourceTier::BatteryStatus,
];

const ENCLOSURE_TIERS: &[SourceTier] = &[
    SourceTier::ThermalService,
    SourceTier::HardwareProperties,
    SourceTier::DerivedFromBattery,
];

/// Enclosure runs this much cooler than the battery it is derived from.
pub const ENCLOSURE_BATTERY_OFFSET_C: f32 = 2.0;

impl MetricKind {
    /// Resolution order within a tick.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Processor,
        MetricKind::Graphics,
        MetricKind::Battery,
        MetricKind::Enclosure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Processor => "processor",
            MetricKind::Graphics => "graphics",
            MetricKind::Battery => "battery",
            MetricKind::Enclosure => "enclosure",
        }
    }

    pub fn tiers(&self) -> &'static [SourceTier] {
        match self {
            MetricKind::Processor => PROCESSOR_TIERS,
            MetricKind::Graphics => GRAPHICS_TIERS,
            MetricKind::Battery => BATTERY_TIERS,
            MetricKind::Enclosure => ENCLOSURE_TIERS,
        }
    }

    /// Plausible range for placeholder values when no real source answers.
    pub fn synthetic_range(&self) -> Range<f32> {
        match self {
            MetricKind::Processor => 35.0..45.0,
            MetricKind::Graphics => 40.0..55.0,
            MetricKind::Battery => 32.0..40.0,
            MetricKind::Enclosure => 30.0..38.0,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
