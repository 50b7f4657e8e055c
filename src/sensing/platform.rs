//! Capability boundary between the sampler and the operating system.
//!
//! Every method is fallible and may be slow to fail on locked-down devices;
//! callers never see these errors directly, [`super::readers`] turns them
//! into "unavailable".

use anyhow::Result;

use crate::models::MetricKind;

/// Result of a typed thermal-service query. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermalSnapshot {
    pub processor: Option<f32>,
    pub graphics: Option<f32>,
    pub battery: Option<f32>,
    pub enclosure: Option<f32>,
}

impl ThermalSnapshot {
    pub fn get(&self, metric: MetricKind) -> Option<f32> {
        match metric {
            MetricKind::Processor => self.processor,
            MetricKind::Graphics => self.graphics,
            MetricKind::Battery => self.battery,
            MetricKind::Enclosure => self.enclosure,
        }
    }

    pub fn set(&mut self, metric: MetricKind, celsius: f32) {
        let slot = match metric {
            MetricKind::Processor => &mut self.processor,
            MetricKind::Graphics => &mut self.graphics,
            MetricKind::Battery => &mut self.battery,
            MetricKind::Enclosure => &mut self.enclosure,
        };
        *slot = Some(celsius);
    }
}

/// Battery report in the units the platform delivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Tenths of a degree Celsius.
    pub temperature_decicelsius: Option<i32>,
    pub level_percent: Option<i32>,
    pub current_microamps: Option<i64>,
}

pub trait Platform: Send + Sync {
    /// Privileged typed thermal query; expected to fail without elevated
    /// permission.
    fn thermal_service(&self) -> Result<ThermalSnapshot>;

    /// Structured hardware-properties query for one metric.
    fn hardware_temperature(&self, metric: MetricKind) -> Result<Option<f32>>;

    /// Raw kernel sensor file `index`, in milli-degrees Celsius.
    fn sensor_millidegrees(&self, index: u32) -> Result<i64>;

    fn battery_status(&self) -> Result<BatteryStatus>;

    fn screen_brightness(&self) -> Result<i32>;
}
