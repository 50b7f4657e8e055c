use anyhow::Result;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::MetricKind;

use super::platform::{Platform, ThermalSnapshot};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderKind {
    ThermalService,
    HardwareProperties,
    SensorFile,
    BatteryStatus,
    Brightness,
}

impl ReaderKind {
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReaderKind::ThermalService => "thermal service",
            ReaderKind::HardwareProperties => "hardware properties",
            ReaderKind::SensorFile => "sensor file",
            ReaderKind::BatteryStatus => "battery status",
            ReaderKind::Brightness => "screen brightness",
        })
    }
}

/// Battery report converted to display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub temperature_c: Option<f32>,
    pub level_percent: i32,
    pub current_ma: i32,
}

/// Session-scoped wrappers around a [`Platform`].
///
/// Each reader returns `Some` only for a usable value. Errors and panics
/// from the platform stop here; the first failure of each kind is logged,
/// repeats are not.
pub struct SourceReaders {
    platform: Arc<dyn Platform>,
    reported: [AtomicBool; 5],
}

impl SourceReaders {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            reported: Default::default(),
        }
    }

    pub fn thermal_service(&self) -> Option<ThermalSnapshot> {
        let raw = self.guarded(ReaderKind::ThermalService, || {
            self.platform.thermal_service()
        })?;

        let mut snapshot = ThermalSnapshot::default();
        for metric in MetricKind::ALL {
            if let Some(celsius) = raw.get(metric).and_then(plausible) {
                snapshot.set(metric, celsius);
            }
        }
        Some(snapshot)
    }

    pub fn hardware_properties(&self, metric: MetricKind) -> Option<f32> {
        self.guarded(ReaderKind::HardwareProperties, || {
            self.platform.hardware_temperature(metric)
        })
        .flatten()
        .and_then(plausible)
    }

    pub fn sensor_file(&self, index: u32) -> Option<f32> {
        let millidegrees = self.guarded(ReaderKind::SensorFile, || {
            self.platform.sensor_millidegrees(index)
        })?;
        plausible(millidegrees as f32 / 1000.0)
    }

    pub fn battery_status(&self) -> Option<BatteryReading> {
        let status = self.guarded(ReaderKind::BatteryStatus, || {
            self.platform.battery_status()
        })?;

        let current_ma = status
            .current_microamps
            .map(|ua| (ua / 1000).clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .unwrap_or(0);

        Some(BatteryReading {
            temperature_c: status
                .temperature_decicelsius
                .and_then(|tenths| plausible(tenths as f32 / 10.0)),
            level_percent: status.level_percent.unwrap_or(0).clamp(0, 100),
            current_ma,
        })
    }

    /// Brightness on the platform scale, -1 when unknown.
    pub fn screen_brightness(&self) -> i32 {
        self.guarded(ReaderKind::Brightness, || self.platform.screen_brightness())
            .filter(|level| *level >= 0)
            .unwrap_or(-1)
    }

    fn guarded<T>(&self, kind: ReaderKind, call: impl FnOnce() -> Result<T>) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                self.note_failure(kind, &format!("{err:#}"));
                None
            }
            Err(_) => {
                self.note_failure(kind, "platform call panicked");
                None
            }
        }
    }

    fn note_failure(&self, kind: ReaderKind, reason: &str) {
        if !self.reported[kind.index()].swap(true, Ordering::Relaxed) {
            log_info!("{kind} unavailable ({reason}); falling back");
        } else {
            log::trace!("{kind} unavailable: {reason}");
        }
    }
}

fn plausible(celsius: f32) -> Option<f32> {
    (celsius.is_finite() && celsius > 0.0).then_some(celsius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::platform::BatteryStatus;
    use anyhow::{anyhow, bail};

    struct Flaky;

    impl Platform for Flaky {
        fn thermal_service(&self) -> Result<ThermalSnapshot> {
            Ok(ThermalSnapshot {
                processor: Some(51.5),
                graphics: Some(-3.0),
                battery: Some(f32::NAN),
                enclosure: None,
            })
        }

        fn hardware_temperature(&self, _metric: MetricKind) -> Result<Option<f32>> {
            panic!("binder died");
        }

        fn sensor_millidegrees(&self, index: u32) -> Result<i64> {
            match index {
                0 => Ok(47_250),
                1 => Ok(0),
                _ => bail!("permission denied"),
            }
        }

        fn battery_status(&self) -> Result<BatteryStatus> {
            Ok(BatteryStatus {
                temperature_decicelsius: Some(312),
                level_percent: Some(140),
                current_microamps: Some(-450_000),
            })
        }

        fn screen_brightness(&self) -> Result<i32> {
            Err(anyhow!("no backlight"))
        }
    }

    fn readers() -> SourceReaders {
        SourceReaders::new(Arc::new(Flaky))
    }

    #[test]
    fn thermal_service_keeps_only_plausible_values() {
        let snapshot = readers().thermal_service().unwrap();
        assert_eq!(snapshot.processor, Some(51.5));
        assert_eq!(snapshot.graphics, None);
        assert_eq!(snapshot.battery, None);
        assert_eq!(snapshot.enclosure, None);
    }

    #[test]
    fn panicking_platform_call_reads_as_unavailable() {
        assert_eq!(readers().hardware_properties(MetricKind::Processor), None);
    }

    #[test]
    fn sensor_files_are_milli_degrees() {
        let readers = readers();
        assert_eq!(readers.sensor_file(0), Some(47.25));
        assert_eq!(readers.sensor_file(1), None);
        assert_eq!(readers.sensor_file(7), None);
    }

    #[test]
    fn battery_units_are_converted() {
        let battery = readers().battery_status().unwrap();
        assert_eq!(battery.temperature_c, Some(31.2));
        assert_eq!(battery.level_percent, 100);
        assert_eq!(battery.current_ma, -450);
    }

    #[test]
    fn unknown_brightness_is_minus_one() {
        assert_eq!(readers().screen_brightness(), -1);
    }
}
