use chrono::{DateTime, Local};
use rand::Rng;
use serde::Serialize;
use std::cell::OnceCell;
use std::sync::{Arc, OnceLock};

use crate::models::{
    MetricKind, Reading, SourceTier, TempSource, Temperature, ENCLOSURE_BATTERY_OFFSET_C,
};
use crate::settings::EnabledMetrics;

use super::platform::{Platform, ThermalSnapshot};
use super::readers::{BatteryReading, SourceReaders};
use super::synthetic::synthetic_celsius;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Which source fed each metric on a session's first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub processor: TempSource,
    pub graphics: TempSource,
    pub battery: TempSource,
    pub enclosure: TempSource,
}

impl SourceSummary {
    fn of(reading: &Reading) -> Self {
        Self {
            processor: reading.processor.source,
            graphics: reading.graphics.source,
            battery: reading.battery.source,
            enclosure: reading.enclosure.source,
        }
    }
}

/// Values shared between metrics within one tick.
#[derive(Default)]
struct TickContext {
    thermal: OnceCell<Option<ThermalSnapshot>>,
    battery_status: Option<BatteryReading>,
    processor: Option<Temperature>,
    battery: Option<Temperature>,
}

/// Walks each enabled metric's tier list and assembles a [`Reading`].
///
/// One resolver belongs to one session; its "first sources" record and the
/// readers' failure logging restart with every session.
pub struct SensorResolver {
    readers: SourceReaders,
    first_sources: OnceLock<SourceSummary>,
}

impl SensorResolver {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            readers: SourceReaders::new(platform),
            first_sources: OnceLock::new(),
        }
    }

    pub fn first_sources(&self) -> Option<SourceSummary> {
        self.first_sources.get().copied()
    }

    pub fn resolve(&self, enabled: EnabledMetrics, timestamp: DateTime<Local>) -> Reading {
        self.resolve_with(enabled, timestamp, &mut rand::thread_rng())
    }

    pub fn resolve_with<R: Rng>(
        &self,
        enabled: EnabledMetrics,
        timestamp: DateTime<Local>,
        rng: &mut R,
    ) -> Reading {
        let mut tick = TickContext {
            battery_status: self.readers.battery_status(),
            ..TickContext::default()
        };

        let processor = self.resolve_metric(MetricKind::Processor, enabled, &tick, rng);
        tick.processor = Some(processor);
        let graphics = self.resolve_metric(MetricKind::Graphics, enabled, &tick, rng);
        let battery = self.resolve_metric(MetricKind::Battery, enabled, &tick, rng);
        tick.battery = Some(battery);
        let enclosure = self.resolve_metric(MetricKind::Enclosure, enabled, &tick, rng);

        let (battery_level_percent, battery_current_ma) = tick
            .battery_status
            .map(|status| (status.level_percent, status.current_ma))
            .unwrap_or((0, 0));

        let reading = Reading {
            timestamp,
            processor,
            graphics,
            battery,
            enclosure,
            battery_level_percent,
            battery_current_ma,
            screen_brightness: self.readers.screen_brightness(),
        };

        let summary = SourceSummary::of(&reading);
        if self.first_sources.set(summary).is_ok() {
            log_info!(
                "temperature sources: processor={}, graphics={}, battery={}, enclosure={}",
                summary.processor.describe(),
                summary.graphics.describe(),
                summary.battery.describe(),
                summary.enclosure.describe()
            );
        }

        reading
    }

    fn resolve_metric<R: Rng>(
        &self,
        metric: MetricKind,
        enabled: EnabledMetrics,
        tick: &TickContext,
        rng: &mut R,
    ) -> Temperature {
        if !enabled.contains(metric) {
            return Temperature::disabled();
        }

        metric
            .tiers()
            .iter()
            .find_map(|tier| self.attempt(*tier, metric, tick))
            .unwrap_or_else(|| Temperature {
                celsius: synthetic_celsius(metric, rng),
                source: TempSource::Synthetic,
            })
    }

    fn attempt(
        &self,
        tier: SourceTier,
        metric: MetricKind,
        tick: &TickContext,
    ) -> Option<Temperature> {
        match tier {
            SourceTier::ThermalService => tick
                .thermal
                .get_or_init(|| self.readers.thermal_service())
                .and_then(|snapshot| snapshot.get(metric))
                .map(|celsius| Temperature {
                    celsius,
                    source: TempSource::ThermalService,
                }),
            SourceTier::HardwareProperties => {
                self.readers
                    .hardware_properties(metric)
                    .map(|celsius| Temperature {
                        celsius,
                        source: TempSource::HardwareProperties,
                    })
            }
            SourceTier::SensorFiles { start, end } => {
                let processor = tick
                    .processor
                    .filter(|temp| metric == MetricKind::Graphics && temp.is_measured())
                    .map(|temp| temp.celsius);

                (start..end).find_map(|index| {
                    let celsius = self.readers.sensor_file(index)?;
                    if processor == Some(celsius) {
                        log_debug!("thermal_zone{index} repeats the processor reading; skipping");
                        return None;
                    }
                    log_debug!("{metric} temperature from thermal_zone{index}: {celsius}");
                    Some(Temperature {
                        celsius,
                        source: TempSource::SensorFile { index },
                    })
                })
            }
            SourceTier::BatteryStatus => tick
                .battery_status
                .and_then(|status| status.temperature_c)
                .map(|celsius| Temperature {
                    celsius,
                    source: TempSource::BatteryStatus,
                }),
            SourceTier::DerivedFromBattery => tick
                .battery
                .filter(Temperature::is_measured)
                .map(|battery| Temperature {
                    celsius: battery.celsius - ENCLOSURE_BATTERY_OFFSET_C,
                    source: TempSource::DerivedFromBattery,
                }),
        }
    }
}
