//! Linux binding of [`Platform`] over `/sys/class` and `sysinfo`.
//!
//! - thermal service: every `thermal/thermal_zone*` classified by its `type`
//!   (`cpu-0-0-usr`, `gpu0-usr`, `battery`, `skin-therm`, ...)
//! - hardware properties: `sysinfo` components matched by label
//! - sensor file: `thermal/thermal_zone<i>/temp`
//! - battery: first `power_supply/*` whose `type` is `Battery`
//! - brightness: first `backlight/*/brightness`

use anyhow::{anyhow, bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use sysinfo::Components;

use crate::models::MetricKind;

use super::platform::{BatteryStatus, Platform, ThermalSnapshot};

const DEFAULT_ROOT: &str = "/sys/class";

const PROCESSOR_LABELS: &[&str] = &["cpu", "package", "core", "tctl", "tdie", "soc"];
const GRAPHICS_LABELS: &[&str] = &["gpu", "nvidia", "amdgpu", "radeon", "edge"];
const BATTERY_LABELS: &[&str] = &["battery", "bat"];
const ENCLOSURE_LABELS: &[&str] = &["skin", "quiet", "case", "chassis", "ambient"];

pub struct SysfsPlatform {
    root: PathBuf,
    components: Option<Mutex<Components>>,
}

impl Default for SysfsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsPlatform {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            components: Some(Mutex::new(Components::new_with_refreshed_list())),
        }
    }

    /// Read from a different `/sys/class` tree and skip `sysinfo`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            components: None,
        }
    }

    fn thermal_dir(&self) -> PathBuf {
        self.root.join("thermal")
    }

    fn zone_temp(&self, zone: &Path) -> Result<i64> {
        read_trimmed(&zone.join("temp"))?
            .parse::<i64>()
            .with_context(|| format!("malformed temperature in {}", zone.display()))
    }
}

impl Platform for SysfsPlatform {
    fn thermal_service(&self) -> Result<ThermalSnapshot> {
        let dir = self.thermal_dir();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?;

        let mut zones: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("thermal_zone"))
            })
            .collect();
        zones.sort_by_key(|path| zone_index(path));

        let mut snapshot = ThermalSnapshot::default();
        for zone in zones {
            let Ok(kind) = read_trimmed(&zone.join("type")) else {
                continue;
            };
            let Some(metric) = classify_zone(&kind) else {
                continue;
            };
            if snapshot.get(metric).is_some() {
                continue;
            }
            match self.zone_temp(&zone) {
                Ok(millidegrees) if millidegrees > 0 => {
                    snapshot.set(metric, millidegrees as f32 / 1000.0);
                }
                _ => {}
            }
        }

        if snapshot == ThermalSnapshot::default() {
            bail!("no typed thermal zones readable under {}", dir.display());
        }
        Ok(snapshot)
    }

    fn hardware_temperature(&self, metric: MetricKind) -> Result<Option<f32>> {
        let components = self
            .components
            .as_ref()
            .ok_or_else(|| anyhow!("hardware sensors not enumerated"))?;
        let mut components = components.lock().unwrap_or_else(PoisonError::into_inner);
        components.refresh();

        let labels = match metric {
            MetricKind::Processor => PROCESSOR_LABELS,
            MetricKind::Graphics => GRAPHICS_LABELS,
            MetricKind::Battery => BATTERY_LABELS,
            MetricKind::Enclosure => ENCLOSURE_LABELS,
        };

        Ok(components
            .list()
            .iter()
            .find(|component| {
                let label = component.label().to_lowercase();
                labels.iter().any(|needle| label.contains(needle))
            })
            .map(|component| component.temperature()))
    }

    fn sensor_millidegrees(&self, index: u32) -> Result<i64> {
        self.zone_temp(&self.thermal_dir().join(format!("thermal_zone{index}")))
    }

    fn battery_status(&self) -> Result<BatteryStatus> {
        let dir = self.root.join("power_supply");
        let supply = fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .find(|path| {
                read_trimmed(&path.join("type"))
                    .is_ok_and(|kind| kind.eq_ignore_ascii_case("battery"))
            })
            .ok_or_else(|| anyhow!("no battery under {}", dir.display()))?;

        Ok(BatteryStatus {
            temperature_decicelsius: read_number(&supply.join("temp")),
            level_percent: read_number(&supply.join("capacity")),
            current_microamps: read_number(&supply.join("current_now")),
        })
    }

    fn screen_brightness(&self) -> Result<i32> {
        let dir = self.root.join("backlight");
        let mut devices: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .collect();
        devices.sort();

        let device = devices
            .first()
            .ok_or_else(|| anyhow!("no backlight under {}", dir.display()))?;
        read_number(&device.join("brightness"))
            .ok_or_else(|| anyhow!("unreadable brightness for {}", device.display()))
    }
}

/// Map a thermal zone `type` onto the metric it most likely measures.
pub fn classify_zone(kind: &str) -> Option<MetricKind> {
    let kind = kind.to_ascii_lowercase();
    if kind.contains("gpu") {
        Some(MetricKind::Graphics)
    } else if kind.contains("batt") {
        Some(MetricKind::Battery)
    } else if ["skin", "quiet", "case", "back"]
        .iter()
        .any(|needle| kind.contains(needle))
    {
        Some(MetricKind::Enclosure)
    } else if ["cpu", "x86_pkg", "soc", "tsens"]
        .iter()
        .any(|needle| kind.contains(needle))
    {
        Some(MetricKind::Processor)
    } else {
        None
    }
}

fn zone_index(path: &Path) -> u32 {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("thermal_zone"))
        .and_then(|index| index.parse().ok())
        .unwrap_or(u32::MAX)
}

fn read_trimmed(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|contents| contents.trim().to_string())
        .with_context(|| format!("failed to read {}", path.display()))
}

fn read_number<T: std::str::FromStr>(path: &Path) -> Option<T> {
    read_trimmed(path).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn android_like_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "thermal/thermal_zone0/type", "cpu-0-0-usr\n");
        write(root, "thermal/thermal_zone0/temp", "41300\n");
        write(root, "thermal/thermal_zone1/type", "cpu-0-1-usr\n");
        write(root, "thermal/thermal_zone1/temp", "44800\n");
        write(root, "thermal/thermal_zone6/type", "gpu0-usr\n");
        write(root, "thermal/thermal_zone6/temp", "39000\n");
        write(root, "thermal/thermal_zone9/type", "skin-therm\n");
        write(root, "thermal/thermal_zone9/temp", "33500\n");
        write(root, "thermal/thermal_zone12/type", "pa-therm0\n");
        write(root, "thermal/thermal_zone12/temp", "30000\n");
        write(root, "power_supply/usb/type", "USB\n");
        write(root, "power_supply/battery/type", "Battery\n");
        write(root, "power_supply/battery/temp", "315\n");
        write(root, "power_supply/battery/capacity", "76\n");
        write(root, "power_supply/battery/current_now", "-812000\n");
        write(root, "backlight/panel0-backlight/brightness", "1023\n");
        dir
    }

    #[test]
    fn typed_zones_map_to_metrics() {
        let dir = android_like_tree();
        let platform = SysfsPlatform::with_root(dir.path());

        let snapshot = platform.thermal_service().unwrap();
        assert_eq!(snapshot.processor, Some(41.3));
        assert_eq!(snapshot.graphics, Some(39.0));
        assert_eq!(snapshot.enclosure, Some(33.5));
        assert_eq!(snapshot.battery, None);
    }

    #[test]
    fn idle_zone_does_not_hide_a_later_one_of_the_same_kind() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "thermal/thermal_zone0/type", "cpu-0-0-usr\n");
        write(root, "thermal/thermal_zone0/temp", "0\n");
        write(root, "thermal/thermal_zone1/type", "cpu-0-1-usr\n");
        write(root, "thermal/thermal_zone1/temp", "45000\n");
        let platform = SysfsPlatform::with_root(root);

        let snapshot = platform.thermal_service().unwrap();
        assert_eq!(snapshot.processor, Some(45.0));
    }

    #[test]
    fn sensor_file_reads_raw_milli_degrees() {
        let dir = android_like_tree();
        let platform = SysfsPlatform::with_root(dir.path());

        assert_eq!(platform.sensor_millidegrees(1).unwrap(), 44_800);
        assert!(platform.sensor_millidegrees(3).is_err());
    }

    #[test]
    fn battery_is_found_among_power_supplies() {
        let dir = android_like_tree();
        let platform = SysfsPlatform::with_root(dir.path());

        let status = platform.battery_status().unwrap();
        assert_eq!(status.temperature_decicelsius, Some(315));
        assert_eq!(status.level_percent, Some(76));
        assert_eq!(status.current_microamps, Some(-812_000));
        assert_eq!(platform.screen_brightness().unwrap(), 1023);
    }

    #[test]
    fn empty_tree_is_unavailable_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let platform = SysfsPlatform::with_root(dir.path());

        assert!(platform.thermal_service().is_err());
        assert!(platform.hardware_temperature(MetricKind::Processor).is_err());
        assert!(platform.sensor_millidegrees(0).is_err());
        assert!(platform.battery_status().is_err());
        assert!(platform.screen_brightness().is_err());
    }

    #[test]
    fn zone_types_classify_by_keyword() {
        assert_eq!(classify_zone("x86_pkg_temp"), Some(MetricKind::Processor));
        assert_eq!(classify_zone("GPU-therm"), Some(MetricKind::Graphics));
        assert_eq!(classify_zone("battery"), Some(MetricKind::Battery));
        assert_eq!(classify_zone("quiet-therm"), Some(MetricKind::Enclosure));
        assert_eq!(classify_zone("pa-therm0"), None);
    }
}
