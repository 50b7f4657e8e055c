use chrono::{DateTime, Local};

use crate::models::Reading;

pub const CSV_HEADER: &str =
    "Time,ThermalCPU,ThermalGPU,ThermalBattery,ThermalSkin,BatteryLevel(%),Current(mA),Brightness";

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn session_file_name(now: DateTime<Local>) -> String {
    format!("system_log_{}.csv", now.format(FILE_STAMP_FORMAT))
}

pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("system_log_export_{}.csv", now.format(FILE_STAMP_FORMAT))
}

/// Decimal Celsius, always with a fractional part (`36.5`, `40.0`, `0.0`).
pub fn format_celsius(celsius: f32) -> String {
    format!("{celsius:?}")
}

/// One data line in [`CSV_HEADER`] column order, without the newline.
pub fn format_line(reading: &Reading) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        reading.timestamp.format(TIME_FORMAT),
        format_celsius(reading.processor.celsius),
        format_celsius(reading.graphics.celsius),
        format_celsius(reading.battery.celsius),
        format_celsius(reading.enclosure.celsius),
        reading.battery_level_percent,
        reading.battery_current_ma,
        reading.screen_brightness,
    )
}
