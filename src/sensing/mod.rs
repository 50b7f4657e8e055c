pub mod platform;
pub mod readers;
pub mod resolver;
pub mod synthetic;
pub mod sysfs;

pub use platform::{BatteryStatus, Platform, ThermalSnapshot};
pub use resolver::{SensorResolver, SourceSummary};
pub use sysfs::SysfsPlatform;
