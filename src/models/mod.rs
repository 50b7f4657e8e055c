mod metric;
mod reading;
mod session;

pub use metric::{MetricKind, SourceTier, ENCLOSURE_BATTERY_OFFSET_C};
pub use reading::{Reading, SampleEvent, TempSource, Temperature};
pub use session::SessionInfo;
