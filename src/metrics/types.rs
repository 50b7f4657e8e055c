use chrono::{DateTime, Utc};
use serde::Serialize;

/// Timings and outcome of one tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickMetrics {
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    pub resolve_ms: u64,
    pub write_ms: u64,
    pub notify_ms: u64,
    pub total_ms: u64,
    pub synthetic_fields: usize,
    pub write_ok: bool,
    pub delivered: bool,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_ticks: Vec<TickMetrics>,
    pub tick_count: u64,
    pub write_failures: u64,
    pub synthetic_ticks: u64,
    pub undelivered: u64,
    /// Ticks abandoned because resolution panicked; nothing was recorded.
    pub lost_ticks: u64,
}
