mod types;

pub use types::{MetricsSnapshot, SystemMetrics, TickMetrics};

use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_TICKS: usize = 20;

/// Rolling record of the sampler's own tick costs.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_ticks: Vec<TickMetrics>,
    tick_count: u64,
    write_failures: u64,
    synthetic_ticks: u64,
    undelivered: u64,
    lost_ticks: u64,
    system: System,
    pid: Pid,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // CPU usage is a delta; the first refresh only sets the baseline.
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_ticks: Vec::with_capacity(MAX_RECENT_TICKS),
                tick_count: 0,
                write_failures: 0,
                synthetic_ticks: 0,
                undelivered: 0,
                lost_ticks: 0,
                system,
                pid,
            })),
        }
    }

    /// Current CPU percent and resident memory (MB) of this process.
    pub async fn sample_system_metrics(&self) -> (f32, f64) {
        let mut state = self.inner.lock().await;
        let usage = state.process_usage();
        (usage.cpu_percent, usage.memory_mb)
    }

    pub async fn record_tick(&self, metrics: TickMetrics) {
        let mut state = self.inner.lock().await;

        state.tick_count += 1;
        if !metrics.write_ok {
            state.write_failures += 1;
        }
        if metrics.synthetic_fields > 0 {
            state.synthetic_ticks += 1;
        }
        if !metrics.delivered {
            state.undelivered += 1;
        }

        state.recent_ticks.push(metrics);
        if state.recent_ticks.len() > MAX_RECENT_TICKS {
            state.recent_ticks.remove(0);
        }
    }

    pub async fn record_lost_tick(&self) {
        self.inner.lock().await.lost_ticks += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let system = state.process_usage();

        MetricsSnapshot {
            system,
            recent_ticks: state.recent_ticks.clone(),
            tick_count: state.tick_count,
            write_failures: state.write_failures,
            synthetic_ticks: state.synthetic_ticks,
            undelivered: state.undelivered,
            lost_ticks: state.lost_ticks,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.recent_ticks.clear();
        state.tick_count = 0;
        state.write_failures = 0;
        state.synthetic_ticks = 0;
        state.undelivered = 0;
        state.lost_ticks = 0;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
    }
}

impl MetricsState {
    fn process_usage(&mut self) -> SystemMetrics {
        let pid = self.pid;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        self.system
            .process(pid)
            .map(|process| SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            })
            .unwrap_or_default()
    }
}
