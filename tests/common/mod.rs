#![allow(dead_code)]

use std::{
    fs::File,
    io::{self, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use thermal_logger_lib::{
    models::MetricKind,
    recorder::LogSink,
    sensing::{BatteryStatus, ThermalSnapshot},
    Platform, Recorder, SampleEvent, SamplerController, SettingsStore, SamplingConfig,
};

/// Test double for the OS boundary. Unset fields read as unavailable.
#[derive(Default)]
pub struct FakePlatform {
    pub thermal: Option<ThermalSnapshot>,
    pub battery: Option<BatteryStatus>,
    pub brightness: Option<i32>,
    /// Blocks every `battery_status` call, which runs once per tick.
    pub tick_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    ticks: AtomicUsize,
}

impl FakePlatform {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn healthy() -> Self {
        Self {
            thermal: Some(ThermalSnapshot {
                processor: Some(47.5),
                graphics: Some(51.0),
                battery: Some(33.0),
                enclosure: None,
            }),
            battery: Some(BatteryStatus {
                temperature_decicelsius: Some(330),
                level_percent: Some(80),
                current_microamps: Some(-250_000),
            }),
            brightness: Some(128),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            tick_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Platform for FakePlatform {
    fn thermal_service(&self) -> Result<ThermalSnapshot> {
        self.thermal.ok_or_else(|| anyhow!("permission denied"))
    }

    fn hardware_temperature(&self, _metric: MetricKind) -> Result<Option<f32>> {
        Err(anyhow!("hardware properties service unavailable"))
    }

    fn sensor_millidegrees(&self, index: u32) -> Result<i64> {
        Err(anyhow!("thermal_zone{index}: permission denied"))
    }

    fn battery_status(&self) -> Result<BatteryStatus> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.tick_delay {
            std::thread::sleep(delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.battery.ok_or_else(|| anyhow!("no battery"))
    }

    fn screen_brightness(&self) -> Result<i32> {
        self.brightness.ok_or_else(|| anyhow!("no backlight"))
    }
}

/// Session files on disk whose writes can be made to fail on demand.
#[derive(Clone, Default)]
pub struct FailingSink {
    failing: Arc<AtomicBool>,
}

impl FailingSink {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

struct FailingFile {
    file: File,
    failing: Arc<AtomicBool>,
}

impl Write for FailingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("no space left on device"));
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl LogSink for FailingSink {
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(FailingFile {
            file: File::create(path)?,
            failing: Arc::clone(&self.failing),
        }))
    }
}

pub fn controller(platform: Arc<FakePlatform>, dir: &Path) -> SamplerController {
    SamplerController::new(
        platform,
        Recorder::new(dir.join("logs")),
        SettingsStore::in_memory(SamplingConfig::default()),
    )
}

pub type Events = Arc<Mutex<Vec<SampleEvent>>>;

pub fn collect_events(controller: &SamplerController) -> Events {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    controller.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

/// Poll until `count` events arrived or `timeout` passed.
pub async fn wait_for_events(events: &Events, count: usize, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if events.lock().unwrap().len() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    events.lock().unwrap().len() >= count
}
