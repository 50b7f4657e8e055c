pub mod error;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod recorder;
pub mod sampler;
pub mod sensing;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use log::{info, warn};

pub use error::SamplerError;
pub use models::{MetricKind, Reading, SampleEvent, SessionInfo, TempSource, Temperature};
pub use recorder::Recorder;
pub use sampler::{SamplerController, SamplerSnapshot, SamplerStatus};
pub use sensing::{Platform, SysfsPlatform};
pub use settings::{EnabledMetrics, SamplingConfig, SettingsStore};

const DEFAULT_LOG_DIR: &str = "thermal_logs";

/// Host harness: samples the local machine until Ctrl-C (or
/// `THERMAL_DURATION_SECS`), streaming each sample to stdout as JSON.
///
/// | Variable                | Default                    |
/// |-------------------------|----------------------------|
/// | `THERMAL_LOG_DIR`       | `./thermal_logs`           |
/// | `THERMAL_SETTINGS`      | `<log dir>/settings.json`  |
/// | `THERMAL_INTERVAL_SECS` | stored setting, else `1`   |
/// | `THERMAL_DURATION_SECS` | run until Ctrl-C           |
/// | `THERMAL_EXPORT`        | unset; `1` exports on exit |
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let log_dir = std::env::var("THERMAL_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR));
    let settings_path = std::env::var("THERMAL_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| log_dir.join("settings.json"));

    let settings = SettingsStore::new(settings_path)?;
    let mut config = settings.current();
    if let Some(secs) = env_parse::<u64>("THERMAL_INTERVAL_SECS") {
        config.interval_secs = secs;
    }
    let duration = env_parse::<u64>("THERMAL_DURATION_SECS").map(Duration::from_secs);
    let export_on_exit = std::env::var("THERMAL_EXPORT")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let controller = SamplerController::new(
        Arc::new(SysfsPlatform::new()),
        Recorder::new(log_dir),
        settings,
    );

    controller.subscribe(|event| match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!("Failed to encode sample {}: {err}", event.sequence),
    });

    let session = controller.start(config).await?;
    info!("Logging to {}", session.output_path.display());

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    controller.stop().await;

    if let Some(summary) = controller.source_summary().await {
        info!(
            "Sources on first tick: processor={}, graphics={}, battery={}, enclosure={}",
            summary.processor.describe(),
            summary.graphics.describe(),
            summary.battery.describe(),
            summary.enclosure.describe()
        );
    }

    if export_on_exit {
        match controller.export_snapshot() {
            Ok(path) => info!("Exported {}", path.display()),
            Err(SamplerError::NoData) => warn!("Nothing to export: no samples were recorded"),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
