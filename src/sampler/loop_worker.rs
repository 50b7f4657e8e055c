use chrono::{Local, Utc};
use std::sync::Arc;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    metrics::{MetricsCollector, TickMetrics},
    models::{SampleEvent, SessionInfo},
    notify::NotificationChannel,
    recorder::SessionLog,
    sensing::SensorResolver,
    settings::{SamplingConfig, SettingsStore},
};

// Set to false to silence per-tick logging from this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Everything owned by one activation. Lives inside the loop task.
pub(crate) struct SamplingSession {
    pub info: SessionInfo,
    pub log: SessionLog,
    pub resolver: Arc<SensorResolver>,
    pub points: u64,
}

/// Collaborators shared with the controller.
pub(crate) struct LoopDeps {
    pub settings: Arc<SettingsStore>,
    pub channel: NotificationChannel,
    pub metrics: MetricsCollector,
}

pub(crate) async fn sampling_loop(
    mut session: SamplingSession,
    deps: LoopDeps,
    cancel_token: CancellationToken,
) {
    let mut period = deps.settings.current().interval();
    let mut ticker = ticker_from(Instant::now(), period);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down for session {}", session.info.id);
                break;
            }
            _ = ticker.tick() => {
                let config = deps.settings.current();
                if config.interval() != period {
                    match delayed_ticker(Instant::now(), config.interval()) {
                        Some(rebuilt) => {
                            period = config.interval();
                            ticker = rebuilt;
                            log_info!("sampling interval now {}s", config.interval_secs);
                        }
                        None => log_error!(
                            "interval {}s is out of range; keeping {}s",
                            config.interval_secs,
                            period.as_secs()
                        ),
                    }
                }

                perform_tick(&mut session, &deps, &config).await;
            }
        }
    }

    let SamplingSession { info, log, .. } = session;
    match log.close() {
        Ok(records) => log_info!("session {} closed with {} records", info.id, records),
        Err(err) => log_error!("failed to close log for session {}: {err:#}", info.id),
    }
}

/// Fires at `start`, then every `period`. An overrunning tick pushes the
/// schedule back instead of bunching up.
fn ticker_from(start: Instant, period: Duration) -> Interval {
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Ticker whose first tick is one `period` after `now`, or `None` when that
/// instant is not representable.
fn delayed_ticker(now: Instant, period: Duration) -> Option<Interval> {
    now.checked_add(period).map(|start| ticker_from(start, period))
}

async fn perform_tick(session: &mut SamplingSession, deps: &LoopDeps, config: &SamplingConfig) {
    let tick_start = Instant::now();
    let timestamp = Local::now();

    let resolver = Arc::clone(&session.resolver);
    let enabled = config.enabled;
    let reading =
        match tokio::task::spawn_blocking(move || resolver.resolve(enabled, timestamp)).await {
            Ok(reading) => reading,
            Err(err) => {
                log_error!("resolution failed for session {}: {err}", session.info.id);
                deps.metrics.record_lost_tick().await;
                return;
            }
        };
    let resolve_ms = tick_start.elapsed().as_millis() as u64;

    session.points += 1;
    let sequence = session.points;

    let write_start = Instant::now();
    let write_ok = match session.log.append(&reading) {
        Ok(()) => true,
        Err(err) => {
            log_error!("failed to persist sample {sequence}: {err:#}");
            false
        }
    };
    let write_ms = write_start.elapsed().as_millis() as u64;

    let synthetic_fields = reading.synthetic_count();
    let event = SampleEvent {
        session_id: session.info.id.clone(),
        sequence,
        reading,
    };

    let notify_start = Instant::now();
    let delivered = deps.channel.publish(&event);
    if !delivered {
        log_debug!("sample {sequence} not delivered: no live subscriber");
    }
    let notify_ms = notify_start.elapsed().as_millis() as u64;

    let (cpu_percent, memory_mb) = deps.metrics.sample_system_metrics().await;
    let total_ms = tick_start.elapsed().as_millis() as u64;

    log_debug!(
        "sample {sequence} in {total_ms}ms \
         (resolve {resolve_ms}ms, write {write_ms}ms, notify {notify_ms}ms)"
    );

    deps.metrics
        .record_tick(TickMetrics {
            timestamp: Utc::now(),
            sequence,
            resolve_ms,
            write_ms,
            notify_ms,
            total_ms,
            synthetic_fields,
            write_ok,
            delivered,
            cpu_percent,
            memory_mb,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unrepresentable_period_yields_no_ticker() {
        let now = Instant::now();
        assert!(delayed_ticker(now, Duration::MAX).is_none());
        assert!(delayed_ticker(now, Duration::from_secs(u64::MAX)).is_none());
    }

    #[tokio::test]
    async fn rebuilt_ticker_waits_one_full_period() {
        let now = Instant::now();
        let mut ticker = delayed_ticker(now, Duration::from_millis(200)).unwrap();

        ticker.tick().await;
        assert!(now.elapsed() >= Duration::from_millis(200));
    }
}
