use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Local;
use log::{error, info, warn};
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::SamplerError,
    metrics::{MetricsCollector, MetricsSnapshot},
    models::{SampleEvent, SessionInfo},
    notify::NotificationChannel,
    recorder::Recorder,
    sensing::{Platform, SensorResolver, SourceSummary},
    settings::{SamplingConfig, SettingsStore},
};

use super::loop_worker::{sampling_loop, LoopDeps, SamplingSession};
use super::{SamplerSnapshot, SamplerState};

/// How long `stop` waits for an in-flight tick before aborting it.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

struct ControllerState {
    sampler: SamplerState,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    resolver: Option<Arc<SensorResolver>>,
}

/// Host-facing handle driving the `Stopped -> Running -> Stopped` cycle.
///
/// Cloning is cheap; every clone controls the same sampler.
#[derive(Clone)]
pub struct SamplerController {
    state: Arc<Mutex<ControllerState>>,
    platform: Arc<dyn Platform>,
    recorder: Arc<Recorder>,
    settings: Arc<SettingsStore>,
    channel: NotificationChannel,
    metrics: MetricsCollector,
    stop_grace: Duration,
}

impl SamplerController {
    pub fn new(platform: Arc<dyn Platform>, recorder: Recorder, settings: SettingsStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                sampler: SamplerState::new(),
                handle: None,
                cancel_token: None,
                resolver: None,
            })),
            platform,
            recorder: Arc::new(recorder),
            settings: Arc::new(settings),
            channel: NotificationChannel::new(),
            metrics: MetricsCollector::new(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Open a session and begin sampling; the first tick fires immediately.
    ///
    /// Already running: returns the active session and changes nothing.
    pub async fn start(&self, config: SamplingConfig) -> Result<SessionInfo, SamplerError> {
        let mut state = self.state.lock().await;
        reap_finished_loop(&mut state).await;
        if let Some(session) = state.sampler.active_session() {
            info!("Sampler already running (session {}); start ignored", session.id);
            return Ok(session.clone());
        }

        config.validate()?;

        let started_at = Local::now();
        let log = self
            .recorder
            .open_session(started_at)
            .map_err(SamplerError::StartupFailed)?;

        self.settings.update(config).inspect_err(|err| {
            warn!("Not starting: {err}; {} left unused", log.path().display());
        })?;

        let session = SessionInfo {
            id: Uuid::new_v4().to_string(),
            started_at,
            output_path: log.path().to_path_buf(),
        };
        let resolver = Arc::new(SensorResolver::new(Arc::clone(&self.platform)));

        self.metrics.reset().await;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            SamplingSession {
                info: session.clone(),
                log,
                resolver: Arc::clone(&resolver),
                points: 0,
            },
            LoopDeps {
                settings: Arc::clone(&self.settings),
                channel: self.channel.clone(),
                metrics: self.metrics.clone(),
            },
            cancel_token.clone(),
        ));

        state.sampler.begin_session(session.clone());
        state.handle = Some(handle);
        state.cancel_token = Some(cancel_token);
        state.resolver = Some(resolver);

        info!(
            "Sampling started: session {} every {}s into {}",
            session.id,
            config.interval_secs,
            session.output_path.display()
        );
        Ok(session)
    }

    /// Stop sampling. Lets an in-flight tick finish (up to the grace
    /// period) and closes the session. No-op when already stopped.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(mut handle) = state.handle.take() else {
            return;
        };

        if let Some(token) = state.cancel_token.take() {
            token.cancel();
        }

        match time::timeout(self.stop_grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("Sampling loop task failed: {err}"),
            Err(_) => {
                warn!(
                    "In-flight tick still running after {:?}; aborting sampling loop",
                    self.stop_grace
                );
                handle.abort();
            }
        }

        state.sampler.finish();
        if let Some(session) = state.sampler.session.as_ref() {
            info!("Sampling stopped: session {}", session.id);
        }
    }

    /// Replace the configuration; takes effect from the next tick.
    pub fn set_config(&self, config: SamplingConfig) -> Result<(), SamplerError> {
        self.settings.update(config).inspect_err(|err| {
            warn!("Rejected sampling config: {err}");
        })?;
        info!(
            "Sampling config updated: every {}s, enabled {:?}",
            config.interval_secs, config.enabled
        );
        Ok(())
    }

    pub fn config(&self) -> SamplingConfig {
        self.settings.current()
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&SampleEvent) + Send + Sync + 'static,
    {
        self.channel.subscribe(subscriber);
    }

    pub fn unsubscribe(&self) {
        self.channel.unsubscribe();
    }

    /// Copy the latest session log for handoff.
    pub fn export_snapshot(&self) -> Result<PathBuf, SamplerError> {
        self.recorder.export(Local::now()).inspect_err(|err| {
            warn!("Export failed: {err}");
        })
    }

    pub async fn is_running(&self) -> bool {
        let mut state = self.state.lock().await;
        reap_finished_loop(&mut state).await;
        state.sampler.is_running()
    }

    pub async fn status(&self) -> SamplerSnapshot {
        let mut state = self.state.lock().await;
        reap_finished_loop(&mut state).await;
        SamplerSnapshot {
            status: state.sampler.status,
            session: state.sampler.session.clone(),
            config: self.settings.current(),
            has_subscriber: self.channel.has_subscriber(),
            first_sources: state.resolver.as_ref().and_then(|r| r.first_sources()),
        }
    }

    /// Which source fed each metric on the latest session's first tick.
    pub async fn source_summary(&self) -> Option<SourceSummary> {
        let state = self.state.lock().await;
        state.resolver.as_ref().and_then(|r| r.first_sources())
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }
}

/// A loop task that ended without `stop` leaves the sampler `Stopped`.
async fn reap_finished_loop(state: &mut ControllerState) {
    if !state.handle.as_ref().is_some_and(JoinHandle::is_finished) {
        return;
    }
    let Some(handle) = state.handle.take() else {
        return;
    };
    state.cancel_token = None;

    let id = state
        .sampler
        .session
        .as_ref()
        .map(|session| session.id.clone())
        .unwrap_or_default();
    match handle.await {
        Ok(()) => error!("Sampling loop for session {id} ended on its own"),
        Err(err) => error!("Sampling loop for session {id} died: {err}"),
    }
    state.sampler.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplerStatus;
    use crate::sensing::SysfsPlatform;

    fn controller(dir: &std::path::Path) -> SamplerController {
        SamplerController::new(
            Arc::new(SysfsPlatform::with_root(dir.join("sys"))),
            Recorder::new(dir.join("logs")),
            SettingsStore::default(),
        )
    }

    fn session(dir: &std::path::Path) -> SessionInfo {
        SessionInfo {
            id: "dead".to_string(),
            started_at: Local::now(),
            output_path: dir.join("dead.csv"),
        }
    }

    #[tokio::test]
    async fn dead_loop_is_not_reported_as_running() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        {
            let mut state = controller.state.lock().await;
            let handle = tokio::spawn(async {
                panic!("loop crashed");
            });
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
            state.sampler.begin_session(session(dir.path()));
            state.handle = Some(handle);
            state.cancel_token = Some(CancellationToken::new());
        }

        assert!(!controller.is_running().await);
        assert_eq!(controller.status().await.status, SamplerStatus::Stopped);
        controller.stop().await;
    }

    #[tokio::test]
    async fn start_replaces_a_dead_loop_with_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        {
            let mut state = controller.state.lock().await;
            let handle = tokio::spawn(async {});
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
            state.sampler.begin_session(session(dir.path()));
            state.handle = Some(handle);
        }

        let fresh = controller.start(SamplingConfig::default()).await.unwrap();
        assert_ne!(fresh.id, "dead");
        assert!(controller.is_running().await);
        controller.stop().await;
    }
}
