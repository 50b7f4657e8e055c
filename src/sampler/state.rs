use serde::{Deserialize, Serialize};

use crate::models::SessionInfo;
use crate::sensing::SourceSummary;
use crate::settings::SamplingConfig;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SamplerStatus {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct SamplerState {
    pub status: SamplerStatus,
    pub session: Option<SessionInfo>,
}

impl SamplerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == SamplerStatus::Running
    }

    /// The active session, if any.
    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.session.as_ref().filter(|_| self.is_running())
    }

    pub fn begin_session(&mut self, session: SessionInfo) {
        *self = Self {
            status: SamplerStatus::Running,
            session: Some(session),
        };
    }

    /// Back to `Stopped`; the last session stays visible for diagnostics.
    pub fn finish(&mut self) {
        self.status = SamplerStatus::Stopped;
    }
}

/// Host-facing view of the sampler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerSnapshot {
    pub status: SamplerStatus,
    pub session: Option<SessionInfo>,
    pub config: SamplingConfig,
    pub has_subscriber: bool,
    pub first_sources: Option<SourceSummary>,
}
