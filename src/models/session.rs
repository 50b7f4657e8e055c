use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// Public view of one sampler activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub started_at: DateTime<Local>,
    pub output_path: PathBuf,
}
