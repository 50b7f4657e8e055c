use std::io;

/// Failures the sampler reports to its host.
///
/// Source unavailability never appears here: readers turn it into a
/// fallback, never into an error.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("invalid sampling configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open session output: {0:#}")]
    StartupFailed(anyhow::Error),

    #[error("no recorded data available for export")]
    NoData,

    #[error("persistence failed: {0}")]
    Persistence(#[from] io::Error),
}
