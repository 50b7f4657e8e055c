//! Append-only CSV persistence of readings.
//!
//! Each session writes `system_log_<yyyyMMdd_HHmmss>.csv` inside the
//! recorder directory: one header line, then one line per tick, flushed as
//! it is written. `export` copies the latest log that holds data.

mod format;

pub use format::{export_file_name, format_celsius, format_line, session_file_name, CSV_HEADER};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::error::SamplerError;
use crate::models::Reading;

struct LogStats {
    path: PathBuf,
    records: AtomicU64,
}

type LatestLog = Arc<Mutex<Option<Arc<LogStats>>>>;

/// Where session log bytes go once the file name is chosen.
pub trait LogSink: Send + Sync {
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Plain files on disk.
pub struct FileSink;

impl LogSink for FileSink {
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }
}

pub struct Recorder {
    dir: PathBuf,
    sink: Arc<dyn LogSink>,
    latest: LatestLog,
}

impl Recorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_sink(dir, Arc::new(FileSink))
    }

    pub fn with_sink(dir: impl Into<PathBuf>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            dir: dir.into(),
            sink,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the session's output file and write the header, truncating
    /// any file of the same name.
    pub fn open_session(&self, now: DateTime<Local>) -> Result<SessionLog> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create log directory {}", self.dir.display()))?;

        let path = self.dir.join(session_file_name(now));
        let mut writer = self
            .sink
            .create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_line(&mut writer, CSV_HEADER)
            .with_context(|| format!("failed to write header to {}", path.display()))?;

        info!("Session log created: {}", path.display());

        Ok(SessionLog {
            writer,
            stats: Arc::new(LogStats {
                path,
                records: AtomicU64::new(0),
            }),
            latest: Arc::clone(&self.latest),
        })
    }

    /// Path of the most recent log holding at least one record.
    pub fn latest_log(&self) -> Option<PathBuf> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|stats| stats.path.clone())
    }

    /// Copy the latest log with data to `system_log_export_<stamp>.csv`.
    pub fn export(&self, now: DateTime<Local>) -> Result<PathBuf, SamplerError> {
        let source = self.latest_log().ok_or(SamplerError::NoData)?;

        let target = self.dir.join(export_file_name(now));
        match fs::copy(&source, &target) {
            Ok(bytes) => {
                info!(
                    "Exported {} ({bytes} bytes) to {}",
                    source.display(),
                    target.display()
                );
                Ok(target)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(SamplerError::NoData),
            Err(err) => Err(SamplerError::Persistence(err)),
        }
    }
}

/// The open output file of one session.
pub struct SessionLog {
    writer: Box<dyn Write + Send>,
    stats: Arc<LogStats>,
    latest: LatestLog,
}

impl SessionLog {
    pub fn path(&self) -> &Path {
        &self.stats.path
    }

    pub fn records(&self) -> u64 {
        self.stats.records.load(Ordering::Relaxed)
    }

    /// Write one record. A failed write leaves nothing buffered, so the
    /// next record starts on a clean line.
    pub fn append(&mut self, reading: &Reading) -> Result<()> {
        write_line(&mut self.writer, &format_line(reading))
            .with_context(|| format!("failed to append to {}", self.stats.path.display()))?;

        if self.stats.records.fetch_add(1, Ordering::Relaxed) == 0 {
            *self.latest.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(Arc::clone(&self.stats));
        }
        Ok(())
    }

    /// Flush and close, returning the number of records written.
    pub fn close(mut self) -> Result<u64> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.stats.path.display()))?;
        Ok(self.records())
    }
}

/// The whole line goes out in one unbuffered `write_all`.
fn write_line(writer: &mut dyn Write, line: &str) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(line.len() + 1);
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    writer.write_all(&bytes)?;
    writer.flush()
}
