//! # Telemetry Logger
//!
//! Writes sampled cycle reports as JSON Lines with file rotation.
//!
//! Each line is one JSON object: an RFC 3339 `time` field plus the
//! flattened [`CycleReport`]. Files are named
//! `gyro-steer-<YYYYmmdd-HHMMSS>-<seq>.jsonl`, so lexical order is creation
//! order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::driver::CycleReport;
use crate::error::{GyroSteerError, Result};

/// Log file name prefix
const FILE_PREFIX: &str = "gyro-steer-";

/// Log file extension
const FILE_EXTENSION: &str = "jsonl";

/// Rotation and sampling limits
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Records per file before rotating
    pub max_records_per_file: usize,
    /// Files kept; older ones are deleted
    pub max_files_to_keep: usize,
    /// Minimum spacing between records
    pub log_interval: Duration,
}

#[derive(Serialize)]
struct Record<'a> {
    time: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a CycleReport,
}

/// Rotating JSONL writer for cycle reports
#[derive(Debug)]
pub struct TelemetryLogger {
    settings: TelemetrySettings,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files_opened: u64,
    last_record: Option<Instant>,
}

impl TelemetryLogger {
    /// Create the log directory and an idle logger
    ///
    /// # Errors
    ///
    /// Returns `Telemetry` error if the directory cannot be created
    pub fn new(settings: TelemetrySettings) -> Result<Self> {
        fs::create_dir_all(&settings.log_dir).map_err(|e| {
            GyroSteerError::Telemetry(format!(
                "Failed to create {}: {}",
                settings.log_dir.display(),
                e
            ))
        })?;

        info!("Telemetry logging to {}", settings.log_dir.display());
        Ok(Self {
            settings,
            writer: None,
            records_in_file: 0,
            files_opened: 0,
            last_record: None,
        })
    }

    /// Log a report if the sampling interval has elapsed
    ///
    /// Returns `true` if a record was written.
    ///
    /// # Errors
    ///
    /// Returns `Telemetry` error on serialization or I/O failure
    pub fn record(&mut self, report: &CycleReport) -> Result<bool> {
        let now = Instant::now();
        if let Some(last) = self.last_record {
            if now.duration_since(last) < self.settings.log_interval {
                return Ok(false);
            }
        }

        self.write_record(report, Utc::now())?;
        self.last_record = Some(now);
        Ok(true)
    }

    /// Flush buffered records to disk
    ///
    /// # Errors
    ///
    /// Returns `Telemetry` error on I/O failure
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(io_error)?;
        }
        Ok(())
    }

    fn write_record(&mut self, report: &CycleReport, time: DateTime<Utc>) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.settings.max_records_per_file {
            self.rotate(time)?;
        }

        let line = serde_json::to_string(&Record { time, report })
            .map_err(|e| GyroSteerError::Telemetry(format!("Failed to encode record: {}", e)))?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line).map_err(io_error)?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    fn rotate(&mut self, time: DateTime<Utc>) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}-{:04}.{}",
            FILE_PREFIX,
            time.format("%Y%m%d-%H%M%S"),
            self.files_opened,
            FILE_EXTENSION
        );
        let path = self.settings.log_dir.join(name);
        let file = File::create(&path).map_err(io_error)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files_opened += 1;

        prune_old_files(&self.settings.log_dir, self.settings.max_files_to_keep)
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn io_error(e: std::io::Error) -> GyroSteerError {
    GyroSteerError::Telemetry(format!("I/O error: {}", e))
}

/// Telemetry files in `dir`, oldest first
fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let is_log = path.extension().map_or(false, |ext| ext == FILE_EXTENSION);
            let named = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with(FILE_PREFIX));
            is_log && named
        })
        .collect();
    files.sort();
    Ok(files)
}

fn prune_old_files(dir: &Path, keep: usize) -> Result<()> {
    let files = log_files(dir)?;
    if files.len() <= keep {
        return Ok(());
    }

    for path in &files[..files.len() - keep] {
        debug!("Removing old telemetry file {}", path.display());
        fs::remove_file(path).map_err(io_error)?;
    }
    Ok(())
}
