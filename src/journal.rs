//! Append-only downtime log.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::LogTargetError;
use crate::models::LogEvent;

/// Destination for session events. `emit` returns once the event is durable.
pub trait EventSink {
    async fn emit(&mut self, event: &LogEvent) -> Result<(), LogTargetError>;
}

/// Append-only log file. Every emitted event is synced to storage before
/// `emit` returns.
pub struct DowntimeLog {
    path: PathBuf,
    file: File,
    needs_separator: bool,
}

impl DowntimeLog {
    /// Opens `path` for appending, creating it when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogTargetError> {
        let path = path.as_ref().to_path_buf();

        let has_content = match fs::metadata(&path).await {
            Ok(meta) if !meta.is_file() => return Err(LogTargetError::NotAFile(path)),
            Ok(meta) => meta.len() > 0,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(source) => return Err(LogTargetError::Inspect { path, source }),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await;
        let file = match file {
            Ok(file) => file,
            Err(source) => return Err(LogTargetError::Open { path, source }),
        };

        info!("Downtime log opened: {}", path.display());

        Ok(Self {
            path,
            file,
            needs_separator: has_content,
        })
    }
}

impl EventSink for DowntimeLog {
    async fn emit(&mut self, event: &LogEvent) -> Result<(), LogTargetError> {
        let mut buf = String::new();
        if std::mem::take(&mut self.needs_separator) {
            buf.push('\n');
        }
        for line in event.lines() {
            buf.push_str(&line);
            buf.push('\n');
        }

        let written = async {
            self.file.write_all(buf.as_bytes()).await?;
            self.file.flush().await?;
            self.file.sync_data().await
        }
        .await;

        written.map_err(|source| LogTargetError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
