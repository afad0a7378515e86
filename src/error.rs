use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogTargetError {
    #[error("Expected {} to be a file", .0.display())]
    NotAFile(PathBuf),

    #[error("Failed to inspect {}", .path.display())]
    Inspect { path: PathBuf, source: io::Error },

    #[error("Failed to open {} for appending", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to write to {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
