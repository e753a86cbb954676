//! Error types for the daily log rotator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for rotator operations.
pub type Result<T> = std::result::Result<T, RotatorError>;

/// Errors raised by the writer path and by retention sweeps.
///
/// Writer-path variants (`CreateDirectory`, `Open`, `Close`, `Write`,
/// `Rename`) are
/// returned from [`DailyRotator::write`](crate::DailyRotator::write) and
/// [`DailyRotator::close`](crate::DailyRotator::close). Sweep variants never
/// reach a writer caller; they end up in a [`SweepReport`](crate::SweepReport).
#[derive(Debug, Error)]
pub enum RotatorError {
    /// Failed to create the log directory.
    #[error("can't make directories for new logfile {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to create or open the canonical log file.
    #[error("can't open logfile {path}: {source}")]
    Open {
        /// Canonical path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to flush or close the active file.
    #[error("can't close logfile {path}: {source}")]
    Close {
        /// Canonical path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to write a record to the active file.
    #[error("can't write to logfile {path}: {source}")]
    Write {
        /// Canonical path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to move the canonical file to its backup name.
    #[error("can't rename logfile {from} to {to}: {source}")]
    Rename {
        /// Canonical path.
        from: PathBuf,
        /// Backup path.
        to: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to list the log directory during a sweep.
    #[error("can't read log file directory {path}: {source}")]
    SweepScan {
        /// Directory being swept.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to delete an expired backup.
    #[error("failed to remove expired backup {path}: {source}")]
    Remove {
        /// Backup path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to compress a backup. The source file is left in place.
    #[error("failed to compress log file {path}: {source}")]
    Compress {
        /// Backup path being compressed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Failed to start the background sweep thread.
    #[error("failed to start log retention worker: {0}")]
    Worker(#[source] io::Error),
}

impl RotatorError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::CreateDirectory { source, .. }
            | Self::Open { source, .. }
            | Self::Close { source, .. }
            | Self::Write { source, .. }
            | Self::Rename { source, .. }
            | Self::SweepScan { source, .. }
            | Self::Remove { source, .. }
            | Self::Compress { source, .. }
            | Self::Worker(source) => source,
        }
    }
}

impl From<RotatorError> for io::Error {
    fn from(err: RotatorError) -> Self {
        io::Error::new(err.io_error().kind(), err)
    }
}
