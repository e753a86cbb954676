//! Daily rotating log file writer for Cortex.
//!
//! [`DailyRotator`] is a byte sink for a structured logger. It appends to a
//! single canonical file and, on the first write of a new calendar day,
//! renames that file to `<stem>-<YYYYMMDD><ext>` and starts a fresh one.
//! A background worker then removes backups older than the retention window
//! and gzips the rest, without ever blocking writers.
//!
//! # Features
//!
//! - **Daily rotation**: local or UTC calendar days
//! - **Retention**: age-based removal of backups (`max_age_days`, 0 = keep all)
//! - **Compression**: gzip with the source file's mode and ownership
//! - **Coalesced sweeps**: rotations never queue more than one pending sweep
//! - **tracing integration**: usable directly as a `tracing-subscriber` writer
//!
//! # Example
//!
//! ```rust,no_run
//! use cortex_log_rotator::{DailyRotator, RotatorConfig};
//!
//! let config = RotatorConfig::new("/var/log/cortex/server.log")
//!     .max_age_days(7)
//!     .compress(true);
//! let rotator = DailyRotator::new(config).expect("failed to create rotator");
//!
//! rotator.write(b"server started\n").expect("write failed");
//! rotator.close().expect("close failed");
//! ```

mod compress;
mod permissions;

pub mod clock;
pub mod config;
pub mod error;
pub mod naming;
pub mod rotator;
pub mod sweeper;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compress::compress_file;
pub use config::{RotatorConfig, BACKUP_DATE_FORMAT, COMPRESS_SUFFIX};
pub use error::{Result, RotatorError};
pub use naming::{BackupName, NamingPolicy};
pub use rotator::DailyRotator;
pub use sweeper::{BackupFile, RetentionSweeper, SweepReport};
pub use worker::SweepWorker;
