//! Configuration for the daily log rotator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// chrono format of the date embedded in backup names (`YYYYMMDD`).
pub const BACKUP_DATE_FORMAT: &str = "%Y%m%d";

/// Suffix appended to a backup once it has been compressed.
pub const COMPRESS_SUFFIX: &str = ".gz";

/// Extension of the default log file name.
pub const DEFAULT_LOG_EXTENSION: &str = ".log";

/// Mode for a canonical file created from scratch.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for log directories created on demand.
pub const DEFAULT_DIR_MODE: u32 = 0o744;

// ============================================================================
// Configuration
// ============================================================================

/// Rotation and retention policy, immutable once a rotator is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Canonical log file path. `None` (or empty) selects
    /// `<temp dir>/<executable name>-<YYYYMMDD>.log`.
    #[serde(deserialize_with = "deserialize_filename")]
    pub filename: Option<PathBuf>,

    /// Backups older than this many days are removed (0 = keep forever).
    #[serde(alias = "maxage", alias = "maxAge", alias = "maxAgeDays")]
    pub max_age_days: u32,

    /// Use local calendar days instead of UTC.
    #[serde(alias = "localtime", alias = "localTime", alias = "useLocalTime")]
    pub local_time: bool,

    /// Gzip backups after rotation.
    pub compress: bool,
}

impl RotatorConfig {
    /// Create a config for the given canonical path with retention disabled.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Set the retention window in days.
    pub fn max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = days;
        self
    }

    /// Select local or UTC calendar days.
    pub fn local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    /// Enable or disable backup compression.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Whether a sweep has anything to do under this policy.
    pub fn retention_enabled(&self) -> bool {
        self.max_age_days > 0 || self.compress
    }
}

/// An empty string means "use the default path".
fn deserialize_filename<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(value.filter(|p| !p.as_os_str().is_empty()))
}
