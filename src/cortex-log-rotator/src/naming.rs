//! Canonical and backup file naming.
//!
//! The canonical file is the configured path. A backup of it lives in the
//! same directory as `<stem>-<YYYYMMDD><ext>`, plus [`COMPRESS_SUFFIX`] once
//! compressed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::clock::day_key;
use crate::config::{RotatorConfig, BACKUP_DATE_FORMAT, COMPRESS_SUFFIX, DEFAULT_LOG_EXTENSION};

/// Date and compression state parsed from a backup file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupName {
    /// Calendar day embedded in the name.
    pub date: NaiveDate,
    /// Whether the name carries the compression suffix.
    pub compressed: bool,
}

/// Derives every path the rotator and sweeper touch.
#[derive(Debug, Clone)]
pub struct NamingPolicy {
    path: PathBuf,
    local_time: bool,
    prefix: String,
    ext: String,
}

impl NamingPolicy {
    /// Build a policy for an explicit canonical path.
    pub fn new(path: impl Into<PathBuf>, local_time: bool) -> Self {
        let path = path.into();
        let (prefix, ext) = split_extension(&file_name_lossy(&path));
        Self {
            path,
            local_time,
            prefix: format!("{prefix}-"),
            ext,
        }
    }

    /// Build a policy from configuration, resolving the default path
    /// against `now` when no filename is configured.
    pub fn from_config(config: &RotatorConfig, now: DateTime<Utc>) -> Self {
        let path = match &config.filename {
            Some(path) => path.clone(),
            None => default_path(now, config.local_time),
        };
        Self::new(path, config.local_time)
    }

    /// The canonical (active) file path.
    pub fn canonical_path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the canonical file and its backups.
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Backup name prefix (`<stem>-`) and extension (`.log`, possibly empty).
    pub fn prefix_and_ext(&self) -> (&str, &str) {
        (&self.prefix, &self.ext)
    }

    /// Whether calendar days are computed in local time.
    pub fn local_time(&self) -> bool {
        self.local_time
    }

    /// Backup path for a rotation happening at `now`.
    ///
    /// The embedded date is the calendar day before `now`, not the day the
    /// active file was opened on.
    pub fn backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let date = day_key(now - Duration::hours(24), self.local_time);
        self.dir().join(format!("{}{}{}", self.prefix, date, self.ext))
    }

    /// Parse a file name in the backup directory.
    ///
    /// Accepts `<prefix><YYYYMMDD><ext>` and the same with the compression
    /// suffix; anything else yields `None`.
    pub fn parse_backup_name(&self, name: &str) -> Option<BackupName> {
        if let Some(date) = self.date_between(name, &self.ext) {
            return Some(BackupName {
                date,
                compressed: false,
            });
        }
        let compressed_ext = format!("{}{}", self.ext, COMPRESS_SUFFIX);
        self.date_between(name, &compressed_ext)
            .map(|date| BackupName {
                date,
                compressed: true,
            })
    }

    fn date_between(&self, name: &str, ext: &str) -> Option<NaiveDate> {
        let stamp = name.strip_prefix(self.prefix.as_str())?.strip_suffix(ext)?;
        if stamp.len() != 8 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(stamp, BACKUP_DATE_FORMAT).ok()
    }
}

/// `<temp dir>/<executable name>-<YYYYMMDD>.log`
fn default_path(now: DateTime<Utc>, local_time: bool) -> PathBuf {
    let exe = std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(OsStr::to_string_lossy)
        .map(|name| name.into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let name = format!("{exe}-{}{DEFAULT_LOG_EXTENSION}", day_key(now, local_time));
    std::env::temp_dir().join(name)
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split at the last `.`, keeping the dot with the extension.
fn split_extension(name: &str) -> (String, String) {
    match name.rfind('.') {
        Some(idx) => (name[..idx].to_string(), name[idx..].to_string()),
        None => (name.to_string(), String::new()),
    }
}
