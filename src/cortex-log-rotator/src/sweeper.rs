//! Retention sweeps over rotated backups.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info};

use crate::clock::{start_of_day, Clock};
use crate::compress::compress_file;
use crate::config::{RotatorConfig, COMPRESS_SUFFIX};
use crate::error::{Result, RotatorError};
use crate::naming::NamingPolicy;

/// A backup discovered in the log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    /// Full path.
    pub path: PathBuf,
    /// Calendar day embedded in the name.
    pub date: NaiveDate,
    /// Whether the backup is already compressed.
    pub compressed: bool,
}

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Expired backups deleted.
    pub removed: usize,
    /// Backups compressed.
    pub compressed: usize,
    /// Removals or compressions that failed.
    pub failures: usize,
    /// The first failure, kept for reporting.
    pub first_error: Option<RotatorError>,
}

impl SweepReport {
    fn record(&mut self, error: RotatorError) {
        self.failures += 1;
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    /// Whether the sweep touched the filesystem.
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.compressed > 0
    }
}

/// Deletes expired backups and compresses the rest.
pub struct RetentionSweeper {
    naming: NamingPolicy,
    max_age_days: u32,
    compress: bool,
    clock: Arc<dyn Clock>,
}

impl RetentionSweeper {
    /// Create a sweeper for the backups of `naming`.
    pub fn new(naming: NamingPolicy, config: &RotatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            naming,
            max_age_days: config.max_age_days,
            compress: config.compress,
            clock,
        }
    }

    /// List backups in the log directory, newest first.
    ///
    /// Directories and names that don't match the backup pattern are
    /// skipped.
    pub fn scan(&self) -> Result<Vec<BackupFile>> {
        let dir = self.naming.dir();
        let entries = fs::read_dir(dir).map_err(|source| RotatorError::SweepScan {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut backups = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(parsed) = self.naming.parse_backup_name(name) {
                backups.push(BackupFile {
                    path: entry.path(),
                    date: parsed.date,
                    compressed: parsed.compressed,
                });
            }
        }

        backups.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));
        Ok(backups)
    }

    /// Run one sweep.
    ///
    /// Returns `Err` only when the directory can't be listed. Individual
    /// removal and compression failures are counted in the report and do
    /// not stop the batch.
    pub fn run_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if self.max_age_days == 0 && !self.compress {
            return Ok(report);
        }

        let backups = self.scan()?;
        let (remove, keep) = self.partition(backups, self.clock.now());

        remove_expired(remove, &mut report);

        if self.compress {
            for backup in keep.into_iter().filter(|b| !b.compressed) {
                let mut dst = backup.path.clone().into_os_string();
                dst.push(COMPRESS_SUFFIX);
                match compress_file(&backup.path, &PathBuf::from(dst)) {
                    Ok(()) => report.compressed += 1,
                    Err(e) => report.record(e),
                }
            }
        }

        if report.changed() {
            info!(
                dir = %self.naming.dir().display(),
                removed = report.removed,
                compressed = report.compressed,
                failures = report.failures,
                "Log retention sweep completed"
            );
        }

        Ok(report)
    }

    /// Split backups into (expired, kept) against `now - max_age_days`.
    fn partition(
        &self,
        backups: Vec<BackupFile>,
        now: DateTime<Utc>,
    ) -> (Vec<BackupFile>, Vec<BackupFile>) {
        if self.max_age_days == 0 {
            return (Vec::new(), backups);
        }

        let Some(cutoff) = now.checked_sub_signed(Duration::days(i64::from(self.max_age_days)))
        else {
            return (Vec::new(), backups);
        };
        let local_time = self.naming.local_time();
        backups
            .into_iter()
            .partition(|b| start_of_day(b.date, local_time) < cutoff)
    }
}

/// Delete `backups`, recording failures without stopping.
fn remove_expired(backups: Vec<BackupFile>, report: &mut SweepReport) {
    for backup in backups {
        match fs::remove_file(&backup.path) {
            Ok(()) => {
                report.removed += 1;
                debug!(path = %backup.path.display(), date = %backup.date, "Removed expired backup");
            }
            Err(source) => report.record(RotatorError::Remove {
                path: backup.path,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use std::path::Path;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn sweeper(dir: &Path, config: RotatorConfig) -> RetentionSweeper {
        let naming = NamingPolicy::new(dir.join("app.log"), false);
        RetentionSweeper::new(naming, &config, Arc::new(ManualClock::new(now())))
    }

    #[test]
    fn test_scan_sorts_newest_first_and_skips_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in [
            "app-20261010.log",
            "app-20261016.log.gz",
            "app-20261012.log",
            "app.log",
            "other-20261011.log",
            "notes.txt",
        ] {
            fs::write(dir.join(name), name).unwrap();
        }
        fs::create_dir(dir.join("app-20261011.log")).unwrap();

        let backups = sweeper(dir, RotatorConfig::default()).scan().unwrap();

        let names: Vec<_> = backups
            .iter()
            .map(|b| b.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["app-20261016.log.gz", "app-20261012.log", "app-20261010.log"]
        );
        assert!(backups[0].compressed);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let err = sweeper(&missing, RotatorConfig::default().max_age_days(1))
            .run_once()
            .unwrap_err();

        assert!(matches!(err, RotatorError::SweepScan { .. }));
    }

    #[test]
    fn test_partition_unlimited_age_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let sweeper = sweeper(temp_dir.path(), RotatorConfig::default().compress(true));
        let backup = BackupFile {
            path: temp_dir.path().join("app-19990101.log"),
            date: NaiveDate::from_ymd_opt(1999, 1, 1).unwrap(),
            compressed: false,
        };

        let (remove, keep) = sweeper.partition(vec![backup], now());

        assert!(remove.is_empty());
        assert_eq!(keep.len(), 1);
    }

    #[test]
    fn test_remove_failure_is_recorded_and_batch_continues() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let present = dir.join("app-20261001.log");
        fs::write(&present, "old").unwrap();
        let backups = vec![
            BackupFile {
                path: dir.join("app-20261002.log"),
                date: NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(),
                compressed: false,
            },
            BackupFile {
                path: present.clone(),
                date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                compressed: false,
            },
        ];

        let mut report = SweepReport::default();
        remove_expired(backups, &mut report);

        assert_eq!(report.removed, 1);
        assert_eq!(report.failures, 1);
        assert!(!present.exists());
        match report.first_error {
            Some(RotatorError::Remove { path, .. }) => {
                assert_eq!(path, dir.join("app-20261002.log"))
            }
            other => panic!("unexpected first error: {other:?}"),
        }
    }

    #[test]
    fn test_report_keeps_first_error() {
        let mut report = SweepReport::default();
        for name in ["a.log", "b.log"] {
            report.record(RotatorError::Remove {
                path: PathBuf::from(name),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        assert_eq!(report.failures, 2);
        match report.first_error {
            Some(RotatorError::Remove { path, .. }) => assert_eq!(path, PathBuf::from("a.log")),
            other => panic!("unexpected first error: {other:?}"),
        }
    }
}
