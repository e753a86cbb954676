//! The daily rotating writer.
//!
//! A [`DailyRotator`] owns one canonical file. Every write first checks the
//! calendar day; when it has changed since the file was opened, the file is
//! closed, renamed to its backup name and replaced by an empty one, and the
//! retention worker is woken up.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::clock::{day_key, Clock, SystemClock};
use crate::config::{RotatorConfig, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use crate::error::{Result, RotatorError};
use crate::naming::NamingPolicy;
use crate::permissions::{create_dir_all_with_mode, create_with_mode, mode_of, open_append};
use crate::sweeper::RetentionSweeper;
use crate::worker::SweepWorker;

/// Name of the retention worker thread.
const WORKER_THREAD_NAME: &str = "log-retention";

/// The open canonical file and the day it belongs to.
///
/// `day` survives `close` and failed rotations: a later write compares
/// against it to decide between reopening and rotating.
#[derive(Default)]
struct ActiveFile {
    file: Option<File>,
    day: Option<String>,
}

/// What a write did to the file before writing, logged once the lock is
/// released.
enum Transition {
    Opened {
        appended: bool,
    },
    Rotated {
        backup: Option<PathBuf>,
        replaced_backup: bool,
    },
}

/// Append-only log sink that rotates its file once per calendar day.
///
/// Writes are serialized by an internal lock, so one instance can be shared
/// between threads (for example behind an `Arc`, or as a `tracing` writer).
pub struct DailyRotator {
    naming: NamingPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<ActiveFile>,
    worker: SweepWorker,
}

impl DailyRotator {
    /// Create a rotator using the system clock.
    ///
    /// The file is opened lazily by the first write. The retention worker
    /// thread starts immediately.
    pub fn new(config: RotatorConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rotator driven by `clock`.
    pub fn with_clock(config: RotatorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let naming = NamingPolicy::from_config(&config, clock.now());
        let sweeper = RetentionSweeper::new(naming.clone(), &config, Arc::clone(&clock));
        let worker = SweepWorker::spawn(WORKER_THREAD_NAME, move || run_sweep(&sweeper))?;

        Ok(Self {
            naming,
            clock,
            state: Mutex::new(ActiveFile::default()),
            worker,
        })
    }

    /// Canonical file path.
    pub fn path(&self) -> &Path {
        self.naming.canonical_path()
    }

    /// Write one record, rotating first if the day has changed.
    ///
    /// The whole buffer is written or an error is returned; on success the
    /// return value is `buf.len()`.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let (written, transition) = {
            let mut active = self.state.lock();
            // Read under the lock so a day key is never compared against an
            // instant taken before another writer rotated.
            let now = self.clock.now();
            let (mut file, transition) = self.acquire(&mut active, now)?;
            let written = file.write_all(buf).map_err(|source| RotatorError::Write {
                path: self.path().to_path_buf(),
                source,
            });
            active.file = Some(file);
            (written, transition)
        };

        if let Some(transition) = transition {
            self.after(transition);
        }

        written.map(|()| buf.len())
    }

    /// Flush and close the active file.
    ///
    /// Closing an already closed rotator succeeds. A later write reopens the
    /// file.
    pub fn close(&self) -> Result<()> {
        let mut active = self.state.lock();
        match active.file.take() {
            Some(file) => self.sync_and_close(file),
            None => Ok(()),
        }
    }

    /// Take the file to write to out of `active`, opening or rotating as
    /// needed. Must not log: the caller holds the state lock.
    fn acquire(
        &self,
        active: &mut ActiveFile,
        now: DateTime<Utc>,
    ) -> Result<(File, Option<Transition>)> {
        let today = day_key(now, self.naming.local_time());
        let current = active.file.take();

        match active.day.as_deref() {
            // Keys are `YYYYMMDD`, so string order is date order. A clock
            // stepping backwards keeps the current file.
            Some(day) if today.as_str() > day => {
                let (file, backup, replaced_backup) = self.rotate(current, now)?;
                active.day = Some(today);
                self.worker.trigger();
                Ok((
                    file,
                    Some(Transition::Rotated {
                        backup,
                        replaced_backup,
                    }),
                ))
            }
            _ => match current {
                Some(file) => Ok((file, None)),
                None => {
                    let (file, appended) = self.open_existing_or_new()?;
                    if active.day.is_none() {
                        active.day = Some(today);
                        self.worker.trigger();
                    }
                    Ok((file, Some(Transition::Opened { appended })))
                }
            },
        }
    }

    /// Close `current`, move the canonical file to its backup name and open
    /// a fresh canonical file with the same mode.
    ///
    /// Returns the new file, the backup path (if there was a file to move)
    /// and whether an existing backup was replaced.
    fn rotate(
        &self,
        current: Option<File>,
        now: DateTime<Utc>,
    ) -> Result<(File, Option<PathBuf>, bool)> {
        if let Some(file) = current {
            self.sync_and_close(file)?;
        }
        self.ensure_dir()?;

        let path = self.path();
        let mut mode = DEFAULT_FILE_MODE;
        let mut backup = None;
        let mut replaced_backup = false;

        if let Ok(metadata) = fs::metadata(path) {
            mode = mode_of(&metadata, DEFAULT_FILE_MODE);
            let backup_path = self.naming.backup_path(now);
            replaced_backup = backup_path.exists();
            fs::rename(path, &backup_path).map_err(|source| RotatorError::Rename {
                from: path.to_path_buf(),
                to: backup_path.clone(),
                source,
            })?;
            backup = Some(backup_path);
        }

        let file = create_with_mode(path, mode).map_err(|source| RotatorError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok((file, backup, replaced_backup))
    }

    /// Open the canonical file for appending, creating it if missing.
    fn open_existing_or_new(&self) -> Result<(File, bool)> {
        self.ensure_dir()?;

        let path = self.path();
        let open_err = |source| RotatorError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = open_append(path, DEFAULT_FILE_MODE).map_err(open_err)?;
        let appended = file.metadata().map_err(open_err)?.len() > 0;

        Ok((file, appended))
    }

    fn ensure_dir(&self) -> Result<()> {
        let dir = self.naming.dir();
        create_dir_all_with_mode(dir, DEFAULT_DIR_MODE).map_err(|source| {
            RotatorError::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            }
        })
    }

    fn sync_and_close(&self, mut file: File) -> Result<()> {
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|source| RotatorError::Close {
                path: self.path().to_path_buf(),
                source,
            })
    }

    fn after(&self, transition: Transition) {
        let path = self.path();
        match transition {
            Transition::Opened { appended } => {
                debug!(path = %path.display(), appended, "Opened log file");
            }
            Transition::Rotated {
                backup,
                replaced_backup,
            } => {
                if replaced_backup {
                    warn!(
                        path = %path.display(),
                        backup = ?backup,
                        "Rotation replaced an existing backup"
                    );
                }
                debug!(path = %path.display(), backup = ?backup, "Rotated log file");
            }
        }
    }
}

impl Drop for DailyRotator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close log file");
        }
    }
}

impl std::fmt::Debug for DailyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyRotator")
            .field("path", &self.path())
            .field("local_time", &self.naming.local_time())
            .finish_non_exhaustive()
    }
}

impl Write for &DailyRotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        DailyRotator::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Records go straight to the file; there is no user-space buffer.
        Ok(())
    }
}

impl Write for DailyRotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        DailyRotator::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DailyRotator {
    type Writer = &'a DailyRotator;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

fn run_sweep(sweeper: &RetentionSweeper) {
    match sweeper.run_once() {
        Ok(report) => match &report.first_error {
            Some(e) => warn!(
                failures = report.failures,
                error = %e,
                "Log retention sweep finished with errors"
            ),
            None => debug!(
                removed = report.removed,
                compressed = report.compressed,
                "Log retention sweep finished"
            ),
        },
        Err(e) => {
            error!(error = %e, "Log retention sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<ManualClock>, DailyRotator) {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        ));
        let config = RotatorConfig::new(temp_dir.path().join("app.log"));
        let rotator = DailyRotator::with_clock(config, clock.clone()).unwrap();
        (temp_dir, clock, rotator)
    }

    #[test]
    fn test_first_write_creates_file() {
        let (_temp, _clock, rotator) = setup();

        assert_eq!(rotator.write(b"hello\n").unwrap(), 6);

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "hello\n");
    }

    #[test]
    fn test_first_write_appends_to_existing_file() {
        let (_temp, _clock, rotator) = setup();
        fs::write(rotator.path(), "earlier\n").unwrap();

        rotator.write(b"later\n").unwrap();

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_first_write_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("logs").join("app.log");
        let rotator = DailyRotator::new(RotatorConfig::new(&path)).unwrap();

        rotator.write(b"x").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_temp, _clock, rotator) = setup();
        rotator.write(b"data\n").unwrap();

        rotator.close().unwrap();
        rotator.close().unwrap();
    }

    #[test]
    fn test_close_without_writes() {
        let (_temp, _clock, rotator) = setup();
        rotator.close().unwrap();
        assert!(!rotator.path().exists());
    }

    #[test]
    fn test_write_after_close_reopens_same_day() {
        let (_temp, _clock, rotator) = setup();
        rotator.write(b"one\n").unwrap();
        rotator.close().unwrap();

        rotator.write(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_write_after_close_rotates_on_new_day() {
        let (temp, clock, rotator) = setup();
        rotator.write(b"one\n").unwrap();
        rotator.close().unwrap();

        clock.advance(Duration::days(1));
        rotator.write(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "two\n");
        let backup = temp.path().join("app-20261018.log");
        assert_eq!(fs::read_to_string(backup).unwrap(), "one\n");
    }

    #[test]
    fn test_rotation_when_canonical_file_was_removed() {
        let (temp, clock, rotator) = setup();
        rotator.write(b"one\n").unwrap();
        fs::remove_file(rotator.path()).unwrap();

        clock.advance(Duration::days(1));
        rotator.write(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "two\n");
        assert!(!temp.path().join("app-20261018.log").exists());
    }

    #[test]
    fn test_clock_stepping_back_does_not_rotate() {
        let (temp, clock, rotator) = setup();
        rotator.write(b"today\n").unwrap();

        clock.set(Utc.with_ymd_and_hms(2026, 10, 17, 23, 0, 0).unwrap());
        rotator.write(b"still today\n").unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 10, 18, 23, 0, 0).unwrap());
        rotator.write(b"again\n").unwrap();

        assert_eq!(
            fs::read_to_string(rotator.path()).unwrap(),
            "today\nstill today\nagain\n"
        );
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unlistable_directory_logs_sweep_error() {
        let temp_dir = TempDir::new().unwrap();
        let naming = NamingPolicy::new(temp_dir.path().join("gone").join("app.log"), false);
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
        ));
        let sweeper =
            RetentionSweeper::new(naming, &RotatorConfig::default().max_age_days(1), clock);
        let log_path = temp_dir.path().join("sweep.log");
        let log_file = Arc::new(File::create(&log_path).unwrap());

        let subscriber = tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || run_sweep(&sweeper));

        let logged = fs::read_to_string(&log_path).unwrap();
        assert!(logged.contains("ERROR"), "{logged}");
        assert!(logged.contains("Log retention sweep failed"), "{logged}");
    }

    #[test]
    fn test_io_write_impl() {
        let (_temp, _clock, rotator) = setup();
        let mut writer = &rotator;

        writeln!(writer, "formatted {}", 42).unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(rotator.path()).unwrap(), "formatted 42\n");
    }

    #[test]
    fn test_write_error_on_unwritable_directory() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let rotator = DailyRotator::new(RotatorConfig::new(blocker.join("app.log"))).unwrap();

        let err = rotator.write(b"x").unwrap_err();

        assert!(matches!(err, RotatorError::CreateDirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_rotation_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, clock, rotator) = setup();
        rotator.write(b"one\n").unwrap();
        fs::set_permissions(rotator.path(), fs::Permissions::from_mode(0o600)).unwrap();

        clock.advance(Duration::days(1));
        rotator.write(b"two\n").unwrap();

        let mode = fs::metadata(rotator.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
