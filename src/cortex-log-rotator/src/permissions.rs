//! File mode and ownership helpers.
//!
//! New canonical files inherit the mode of the file they replace, and
//! compressed backups inherit the mode of their source. Ownership is copied
//! best effort: unprivileged processes usually can't chown, and that is not
//! an error.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::Path;

use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Unix mode bits of `metadata`, or `default` where modes don't exist.
#[cfg(unix)]
pub(crate) fn mode_of(metadata: &Metadata, _default: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub(crate) fn mode_of(_metadata: &Metadata, default: u32) -> u32 {
    default
}

/// Create (truncating) a write-only file with exactly `mode`.
///
/// The mode is applied again after creation because `OpenOptions::mode`
/// is filtered by the process umask.
pub(crate) fn create_with_mode(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    options.mode(mode);

    let file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(file)
}

/// Open `path` for appending, creating it with `mode` (umask applies) if
/// it doesn't exist.
pub(crate) fn open_append(path: &Path, mode: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);

    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

/// Create directories recursively with `mode` (umask applies).
pub(crate) fn create_dir_all_with_mode(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;

        fs::DirBuilder::new().recursive(true).mode(mode).create(path)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        fs::create_dir_all(path)
    }
}

/// Give `file` the owner and group recorded in `source`. Best effort.
#[cfg(unix)]
pub(crate) fn copy_ownership(file: &File, source: &Metadata, path: &Path) {
    use std::os::unix::fs::MetadataExt;

    if let Err(e) = std::os::unix::fs::fchown(file, Some(source.uid()), Some(source.gid())) {
        debug!(path = %path.display(), error = %e, "Could not copy file ownership");
    }
}

#[cfg(not(unix))]
pub(crate) fn copy_ownership(_file: &File, _source: &Metadata, _path: &Path) {}
