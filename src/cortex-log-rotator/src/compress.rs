//! Gzip compression of retired backups.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::config::DEFAULT_FILE_MODE;
use crate::error::{Result, RotatorError};
use crate::permissions::{copy_ownership, create_with_mode, mode_of};

/// Compress `src` into `dst`, then remove `src`.
///
/// `dst` gets the mode (and, best effort, the ownership) of `src`. If
/// writing fails the partial `dst` is deleted and `src` is left untouched.
/// If only the final removal of `src` fails, the finished `dst` is kept.
pub fn compress_file(src: &Path, dst: &Path) -> Result<()> {
    let err = |source: io::Error| RotatorError::Compress {
        path: src.to_path_buf(),
        source,
    };

    let file = File::open(src).map_err(err)?;
    let metadata = file.metadata().map_err(err)?;

    let out = create_with_mode(dst, mode_of(&metadata, DEFAULT_FILE_MODE)).map_err(err)?;

    if let Err(e) = write_compressed(file, out, &metadata, dst) {
        if let Err(cleanup) = fs::remove_file(dst) {
            debug!(
                path = %dst.display(),
                error = %cleanup,
                "Failed to remove partial compressed file"
            );
        }
        return Err(err(e));
    }

    remove_source(src, dst)?;

    debug!(src = %src.display(), dst = %dst.display(), "Compressed log file");
    Ok(())
}

/// Remove `src` once `dst` holds its complete compressed copy.
///
/// On failure `dst` stays; the next sweep finds `src` again and rewrites it.
fn remove_source(src: &Path, dst: &Path) -> Result<()> {
    fs::remove_file(src).map_err(|source| {
        debug!(
            src = %src.display(),
            dst = %dst.display(),
            error = %source,
            "Kept compressed copy, source removal failed"
        );
        RotatorError::Compress {
            path: src.to_path_buf(),
            source,
        }
    })
}

fn write_compressed(src: File, out: File, metadata: &fs::Metadata, dst: &Path) -> io::Result<()> {
    copy_ownership(&out, metadata, dst);

    let mut reader = BufReader::new(src);
    let mut encoder = GzEncoder::new(out, Compression::default());
    io::copy(&mut reader, &mut encoder)?;

    let out = encoder.finish()?;
    out.sync_all()
}
