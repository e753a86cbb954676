//! Wire a `DailyRotator` in as the sink of a `tracing` subscriber.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p cortex-log-rotator --example daily_log -- /tmp/cortex-demo/app.log
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use cortex_log_rotator::{DailyRotator, RotatorConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filename = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RotatorConfig {
        filename,
        max_age_days: 7,
        local_time: true,
        compress: true,
    };
    let rotator = Arc::new(DailyRotator::new(config)?);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::clone(&rotator))
        .with_ansi(false)
        .init();

    debug!("debug log");
    info!(path = %rotator.path().display(), "logging to daily rotated file");
    warn!(component = "example", "clone error log");

    rotator.close()?;
    eprintln!("wrote {}", rotator.path().display());
    Ok(())
}
