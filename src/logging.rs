use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

pub const LOG_FILE: &str = "ghtree.log";

/// Level for a config `debug` value.
pub fn level_for(verbosity: u8) -> Level {
  match verbosity {
    0 => Level::INFO,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  }
}

/// Log to `<dir>/ghtree.log`. `RUST_LOG` overrides the configured level.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn setup_logging(dir: &Path, verbosity: u8) -> Result<WorkerGuard> {
  let log_path = log_path(dir);
  std::fs::create_dir_all(dir)?;

  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(&log_path)?;

  let (non_blocking, guard) = tracing_appender::non_blocking(file);

  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::from_level(level_for(verbosity)).into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(non_blocking)
    .with_ansi(false)
    .with_target(true)
    .with_thread_ids(false)
    .with_file(true)
    .with_line_number(true)
    .init();

  tracing::info!("ghtree started with debug level {}", verbosity);
  tracing::info!("Log file: {:?}", log_path);

  Ok(guard)
}

pub fn log_path(dir: &Path) -> PathBuf {
  dir.join(LOG_FILE)
}
