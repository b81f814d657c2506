//! Tracing setup.
//!
//! The terminal is owned by the UI, so logs go to a daily-rotated file in
//! the log directory. Filtering follows `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=rynx_inline::session=debug`.

use crate::constants::LOG_FILE_NAME;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keep the returned guard alive for the program's lifetime or buffered
/// lines are lost on exit.
pub fn init(log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
    Ok(guard)
}
