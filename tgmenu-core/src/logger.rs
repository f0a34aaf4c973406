//! Tracing setup: one fmt layer written to both stdout and an append-mode log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, fmt::writer::MakeWriterExt, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Registry,
};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// Level comes from `RUST_LOG` (falls back to [`DEFAULT_LOG_FILTER`]). The parent directory of
/// `log_file_path` is created when missing. Load `.env` before calling this, otherwise `RUST_LOG`
/// from the file is not seen.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    let log_file = open_log_file(Path::new(log_file_path))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout.and(Arc::new(log_file)))
        .with_span_events(FmtSpan::CLOSE)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
        _ => {}
    }
    OpenOptions::new().create(true).append(true).open(path)
}
