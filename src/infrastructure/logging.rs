//! Logging system initialization.
//!
//! Console logging via `tracing-subscriber` with an `EnvFilter`; optionally
//! mirrored to a log file through a non-blocking `tracing-appender` writer.
//! The returned guard must stay alive for the duration of the process so
//! buffered file output is flushed on exit.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::infrastructure::config::LoggingConfig;

/// Initialize the global subscriber. `RUST_LOG` wins over the configured
/// level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter directive")?;

    match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(
                dir.unwrap_or_else(|| Path::new(".")),
                name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);

            Registry::default()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .context("installing logging subscriber")?;
            Ok(Some(guard))
        }
        None => {
            Registry::default()
                .with(filter)
                .with(fmt::layer())
                .try_init()
                .context("installing logging subscriber")?;
            Ok(None)
        }
    }
}
