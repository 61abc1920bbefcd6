//! tracing 初始化：stdout + 可选的按天滚动日志文件

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

const LOG_FILE_PREFIX: &str = "netkit-web.log";

/// `RUST_LOG` wins over the configured level. `log` records from the
/// toolbox are bridged into tracing.
///
/// Keep the returned guard alive for as long as file logging should flush.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let (file_writer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer())
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
