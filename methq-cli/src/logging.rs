use std::path::Path;

use anyhow::{Context, Result};

use methq_net::LogLevel;

/// Configure the global tracing subscriber once, at process start. Console
/// output goes to stderr so query results on stdout stay clean; a log file
/// is appended to when configured.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_max_level(level.to_filter())
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level.to_filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Parse a `--log-level` flag value.
pub fn parse_level(value: &str) -> Result<LogLevel> {
    match value {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warning" => Ok(LogLevel::Warning),
        "error" => Ok(LogLevel::Error),
        "critical" => Ok(LogLevel::Critical),
        other => anyhow::bail!("unknown log level: {}", other),
    }
}
