//! Subscriber setup: the audit log file receives every event at the
//! configured level, stderr only receives warnings and errors so it does not
//! interleave with the progress bar.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::types::LogLevel;

/// Dependencies that are chatty at info level.
const QUIET_TARGETS: &[&str] = &["aws_config", "aws_smithy_runtime", "hyper", "rustls"];

fn default_filter(level: LogLevel) -> EnvFilter {
    let mut directives = level.as_str().to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    EnvFilter::new(directives)
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered log lines are flushed.
pub fn init(log_file: &Path, level: LogLevel) -> anyhow::Result<WorkerGuard> {
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", log_file.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_dependencies() {
        let rendered = default_filter(LogLevel::Debug).to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("aws_smithy_runtime=warn"));
    }
}
