// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "STORYLINE_LOG";

/// Keeps the non-blocking writer flushing until dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber writing to `file`. The terminal belongs to
/// the interface, so nothing is written to stdout or stderr.
pub fn init(file: &Path, default_level: &str) -> Result<LoggingGuard> {
    let dir = file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = file
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", file.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(default_level)?)
        .with(layer)
        .try_init()
        .context("install log subscriber")?;

    Ok(LoggingGuard { _guard: guard })
}

fn build_filter(default_level: &str) -> Result<EnvFilter> {
    let level: LevelFilter = default_level
        .parse()
        .with_context(|| format!("invalid log level {default_level:?}"))?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy())
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn known_levels_build_filters() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            assert!(build_filter(level).is_ok(), "level {level}");
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        let error = build_filter("loud").expect_err("unknown level should fail");
        assert!(error.to_string().contains("invalid log level"));
    }
}
