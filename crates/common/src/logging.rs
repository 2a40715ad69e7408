// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Logging configuration for ETP components
//!
//! Console output goes to stderr so it never interleaves with corpus text a
//! pipeline may stream to stdout. File logging is optional and lands in
//! `<temp>/etp-logs/<component>/`.

use std::{env, fs, path::PathBuf, sync::Once};

use eyre::{eyre, Result};
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Directory under the system temp folder that holds per-component logs
pub const LOG_ROOT: &str = "etp-logs";

/// Keeps the non-blocking file writer alive; drop it to flush.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize logging for an ETP component
///
/// Sets up a stderr console layer filtered by `RUST_LOG` (default `info`)
/// and, if requested, a daily-rotated plain-text file layer.
///
/// # Arguments
/// * `component_name` - Name of the component (e.g., "etp")
/// * `enable_file_logging` - Whether to also write a log file
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> Result<LoggingGuard> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(default_filter(Level::INFO)?);

    let guard = if enable_file_logging {
        let log_dir = create_log_directory(component_name)?;
        let file_appender = rolling::daily(&log_dir, format!("{component_name}.log"));
        let (writer, guard) = non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(LocalTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(default_filter(Level::DEBUG)?);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| eyre!("Failed to initialize tracing subscriber: {e}"))?;

        tracing::info!(
            component = component_name,
            log_dir = %log_dir.display(),
            "Logging initialized with console and file output"
        );
        LoggingGuard { _file: Some(guard) }
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre!("Failed to initialize tracing subscriber: {e}"))?;

        tracing::debug!(component = component_name, "Logging initialized with console output only");
        LoggingGuard::default()
    };

    let args: Vec<String> = env::args().collect();
    tracing::debug!(component = component_name, args = ?args, "Environment information");

    Ok(guard)
}

/// `RUST_LOG` if set, otherwise `level`
fn default_filter(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| eyre!("Failed to create environment filter: {e}"))
}

/// Create log directory in system temp folder
fn create_log_directory(component_name: &str) -> Result<PathBuf> {
    let log_dir = env::temp_dir().join(LOG_ROOT).join(component_name);
    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// Initialize console-only compact logging at `level` (overridden by `RUST_LOG`)
pub fn init_simple_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre!("Failed to initialize simple logging: {e}"))?;

    Ok(())
}

static TEST_LOGGING_INIT: Once = Once::new();

/// Idempotent logging setup for tests.
///
/// The first call installs [`init_simple_logging`] at `default_level`
/// (INFO when `None`); later calls do nothing. Failure to install because a
/// subscriber already exists is ignored.
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        let _ = init_simple_logging(default_level.unwrap_or(Level::INFO));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info, warn};

    #[test]
    #[serial]
    fn test_logging_functions_work() {
        ensure_test_logging(None);
        info!("Test info message");
        warn!("Test warning message");
        debug!("Test debug message");
    }

    #[test]
    fn test_log_directory_creation() {
        let log_dir = create_log_directory("test-component").unwrap();
        assert!(log_dir.exists());
        assert!(log_dir.to_string_lossy().contains(LOG_ROOT));
        assert!(log_dir.to_string_lossy().contains("test-component"));
    }

    #[test]
    fn test_default_filter() {
        let filter = default_filter(Level::WARN).unwrap();
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    #[serial]
    fn test_repeated_initialization_is_an_error_not_a_panic() {
        ensure_test_logging(None);
        // a subscriber is already installed
        assert!(init_logging("test-repeat", false).is_err());
        assert!(init_simple_logging(Level::DEBUG).is_err());
        info!("Logging still works");
    }
}
