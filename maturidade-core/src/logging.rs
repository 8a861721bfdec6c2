//! Logging for maturidade
//!
//! Log lines go to a daily-rolling file under `$XDG_STATE_HOME/maturidade/`.
//! Each day gets its own file, named `maturidade.YYYY-MM-DD.log` after the
//! UTC date it was opened on; see [`log_file_name`].

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_PREFIX: &str = "maturidade";
const LOG_SUFFIX: &str = "log";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level` when set. The returned guard must be
/// held for the life of the process or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let dir = log_dir();
    let appender = file_appender(&dir, config.max_files)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::debug!(
        log_file = %current_log_file().display(),
        level = %config.level,
        max_files = config.max_files,
        "logging ready"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Subscriber for tests: writes through the test harness, ignores failures
/// when one is already installed.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Flushes pending log lines on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))
}

/// Directory holding the rolling log files.
pub fn log_dir() -> PathBuf {
    Config::log_dir()
}

/// File name the appender uses for `day`.
pub fn log_file_name(day: NaiveDate) -> String {
    format!("{}.{}.{}", LOG_PREFIX, day.format("%Y-%m-%d"), LOG_SUFFIX)
}

/// Path of the file being written today.
pub fn current_log_file() -> PathBuf {
    log_dir().join(log_file_name(Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name_is_dated() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(log_file_name(day), "maturidade.2024-03-05.log");
    }

    #[test]
    fn test_current_log_file_lives_in_log_dir() {
        let path = current_log_file();
        assert_eq!(path.parent(), Some(log_dir().as_path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("maturidade.20"));
    }

    #[test]
    fn test_appender_writes_dated_file() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");

        let mut appender = file_appender(&logs, 0).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let expected = logs.join(log_file_name(Utc::now().date_naive()));
        let contents = std::fs::read_to_string(&expected).unwrap();
        assert_eq!(contents, "hello\n");
    }
}
