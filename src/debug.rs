//! File-backed log bridge.
//!
//! Routes every `log::info!()`/`log::debug!()`... call from all workspace
//! crates to `nvgrid_debug.log` in the temp directory, so diagnostics never
//! mix with the program's own output.
//!
//! The level comes from, in order of precedence:
//! - the `--log-level` command-line flag
//! - the `DEBUG_LEVEL` environment variable (0 off, 1 error, 2 info,
//!   3 debug, 4 trace)
//! - `log_level` in the config file
//!
//! When `RUST_LOG` is set, lines are mirrored to stderr as well.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use nvgrid_config::LogLevel;

/// Map the numeric `DEBUG_LEVEL` variable onto a level.
pub fn level_from_env_value(value: &str) -> Option<LogLevel> {
    match value.trim().parse::<u8>().ok()? {
        0 => Some(LogLevel::Off),
        1 => Some(LogLevel::Error),
        2 => Some(LogLevel::Info),
        3 => Some(LogLevel::Debug),
        4 => Some(LogLevel::Trace),
        _ => None,
    }
}

/// Pick the effective level: CLI, then `DEBUG_LEVEL`, then config.
pub fn resolve_level(cli: Option<LogLevel>, env: Option<&str>, config: LogLevel) -> LogLevel {
    cli.or_else(|| env.and_then(level_from_env_value))
        .unwrap_or(config)
}

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("nvgrid_debug.log")
}

struct DebugLogger {
    level: log::LevelFilter,
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn open(level: log::LevelFilter, mirror_stderr: bool) -> Self {
        let file = if level == log::LevelFilter::Off {
            None
        } else {
            // Silently run without a file if it can't be opened.
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .create(true)
                .open(log_path())
                .ok()
        };
        let logger = Self {
            level,
            file: Mutex::new(file),
            mirror_stderr,
        };
        logger.write_raw(&format!(
            "{}\nnvgrid debug session started at {} (level={})\n{}\n",
            "=".repeat(80),
            timestamp(),
            level,
            "=".repeat(80)
        ));
        logger
    }

    fn write_raw(&self, line: &str) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }
}

impl log::Log for DebugLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        self.write_raw(&line);
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Install the bridge as the global logger. Later calls only log a warning.
pub fn init_log_bridge(level: LogLevel) {
    let filter = level.to_level_filter();
    let mirror = std::env::var_os("RUST_LOG").is_some();
    let logger: &'static DebugLogger = Box::leak(Box::new(DebugLogger::open(filter, mirror)));
    match log::set_logger(logger) {
        Ok(()) => {
            log::set_max_level(filter);
            log::info!("log bridge active, writing to {}", log_path().display());
        }
        Err(_) => log::warn!("logger already installed, keeping it"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_level_env_values() {
        assert_eq!(level_from_env_value("0"), Some(LogLevel::Off));
        assert_eq!(level_from_env_value(" 3 "), Some(LogLevel::Debug));
        assert_eq!(level_from_env_value("9"), None);
        assert_eq!(level_from_env_value("verbose"), None);
    }

    #[test]
    fn cli_beats_env_beats_config() {
        assert_eq!(
            resolve_level(Some(LogLevel::Warn), Some("4"), LogLevel::Off),
            LogLevel::Warn
        );
        assert_eq!(resolve_level(None, Some("4"), LogLevel::Off), LogLevel::Trace);
        assert_eq!(resolve_level(None, Some("x"), LogLevel::Info), LogLevel::Info);
        assert_eq!(resolve_level(None, None, LogLevel::Error), LogLevel::Error);
    }
}
