use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use crate::app_config::LogLevel;

// @module: Colored stderr logger for applications embedding the engine

// @struct: Logger writing one colored line per record
struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        StderrLogger { level }
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Fixed-width tag for log level
    fn tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

/// Format one log line: `<color>HH:MM:SS.mmm LEVEL message<reset>`
fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!(
        "{}{} {} {}\x1B[0m",
        StderrLogger::color_for_level(level),
        timestamp,
        StderrLogger::tag_for_level(level),
        message
    )
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = Local::now().format("%H:%M:%S.%3f").to_string();
            let line = format_line(&now, record.level(), &record.args().to_string());
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger as the global logger.
///
/// Fails when another logger is already installed; the library never calls
/// this on its own.
pub fn init(level: &LogLevel) -> Result<(), SetLoggerError> {
    let filter = level.to_level_filter();
    log::set_boxed_logger(Box::new(StderrLogger::new(filter)))?;
    log::set_max_level(filter);
    Ok(())
}
