// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU8, Ordering};

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    log::set_max_level(match level {
        LogLevel::Quiet => LevelFilter::Error,
        LogLevel::Normal => LevelFilter::Warn,
        LogLevel::Verbose => LevelFilter::Trace,
    });
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        2 => LogLevel::Verbose,
        _ => LogLevel::Normal,
    }
}

/// Routes `log` records from the libraries to stderr.
struct CliLogger;

static LOGGER: CliLogger = CliLogger;

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".normal(),
            Level::Debug => "debug".dimmed(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[rawdisk] {tag}: {}", record.args());
    }

    fn flush(&self) {}
}

/// Installs the logger; a second call keeps the first one.
pub fn init(level: LogLevel) {
    let _ = log::set_logger(&LOGGER);
    set_log_level(level);
}

#[macro_export]
macro_rules! log_normal {
    ($($arg:tt)*) => {
        println!("[rawdisk] {}", format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() != $crate::utils::LogLevel::Quiet {
            println!("[rawdisk] {}", format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::utils::log_level() == $crate::utils::LogLevel::Verbose {
            println!("[rawdisk] {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips() {
        set_log_level(LogLevel::Verbose);
        assert_eq!(log_level(), LogLevel::Verbose);
        assert_eq!(log::max_level(), LevelFilter::Trace);
        set_log_level(LogLevel::Quiet);
        assert_eq!(log_level(), LogLevel::Quiet);
        set_log_level(LogLevel::Normal);
        assert_eq!(log_level(), LogLevel::Normal);
    }
}
