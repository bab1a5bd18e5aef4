//! Process-wide logging facade. The host installs a sink once; the
//! `log_*!` macros check the level before formatting anything, so disabled
//! levels cost one atomic load.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use derive_more::Display;
use once_cell::sync::OnceCell;
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum LogLevel {
    #[display(fmt = "TRACE")]
    #[strum(serialize = "trace")]
    Trace = 0,
    #[display(fmt = "DEBUG")]
    #[strum(serialize = "debug")]
    Debug = 1,
    #[display(fmt = " INFO")]
    #[strum(serialize = "info")]
    Info = 2,
    #[display(fmt = " WARN")]
    #[strum(serialize = "warn", serialize = "warning")]
    Warn = 3,
    #[display(fmt = "ERROR")]
    #[strum(serialize = "error")]
    Error = 4,
}

impl LogLevel {
    /// Debug builds log debug and up, release builds info and up
    pub const fn build_default() -> Self {
        if cfg!(debug_assertions) { LogLevel::Debug } else { LogLevel::Info }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Layer and subsystem an entry comes from
#[derive(Debug, Clone, Display)]
pub enum LogComponent {
    #[display(fmt = "DOM:{}", _0)]
    Domain(&'static str),
    #[display(fmt = "APP:{}", _0)]
    Application(&'static str),
    #[display(fmt = "INF:{}", _0)]
    Infrastructure(&'static str),
    #[display(fmt = "PRE:{}", _0)]
    Presentation(&'static str),
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: u64,
    pub level: LogLevel,
    pub component: LogComponent,
    pub message: String,
}

pub trait TimeProvider: Send + Sync {
    fn current_timestamp(&self) -> u64;
    fn format_timestamp(&self, timestamp: u64) -> String;
}

/// Sink for entries that passed the level filter. Entries can arrive from
/// the compute thread as well as the UI thread.
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

static LOGGER: OnceCell<Box<dyn Logger>> = OnceCell::new();
static CLOCK: OnceCell<Box<dyn TimeProvider>> = OnceCell::new();
static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::build_default() as u8);

/// Install the sink and its level. The sink can be installed once; the
/// level can be changed later with [`set_max_level`].
pub fn init_logger(logger: Box<dyn Logger>, level: LogLevel) {
    set_max_level(level);
    if LOGGER.set(logger).is_err() {
        log_event(
            LogLevel::Warn,
            LogComponent::Domain("Logging"),
            format_args!("logger already installed; kept the first one"),
        );
    }
}

/// Install the clock used for timestamps. Only the first call wins.
pub fn init_time_provider(clock: Box<dyn TimeProvider>) {
    let _ = CLOCK.set(clock);
}

pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

pub fn enabled(level: LogLevel) -> bool {
    level >= max_level()
}

pub fn time_provider() -> &'static dyn TimeProvider {
    CLOCK.get().map(|clock| clock.as_ref()).unwrap_or(&TickClock)
}

/// Entry point of the `log_*!` macros. `args` is only formatted when the
/// level is enabled.
pub fn log_event(level: LogLevel, component: LogComponent, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let Some(logger) = LOGGER.get() else {
        return;
    };
    logger.log(&LogEntry {
        timestamp: time_provider().current_timestamp(),
        level,
        component,
        message: args.to_string(),
    });
}

/// Sequence numbers until a real clock is installed
struct TickClock;

impl TimeProvider for TickClock {
    fn current_timestamp(&self) -> u64 {
        use std::sync::atomic::AtomicU64;
        static TICKS: AtomicU64 = AtomicU64::new(0);
        TICKS.fetch_add(1, Ordering::Relaxed)
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        format!("#{:06}", timestamp)
    }
}

#[macro_export]
macro_rules! log_trace {
    ($component:expr, $($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::domain::logging::log_event(
                $crate::domain::logging::LogLevel::Trace,
                $component,
                format_args!($($arg)*),
            );
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($component:expr, $($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::domain::logging::log_event(
                $crate::domain::logging::LogLevel::Debug,
                $component,
                format_args!($($arg)*),
            );
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($component:expr, $($arg:tt)*) => {
        $crate::domain::logging::log_event(
            $crate::domain::logging::LogLevel::Info,
            $component,
            format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($component:expr, $($arg:tt)*) => {
        $crate::domain::logging::log_event(
            $crate::domain::logging::LogLevel::Warn,
            $component,
            format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($component:expr, $($arg:tt)*) => {
        $crate::domain::logging::log_event(
            $crate::domain::logging::LogLevel::Error,
            $component,
            format_args!($($arg)*),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_from_config_strings() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    // the only test that touches the global level
    #[test]
    fn max_level_gates_entries() {
        let previous = max_level();

        set_max_level(LogLevel::Warn);
        assert!(!enabled(LogLevel::Info));
        assert!(enabled(LogLevel::Warn));
        assert!(enabled(LogLevel::Error));

        set_max_level(LogLevel::Trace);
        assert!(enabled(LogLevel::Trace));

        set_max_level(previous);
    }
}
