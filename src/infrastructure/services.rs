//! Console logger and wall clock used by the logging facade.

use crate::domain::logging::{LogEntry, Logger, TimeProvider, time_provider};

/// Writes entries to the browser console on wasm, stderr elsewhere. Level
/// filtering happens in the facade before an entry reaches it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }

    /// `[time] LEVEL LAYER:subsystem | message`
    pub fn format_entry(entry: &LogEntry, clock: &dyn TimeProvider) -> String {
        format!(
            "[{}] {} {} | {}",
            clock.format_timestamp(entry.timestamp),
            entry.level,
            entry.component,
            entry.message
        )
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, entry: &LogEntry) {
        let line = Self::format_entry(entry, time_provider());

        #[cfg(target_arch = "wasm32")]
        {
            use crate::domain::logging::LogLevel;
            let value = wasm_bindgen::JsValue::from_str(&line);
            match entry.level {
                LogLevel::Trace | LogLevel::Debug => web_sys::console::debug_1(&value),
                LogLevel::Info => web_sys::console::info_1(&value),
                LogLevel::Warn => web_sys::console::warn_1(&value),
                LogLevel::Error => web_sys::console::error_1(&value),
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        eprintln!("{}", line);
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemTimeProvider {
    #[cfg(target_arch = "wasm32")]
    fn current_timestamp(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn current_timestamp(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        let millis_of_day = timestamp % 86_400_000;
        let hours = millis_of_day / 3_600_000;
        let minutes = millis_of_day / 60_000 % 60;
        let seconds = millis_of_day / 1_000 % 60;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis_of_day % 1_000)
    }
}
