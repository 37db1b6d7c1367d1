//! Structured log records surfaced to an injected callback.
//!
//! The core never writes to a transport itself (stderr, syslog, …): it hands a
//! [`LogRecord`] to whatever [`Logger`] the caller installed, the way a reader or
//! writer is handed an explicit logger handle rather than reaching for global state.

use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogRecord`], ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        })
    }
}

/// A single structured log event: a level, a set of conventional `(key, value)`
/// fields (`SERD_FILE`, `SERD_LINE`, `SERD_COL`, `SERD_CHECK`), and a message.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub fields: Vec<(&'static str, String)>,
    pub message: String,
}

impl LogRecord {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            fields: Vec::new(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }
}

/// A sink for [`LogRecord`]s, installed explicitly on each subsystem that may emit one.
pub trait Logger: Send + Sync {
    fn log(&self, record: &LogRecord);
}

/// The default logger: drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _record: &LogRecord) {}
}

/// Convenience alias for the shared handle stored on readers/writers/models.
pub type LoggerHandle = Arc<dyn Logger>;

#[must_use]
pub fn null_logger() -> LoggerHandle {
    Arc::new(NullLogger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingLogger(Mutex<Vec<String>>);

    impl Logger for CollectingLogger {
        fn log(&self, record: &LogRecord) {
            self.0.lock().unwrap().push(record.message.clone());
        }
    }

    #[test]
    fn records_reach_the_installed_logger() {
        let logger = CollectingLogger::default();
        logger.log(&LogRecord::new(LogLevel::Warning, "hello").with_field("SERD_LINE", "3"));
        assert_eq!(logger.0.lock().unwrap().as_slice(), ["hello"]);
    }
}
