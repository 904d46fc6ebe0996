//! Observable repository events

use std::fmt;

use super::logger::Severity;

/// Events emitted by the query layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A query method was registered and its strategy selected
    QueryRegistered,
    /// An invocation built its outcome
    QueryExecuted,
    /// An invocation failed before reaching the store
    QueryFailed,
    /// First page came back empty, count command not issued
    PageCountSkipped,
    /// Configuration loaded and validated
    ConfigLoaded,
}

impl Event {
    pub const ALL: [Event; 5] = [
        Event::QueryRegistered,
        Event::QueryExecuted,
        Event::QueryFailed,
        Event::PageCountSkipped,
        Event::ConfigLoaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryRegistered => "QUERY_REGISTERED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::PageCountSkipped => "PAGE_COUNT_SKIPPED",
            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryFailed => Severity::Warn,
            Event::QueryExecuted | Event::PageCountSkipped => Severity::Trace,
            Event::QueryRegistered | Event::ConfigLoaded => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
