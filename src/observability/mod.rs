//! Observability for the query layer
//!
//! Structured JSON log lines, one per event. Logging is read-only: it
//! never changes what a query returns.
//!
//! ```ignore
//! use aerorepo::observability::{log_event, Event};
//!
//! log_event(Event::QueryExecuted, &[("collection", "people")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Logs `event` at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
