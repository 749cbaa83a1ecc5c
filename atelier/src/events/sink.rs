//! Event sink trait and implementations.

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, Level};

/// Receives job and pipeline lifecycle events.
///
/// Emission never fails and never blocks on I/O; sinks that need to ship
/// events elsewhere should buffer internally.
pub trait EventSink: Send + Sync {
    /// Records one event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - Dotted event name, e.g. `job.retry_scheduled`
    /// * `data` - Event payload
    fn emit(&self, event_type: &str, data: Value);
}

/// Discards all events. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Value) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Value) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = %data, "Event: {}", event_type);
        } else {
            info!(event_type = %event_type, event_data = %data, "Event: {}", event_type);
        }
    }
}

/// Keeps every event in memory; for tests and diagnostics.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Value)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.read().clone()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Events whose type equals `event_type`.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<Value> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Value) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_noop_sink() {
        NoOpEventSink.emit("job.submitted", json!({"x": 1}));
    }

    #[test]
    fn test_logging_sink() {
        LoggingEventSink::default().emit("job.submitted", json!({"job": "abc"}));
        LoggingEventSink::debug().emit("job.submitted", Value::Null);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("job.submitted", json!({"attempt": 0}));
        sink.emit("job.retry_scheduled", json!({"attempt": 0}));
        sink.emit("job.submitted", json!({"attempt": 1}));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events()[1].0, "job.retry_scheduled");
        assert_eq!(
            sink.events_of_type("job.submitted"),
            vec![json!({"attempt": 0}), json!({"attempt": 1})]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}
