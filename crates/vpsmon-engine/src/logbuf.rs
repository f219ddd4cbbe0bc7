use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// One captured log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Bounded in-memory sink for recent log lines, backing the dashboard log
/// viewer. Components log through `tracing` as usual; the layer copies each
/// formatted event into a fixed-capacity ring buffer, dropping the oldest
/// entry once full.
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Buffered entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().cloned().collect()
    }

    /// A `tracing` layer writing into this buffer.
    pub fn layer(&self) -> BufferLayer {
        BufferLayer {
            buffer: self.clone(),
        }
    }
}

pub struct BufferLayer {
    buffer: LogBuffer,
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let message = if visitor.fields.is_empty() {
            visitor.message
        } else {
            format!("{}{}", visitor.message, visitor.fields)
        };

        self.buffer.push(LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message,
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: "2025-12-16T07:15:00Z".to_string(),
            level: "INFO".to_string(),
            target: "test".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn capacity_bound_drops_oldest_entries() {
        let buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(entry(&format!("line {i}")));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].message, "line 2");
        assert_eq!(snapshot[2].message, "line 4");
    }

    #[test]
    fn layer_captures_events_with_fields() {
        use tracing_subscriber::prelude::*;

        let buffer = LogBuffer::new(16);
        let subscriber = tracing_subscriber::registry().with(buffer.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(vm_id = 100u64, "Checking data window");
        });

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].message.contains("Checking data window"));
        assert!(snapshot[0].message.contains("vm_id=100"));
        assert_eq!(snapshot[0].level, "INFO");
    }
}
