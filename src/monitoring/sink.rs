//! Outward notification sinks
//!
//! The sink is the only channel by which events leave the engine. A sink
//! accepts a batch and owns delivery (queueing, retries, encoding).

use crate::domain::{EventData, Severity};
use crate::error::SinkError;
use std::io::{self, Write};
use std::sync::Mutex;

/// Notification channel trait
pub trait EventSink: Send + Sync {
    /// Hand a batch of events over for delivery
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError>;

    /// Channel name for identification
    fn name(&self) -> &str;
}

/// Terminal/console sink
///
/// Prints one line per event with colored severity.
pub struct TerminalSink {
    /// Use stderr instead of stdout
    use_stderr: bool,
    /// Use colors (ANSI escape codes)
    use_colors: bool,
}

impl TerminalSink {
    /// Create a new terminal sink writing to stderr
    pub fn new() -> Self {
        Self {
            use_stderr: true,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a sink that uses stdout
    pub fn stdout() -> Self {
        Self {
            use_stderr: false,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a sink without colors
    pub fn no_color() -> Self {
        Self {
            use_stderr: false,
            use_colors: false,
        }
    }

    fn supports_color() -> bool {
        std::env::var("TERM")
            .map(|term| term != "dumb")
            .unwrap_or(false)
    }

    fn format_event(&self, event: &EventData) -> String {
        let timestamp = event
            .timestamp
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| {
                let secs = d.as_secs();
                let hours = (secs / 3600) % 24;
                let mins = (secs % 3600) / 60;
                let secs = secs % 60;
                format!("{:02}:{:02}:{:02}", hours, mins, secs)
            })
            .unwrap_or_else(|_| "??:??:??".to_string());

        let state = match event.cleared {
            Some(true) => " cleared",
            Some(false) => " active",
            None => "",
        };

        format!(
            "[{}] {} #{} {}{} monitor {} {}.{} = {}",
            timestamp,
            self.format_severity(event.severity),
            event.event_id,
            event.trigger,
            state,
            event.variable_monitoring_id,
            event.component,
            event.variable,
            event.actual_value
        )
    }

    fn format_severity(&self, severity: Severity) -> String {
        let text = format!("SEV{}", severity.level());
        if !self.use_colors {
            return text;
        }

        let color_code = match severity.level() {
            0..=2 => "\x1b[35m\x1b[1m", // Bold Magenta
            3..=4 => "\x1b[31m",        // Red
            5..=6 => "\x1b[33m",        // Yellow
            _ => "\x1b[36m",            // Cyan
        };

        format!("{}{}\x1b[0m", color_code, text)
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TerminalSink {
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
        if self.use_stderr {
            let stderr = io::stderr();
            let mut handle = stderr.lock();
            for event in events {
                writeln!(handle, "{}", self.format_event(event))?;
            }
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for event in events {
                writeln!(handle, "{}", self.format_event(event))?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "terminal"
    }
}

/// Writes each event as one JSON line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for event in events {
            let line = serde_json::to_string(event).map_err(|e| SinkError::Rejected {
                count: events.len(),
                reason: e.to_string(),
            })?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// Keeps every accepted event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EventData>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all events collected so far
    pub fn drain(&self) -> Vec<EventData> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl EventSink for MemorySink {
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(events);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Dispatches every batch to several sinks
///
/// Fails only when every channel failed.
pub struct SinkSet {
    sinks: Vec<Box<dyn EventSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Get number of sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for SinkSet {
    fn default() -> Self {
        let mut set = Self::new();
        set.add_sink(Box::new(TerminalSink::new()));
        set
    }
}

impl EventSink for SinkSet {
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
        let mut last_error = None;
        let mut delivered = self.sinks.is_empty();
        for sink in &self.sinks {
            match sink.notify(events) {
                Ok(()) => delivered = true,
                Err(e) => {
                    log::warn!("Failed to notify via {}: {}", sink.name(), e);
                    last_error = Some(e);
                }
            }
        }
        match (delivered, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "set"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Component, EventId, EventNotificationType, EventTrigger, MonitorId, Variable,
    };
    use std::time::{Duration, UNIX_EPOCH};

    fn event(cleared: Option<bool>) -> EventData {
        EventData {
            event_id: EventId::new(7),
            timestamp: UNIX_EPOCH + Duration::from_secs(3600 + 61),
            trigger: EventTrigger::Alerting,
            actual_value: "85".to_string(),
            cleared,
            component: Component::new("EVSE").with_evse(1, None),
            variable: Variable::new("Temperature"),
            variable_monitoring_id: MonitorId::new(3),
            notification_type: EventNotificationType::CustomMonitor,
            severity: Severity::new(4).unwrap(),
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
            Err(SinkError::Rejected {
                count: events.len(),
                reason: "offline".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_terminal_sink_creation() {
        let sink = TerminalSink::new();
        assert_eq!(sink.name(), "terminal");
        assert!(sink.use_stderr);
        assert!(!TerminalSink::stdout().use_stderr);
        assert!(!TerminalSink::no_color().use_colors);
    }

    #[test]
    fn test_format_event() {
        let sink = TerminalSink::no_color();
        let line = sink.format_event(&event(Some(false)));
        assert_eq!(
            line,
            "[01:01:01] SEV4 #7 Alerting active monitor #3 EVSE@evse1.Temperature = 85"
        );
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.notify(&[event(Some(true)), event(None)]).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["cleared"], true);
        assert_eq!(parsed["variable_monitoring_id"], 3);
        assert!(serde_json::from_str::<serde_json::Value>(lines[1]).unwrap()["cleared"].is_null());
    }

    #[test]
    fn test_sink_set_partial_failure_is_ok() {
        let mut set = SinkSet::new();
        set.add_sink(Box::new(FailingSink));
        set.add_sink(Box::new(JsonLinesSink::new(Vec::new())));
        assert_eq!(set.sink_count(), 2);
        assert!(set.notify(&[event(None)]).is_ok());
    }

    #[test]
    fn test_sink_set_total_failure() {
        let mut set = SinkSet::new();
        set.add_sink(Box::new(FailingSink));
        assert!(set.notify(&[event(None)]).is_err());
    }

    #[test]
    fn test_memory_sink_drain() {
        let sink = MemorySink::new();
        sink.notify(&[event(None), event(Some(false))]).unwrap();
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_sink_set_default() {
        assert_eq!(SinkSet::default().sink_count(), 1);
    }
}
