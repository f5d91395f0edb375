//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{EventData, MonitorDefinition};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Monitor list entry for display
#[derive(Debug, Clone, Serialize)]
pub struct MonitorListEntry {
    pub id: i32,
    pub kind: String,
    pub value: f64,
    pub severity: u8,
    pub origin: String,
    pub component: String,
    pub variable: String,
}

impl From<&MonitorDefinition> for MonitorListEntry {
    fn from(monitor: &MonitorDefinition) -> Self {
        Self {
            id: monitor.id.get(),
            kind: monitor.kind.to_string(),
            value: monitor.value,
            severity: monitor.severity.level(),
            origin: format!("{:?}", monitor.origin),
            component: monitor.component.to_string(),
            variable: monitor.variable.to_string(),
        }
    }
}

/// Monitor list for display
#[derive(Debug, Clone, Serialize)]
pub struct MonitorList {
    pub enabled: bool,
    pub monitors: Vec<MonitorListEntry>,
}

impl TableDisplay for MonitorList {
    fn to_table(&self) -> String {
        let mut output = format!(
            "Monitoring: {}\nMonitors: {}\n\n",
            if self.enabled { "enabled" } else { "disabled" },
            self.monitors.len()
        );

        if self.monitors.is_empty() {
            output.push_str("  No monitors configured\n");
            return output;
        }

        output.push_str("  ID     Kind                      Value      Sev  Target\n");
        output.push_str("  ────────────────────────────────────────────────────────────\n");
        for m in &self.monitors {
            output.push_str(&format!(
                "  {:<6} {:<25} {:<10} {:<4} {}.{}\n",
                m.id, m.kind, m.value, m.severity, m.component, m.variable
            ));
        }
        output
    }

    fn to_compact(&self) -> String {
        self.monitors
            .iter()
            .map(|m| format!("{}:{}", m.id, m.kind))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Event entry for display
#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub event_id: i32,
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<bool>,
    pub monitor_id: i32,
    pub severity: u8,
    pub component: String,
    pub variable: String,
    pub actual_value: String,
}

impl From<&EventData> for EventEntry {
    fn from(event: &EventData) -> Self {
        Self {
            event_id: event.event_id.get(),
            trigger: event.trigger.to_string(),
            cleared: event.cleared,
            monitor_id: event.variable_monitoring_id.get(),
            severity: event.severity.level(),
            component: event.component.to_string(),
            variable: event.variable.to_string(),
            actual_value: event.actual_value.clone(),
        }
    }
}

impl TableDisplay for EventEntry {
    fn to_table(&self) -> String {
        let state = match self.cleared {
            Some(true) => "cleared",
            Some(false) => "active",
            None => "-",
        };
        format!(
            "  {:<6} {:<9} {:<8} {:<8} {:<4} {}.{} = {}",
            self.event_id,
            self.trigger,
            state,
            self.monitor_id,
            self.severity,
            self.component,
            self.variable,
            self.actual_value
        )
    }

    fn to_compact(&self) -> String {
        format!("#{}:{}={}", self.event_id, self.monitor_id, self.actual_value)
    }
}

/// Events produced by a command
#[derive(Debug, Clone, Serialize)]
pub struct EventList {
    pub events: Vec<EventEntry>,
    /// Entries still tracked by the engine afterwards
    pub tracked: usize,
}

impl TableDisplay for EventList {
    fn to_table(&self) -> String {
        let mut output = format!("Events: {}\n\n", self.events.len());
        if !self.events.is_empty() {
            output.push_str("  Event  Trigger   State    Monitor  Sev  Value\n");
            output.push_str("  ────────────────────────────────────────────────────────────\n");
            for event in &self.events {
                output.push_str(&event.to_table());
                output.push('\n');
            }
            output.push('\n');
        }
        output.push_str(&format!("Tracked monitors: {}\n", self.tracked));
        output
    }

    fn to_compact(&self) -> String {
        self.events
            .iter()
            .map(TableDisplay::to_compact)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of validating a configuration
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: String,
    pub variables: usize,
    pub monitors: usize,
    pub periodic_monitors: usize,
}

impl TableDisplay for CheckReport {
    fn to_table(&self) -> String {
        format!(
            "✓ {} is valid\n  Variables: {}\n  Monitors: {} ({} periodic)",
            self.source, self.variables, self.monitors, self.periodic_monitors
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "ok {} vars={} monitors={}",
            self.source, self.variables, self.monitors
        )
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Component, EventId, EventNotificationType, EventTrigger, MonitorId, MonitorKind, Severity,
        Variable,
    };
    use std::time::SystemTime;

    #[test]
    fn test_monitor_list_table() {
        let monitor = MonitorDefinition::new(
            1,
            MonitorKind::UpperThreshold,
            80.0,
            Severity::new(4).unwrap(),
            Component::new("EVSE").with_evse(1, None),
            Variable::new("Temperature"),
        );
        let list = MonitorList {
            enabled: true,
            monitors: vec![MonitorListEntry::from(&monitor)],
        };

        let output = list.to_table();
        assert!(output.contains("Monitoring: enabled"));
        assert!(output.contains("EVSE@evse1.Temperature"));
        assert_eq!(list.to_compact(), "1:upper_threshold");
    }

    #[test]
    fn test_event_entry_from_event() {
        let event = EventData {
            event_id: EventId::new(5),
            timestamp: SystemTime::now(),
            trigger: EventTrigger::Alerting,
            actual_value: "85".to_string(),
            cleared: Some(true),
            component: Component::new("EVSE"),
            variable: Variable::new("Temperature"),
            variable_monitoring_id: MonitorId::new(1),
            notification_type: EventNotificationType::CustomMonitor,
            severity: Severity::new(4).unwrap(),
        };
        let entry = EventEntry::from(&event);
        assert!(entry.to_table().contains("cleared"));
        assert_eq!(entry.to_compact(), "#5:1=85");
    }

    #[test]
    fn test_empty_event_list() {
        let list = EventList {
            events: Vec::new(),
            tracked: 2,
        };
        let output = list.to_table();
        assert!(output.starts_with("Events: 0"));
        assert!(output.contains("Tracked monitors: 2"));
    }

    #[test]
    fn test_message_display() {
        let msg = Message {
            message: "Operation completed".to_string(),
            success: true,
        };

        assert!(msg.to_table().starts_with('✓'));
    }
}
