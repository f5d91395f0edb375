//! Variable monitoring engine
//!
//! Decides for every variable change and every timer tick whether a monitor
//! fired, when an event must be generated, and when a fired monitor can be
//! forgotten.

pub mod cleanup;
pub mod emission;
pub mod engine;
pub mod entry;
pub mod periodic;
pub mod sink;
pub mod store;
pub mod trigger;

pub use cleanup::should_remove;
pub use emission::EventBatch;
pub use engine::{EngineConfig, MonitorEngine};
pub use entry::{EntryState, MonitorEntry, PeriodicState, ReportState, TriggerPhase, TriggerState};
pub use sink::{EventSink, JsonLinesSink, MemorySink, SinkSet, TerminalSink};
pub use store::MetadataStore;
