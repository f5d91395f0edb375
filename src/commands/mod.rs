//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod check;
pub mod feed;
pub mod monitors;
pub mod run;

pub use check::run_check;
pub use feed::run_feed;
pub use monitors::run_monitors;
pub use run::run_monitoring;
