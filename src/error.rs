//! Unified error types for varmon
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from device model access
    #[error("Device model error: {0}")]
    DeviceModel(#[from] DeviceModelError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// Error handing events to the notification sink
    #[error("Event sink error: {0}")]
    Sink(#[from] SinkError),

    /// Component/variable pair has no entry in the device model
    #[error("Variable not found: {component}.{variable}")]
    VariableNotFound { component: String, variable: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from device model queries
///
/// All of these are treated as "skip this entry this pass" by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceModelError {
    /// Component is not part of the device model
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Variable is not part of the component
    #[error("Variable not found: {component}.{variable}")]
    VariableNotFound { component: String, variable: String },

    /// Attribute exists but carries no value
    #[error("Attribute {attribute} of {component}.{variable} has no value")]
    AttributeUnavailable {
        component: String,
        variable: String,
        attribute: String,
    },

    /// Monitor id is not known to the device model
    #[error("Monitor not found: {0}")]
    MonitorNotFound(i32),

    /// Monitor id is already in use
    #[error("Monitor id already in use: {0}")]
    DuplicateMonitor(i32),

    /// Storage is temporarily unavailable
    #[error("Device model unavailable: {0}")]
    Unavailable(String),
}

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Severity outside 0-9
    #[error("Invalid severity: {0} (must be 0-9)")]
    InvalidSeverity(u8),

    /// Monitor value is unusable for its kind
    #[error("Invalid monitor value {value} for monitor {id}: {reason}")]
    InvalidMonitorValue { id: i32, value: f64, reason: String },

    /// Unknown enumeration text
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Failed to parse config file
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Two monitors share an id
    #[error("Duplicate monitor id: {0}")]
    DuplicateMonitorId(i32),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors reported by an event sink on hand-off
#[derive(Error, Debug)]
pub enum SinkError {
    /// Sink refused the batch
    #[error("Sink rejected {count} event(s): {reason}")]
    Rejected { count: usize, reason: String },

    /// Sink failed writing
    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
