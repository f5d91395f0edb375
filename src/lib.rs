//! varmon - variable monitoring engine library
//!
//! Trigger and periodic monitor evaluation for a charge-point device model,
//! with offline deferral of notification events and a settled-state cleanup
//! policy.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`device_model`]: Device model abstraction layer
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`monitoring`]: Monitor update engine
//! - [`services`]: Timer-driven updater service

pub mod cli;
pub mod commands;
pub mod config;
pub mod device_model;
pub mod domain;
pub mod error;
pub mod monitoring;
pub mod services;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
