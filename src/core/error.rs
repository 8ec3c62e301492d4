//! Error types for simulation control and the advisory boundary.
//!
//! The tick engine and pool scaler are total and never return errors; failures only
//! exist where outside input enters the crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the simulation driver and builders.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Requested pool size is outside the configured bounds.
    #[error("thread count {requested} out of range (max {max})")]
    ThreadCountOutOfRange {
        /// Requested pool size.
        requested: i64,
        /// Largest accepted pool size.
        max: usize,
    },
    /// The background ticker failed or could not be joined.
    #[error("ticker error: {0}")]
    Ticker(String),
}

/// A single per-field validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors on the advisory (thread count recommendation) path.
///
/// None of these ever reach simulation state: invalid input is rejected before the
/// advisor is called and service faults are reported to the caller only.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// Request fields failed validation.
    #[error("invalid advisory input: {}", summarize(.0))]
    InvalidInput(Vec<FieldError>),
    /// The advisory service failed.
    #[error("advisory service error: {0}")]
    Service(String),
    /// The service answered with an unusable thread count.
    #[error("invalid recommendation: {0} threads")]
    InvalidRecommendation(i64),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
