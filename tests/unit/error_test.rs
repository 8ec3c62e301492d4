//! Tests for error types

use prometheus_pool_sim::core::{AdvisoryError, AppResult, FieldError, SimulationError};

#[test]
fn test_simulation_error_display() {
    let err = SimulationError::InvalidConfig("thread_count must be at most 1000, got 2000".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: thread_count must be at most 1000, got 2000"
    );

    let err = SimulationError::ThreadCountOutOfRange {
        requested: -1,
        max: 1000,
    };
    assert_eq!(err.to_string(), "thread count -1 out of range (max 1000)");
}

#[test]
fn test_advisory_error_display() {
    let err = AdvisoryError::Service("timeout".into());
    assert_eq!(err.to_string(), "advisory service error: timeout");

    let err = AdvisoryError::InvalidInput(vec![FieldError::new("application_needs", "too short")]);
    assert_eq!(err.to_string(), "invalid advisory input: application_needs: too short");
}

#[test]
fn test_app_result_wraps_domain_errors() {
    fn fails() -> AppResult<()> {
        Err(SimulationError::Ticker("join failed".into()).into())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<SimulationError>().is_some());
    assert_eq!(err.to_string(), "ticker error: join failed");
}
