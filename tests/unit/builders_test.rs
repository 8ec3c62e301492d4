//! Tests for the simulation builder

use prometheus_pool_sim::builders::SimulationBuilder;
use prometheus_pool_sim::config::{RetentionLimits, SimulationConfig, WorkloadProfile};
use prometheus_pool_sim::core::SimulationError;
use prometheus_pool_sim::runtime::SimulationStatus;

#[test]
fn test_build_produces_stopped_reset_driver() {
    let driver = SimulationBuilder::new(
        SimulationConfig::new()
            .with_thread_count(3)
            .with_task_count(12)
            .with_resource_count(1),
    )
    .with_seed(1)
    .build()
    .unwrap();

    assert_eq!(driver.status(), SimulationStatus::Stopped);
    assert_eq!(driver.state().threads.len(), 3);
    assert_eq!(driver.state().tasks.len(), 12);
    assert_eq!(driver.state().resources.len(), 1);
}

#[test]
fn test_retention_limits_applied() {
    let mut driver = SimulationBuilder::new(
        SimulationConfig::new()
            .with_thread_count(2)
            .with_task_count(50)
            .with_workload(WorkloadProfile {
                min_task_duration: 1,
                max_task_duration: 2,
                resource_probability: 0.0,
            })
            .with_retention(RetentionLimits {
                history_capacity: 5,
                log_capacity: 8,
            }),
    )
    .with_seed(2)
    .build()
    .unwrap();

    // Both threads finish and restart a task at least every other tick.
    for _ in 0..20 {
        driver.step();
    }
    assert!(driver.state().completed_tasks >= 10);
    assert_eq!(driver.history().len(), 5);
    assert_eq!(driver.log().len(), 8);

    let ids: Vec<u64> = driver.log().iter().map(|e| e.id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1] + 1), "ids = {ids:?}");
    assert!(ids[7] > 1, "oldest entries should have been dropped: {ids:?}");
}

#[test]
fn test_without_jitter_is_deterministic() {
    let build = || {
        SimulationBuilder::new(SimulationConfig::new().with_thread_count(4).with_task_count(20))
            .with_seed(9)
            .without_jitter()
            .build()
            .unwrap()
    };
    let mut a = build();
    let mut b = build();
    for _ in 0..10 {
        assert_eq!(a.step().sample.cpu_usage, b.step().sample.cpu_usage);
    }
}

#[test]
fn test_invalid_retention_rejected() {
    let result = SimulationBuilder::new(SimulationConfig::new().with_retention(RetentionLimits {
        history_capacity: 0,
        log_capacity: 10,
    }))
    .build();
    assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
}
