//! Tests for configuration validation

use prometheus_pool_sim::config::{
    ChangeEffect, ConfigChange, PriorityDistribution, SimulationConfig, WorkloadProfile,
};

#[test]
fn test_defaults_match_dashboard() {
    let cfg = SimulationConfig::default();
    assert_eq!(cfg.thread_count, 100);
    assert_eq!(cfg.task_count, 200);
    assert_eq!(cfg.resource_count, 4);
    assert_eq!(cfg.simulation_speed_ms, 250);
    assert_eq!(cfg.priority_distribution, PriorityDistribution::new(20, 50, 30));
    assert_eq!(cfg.retention.history_capacity, 30);
    assert_eq!(cfg.retention.log_capacity, 50);
}

#[test]
fn test_thread_count_bounds() {
    assert!(SimulationConfig::new().with_thread_count(1000).validate().is_ok());
    assert!(SimulationConfig::new().with_thread_count(1001).validate().is_err());
    assert!(SimulationConfig::new().with_thread_count(0).validate().is_ok());
}

#[test]
fn test_resource_count_limited_to_alphabet() {
    assert!(SimulationConfig::new().with_resource_count(26).validate().is_ok());
    assert!(SimulationConfig::new().with_resource_count(27).validate().is_err());
}

#[test]
fn test_distribution_must_sum_to_hundred() {
    let cfg = SimulationConfig::new().with_priority_distribution(PriorityDistribution::new(50, 50, 1));
    assert!(cfg.validate().is_err());
}

#[test]
fn test_workload_bounds() {
    let bad_range = WorkloadProfile {
        min_task_duration: 20,
        max_task_duration: 10,
        ..WorkloadProfile::default()
    };
    assert!(SimulationConfig::new().with_workload(bad_range).validate().is_err());

    let bad_probability = WorkloadProfile {
        resource_probability: 1.5,
        ..WorkloadProfile::default()
    };
    assert!(SimulationConfig::new().with_workload(bad_probability).validate().is_err());
}

#[test]
fn test_from_json_fills_defaults() {
    let cfg = SimulationConfig::from_json_str(
        r#"{"thread_count": 8, "task_count": 40, "resource_count": 2, "simulation_speed_ms": 100}"#,
    )
    .unwrap();
    assert_eq!(cfg.thread_count, 8);
    assert_eq!(cfg.priority_distribution, PriorityDistribution::default());
    assert_eq!(cfg.workload, WorkloadProfile::default());
}

#[test]
fn test_from_json_rejects_invalid() {
    let err = SimulationConfig::from_json_str(
        r#"{"thread_count": 8, "task_count": 40, "resource_count": 2, "simulation_speed_ms": 0}"#,
    )
    .unwrap_err();
    assert!(err.contains("simulation_speed_ms"));
    assert!(SimulationConfig::from_json_str("not json").is_err());
}

#[test]
fn test_apply_classifies_change() {
    let cfg = SimulationConfig::default();
    let (next, effect) = cfg.apply(ConfigChange::ThreadCount(12)).unwrap();
    assert_eq!(effect, ChangeEffect::Rescale);
    assert_eq!(next.thread_count, 12);

    let (_, effect) = cfg.apply(ConfigChange::SimulationSpeedMs(50)).unwrap();
    assert_eq!(effect, ChangeEffect::Cadence);

    let (_, effect) = cfg
        .apply(ConfigChange::PriorityDistribution(PriorityDistribution::new(0, 0, 100)))
        .unwrap();
    assert_eq!(effect, ChangeEffect::Reset);
}

#[test]
fn test_tick_period() {
    let cfg = SimulationConfig::new().with_simulation_speed_ms(125);
    assert_eq!(cfg.tick_period(), std::time::Duration::from_millis(125));
}

// ============================================================================
// ENVIRONMENT LOADING
// ============================================================================

const ENV_KEYS: [&str; 5] = [
    "POOL_SIM_THREAD_COUNT",
    "POOL_SIM_TASK_COUNT",
    "POOL_SIM_RESOURCE_COUNT",
    "POOL_SIM_SPEED_MS",
    "POOL_SIM_PRIORITY",
];

fn scratch_env_file(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("pool_sim_{}_{name}.env", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// All environment cases run in one test; the process environment is shared
/// between test threads.
#[test]
fn test_from_env_reads_variables_and_dotenv_file() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }

    std::env::set_var("POOL_SIM_THREAD_COUNT", "12");
    std::env::set_var("POOL_SIM_PRIORITY", "10, 60, 30");
    let cfg = SimulationConfig::from_env().unwrap();
    assert_eq!(cfg.thread_count, 12);
    assert_eq!(cfg.priority_distribution, PriorityDistribution::new(10, 60, 30));
    assert_eq!(cfg.task_count, SimulationConfig::default().task_count);

    // Missing file is fine; file entries fill gaps but never override the process.
    let missing = std::env::temp_dir().join("pool_sim_no_such_file.env");
    assert_eq!(SimulationConfig::from_env_file(&missing).unwrap(), cfg);
    let dotenv = scratch_env_file("valid", "POOL_SIM_TASK_COUNT=77\nPOOL_SIM_THREAD_COUNT=99\n");
    let from_file = SimulationConfig::from_env_file(&dotenv).unwrap();
    assert_eq!(from_file.task_count, 77);
    assert_eq!(from_file.thread_count, 12);

    std::env::set_var("POOL_SIM_PRIORITY", "10,10,10");
    let err = SimulationConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("POOL_SIM_PRIORITY"), "{err}");

    std::env::set_var("POOL_SIM_PRIORITY", "20,50,30");
    std::env::set_var("POOL_SIM_THREAD_COUNT", "lots");
    assert!(SimulationConfig::from_env().is_err());

    std::env::set_var("POOL_SIM_THREAD_COUNT", "4");
    let malformed = scratch_env_file("malformed", "this line is not valid\n");
    let err = SimulationConfig::from_env_file(&malformed).unwrap_err();
    assert!(err.to_string().contains("failed to load"), "{err}");

    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
    let _ = std::fs::remove_file(dotenv);
    let _ = std::fs::remove_file(malformed);
}
