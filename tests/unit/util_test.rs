//! Tests for utility functions

use prometheus_pool_sim::util::{wall_clock_label, Priority, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_serde() {
    let json = serde_json::to_string(&Priority::High).unwrap();
    assert_eq!(json, "\"High\"");
    let back: Priority = serde_json::from_str("\"Low\"").unwrap();
    assert_eq!(back, Priority::Low);
    assert_eq!(Priority::Medium.to_string(), "Medium");
}

#[test]
fn test_wall_clock_label_is_local_time() {
    let ms: i64 = 86_400_000 + 45_296_000;
    let expected = chrono::DateTime::from_timestamp_millis(ms)
        .unwrap()
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();
    assert_eq!(wall_clock_label(u128::try_from(ms).unwrap()), expected);
}

#[test]
fn test_default_log_directive_targets_crate() {
    assert!(DEFAULT_LOG_DIRECTIVE.starts_with("prometheus_pool_sim"));
}
