//! Tests for the event log

use prometheus_pool_sim::core::{EventLog, Severity, SimEvent};

#[test]
fn test_log_overflow_drops_oldest() {
    let mut log = EventLog::new(3);
    for thread_id in 1..=5 {
        log.record(SimEvent::ThreadTerminated { thread_id });
    }
    let ids: Vec<_> = log
        .iter()
        .map(|entry| match entry.event {
            SimEvent::ThreadTerminated { thread_id } => thread_id,
            _ => 0,
        })
        .collect();
    assert_eq!(ids, vec![5, 4, 3]);
    assert_eq!(log.capacity(), 3);
}

#[test]
fn test_entry_ids_strictly_increase() {
    let mut log = EventLog::new(10);
    log.record_all([
        SimEvent::PoolResized { from: 2, to: 4 },
        SimEvent::ThreadsSpawned { first_id: 3, count: 2 },
    ]);
    let entries = log.entries();
    assert!(entries[0].id > entries[1].id);
    assert_eq!(entries[0].message, "Scaled up: threads 3-4 added.");
    assert_eq!(entries[1].message, "Thread pool resized from 2 to 4.");
}

#[test]
fn test_draining_narration() {
    let event = SimEvent::ThreadDraining {
        thread_id: 7,
        task_id: Some(12),
    };
    assert_eq!(event.severity(), Severity::Warning);
    assert_eq!(event.message(), "Scaled down: thread 7 will terminate after task 12.");
}

#[test]
fn test_event_serializes_with_kind_tag() {
    let event = SimEvent::ResourceHandedOff {
        thread_id: 2,
        resource_id: "Resource B".into(),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["kind"], "resource_handed_off");
    assert_eq!(value["resource_id"], "Resource B");
}
