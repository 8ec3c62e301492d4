//! Pool scaler: grows or shrinks the simulated thread set between ticks.
//!
//! Scale-up appends idle threads with fresh ids. Scale-down removes idle threads at
//! once and marks busy ones `Terminating`; the tick engine removes those after their
//! current task finishes.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::core::event_log::SimEvent;
use crate::core::state::{SimulationState, Thread, ThreadStatus};

/// Result of a resize.
#[derive(Debug, Clone)]
pub struct ScaleOutcome {
    /// The resized snapshot.
    pub state: SimulationState,
    /// Spawn, retire and drain events, in order.
    pub events: Vec<SimEvent>,
}

/// Resize the pool in `snapshot` so that `desired` threads are not draining.
#[must_use]
pub fn resize(snapshot: &SimulationState, desired: usize) -> ScaleOutcome {
    let effective = snapshot.effective_thread_count();
    let mut next = snapshot.clone();
    let mut events = Vec::new();

    match desired.cmp(&effective) {
        Ordering::Equal => {}
        Ordering::Greater => scale_up(&mut next, desired - effective, &mut events),
        Ordering::Less => scale_down(&mut next, effective - desired, &mut events),
    }

    if !events.is_empty() {
        info!(from = effective, to = desired, threads = next.threads.len(), "pool resized");
        events.insert(0, SimEvent::PoolResized {
            from: effective,
            to: desired,
        });
    }

    ScaleOutcome {
        state: next,
        events,
    }
}

fn scale_up(state: &mut SimulationState, count: usize, events: &mut Vec<SimEvent>) {
    let first_id = state.next_thread_id;
    // Ids come from the run counter, so appending keeps the list sorted.
    state
        .threads
        .extend((0..count as u64).map(|offset| Thread::idle(first_id + offset)));
    state.next_thread_id = first_id + count as u64;
    debug!(first_id, count, "threads spawned");
    events.push(SimEvent::ThreadsSpawned { first_id, count });
}

fn scale_down(state: &mut SimulationState, count: usize, events: &mut Vec<SimEvent>) {
    let mut retired = Vec::new();
    for thread in state.threads.iter().rev() {
        if retired.len() == count {
            break;
        }
        if thread.status == ThreadStatus::Idle {
            retired.push(thread.id);
        }
    }
    state.threads.retain(|t| !retired.contains(&t.id));
    for &thread_id in &retired {
        debug!(thread_id, "idle thread retired");
        events.push(SimEvent::ThreadRetired { thread_id });
    }

    let mut deficit = count - retired.len();
    for thread in state.threads.iter_mut().rev() {
        if deficit == 0 {
            break;
        }
        if thread.status == ThreadStatus::Terminating {
            continue;
        }
        thread.status = ThreadStatus::Terminating;
        deficit -= 1;
        debug!(thread_id = thread.id, task_id = ?thread.current_task_id, "thread draining");
        events.push(SimEvent::ThreadDraining {
            thread_id: thread.id,
            task_id: thread.current_task_id,
        });
    }
}
