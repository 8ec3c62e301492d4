//! Tick engine: the per-tick state transition of the simulated pool.
//!
//! [`advance`] clones the previous snapshot once and applies four phases to the copy,
//! strictly in order:
//!
//! 1. **Progress**: executing threads advance their task by one tick; finished tasks
//!    release their resource and free (or retire) their thread.
//! 2. **Removal**: draining threads that finished, and draining threads without a
//!    task, leave the pool.
//! 3. **Hand-off**: each free resource with waiters grants the lock to the head of
//!    its queue.
//! 4. **Dispatch**: pending tasks, highest priority first and creation order within
//!    a priority, go to idle threads in id order.
//!
//! The function is total. References that do not resolve are skipped.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::core::event_log::SimEvent;
use crate::core::state::{holds_or_needs_none, SimulationState, ThreadStatus};
use crate::util::serde::{TaskId, ThreadId};

/// Result of applying one tick.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The new snapshot.
    pub state: SimulationState,
    /// Tasks whose `remaining` reached zero during this tick.
    pub completed: u32,
    /// State-changing actions, in the order they happened.
    pub events: Vec<SimEvent>,
}

/// Advance `snapshot` by one discrete tick.
#[must_use]
pub fn advance(snapshot: &SimulationState) -> TickOutcome {
    let mut next = snapshot.clone();
    let mut events = Vec::new();

    let (completed, retiring) = progress_phase(&mut next, &mut events);
    removal_phase(&mut next, &retiring, &mut events);
    handoff_phase(&mut next, &mut events);
    dispatch_phase(&mut next, &mut events);

    next.tick += 1;
    next.completed_tasks += u64::from(completed);

    debug!(
        tick = next.tick,
        completed,
        events = events.len(),
        threads = next.threads.len(),
        "tick applied"
    );

    TickOutcome {
        state: next,
        completed,
        events,
    }
}

fn progress_phase(state: &mut SimulationState, events: &mut Vec<SimEvent>) -> (u32, HashSet<ThreadId>) {
    let SimulationState {
        threads,
        tasks,
        resources,
        ..
    } = state;
    let task_index: HashMap<TaskId, usize> =
        tasks.iter().enumerate().map(|(idx, t)| (t.id, idx)).collect();

    let mut completed = 0;
    let mut retiring = HashSet::new();

    for thread in threads.iter_mut() {
        let Some(task_id) = thread.current_task_id else {
            continue;
        };
        let Some(&task_idx) = task_index.get(&task_id) else {
            trace!(thread_id = thread.id, task_id, "thread references unknown task");
            continue;
        };
        let task = &mut tasks[task_idx];
        let executing = match thread.status {
            ThreadStatus::Running => true,
            ThreadStatus::Terminating => holds_or_needs_none(thread.id, task, resources),
            ThreadStatus::Idle | ThreadStatus::Waiting => false,
        };
        if !executing {
            continue;
        }

        let was_active = task.is_active();
        task.remaining = task.remaining.saturating_sub(1);
        thread.progress = task.progress();
        if task.is_active() {
            continue;
        }

        if was_active {
            completed += 1;
            debug!(thread_id = thread.id, task_id, "task completed");
            events.push(SimEvent::TaskCompleted {
                thread_id: thread.id,
                task_id,
            });
        }

        if let Some(resource_id) = task.resource_id.as_deref() {
            if let Some(resource) = resources.iter_mut().find(|r| r.id == resource_id) {
                if resource.locked_by == Some(thread.id) {
                    resource.locked_by = None;
                    events.push(SimEvent::ResourceReleased {
                        thread_id: thread.id,
                        resource_id: resource.id.clone(),
                    });
                }
            }
        }

        if thread.status == ThreadStatus::Terminating {
            retiring.insert(thread.id);
        } else {
            thread.reset_to_idle();
        }
    }

    (completed, retiring)
}

fn removal_phase(state: &mut SimulationState, retiring: &HashSet<ThreadId>, events: &mut Vec<SimEvent>) {
    state.threads.retain(|thread| {
        let remove = retiring.contains(&thread.id)
            || (thread.status == ThreadStatus::Terminating && thread.current_task_id.is_none());
        if remove {
            debug!(thread_id = thread.id, "draining thread removed");
            events.push(SimEvent::ThreadTerminated {
                thread_id: thread.id,
            });
        }
        !remove
    });
}

fn handoff_phase(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    let SimulationState {
        threads,
        tasks,
        resources,
        ..
    } = state;
    let thread_index: HashMap<ThreadId, usize> =
        threads.iter().enumerate().map(|(idx, t)| (t.id, idx)).collect();

    for resource in resources.iter_mut() {
        if !resource.is_free() {
            continue;
        }
        let Some(next_id) = resource.queue.pop_front() else {
            continue;
        };
        let Some(&thread_idx) = thread_index.get(&next_id) else {
            trace!(thread_id = next_id, resource = %resource.id, "queued thread no longer exists");
            continue;
        };
        let thread = &mut threads[thread_idx];
        let eligible = match thread.status {
            ThreadStatus::Waiting => true,
            // A draining thread still finishes the task it was waiting for.
            ThreadStatus::Terminating => thread
                .current_task_id
                .and_then(|id| tasks.iter().find(|t| t.id == id))
                .is_some_and(|task| task.resource_id.as_deref() == Some(resource.id.as_str())),
            ThreadStatus::Idle | ThreadStatus::Running => false,
        };
        if !eligible {
            trace!(thread_id = next_id, resource = %resource.id, "stale queue entry skipped");
            continue;
        }

        resource.locked_by = Some(thread.id);
        if thread.status == ThreadStatus::Waiting {
            thread.status = ThreadStatus::Running;
        }
        debug!(thread_id = thread.id, resource = %resource.id, "resource handed off");
        events.push(SimEvent::ResourceHandedOff {
            thread_id: thread.id,
            resource_id: resource.id.clone(),
        });
    }
}

fn dispatch_phase(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    let SimulationState {
        threads,
        tasks,
        resources,
        ..
    } = state;

    let assigned: HashSet<TaskId> = threads.iter().filter_map(|t| t.current_task_id).collect();
    let mut pending: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_active() && !assigned.contains(&t.id))
        .map(|(idx, _)| idx)
        .collect();
    // Stable: creation order is kept within a priority class.
    pending.sort_by_key(|&idx| Reverse(tasks[idx].priority));

    let mut idle: Vec<usize> = threads
        .iter()
        .enumerate()
        .filter(|(_, t)| t.status == ThreadStatus::Idle)
        .map(|(idx, _)| idx)
        .collect();
    idle.sort_by_key(|&idx| threads[idx].id);

    for (thread_idx, task_idx) in idle.into_iter().zip(pending) {
        let thread = &mut threads[thread_idx];
        let task = &tasks[task_idx];

        thread.current_task_id = Some(task.id);
        thread.progress = 0.0;
        events.push(SimEvent::TaskStarted {
            thread_id: thread.id,
            task_id: task.id,
            priority: task.priority,
        });

        let Some(resource_id) = task.resource_id.as_deref() else {
            thread.status = ThreadStatus::Running;
            continue;
        };
        let Some(resource) = resources.iter_mut().find(|r| r.id == resource_id) else {
            warn!(
                task_id = task.id,
                resource = resource_id,
                "task needs unknown resource; running without lock"
            );
            thread.status = ThreadStatus::Running;
            continue;
        };

        if resource.is_free() {
            resource.locked_by = Some(thread.id);
            thread.status = ThreadStatus::Running;
            events.push(SimEvent::ResourceLocked {
                thread_id: thread.id,
                resource_id: resource.id.clone(),
            });
        } else {
            thread.status = ThreadStatus::Waiting;
            if !resource.queue.contains(&thread.id) {
                resource.queue.push_back(thread.id);
            }
            let position = resource
                .queue
                .iter()
                .position(|&id| id == thread.id)
                .map_or(resource.queue.len(), |p| p + 1);
            debug!(thread_id = thread.id, resource = %resource.id, position, "thread queued on resource");
            events.push(SimEvent::ResourceQueued {
                thread_id: thread.id,
                resource_id: resource.id.clone(),
                position,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{Resource, Task, Thread};
    use crate::util::serde::Priority;

    const RES_A: &str = "Resource A";

    fn task(id: TaskId, duration: u32, resource: Option<&str>, priority: Priority) -> Task {
        Task::new(id, duration, resource.map(str::to_string), priority)
    }

    fn status_of(state: &SimulationState, id: ThreadId) -> ThreadStatus {
        state.thread(id).map(|t| t.status).unwrap()
    }

    fn run(state: &SimulationState, ticks: usize) -> (SimulationState, u32) {
        let mut current = state.clone();
        let mut completed = 0;
        for _ in 0..ticks {
            let outcome = advance(&current);
            outcome.state.check_invariants().unwrap();
            completed += outcome.completed;
            current = outcome.state;
        }
        (current, completed)
    }

    #[test]
    fn test_first_tick_only_dispatches() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 3, None, Priority::Medium)],
            Vec::new(),
        );
        let outcome = advance(&state);
        let thread = outcome.state.thread(1).unwrap();
        assert_eq!(thread.status, ThreadStatus::Running);
        assert_eq!(thread.current_task_id, Some(1));
        assert_eq!(outcome.state.task(1).unwrap().remaining, 3);
        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.state.tick, 1);
    }

    #[test]
    fn test_contended_resource_scenario() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1), Thread::idle(2)],
            vec![
                task(1, 3, Some(RES_A), Priority::Medium),
                task(2, 5, Some(RES_A), Priority::Medium),
            ],
            vec![Resource::new(RES_A)],
        );

        // Tick 1: thread 1 locks, thread 2 queues.
        let (s, _) = run(&state, 1);
        assert_eq!(status_of(&s, 1), ThreadStatus::Running);
        assert_eq!(status_of(&s, 2), ThreadStatus::Waiting);
        let res = s.resource(RES_A).unwrap();
        assert_eq!(res.locked_by, Some(1));
        assert_eq!(res.queue.iter().copied().collect::<Vec<_>>(), vec![2]);

        // Ticks 2-3: task 1 counts down.
        let (s, completed) = run(&s, 2);
        assert_eq!(completed, 0);
        assert_eq!(s.task(1).unwrap().remaining, 1);

        // Tick 4: task 1 finishes, lock handed to thread 2 in the same tick.
        let outcome = advance(&s);
        assert_eq!(outcome.completed, 1);
        let s = outcome.state;
        assert_eq!(status_of(&s, 1), ThreadStatus::Idle);
        assert_eq!(status_of(&s, 2), ThreadStatus::Running);
        let res = s.resource(RES_A).unwrap();
        assert_eq!(res.locked_by, Some(2));
        assert!(res.queue.is_empty());
        assert_eq!(s.task(2).unwrap().remaining, 5);
        assert!(outcome.events.contains(&SimEvent::ResourceHandedOff {
            thread_id: 2,
            resource_id: RES_A.into(),
        }));

        // Ticks 5-9: task 2 runs its full duration.
        let (s, completed) = run(&s, 4);
        assert_eq!(completed, 0);
        assert_eq!(s.task(2).unwrap().remaining, 1);
        let (s, completed) = run(&s, 1);
        assert_eq!(completed, 1);
        assert_eq!(status_of(&s, 2), ThreadStatus::Idle);
        assert!(s.resource(RES_A).unwrap().is_free());
        assert_eq!(s.completed_tasks, 2);
        assert!(s.is_drained());
    }

    #[test]
    fn test_dispatch_priority_then_creation_order() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1), Thread::idle(2), Thread::idle(3), Thread::idle(4)],
            vec![
                task(1, 5, None, Priority::Low),
                task(2, 5, None, Priority::Medium),
                task(3, 5, None, Priority::High),
                task(4, 5, None, Priority::Medium),
                task(5, 5, None, Priority::High),
            ],
            Vec::new(),
        );
        let s = advance(&state).state;
        let assigned: Vec<_> = s.threads.iter().map(|t| t.current_task_id.unwrap()).collect();
        assert_eq!(assigned, vec![3, 5, 2, 4]);
        assert_eq!(s.pending_task_count(), 1);
    }

    #[test]
    fn test_progress_reaches_hundred_on_completion() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 4, None, Priority::High)],
            Vec::new(),
        );
        let mut s = advance(&state).state;
        let mut last = 0.0;
        for expected_remaining in (1..4).rev() {
            s = advance(&s).state;
            let thread = s.thread(1).unwrap();
            assert_eq!(s.task(1).unwrap().remaining, expected_remaining);
            assert!(thread.progress > last);
            last = thread.progress;
        }
        let outcome = advance(&s);
        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.state.thread(1).unwrap().status, ThreadStatus::Idle);
        assert!(outcome.state.thread(1).unwrap().progress.abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminating_running_thread_is_removed_after_completion() {
        let mut state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 2, None, Priority::High), task(2, 2, None, Priority::High)],
            Vec::new(),
        );
        state = advance(&state).state;
        state.threads[0].status = ThreadStatus::Terminating;

        let s = advance(&state).state;
        assert_eq!(status_of(&s, 1), ThreadStatus::Terminating);
        assert_eq!(s.task(1).unwrap().remaining, 1);

        let outcome = advance(&s);
        assert_eq!(outcome.completed, 1);
        assert!(outcome.state.thread(1).is_none());
        assert!(outcome
            .events
            .contains(&SimEvent::ThreadTerminated { thread_id: 1 }));
        // Task 2 was never started on the draining thread.
        assert_eq!(outcome.state.task(2).unwrap().remaining, 2);
    }

    #[test]
    fn test_terminating_waiter_acquires_then_drains() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1), Thread::idle(2)],
            vec![
                task(1, 1, Some(RES_A), Priority::High),
                task(2, 2, Some(RES_A), Priority::High),
            ],
            vec![Resource::new(RES_A)],
        );
        let mut s = advance(&state).state;
        assert_eq!(status_of(&s, 2), ThreadStatus::Waiting);
        s.threads[1].status = ThreadStatus::Terminating;
        s.check_invariants().unwrap();

        // Task 1 completes, lock goes to the draining waiter.
        let s = advance(&s).state;
        assert_eq!(s.resource(RES_A).unwrap().locked_by, Some(2));
        assert_eq!(status_of(&s, 2), ThreadStatus::Terminating);
        assert_eq!(s.task(2).unwrap().remaining, 2);

        let (s, completed) = run(&s, 2);
        assert_eq!(completed, 1);
        assert!(s.thread(2).is_none());
        assert!(s.resource(RES_A).unwrap().is_free());
    }

    #[test]
    fn test_idle_terminating_thread_removed_immediately() {
        let mut thread = Thread::idle(3);
        thread.status = ThreadStatus::Terminating;
        let state = SimulationState::from_parts(
            vec![thread],
            vec![task(1, 2, None, Priority::High)],
            Vec::new(),
        );
        let s = advance(&state).state;
        assert!(s.threads.is_empty());
        assert_eq!(s.task(1).unwrap().remaining, 2);
    }

    #[test]
    fn test_stale_queue_entry_is_dropped() {
        let mut res = Resource::new(RES_A);
        res.queue.push_back(42);
        let state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 3, Some(RES_A), Priority::High)],
            vec![res],
        );
        let s = advance(&state).state;
        let res = s.resource(RES_A).unwrap();
        assert!(!res.queue.contains(&42));
        // The free resource goes to the dispatched thread.
        assert_eq!(res.locked_by, Some(1));
        assert_eq!(status_of(&s, 1), ThreadStatus::Running);
    }

    #[test]
    fn test_unknown_task_reference_is_skipped() {
        let mut thread = Thread::idle(1);
        thread.status = ThreadStatus::Running;
        thread.current_task_id = Some(99);
        let state = SimulationState::from_parts(
            vec![thread, Thread::idle(2)],
            vec![task(1, 2, None, Priority::Low)],
            Vec::new(),
        );
        let outcome = advance(&state);
        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.state.thread(1).unwrap().current_task_id, Some(99));
        assert_eq!(outcome.state.thread(2).unwrap().current_task_id, Some(1));
    }

    #[test]
    fn test_unknown_resource_runs_unlocked() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 1, Some("Resource Q"), Priority::Low)],
            Vec::new(),
        );
        let s = advance(&state).state;
        assert_eq!(status_of(&s, 1), ThreadStatus::Running);
        let outcome = advance(&s);
        assert_eq!(outcome.completed, 1);
    }

    #[test]
    fn test_input_snapshot_untouched() {
        let state = SimulationState::from_parts(
            vec![Thread::idle(1)],
            vec![task(1, 3, None, Priority::Low)],
            Vec::new(),
        );
        let before = state.clone();
        let _ = advance(&state);
        assert_eq!(state, before);
    }
}
