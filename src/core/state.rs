//! Simulation entity graph: threads, tasks, shared resources and run counters.
//!
//! A [`SimulationState`] is a plain value. The tick engine and pool scaler take a
//! snapshot by reference and return a new one; nothing in this module mutates shared
//! state behind the caller's back.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::util::serde::{Priority, ResourceId, TaskId, ThreadId};

/// Lifecycle status of a simulated thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// No task assigned; eligible for dispatch.
    Idle,
    /// Executing its task (holding the task's resource, if any).
    Running,
    /// Assigned a task whose resource is held by another thread.
    Waiting,
    /// Draining: finishes its current task, then is removed. Never receives new work.
    Terminating,
}

/// A simulated worker thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Stable identifier, never reused within a run.
    pub id: ThreadId,
    /// Current status.
    pub status: ThreadStatus,
    /// Task currently owned by this thread.
    pub current_task_id: Option<TaskId>,
    /// Progress of the current task in percent.
    pub progress: f64,
}

impl Thread {
    /// A fresh idle thread.
    #[must_use]
    pub const fn idle(id: ThreadId) -> Self {
        Self {
            id,
            status: ThreadStatus::Idle,
            current_task_id: None,
            progress: 0.0,
        }
    }

    pub(crate) fn reset_to_idle(&mut self) {
        self.status = ThreadStatus::Idle;
        self.current_task_id = None;
        self.progress = 0.0;
    }
}

/// A unit of simulated work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within a run.
    pub id: TaskId,
    /// Total length in ticks, fixed at creation.
    pub duration: u32,
    /// Ticks still to run; the task is complete once this reaches 0.
    pub remaining: u32,
    /// Shared resource the task must hold while running.
    pub resource_id: Option<ResourceId>,
    /// Dispatch priority.
    pub priority: Priority,
}

impl Task {
    /// A task that has not started yet.
    pub fn new(
        id: TaskId,
        duration: u32,
        resource_id: Option<ResourceId>,
        priority: Priority,
    ) -> Self {
        Self {
            id,
            duration,
            remaining: duration,
            resource_id,
            priority,
        }
    }

    /// Whether the task still has work left.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Completion percentage, `100 × (1 − remaining/duration)`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 100.0;
        }
        100.0 * (1.0 - f64::from(self.remaining) / f64::from(self.duration))
    }
}

/// A mutex-like shared resource with a FIFO wait queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Display identifier, e.g. `"Resource A"`.
    pub id: ResourceId,
    /// Thread currently holding the lock.
    pub locked_by: Option<ThreadId>,
    /// Threads waiting for the lock, oldest first. Never contains duplicates.
    pub queue: VecDeque<ThreadId>,
}

impl Resource {
    /// A free resource with an empty queue.
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            locked_by: None,
            queue: VecDeque::new(),
        }
    }

    /// Name of the `index`-th resource: `Resource A`, `Resource B`, ...
    ///
    /// Indices past 25 wrap around the alphabet.
    #[must_use]
    pub fn letter_name(index: usize) -> ResourceId {
        let letter = char::from(b'A' + u8::try_from(index % 26).unwrap_or(0));
        format!("Resource {letter}")
    }

    /// Whether no thread holds the lock.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.locked_by.is_none()
    }
}

/// Number of threads per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Threads with status Running.
    pub running: usize,
    /// Threads with status Waiting.
    pub waiting: usize,
    /// Threads with status Idle.
    pub idle: usize,
    /// Threads with status Terminating.
    pub terminating: usize,
}

impl StatusCounts {
    /// Sum over all statuses.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.running + self.waiting + self.idle + self.terminating
    }
}

/// A broken structural invariant, reported by [`SimulationState::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// The complete state of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Identifier of the current run; regenerated on every reset.
    pub run_id: Uuid,
    /// Number of ticks applied since the last reset.
    pub tick: u64,
    /// Active threads in ascending id order.
    pub threads: Vec<Thread>,
    /// All tasks of the run in creation order.
    pub tasks: Vec<Task>,
    /// Shared resources.
    pub resources: Vec<Resource>,
    /// Id the next spawned thread receives.
    pub next_thread_id: ThreadId,
    /// Tasks completed since the last reset.
    pub completed_tasks: u64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new())
    }
}

impl SimulationState {
    /// Assemble a state from its parts. Threads are sorted by id and the thread id
    /// counter continues after the largest id present.
    #[must_use]
    pub fn from_parts(mut threads: Vec<Thread>, tasks: Vec<Task>, resources: Vec<Resource>) -> Self {
        threads.sort_by_key(|t| t.id);
        let next_thread_id = threads.last().map_or(1, |t| t.id + 1);
        Self {
            run_id: Uuid::new_v4(),
            tick: 0,
            threads,
            tasks,
            resources,
            next_thread_id,
            completed_tasks: 0,
        }
    }

    /// Look up a thread by id.
    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads
            .binary_search_by_key(&id, |t| t.id)
            .ok()
            .map(|idx| &self.threads[idx])
    }

    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a resource by id.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Count threads per status.
    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for thread in &self.threads {
            match thread.status {
                ThreadStatus::Idle => counts.idle += 1,
                ThreadStatus::Running => counts.running += 1,
                ThreadStatus::Waiting => counts.waiting += 1,
                ThreadStatus::Terminating => counts.terminating += 1,
            }
        }
        counts
    }

    /// Pool size as seen by the scaler: threads that are not draining.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        self.threads
            .iter()
            .filter(|t| t.status != ThreadStatus::Terminating)
            .count()
    }

    /// Tasks with work left, assigned or not.
    #[must_use]
    pub fn active_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_active()).count()
    }

    /// Tasks with work left that no thread owns yet.
    #[must_use]
    pub fn pending_task_count(&self) -> usize {
        let assigned: HashSet<TaskId> =
            self.threads.iter().filter_map(|t| t.current_task_id).collect();
        self.tasks
            .iter()
            .filter(|t| t.is_active() && !assigned.contains(&t.id))
            .count()
    }

    /// Whether every task has finished.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.tasks.iter().all(|t| !t.is_active())
    }

    /// Whether `thread` advances its task on the next tick.
    ///
    /// Running threads always do. A Terminating thread does when its task needs no
    /// resource, or it holds that resource, or the resource no longer exists.
    #[must_use]
    pub fn is_executing(&self, thread: &Thread) -> bool {
        match thread.status {
            ThreadStatus::Running => thread.current_task_id.is_some(),
            ThreadStatus::Terminating => thread
                .current_task_id
                .and_then(|task_id| self.task(task_id))
                .is_some_and(|task| holds_or_needs_none(thread.id, task, &self.resources)),
            ThreadStatus::Idle | ThreadStatus::Waiting => false,
        }
    }

    /// Verify the structural invariants of the entity graph.
    ///
    /// Used by tests and debug assertions; the engine itself never fails.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let fail = |msg: String| Err(InvariantViolation(msg));

        for pair in self.threads.windows(2) {
            if pair[0].id >= pair[1].id {
                return fail(format!("threads out of order: {} then {}", pair[0].id, pair[1].id));
            }
        }
        if let Some(last) = self.threads.last() {
            if last.id >= self.next_thread_id {
                return fail(format!(
                    "thread {} not below id counter {}",
                    last.id, self.next_thread_id
                ));
            }
        }

        let mut owners: HashMap<TaskId, ThreadId> = HashMap::new();
        for thread in &self.threads {
            let busy = matches!(thread.status, ThreadStatus::Running | ThreadStatus::Waiting);
            if thread.status != ThreadStatus::Terminating && busy != thread.current_task_id.is_some() {
                return fail(format!(
                    "thread {} is {:?} with task {:?}",
                    thread.id, thread.status, thread.current_task_id
                ));
            }
            if !(0.0..=100.0).contains(&thread.progress) {
                return fail(format!("thread {} progress {}", thread.id, thread.progress));
            }
            if thread.progress > 0.0 && !self.is_executing(thread) {
                return fail(format!(
                    "thread {} reports progress while {:?}",
                    thread.id, thread.status
                ));
            }
            if let Some(task_id) = thread.current_task_id {
                if let Some(other) = owners.insert(task_id, thread.id) {
                    return fail(format!(
                        "task {task_id} assigned to threads {other} and {}",
                        thread.id
                    ));
                }
            }
        }

        for task in &self.tasks {
            if task.remaining > task.duration {
                return fail(format!(
                    "task {} remaining {} exceeds duration {}",
                    task.id, task.remaining, task.duration
                ));
            }
        }

        let mut queued: HashSet<ThreadId> = HashSet::new();
        for resource in &self.resources {
            if let Some(holder_id) = resource.locked_by {
                let Some(holder) = self.thread(holder_id) else {
                    return fail(format!("{} locked by missing thread {holder_id}", resource.id));
                };
                if !matches!(holder.status, ThreadStatus::Running | ThreadStatus::Terminating) {
                    return fail(format!(
                        "{} locked by thread {holder_id} in status {:?}",
                        resource.id, holder.status
                    ));
                }
                let needs_it = holder
                    .current_task_id
                    .and_then(|id| self.task(id))
                    .is_some_and(|task| task.resource_id.as_deref() == Some(resource.id.as_str()));
                if !needs_it {
                    return fail(format!(
                        "{} locked by thread {holder_id} whose task does not need it",
                        resource.id
                    ));
                }
            }
            for &waiter_id in &resource.queue {
                if !queued.insert(waiter_id) {
                    return fail(format!("thread {waiter_id} queued more than once"));
                }
                let waiting_here = self.thread(waiter_id).is_some_and(|t| {
                    matches!(t.status, ThreadStatus::Waiting | ThreadStatus::Terminating)
                        && t.current_task_id
                            .and_then(|id| self.task(id))
                            .is_some_and(|task| task.resource_id.as_deref() == Some(resource.id.as_str()))
                });
                if !waiting_here {
                    return fail(format!(
                        "thread {waiter_id} queued on {} without waiting for it",
                        resource.id
                    ));
                }
            }
        }

        for thread in &self.threads {
            let Some(task) = thread.current_task_id.and_then(|id| self.task(id)) else {
                continue;
            };
            let Some(resource) = task
                .resource_id
                .as_deref()
                .and_then(|rid| self.resource(rid))
            else {
                continue;
            };
            let holds = resource.locked_by == Some(thread.id);
            match thread.status {
                ThreadStatus::Running if !holds => {
                    return fail(format!(
                        "thread {} running task {} without holding {}",
                        thread.id, task.id, resource.id
                    ));
                }
                ThreadStatus::Waiting if !resource.queue.contains(&thread.id) => {
                    return fail(format!(
                        "thread {} waiting for {} but not queued",
                        thread.id, resource.id
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// True when `task` needs no resource, the resource is missing, or `thread_id` holds it.
pub(crate) fn holds_or_needs_none(thread_id: ThreadId, task: &Task, resources: &[Resource]) -> bool {
    match task.resource_id.as_deref() {
        None => true,
        Some(rid) => resources
            .iter()
            .find(|r| r.id == rid)
            .is_none_or(|r| r.locked_by == Some(thread_id)),
    }
}
