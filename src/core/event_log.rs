//! Simulation events and the bounded event log.
//!
//! Every state-changing action of the tick engine, the pool scaler and the driver is
//! described by a [`SimEvent`]. The [`EventLog`] turns events into human-readable
//! [`LogEntry`] values, newest first, keeping only the most recent entries.
//! The log is an observability side channel: it never feeds back into scheduling.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::util::clock::{now_ms, wall_clock_label};
use crate::util::serde::{Priority, ResourceId, TaskId, ThreadId};

/// Display severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine transition.
    Info,
    /// Contention or pool shrinkage.
    Warning,
    /// A task finished.
    Success,
}

/// A state-changing action in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    /// A task was assigned to an idle thread.
    TaskStarted {
        /// Receiving thread.
        thread_id: ThreadId,
        /// Assigned task.
        task_id: TaskId,
        /// Priority of the task.
        priority: Priority,
    },
    /// A task ran out of remaining ticks.
    TaskCompleted {
        /// Thread that ran it.
        thread_id: ThreadId,
        /// Finished task.
        task_id: TaskId,
    },
    /// A free resource was locked at dispatch.
    ResourceLocked {
        /// New holder.
        thread_id: ThreadId,
        /// Locked resource.
        resource_id: ResourceId,
    },
    /// A thread found its resource busy and joined the wait queue.
    ResourceQueued {
        /// Waiting thread.
        thread_id: ThreadId,
        /// Contended resource.
        resource_id: ResourceId,
        /// 1-based position in the queue.
        position: usize,
    },
    /// A released resource was granted to the head of its wait queue.
    ResourceHandedOff {
        /// New holder.
        thread_id: ThreadId,
        /// Resource handed over.
        resource_id: ResourceId,
    },
    /// A holder finished its task and released the resource.
    ResourceReleased {
        /// Former holder.
        thread_id: ThreadId,
        /// Released resource.
        resource_id: ResourceId,
    },
    /// New idle threads joined the pool.
    ThreadsSpawned {
        /// Id of the first new thread.
        first_id: ThreadId,
        /// Number of threads added.
        count: usize,
    },
    /// An idle thread was removed immediately on scale-down.
    ThreadRetired {
        /// Removed thread.
        thread_id: ThreadId,
    },
    /// A busy thread was marked Terminating on scale-down.
    ThreadDraining {
        /// Draining thread.
        thread_id: ThreadId,
        /// Task it will finish first.
        task_id: Option<TaskId>,
    },
    /// A draining thread finished and left the pool.
    ThreadTerminated {
        /// Removed thread.
        thread_id: ThreadId,
    },
    /// The pool size target changed.
    PoolResized {
        /// Previous effective pool size.
        from: usize,
        /// New target.
        to: usize,
    },
    /// Fresh thread, task and resource sets were generated.
    SimulationReset {
        /// Threads created.
        threads: usize,
        /// Tasks created.
        tasks: usize,
        /// Resources created.
        resources: usize,
    },
}

impl SimEvent {
    /// Severity used when displaying this event.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::TaskCompleted { .. } => Severity::Success,
            Self::ResourceQueued { .. }
            | Self::ThreadRetired { .. }
            | Self::ThreadDraining { .. }
            | Self::ThreadTerminated { .. } => Severity::Warning,
            Self::TaskStarted { .. }
            | Self::ResourceLocked { .. }
            | Self::ResourceHandedOff { .. }
            | Self::ResourceReleased { .. }
            | Self::ThreadsSpawned { .. }
            | Self::PoolResized { .. }
            | Self::SimulationReset { .. } => Severity::Info,
        }
    }

    /// Human-readable narration.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::TaskStarted {
                thread_id,
                task_id,
                priority,
            } => format!("Thread {thread_id} started task {task_id} ({priority} priority)."),
            Self::TaskCompleted { thread_id, task_id } => {
                format!("Thread {thread_id} completed task {task_id}.")
            }
            Self::ResourceLocked {
                thread_id,
                resource_id,
            } => format!("Thread {thread_id} locked {resource_id}."),
            Self::ResourceQueued {
                thread_id,
                resource_id,
                position,
            } => format!(
                "Thread {thread_id} is waiting for {resource_id} (position {position} in queue)."
            ),
            Self::ResourceHandedOff {
                thread_id,
                resource_id,
            } => format!("{resource_id} handed off to thread {thread_id}."),
            Self::ResourceReleased {
                thread_id,
                resource_id,
            } => format!("Thread {thread_id} released {resource_id}."),
            Self::ThreadsSpawned { first_id, count } => match count {
                1 => format!("Scaled up: thread {first_id} added."),
                n => format!(
                    "Scaled up: threads {first_id}-{} added.",
                    first_id + *n as u64 - 1
                ),
            },
            Self::ThreadRetired { thread_id } => {
                format!("Scaled down: idle thread {thread_id} removed.")
            }
            Self::ThreadDraining { thread_id, task_id } => match task_id {
                Some(task_id) => format!(
                    "Scaled down: thread {thread_id} will terminate after task {task_id}."
                ),
                None => format!("Scaled down: thread {thread_id} marked for termination."),
            },
            Self::ThreadTerminated { thread_id } => format!("Thread {thread_id} terminated."),
            Self::PoolResized { from, to } => format!("Thread pool resized from {from} to {to}."),
            Self::SimulationReset {
                threads,
                tasks,
                resources,
            } => format!(
                "Simulation reset with {threads} threads, {tasks} tasks and {resources} resources."
            ),
        }
    }
}

/// One narrated entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Strictly increasing identifier.
    pub id: u64,
    /// Wall-clock label (`HH:MM:SS`).
    pub timestamp: String,
    /// Narration.
    pub message: String,
    /// Display severity.
    pub severity: Severity,
    /// Structured event behind the narration.
    pub event: SimEvent,
}

/// Bounded, newest-first event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl EventLog {
    /// Create an empty log keeping at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
        }
    }

    /// Record an event stamped with the current wall-clock time. Returns the entry id.
    pub fn record(&mut self, event: SimEvent) -> u64 {
        self.record_at(event, now_ms())
    }

    /// Record an event stamped with `epoch_ms`. Returns the entry id.
    pub fn record_at(&mut self, event: SimEvent, epoch_ms: u128) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(LogEntry {
            id,
            timestamp: wall_clock_label(epoch_ms),
            message: event.message(),
            severity: event.severity(),
            event,
        });
        self.entries.truncate(self.capacity);
        id
    }

    /// Record a batch of events in order, all with the same timestamp.
    pub fn record_all(&mut self, events: impl IntoIterator<Item = SimEvent>) {
        let stamp = now_ms();
        for event in events {
            self.record_at(event, stamp);
        }
    }

    /// Snapshot of the retained entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Iterate retained entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries. Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
