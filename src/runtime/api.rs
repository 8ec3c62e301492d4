//! Read-only models handed to dashboard and chart collaborators.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::core::{
    LogEntry, MetricsHistory, PerformanceSample, Resource, SimulationState, Task, Thread,
};
use crate::runtime::driver::SimulationStatus;

/// Headline statistics of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Tasks with work left.
    pub tasks_remaining: usize,
    /// Tasks completed since the last reset.
    pub completed_tasks: u64,
    /// Completed tasks per second across the retained history.
    pub throughput: f64,
    /// Share of threads Running, in percent.
    pub thread_utilization: f64,
}

impl SystemStats {
    /// Compute statistics for `state`.
    #[must_use]
    pub fn compute(state: &SimulationState, history: &MetricsHistory, tick_period: Duration) -> Self {
        let total = state.threads.len();
        #[allow(clippy::cast_precision_loss)]
        let thread_utilization = if total == 0 {
            0.0
        } else {
            state.status_counts().running as f64 / total as f64 * 100.0
        };
        Self {
            tasks_remaining: state.active_task_count(),
            completed_tasks: state.completed_tasks,
            throughput: history.throughput(tick_period),
            thread_utilization,
        }
    }
}

/// Everything a dashboard renders, captured at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Identifier of the current run.
    pub run_id: Uuid,
    /// Run status.
    pub status: SimulationStatus,
    /// Ticks applied since the last reset.
    pub tick: u64,
    /// Active configuration.
    pub config: SimulationConfig,
    /// Threads in id order.
    pub threads: Vec<Thread>,
    /// Tasks in creation order.
    pub tasks: Vec<Task>,
    /// Shared resources with holders and queues.
    pub resources: Vec<Resource>,
    /// Performance samples, oldest first.
    pub history: Vec<PerformanceSample>,
    /// Log entries, newest first.
    pub log: Vec<LogEntry>,
    /// Headline statistics.
    pub stats: SystemStats,
}

impl DashboardSnapshot {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
