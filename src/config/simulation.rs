//! Simulation configuration structures.

use std::env::VarError;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::AppResult;
use crate::util::serde::Priority;

/// Upper bound for the simulated pool size.
pub const MAX_THREAD_COUNT: usize = 1000;
/// Upper bound for the number of generated tasks per run.
pub const MAX_TASK_COUNT: usize = 10_000;
/// Resources are named `Resource A` through `Resource Z`.
pub const MAX_RESOURCE_COUNT: usize = 26;

/// Percentage split of newly created tasks among priority classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDistribution {
    /// Share of High priority tasks, in percent.
    pub high: u8,
    /// Share of Medium priority tasks, in percent.
    pub medium: u8,
    /// Share of Low priority tasks, in percent.
    pub low: u8,
}

impl Default for PriorityDistribution {
    fn default() -> Self {
        Self {
            high: 20,
            medium: 50,
            low: 30,
        }
    }
}

impl PriorityDistribution {
    /// Create a distribution from percentages. Call [`Self::validate`] before use.
    #[must_use]
    pub const fn new(high: u8, medium: u8, low: u8) -> Self {
        Self { high, medium, low }
    }

    /// Ensure the shares sum to exactly 100.
    pub fn validate(&self) -> Result<(), String> {
        let total = u16::from(self.high) + u16::from(self.medium) + u16::from(self.low);
        if total != 100 {
            return Err(format!(
                "priority distribution must sum to 100, got {total} ({}/{}/{})",
                self.high, self.medium, self.low
            ));
        }
        Ok(())
    }

    /// Map a roll in `0..100` onto a priority class.
    #[must_use]
    pub const fn pick(&self, roll: u8) -> Priority {
        if roll < self.high {
            Priority::High
        } else if roll < self.high.saturating_add(self.medium) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl FromStr for PriorityDistribution {
    type Err = String;

    /// Parse `"high,medium,low"`, e.g. `"20,50,30"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [high, medium, low] = parts.as_slice() else {
            return Err(format!("expected `high,medium,low`, got `{s}`"));
        };
        let parse = |v: &str| v.parse::<u8>().map_err(|e| format!("`{v}`: {e}"));
        let dist = Self::new(parse(*high)?, parse(*medium)?, parse(*low)?);
        dist.validate()?;
        Ok(dist)
    }
}

/// Parameters of the random task generator used on reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadProfile {
    /// Shortest task duration in ticks (inclusive).
    pub min_task_duration: u32,
    /// Longest task duration in ticks (inclusive).
    pub max_task_duration: u32,
    /// Probability that a task needs one of the shared resources.
    pub resource_probability: f64,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            min_task_duration: 10,
            max_task_duration: 49,
            resource_probability: 0.3,
        }
    }
}

impl WorkloadProfile {
    /// Validate duration bounds and probability range.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_task_duration == 0 {
            return Err("min_task_duration must be greater than 0".into());
        }
        if self.min_task_duration > self.max_task_duration {
            return Err(format!(
                "min_task_duration ({}) exceeds max_task_duration ({})",
                self.min_task_duration, self.max_task_duration
            ));
        }
        if !(0.0..=1.0).contains(&self.resource_probability) {
            return Err(format!(
                "resource_probability must be within [0, 1], got {}",
                self.resource_probability
            ));
        }
        Ok(())
    }
}

/// Retention windows for the observability side channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionLimits {
    /// Number of performance samples kept (oldest evicted).
    pub history_capacity: usize,
    /// Number of log entries kept (oldest dropped).
    pub log_capacity: usize,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            log_capacity: 50,
        }
    }
}

/// Root simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Desired number of worker threads.
    pub thread_count: usize,
    /// Number of tasks generated on reset.
    pub task_count: usize,
    /// Number of shared resources generated on reset.
    pub resource_count: usize,
    /// Tick period in milliseconds.
    pub simulation_speed_ms: u64,
    /// Priority split for generated tasks.
    #[serde(default)]
    pub priority_distribution: PriorityDistribution,
    /// Task generator parameters.
    #[serde(default)]
    pub workload: WorkloadProfile,
    /// History and log retention.
    #[serde(default)]
    pub retention: RetentionLimits,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            thread_count: 100,
            task_count: 200,
            resource_count: 4,
            simulation_speed_ms: 250,
            priority_distribution: PriorityDistribution::default(),
            workload: WorkloadProfile::default(),
            retention: RetentionLimits::default(),
        }
    }
}

impl SimulationConfig {
    /// Configuration with the dashboard defaults (100 threads, 200 tasks, 4 resources, 250ms).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the desired thread count.
    #[must_use]
    pub const fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the number of tasks generated on reset.
    #[must_use]
    pub const fn with_task_count(mut self, task_count: usize) -> Self {
        self.task_count = task_count;
        self
    }

    /// Set the number of shared resources.
    #[must_use]
    pub const fn with_resource_count(mut self, resource_count: usize) -> Self {
        self.resource_count = resource_count;
        self
    }

    /// Set the tick period in milliseconds.
    #[must_use]
    pub const fn with_simulation_speed_ms(mut self, simulation_speed_ms: u64) -> Self {
        self.simulation_speed_ms = simulation_speed_ms;
        self
    }

    /// Set the priority split.
    #[must_use]
    pub const fn with_priority_distribution(mut self, distribution: PriorityDistribution) -> Self {
        self.priority_distribution = distribution;
        self
    }

    /// Set the workload generator parameters.
    #[must_use]
    pub const fn with_workload(mut self, workload: WorkloadProfile) -> Self {
        self.workload = workload;
        self
    }

    /// Set the retention windows.
    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionLimits) -> Self {
        self.retention = retention;
        self
    }

    /// Tick period as a [`Duration`].
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.simulation_speed_ms)
    }

    /// Validate all values.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_count > MAX_THREAD_COUNT {
            return Err(format!(
                "thread_count must be at most {MAX_THREAD_COUNT}, got {}",
                self.thread_count
            ));
        }
        if self.task_count > MAX_TASK_COUNT {
            return Err(format!(
                "task_count must be at most {MAX_TASK_COUNT}, got {}",
                self.task_count
            ));
        }
        if self.resource_count > MAX_RESOURCE_COUNT {
            return Err(format!(
                "resource_count must be at most {MAX_RESOURCE_COUNT}, got {}",
                self.resource_count
            ));
        }
        if self.simulation_speed_ms == 0 {
            return Err("simulation_speed_ms must be greater than 0".into());
        }
        self.priority_distribution.validate()?;
        self.workload
            .validate()
            .map_err(|e| format!("workload invalid: {e}"))?;
        if self.retention.history_capacity == 0 {
            return Err("history_capacity must be greater than 0".into());
        }
        if self.retention.log_capacity == 0 {
            return Err("log_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse simulation configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading a `.env` file from
    /// the working directory first if one exists. Unset variables keep their defaults.
    ///
    /// Recognised variables: `POOL_SIM_THREAD_COUNT`, `POOL_SIM_TASK_COUNT`,
    /// `POOL_SIM_RESOURCE_COUNT`, `POOL_SIM_SPEED_MS` and `POOL_SIM_PRIORITY`
    /// (`"high,medium,low"`).
    ///
    /// # Errors
    ///
    /// Fails when the `.env` file is unreadable or malformed, when a variable cannot
    /// be parsed, or when the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        Self::from_env_file(".env")
    }

    /// Like [`from_env`](Self::from_env), reading dotenv entries from `path`.
    /// Variables already set in the process take precedence over the file.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env). A missing file is not an error.
    pub fn from_env_file(path: impl AsRef<Path>) -> AppResult<Self> {
        match dotenvy::from_path(path.as_ref()) {
            Ok(()) => {}
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to load {}: {e}",
                    path.as_ref().display()
                ))
            }
        }

        let mut cfg = Self::default();
        if let Some(v) = env_value("POOL_SIM_THREAD_COUNT")? {
            cfg.thread_count = v;
        }
        if let Some(v) = env_value("POOL_SIM_TASK_COUNT")? {
            cfg.task_count = v;
        }
        if let Some(v) = env_value("POOL_SIM_RESOURCE_COUNT")? {
            cfg.resource_count = v;
        }
        if let Some(v) = env_value("POOL_SIM_SPEED_MS")? {
            cfg.simulation_speed_ms = v;
        }
        if let Some(v) = env_value("POOL_SIM_PRIORITY")? {
            cfg.priority_distribution = v;
        }
        cfg.validate()
            .map_err(|e| anyhow::anyhow!("invalid simulation config: {e}"))?;
        Ok(cfg)
    }

    /// Produce the configuration that results from `change`, validated, along with
    /// the effect the change has on a running simulation.
    pub fn apply(&self, change: ConfigChange) -> Result<(Self, ChangeEffect), String> {
        let mut next = self.clone();
        match change {
            ConfigChange::ThreadCount(v) => next.thread_count = v,
            ConfigChange::TaskCount(v) => next.task_count = v,
            ConfigChange::ResourceCount(v) => next.resource_count = v,
            ConfigChange::SimulationSpeedMs(v) => next.simulation_speed_ms = v,
            ConfigChange::PriorityDistribution(v) => next.priority_distribution = v,
            ConfigChange::Workload(v) => next.workload = v,
        }
        next.validate()?;
        Ok((next, change.effect()))
    }
}

fn env_value<T>(key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key}=`{raw}`: {e}")),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("{key}: {e}")),
    }
}

/// A single configuration delta supplied by the driver's caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigChange {
    /// Resize the pool.
    ThreadCount(usize),
    /// Change the number of generated tasks.
    TaskCount(usize),
    /// Change the number of shared resources.
    ResourceCount(usize),
    /// Change the tick period.
    SimulationSpeedMs(u64),
    /// Change the priority split.
    PriorityDistribution(PriorityDistribution),
    /// Change the task generator parameters.
    Workload(WorkloadProfile),
}

/// What applying a [`ConfigChange`] does to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEffect {
    /// Fresh thread, task and resource sets.
    Reset,
    /// Incremental pool resize.
    Rescale,
    /// Only the tick cadence changes.
    Cadence,
}

impl ConfigChange {
    /// Classify the change.
    #[must_use]
    pub const fn effect(&self) -> ChangeEffect {
        match self {
            Self::ThreadCount(_) => ChangeEffect::Rescale,
            Self::SimulationSpeedMs(_) => ChangeEffect::Cadence,
            Self::TaskCount(_)
            | Self::ResourceCount(_)
            | Self::PriorityDistribution(_)
            | Self::Workload(_) => ChangeEffect::Reset,
        }
    }
}
