//! Simulation driver: the single owner of the canonical simulation state.
//!
//! Every mutation goes through a `&mut SimulationDriver`, so ticks, resizes and
//! resets are serialized by construction. The driver feeds each tick outcome to the
//! metrics sampler and the event log.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::simulation::MAX_THREAD_COUNT;
use crate::config::{ChangeEffect, ConfigChange, SimulationConfig};
use crate::core::{
    advance, generate, resize, AdvisoryRequest, EventLog, HistoryDigest, MetricsHistory,
    MetricsSampler, PerformanceSample, Recommendation, SimEvent, SimulationError,
    SimulationState, StatusDigest,
};
use crate::runtime::api::{DashboardSnapshot, SystemStats};

/// Run status of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    /// The ticker advances the simulation every period.
    Running,
    /// Ticks are suspended; state is kept.
    Paused,
    /// Freshly reset; ticks are suspended.
    Stopped,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// What one applied tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick number after the step.
    pub tick: u64,
    /// Tasks completed during the step.
    pub completed: u32,
    /// Sample recorded for the step.
    pub sample: PerformanceSample,
}

/// Owns the simulation state, configuration, RNG and observability buffers.
#[derive(Debug)]
pub struct SimulationDriver {
    config: SimulationConfig,
    state: SimulationState,
    status: SimulationStatus,
    rng: StdRng,
    sampler: MetricsSampler,
    history: MetricsHistory,
    log: EventLog,
}

impl SimulationDriver {
    /// Create a stopped driver with a freshly generated workload.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        config: SimulationConfig,
        rng: StdRng,
        sampler: MetricsSampler,
    ) -> Result<Self, SimulationError> {
        config.validate().map_err(SimulationError::InvalidConfig)?;
        let mut driver = Self {
            history: MetricsHistory::new(config.retention.history_capacity),
            log: EventLog::new(config.retention.log_capacity),
            config,
            state: SimulationState::default(),
            status: SimulationStatus::Stopped,
            rng,
            sampler,
        };
        driver.reset();
        Ok(driver)
    }

    /// Create a driver seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if `config` does not validate.
    pub fn from_config(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::new(config, StdRng::from_os_rng(), MetricsSampler::from_os_rng())
    }

    /// Let the ticker advance the simulation.
    pub fn start(&mut self) {
        if self.status != SimulationStatus::Running {
            info!(run_id = %self.state.run_id, tick = self.state.tick, "simulation started");
        }
        self.status = SimulationStatus::Running;
    }

    /// Suspend ticking, keeping state.
    pub fn pause(&mut self) {
        if self.status == SimulationStatus::Running {
            info!(run_id = %self.state.run_id, tick = self.state.tick, "simulation paused");
            self.status = SimulationStatus::Paused;
        }
    }

    /// Suspend ticking and discard the run.
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Generate fresh threads, tasks and resources from the current configuration.
    ///
    /// History is cleared and the simulation is left stopped. The event log is kept.
    pub fn reset(&mut self) {
        self.status = SimulationStatus::Stopped;
        self.state = generate(&self.config, &mut self.rng);
        self.history.clear();
        info!(
            run_id = %self.state.run_id,
            threads = self.state.threads.len(),
            tasks = self.state.tasks.len(),
            resources = self.state.resources.len(),
            "simulation reset"
        );
        self.log.record(SimEvent::SimulationReset {
            threads: self.state.threads.len(),
            tasks: self.state.tasks.len(),
            resources: self.state.resources.len(),
        });
    }

    /// Apply exactly one tick, whatever the status.
    pub fn step(&mut self) -> TickReport {
        let outcome = advance(&self.state);
        self.state = outcome.state;
        self.log.record_all(outcome.events);
        let sample = self.sampler.sample(&self.state);
        self.history.push(sample.clone());
        debug!(
            tick = self.state.tick,
            completed = outcome.completed,
            cpu = sample.cpu_usage,
            memory = sample.memory_usage,
            "step recorded"
        );
        TickReport {
            tick: self.state.tick,
            completed: outcome.completed,
            sample,
        }
    }

    /// Apply one tick if the simulation is running.
    pub fn tick_if_running(&mut self) -> Option<TickReport> {
        (self.status == SimulationStatus::Running).then(|| self.step())
    }

    /// Apply a configuration change.
    ///
    /// Reset-class changes regenerate the workload and stop the simulation. A
    /// thread count change resizes the pool in place; a speed change only updates
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] and leaves everything untouched if
    /// the resulting configuration does not validate.
    pub fn apply_change(&mut self, change: ConfigChange) -> Result<ChangeEffect, SimulationError> {
        let (next, effect) = self
            .config
            .apply(change)
            .map_err(SimulationError::InvalidConfig)?;
        self.config = next;
        match effect {
            ChangeEffect::Reset => self.reset(),
            ChangeEffect::Rescale => self.rescale(),
            ChangeEffect::Cadence => {
                info!(speed_ms = self.config.simulation_speed_ms, "tick cadence changed");
            }
        }
        Ok(effect)
    }

    /// Resize the pool to `thread_count`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ThreadCountOutOfRange`] above the maximum pool size.
    pub fn set_thread_count(&mut self, thread_count: usize) -> Result<(), SimulationError> {
        if thread_count > MAX_THREAD_COUNT {
            return Err(SimulationError::ThreadCountOutOfRange {
                requested: i64::try_from(thread_count).unwrap_or(i64::MAX),
                max: MAX_THREAD_COUNT,
            });
        }
        self.apply_change(ConfigChange::ThreadCount(thread_count))
            .map(|_| ())
    }

    /// Change the tick period. Returns the new period.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] for a zero period.
    pub fn set_speed(&mut self, speed_ms: u64) -> Result<Duration, SimulationError> {
        self.apply_change(ConfigChange::SimulationSpeedMs(speed_ms))?;
        Ok(self.config.tick_period())
    }

    /// Apply an advisor's recommendation as a thread count change.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ThreadCountOutOfRange`] for negative or oversized
    /// counts; state is not touched in that case.
    pub fn accept_recommendation(
        &mut self,
        recommendation: &Recommendation,
    ) -> Result<usize, SimulationError> {
        let requested = recommendation.recommended_thread_count;
        let Ok(thread_count) = recommendation.thread_count(MAX_THREAD_COUNT) else {
            warn!(requested, max = MAX_THREAD_COUNT, "recommendation rejected");
            return Err(SimulationError::ThreadCountOutOfRange {
                requested,
                max: MAX_THREAD_COUNT,
            });
        };
        info!(thread_count, "applying recommended thread count");
        self.set_thread_count(thread_count)?;
        Ok(thread_count)
    }

    fn rescale(&mut self) {
        let outcome = resize(&self.state, self.config.thread_count);
        self.state = outcome.state;
        self.log.record_all(outcome.events);
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current state snapshot.
    #[must_use]
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Current run status.
    #[must_use]
    pub const fn status(&self) -> SimulationStatus {
        self.status
    }

    /// Whether the ticker should advance the simulation.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == SimulationStatus::Running
    }

    /// Current tick period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.config.tick_period()
    }

    /// Retained performance samples.
    #[must_use]
    pub const fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Event log.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Digest of the retained metrics window.
    #[must_use]
    pub fn history_digest(&self) -> HistoryDigest {
        HistoryDigest::from_history(&self.history)
    }

    /// Digest of the current pool.
    #[must_use]
    pub fn status_digest(&self) -> StatusDigest {
        StatusDigest::from_state(&self.state, &self.history)
    }

    /// Advisory request prefilled from the current digests.
    pub fn advisory_request(&self, application_needs: impl Into<String>) -> AdvisoryRequest {
        AdvisoryRequest::from_digests(
            &self.history_digest(),
            &self.status_digest(),
            application_needs,
        )
    }

    /// Headline statistics.
    #[must_use]
    pub fn stats(&self) -> SystemStats {
        SystemStats::compute(&self.state, &self.history, self.tick_period())
    }

    /// Read-only view of everything a dashboard renders.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            run_id: self.state.run_id,
            status: self.status,
            tick: self.state.tick,
            config: self.config.clone(),
            threads: self.state.threads.clone(),
            tasks: self.state.tasks.clone(),
            resources: self.state.resources.clone(),
            history: self.history.samples(),
            log: self.log.entries(),
            stats: self.stats(),
        }
    }
}
