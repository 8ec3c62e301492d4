//! Synthetic performance metrics derived from the simulation state.
//!
//! One [`PerformanceSample`] is taken per tick. CPU usage follows the share of
//! running threads, memory usage follows pool and backlog size; both carry a little
//! random jitter so the charts look alive. Jitter comes from a seedable RNG and can
//! be disabled for deterministic runs.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::state::SimulationState;
use crate::util::clock::{now_ms, wall_clock_label};

/// Upper bound of the additive CPU jitter, in percentage points.
const CPU_JITTER: f64 = 5.0;
/// Upper bound of the multiplicative memory jitter.
const MEMORY_JITTER: f64 = 0.1;
/// Memory percentage attributed to each thread.
const MEMORY_PER_THREAD: f64 = 0.1;
/// Memory percentage attributed to each task with work left.
const MEMORY_PER_TASK: f64 = 0.02;

/// Metrics recorded after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Wall-clock label (`HH:MM:SS`).
    pub label: String,
    /// Tick the sample was taken after.
    pub tick: u64,
    /// Simulated CPU usage in percent, one decimal.
    pub cpu_usage: f64,
    /// Simulated memory usage in percent, one decimal.
    pub memory_usage: f64,
    /// Tasks completed since the last reset.
    pub completed_tasks: u64,
}

/// Produces [`PerformanceSample`]s from post-tick state.
#[derive(Debug, Clone)]
pub struct MetricsSampler {
    rng: StdRng,
    jitter: bool,
}

impl MetricsSampler {
    /// Sampler with jitter seeded from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter: true,
        }
    }

    /// Sampler with jitter seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            jitter: true,
        }
    }

    /// Disable jitter; samples become a pure function of the state.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Sample `state`, labelled with the current wall-clock time.
    pub fn sample(&mut self, state: &SimulationState) -> PerformanceSample {
        self.sample_at(state, now_ms())
    }

    /// Sample `state`, labelled with `epoch_ms`.
    pub fn sample_at(&mut self, state: &SimulationState, epoch_ms: u128) -> PerformanceSample {
        let total = state.threads.len();
        let running = state.status_counts().running;
        let active = state.active_task_count();

        let cpu = if total == 0 {
            0.0
        } else {
            as_f64(running) / as_f64(total) * 100.0 + self.draw(CPU_JITTER)
        };
        let memory = (as_f64(total) * MEMORY_PER_THREAD + as_f64(active) * MEMORY_PER_TASK)
            * (1.0 + self.draw(MEMORY_JITTER));

        PerformanceSample {
            label: wall_clock_label(epoch_ms),
            tick: state.tick,
            cpu_usage: to_percent(cpu),
            memory_usage: to_percent(memory),
            completed_tasks: state.completed_tasks,
        }
    }

    fn draw(&mut self, upper: f64) -> f64 {
        if self.jitter {
            self.rng.random::<f64>() * upper
        } else {
            0.0
        }
    }
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(value: usize) -> f64 {
    value as f64
}

fn to_percent(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Bounded history of samples, oldest first.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
}

impl MetricsHistory {
    /// Empty history keeping at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: PerformanceSample) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Retained samples, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<PerformanceSample> {
        self.samples.iter().cloned().collect()
    }

    /// Iterate retained samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Completed tasks per second across the retained window.
    ///
    /// Returns 0 with fewer than two samples or a zero tick period.
    #[must_use]
    pub fn throughput(&self, tick_period: Duration) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let ticks = last.tick.saturating_sub(first.tick);
        if ticks == 0 || tick_period.is_zero() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let (done, ticks) = (
            last.completed_tasks.saturating_sub(first.completed_tasks) as f64,
            ticks as f64,
        );
        done / (ticks * tick_period.as_secs_f64())
    }

    /// Mean CPU usage over the window.
    #[must_use]
    pub fn average_cpu(&self) -> f64 {
        self.average(|s| s.cpu_usage)
    }

    /// Mean memory usage over the window.
    #[must_use]
    pub fn average_memory(&self) -> f64 {
        self.average(|s| s.memory_usage)
    }

    /// Highest CPU usage over the window.
    #[must_use]
    pub fn peak_cpu(&self) -> f64 {
        self.samples.iter().map(|s| s.cpu_usage).fold(0.0, f64::max)
    }

    /// Highest memory usage over the window.
    #[must_use]
    pub fn peak_memory(&self) -> f64 {
        self.samples.iter().map(|s| s.memory_usage).fold(0.0, f64::max)
    }

    fn average(&self, field: impl Fn(&PerformanceSample) -> f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(field).sum::<f64>() / as_f64(self.samples.len())
    }
}
