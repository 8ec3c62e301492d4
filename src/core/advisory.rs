//! Thread count advisory boundary.
//!
//! The simulation exposes two plain-text digests of its metrics, a validated request
//! type and the [`ThreadAdvisor`] trait. Whatever sits behind the trait (a language
//! model, a heuristic, a test double) only ever returns a [`Recommendation`]; applying
//! it is a normal thread count change made by the driver.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::simulation::MAX_THREAD_COUNT;
use crate::core::error::{AdvisoryError, FieldError};
use crate::core::metrics::MetricsHistory;
use crate::core::state::{SimulationState, StatusCounts};

/// Minimum length of the application needs description.
pub const MIN_NEEDS_LEN: usize = 10;

/// Summary of the retained metrics window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDigest {
    /// Number of samples summarized.
    pub samples: usize,
    /// Mean CPU usage in percent.
    pub average_cpu: f64,
    /// Highest CPU usage in percent.
    pub peak_cpu: f64,
    /// Mean memory usage in percent.
    pub average_memory: f64,
    /// Highest memory usage in percent.
    pub peak_memory: f64,
    /// Completed task count at the newest sample.
    pub completed_tasks: u64,
}

impl HistoryDigest {
    /// Summarize `history`.
    #[must_use]
    pub fn from_history(history: &MetricsHistory) -> Self {
        Self {
            samples: history.len(),
            average_cpu: round1(history.average_cpu()),
            peak_cpu: round1(history.peak_cpu()),
            average_memory: round1(history.average_memory()),
            peak_memory: round1(history.peak_memory()),
            completed_tasks: history.latest().map_or(0, |s| s.completed_tasks),
        }
    }
}

impl fmt::Display for HistoryDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.samples == 0 {
            return write!(f, "No load history recorded yet.");
        }
        write!(
            f,
            "Over the last {} samples: average CPU usage {:.1}% (peak {:.1}%), average memory usage {:.1}% (peak {:.1}%), {} tasks completed.",
            self.samples,
            self.average_cpu,
            self.peak_cpu,
            self.average_memory,
            self.peak_memory,
            self.completed_tasks
        )
    }
}

/// Snapshot of the current pool and its latest usage figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDigest {
    /// Threads per status.
    pub counts: StatusCounts,
    /// Share of threads Running, in percent.
    pub running_pct: f64,
    /// Share of threads Waiting, in percent.
    pub waiting_pct: f64,
    /// Share of threads Idle, in percent.
    pub idle_pct: f64,
    /// Share of threads Terminating, in percent.
    pub terminating_pct: f64,
    /// Latest CPU usage in percent.
    pub cpu_usage: f64,
    /// Latest memory usage in percent.
    pub memory_usage: f64,
}

impl StatusDigest {
    /// Digest `state`, taking usage figures from the newest sample in `history`.
    #[must_use]
    pub fn from_state(state: &SimulationState, history: &MetricsHistory) -> Self {
        let counts = state.status_counts();
        let share = |n: usize| percent_of(n, counts.total());
        let latest = history.latest();
        Self {
            counts,
            running_pct: share(counts.running),
            waiting_pct: share(counts.waiting),
            idle_pct: share(counts.idle),
            terminating_pct: share(counts.terminating),
            cpu_usage: latest.map_or(0.0, |s| s.cpu_usage),
            memory_usage: latest.map_or(0.0, |s| s.memory_usage),
        }
    }
}

impl fmt::Display for StatusDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} threads: {} running ({:.1}%), {} waiting ({:.1}%), {} idle ({:.1}%), {} terminating ({:.1}%). CPU usage {:.1}%, memory usage {:.1}%.",
            self.counts.total(),
            self.counts.running,
            self.running_pct,
            self.counts.waiting,
            self.waiting_pct,
            self.counts.idle,
            self.idle_pct,
            self.counts.terminating,
            self.terminating_pct,
            self.cpu_usage,
            self.memory_usage
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(part as f64 / total as f64 * 100.0)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Input to a [`ThreadAdvisor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    /// Load history, free text.
    pub historical_load_data: String,
    /// Current usage figures, free text.
    pub current_usage_metrics: String,
    /// What the application needs, free text.
    pub application_needs: String,
}

impl AdvisoryRequest {
    /// Build a request from raw text fields.
    pub fn new(
        historical_load_data: impl Into<String>,
        current_usage_metrics: impl Into<String>,
        application_needs: impl Into<String>,
    ) -> Self {
        Self {
            historical_load_data: historical_load_data.into(),
            current_usage_metrics: current_usage_metrics.into(),
            application_needs: application_needs.into(),
        }
    }

    /// Build a request whose metric fields are rendered from the digests.
    pub fn from_digests(
        history: &HistoryDigest,
        status: &StatusDigest,
        application_needs: impl Into<String>,
    ) -> Self {
        Self::new(history.to_string(), status.to_string(), application_needs)
    }

    /// Check every field, collecting one message per offending field.
    pub fn validate(&self) -> Result<(), AdvisoryError> {
        let mut errors = Vec::new();
        if self.historical_load_data.is_empty() {
            errors.push(FieldError::new(
                "historical_load_data",
                "Please provide more detailed historical data.",
            ));
        }
        if self.current_usage_metrics.is_empty() {
            errors.push(FieldError::new(
                "current_usage_metrics",
                "Please provide more detailed current metrics.",
            ));
        }
        if self.application_needs.chars().count() < MIN_NEEDS_LEN {
            errors.push(FieldError::new(
                "application_needs",
                "Please describe application needs in more detail.",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdvisoryError::InvalidInput(errors))
        }
    }
}

/// Advisor output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Suggested pool size. Signed so out-of-range answers can be reported.
    pub recommended_thread_count: i64,
    /// Free-text justification, passed through untouched.
    pub reasoning: String,
}

impl Recommendation {
    /// Recommended count as a pool size, if it lies within `0..=max`.
    pub fn thread_count(&self, max: usize) -> Result<usize, AdvisoryError> {
        usize::try_from(self.recommended_thread_count)
            .ok()
            .filter(|&n| n <= max)
            .ok_or(AdvisoryError::InvalidRecommendation(self.recommended_thread_count))
    }
}

/// Source of thread count recommendations.
///
/// Implementations may be slow or fail; callers must not hold simulation locks
/// across [`ThreadAdvisor::recommend`].
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_pool_sim::core::{AdvisoryError, AdvisoryRequest, Recommendation, ThreadAdvisor};
///
/// struct Fixed(i64);
///
/// #[async_trait]
/// impl ThreadAdvisor for Fixed {
///     async fn recommend(&self, _request: AdvisoryRequest) -> Result<Recommendation, AdvisoryError> {
///         Ok(Recommendation { recommended_thread_count: self.0, reasoning: "fixed".into() })
///     }
/// }
/// ```
#[async_trait]
pub trait ThreadAdvisor: Send + Sync {
    /// Produce a recommendation for an already validated request.
    async fn recommend(&self, request: AdvisoryRequest) -> Result<Recommendation, AdvisoryError>;
}

/// Validate `request`, then ask `advisor`.
///
/// Invalid requests never reach the advisor. Counts outside `0..=MAX_THREAD_COUNT`
/// are rejected as [`AdvisoryError::InvalidRecommendation`].
pub async fn advise<A>(advisor: &A, request: AdvisoryRequest) -> Result<Recommendation, AdvisoryError>
where
    A: ThreadAdvisor + ?Sized,
{
    request.validate()?;
    let recommendation = advisor.recommend(request).await?;
    recommendation.thread_count(MAX_THREAD_COUNT)?;
    Ok(recommendation)
}
