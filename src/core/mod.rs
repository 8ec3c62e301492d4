//! Simulation core: entity graph, tick engine, pool scaler and observability.

pub mod advisory;
pub mod error;
pub mod event_log;
pub mod metrics;
pub mod scaler;
pub mod state;
pub mod tick;
pub mod workload;

pub use advisory::{
    advise, AdvisoryRequest, HistoryDigest, Recommendation, StatusDigest, ThreadAdvisor,
};
pub use error::{AdvisoryError, AppResult, FieldError, SimulationError};
pub use event_log::{EventLog, LogEntry, Severity, SimEvent};
pub use metrics::{MetricsHistory, MetricsSampler, PerformanceSample};
pub use scaler::{resize, ScaleOutcome};
pub use state::{
    InvariantViolation, Resource, SimulationState, StatusCounts, Task, Thread, ThreadStatus,
};
pub use tick::{advance, TickOutcome};
pub use workload::generate;
