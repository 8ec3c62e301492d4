//! Serializable identifier and priority types shared across the crate.

use serde::{Deserialize, Serialize};

/// Identifier of a simulated worker thread. Assigned monotonically, never reused.
pub type ThreadId = u64;

/// Identifier of a simulated task, unique within one simulation run.
pub type TaskId = u64;

/// Identifier of a shared resource (e.g. `"Resource A"`).
pub type ResourceId = String;

/// Scheduling priority of a task.
///
/// Variants are declared lowest first so the derived ordering reads naturally:
/// `Priority::High > Priority::Medium > Priority::Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    /// Dispatched after everything else.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Dispatched first.
    High,
}

impl Priority {
    /// Human-readable label used in event narrations.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
