//! Configuration models for the simulation, workload generation and retention.

pub mod simulation;

pub use simulation::{
    ConfigChange, ChangeEffect, PriorityDistribution, RetentionLimits, SimulationConfig,
    WorkloadProfile,
};
