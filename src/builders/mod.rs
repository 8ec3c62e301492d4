//! Builders to construct simulation drivers from configuration.

pub mod simulation_builder;

pub use simulation_builder::SimulationBuilder;
