//! # Prometheus Pool Sim
//!
//! A discrete-tick simulation of a thread pool scheduling prioritized tasks onto
//! worker threads that contend for shared, lockable resources.
//!
//! Each tick runs four phases over an immutable snapshot and produces a new one:
//! progress, removal of drained threads, resource hand-off and dispatch. The pool can
//! be resized between ticks; busy threads removed by a scale-down finish their current
//! task before they leave.
//!
//! ## Key Features
//!
//! - **Pure tick engine**: `core::advance` never mutates its input and never fails
//! - **FIFO resource queues**: a released resource goes to the oldest waiter
//! - **Priority dispatch**: High before Medium before Low, creation order within a class
//! - **Graceful scale-down**: idle threads leave at once, busy threads drain
//! - **Synthetic metrics**: CPU/memory samples with seedable jitter, bounded history
//! - **Event log**: bounded, newest-first narration of every transition
//! - **Advisory boundary**: metric digests out, a recommended thread count in
//!
//! ## Driving a simulation
//!
//! ```rust,ignore
//! use prometheus_pool_sim::builders::SimulationBuilder;
//! use prometheus_pool_sim::config::SimulationConfig;
//!
//! let mut driver = SimulationBuilder::new(
//!     SimulationConfig::new()
//!         .with_thread_count(8)
//!         .with_task_count(50)
//!         .with_resource_count(2),
//! )
//! .with_seed(7)
//! .build()?;
//!
//! driver.start();
//! while !driver.state().is_drained() {
//!     driver.step();
//! }
//! driver.set_thread_count(4)?;
//! println!("{}", driver.snapshot().to_json()?);
//! ```
//!
//! ## Running on tokio
//!
//! ```rust,ignore
//! use prometheus_pool_sim::runtime::{spawn_ticker, SimulationHandle};
//!
//! let handle = SimulationHandle::new(driver);
//! let ticker = spawn_ticker(handle.clone());
//! handle.start();
//! // ...
//! ticker.shutdown().await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Simulation core: state, tick engine, scaler, metrics, event log and advisory types.
pub mod core;
/// Configuration models for the simulation.
pub mod config;
/// Builders to construct simulation drivers from configuration.
pub mod builders;
/// Driver, ticker and dashboard-facing models.
pub mod runtime;
/// Shared utilities.
pub mod util;
