//! Driver, tokio ticker and dashboard-facing models.

pub mod api;
pub mod driver;
#[cfg(feature = "tokio-runtime")]
pub mod ticker;

pub use api::{DashboardSnapshot, SystemStats};
pub use driver::{SimulationDriver, SimulationStatus, TickReport};
#[cfg(feature = "tokio-runtime")]
pub use ticker::{spawn_ticker, SimulationHandle, TickerHandle};
