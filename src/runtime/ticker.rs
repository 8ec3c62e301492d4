//! Tokio ticker: advances a shared driver once per tick period.
//!
//! A single task owns a `tokio::time::Interval`. The period is published on a
//! `watch` channel; when it changes the interval is rebuilt before the next tick, so
//! ticks never overlap and a tick is never re-entered. The driver lock is only held
//! for the synchronous duration of one tick or one control call.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ChangeEffect, ConfigChange};
use crate::core::{advise, AdvisoryError, AppResult, Recommendation, SimulationError, ThreadAdvisor};
use crate::runtime::api::DashboardSnapshot;
use crate::runtime::driver::SimulationDriver;

/// Cloneable handle to a driver shared with a ticker.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    driver: Arc<Mutex<SimulationDriver>>,
    cadence: Arc<watch::Sender<Duration>>,
}

impl SimulationHandle {
    /// Wrap `driver` for shared use.
    #[must_use]
    pub fn new(driver: SimulationDriver) -> Self {
        let (cadence, _) = watch::channel(driver.tick_period());
        Self {
            driver: Arc::new(Mutex::new(driver)),
            cadence: Arc::new(cadence),
        }
    }

    /// Run `f` with exclusive access to the driver, then publish the tick period
    /// if `f` changed it.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut SimulationDriver) -> R) -> R {
        let (result, period) = {
            let mut driver = self.driver.lock();
            let result = f(&mut *driver);
            (result, driver.tick_period())
        };
        self.cadence.send_if_modified(|current| {
            if *current == period {
                false
            } else {
                *current = period;
                true
            }
        });
        result
    }

    /// Receiver for tick period changes.
    #[must_use]
    pub fn subscribe_cadence(&self) -> watch::Receiver<Duration> {
        self.cadence.subscribe()
    }

    /// Start ticking.
    pub fn start(&self) {
        self.with_driver(SimulationDriver::start);
    }

    /// Pause ticking.
    pub fn pause(&self) {
        self.with_driver(SimulationDriver::pause);
    }

    /// Stop and reset.
    pub fn stop(&self) {
        self.with_driver(SimulationDriver::stop);
    }

    /// Apply a configuration change.
    ///
    /// # Errors
    ///
    /// See [`SimulationDriver::apply_change`].
    pub fn apply_change(&self, change: ConfigChange) -> Result<ChangeEffect, SimulationError> {
        self.with_driver(|driver| driver.apply_change(change))
    }

    /// Read-only snapshot.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.with_driver(|driver| driver.snapshot())
    }

    /// Ask `advisor` for a thread count based on the current digests.
    ///
    /// The driver lock is released before the advisor is awaited, so the ticker
    /// keeps running meanwhile. Failures are logged and returned; state is never
    /// touched here.
    ///
    /// # Errors
    ///
    /// Validation, service and out-of-range failures as [`AdvisoryError`].
    pub async fn request_recommendation<A>(
        &self,
        advisor: &A,
        application_needs: impl Into<String>,
    ) -> Result<Recommendation, AdvisoryError>
    where
        A: ThreadAdvisor + ?Sized,
    {
        let request = self.with_driver(|driver| driver.advisory_request(application_needs));
        match advise(advisor, request).await {
            Ok(recommendation) => {
                info!(
                    recommended = recommendation.recommended_thread_count,
                    "recommendation received"
                );
                Ok(recommendation)
            }
            Err(err) => {
                warn!(error = %err, "advisory request failed");
                Err(err)
            }
        }
    }

    /// Apply a recommendation to the shared driver.
    ///
    /// # Errors
    ///
    /// See [`SimulationDriver::accept_recommendation`].
    pub fn accept_recommendation(&self, recommendation: &Recommendation) -> Result<usize, SimulationError> {
        self.with_driver(|driver| driver.accept_recommendation(recommendation))
    }
}

/// Control handle of a spawned ticker task.
#[derive(Debug)]
pub struct TickerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl TickerHandle {
    /// Stop the ticker between ticks and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Fails if the ticker task panicked or was cancelled.
    pub async fn shutdown(self) -> AppResult<()> {
        // The task may already be gone; joining reports why.
        let _ = self.shutdown.send(());
        self.join
            .await
            .map_err(|e| SimulationError::Ticker(e.to_string()).into())
    }
}

/// Spawn the ticker task on the current tokio runtime.
///
/// Each period the task calls [`SimulationDriver::tick_if_running`]. The first tick
/// fires one full period after spawning.
#[must_use]
pub fn spawn_ticker(handle: SimulationHandle) -> TickerHandle {
    let mut cadence = handle.subscribe_cadence();
    let (shutdown, mut shutdown_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut period = *cadence.borrow_and_update();
        let mut interval = build_interval(period);
        info!(period_ms = period.as_millis(), "ticker started");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                changed = cadence.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    period = *cadence.borrow_and_update();
                    interval = build_interval(period);
                    debug!(period_ms = period.as_millis(), "ticker cadence rebuilt");
                }
                _ = interval.tick() => {
                    if let Some(report) = handle.with_driver(SimulationDriver::tick_if_running) {
                        debug!(tick = report.tick, completed = report.completed, "ticker advanced");
                    }
                }
            }
        }

        info!("ticker stopped");
    });

    TickerHandle { shutdown, join }
}

fn build_interval(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
