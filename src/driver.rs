//! Periodic refresh driver for one backend address.
//!
//! # Responsibilities
//! - Serialize `refresh` calls on a single timer
//! - Replace a unit after a fatal refresh, with jittered backoff
//! - Re-dial units that started in degraded mode
//! - Publish the current unit for lock-free readers
//!
//! # State Transitions
//! ```text
//! (none) ──connect──▶ unit ──tick: Ok──▶ unit
//!    ▲                 │
//!    └──backoff────────┘ tick: Err (evicted, closed)
//! ```

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::backend::{BackendUnit, ServerSnapshot};
use crate::config::{BackendUnitConfig, ProbeConfig};
use crate::lifecycle::shutdown;
use crate::report::Dialer;
use crate::resilience::Backoff;

/// Read side of a running driver.
#[derive(Debug, Clone, Default)]
pub struct UnitWatch {
    slot: Arc<ArcSwapOption<BackendUnit>>,
}

impl UnitWatch {
    /// Unit currently in service, if any.
    pub fn current(&self) -> Option<Arc<BackendUnit>> {
        self.slot.load_full()
    }

    pub fn snapshot(&self) -> Option<ServerSnapshot> {
        self.slot.load_full().map(|unit| unit.snapshot())
    }
}

/// Keeps one backend unit refreshed until shutdown.
pub struct RefreshDriver<D> {
    dialer: D,
    target: String,
    address: String,
    unit_config: BackendUnitConfig,
    interval: Duration,
    backoff: Backoff,
    watch: UnitWatch,
}

impl<D: Dialer> RefreshDriver<D> {
    pub fn new(dialer: D, probe: &ProbeConfig, unit_config: BackendUnitConfig) -> Self {
        Self {
            dialer,
            target: probe.target.clone(),
            address: probe.address.clone(),
            unit_config,
            interval: probe.interval(),
            backoff: Backoff::new(probe.backoff_base_ms, probe.backoff_max_ms),
            watch: UnitWatch::default(),
        }
    }

    pub fn watch(&self) -> UnitWatch {
        self.watch.clone()
    }

    /// Run until `shutdown` fires. The unit in service is closed on exit.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            service = %self.target,
            address = %self.address,
            interval = ?self.interval,
            "Refresh driver starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);

        loop {
            if self.watch.current().is_none() {
                let retry = tokio::select! {
                    delay = self.install_unit() => delay,
                    _ = shutdown::wait_for(&mut shutdown) => break,
                };
                if let Some(delay) = retry {
                    tokio::select! {
                        _ = time::sleep(delay) => continue,
                        _ = shutdown::wait_for(&mut shutdown) => break,
                    }
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown::wait_for(&mut shutdown) => break,
            }

            let backoff = tokio::select! {
                delay = self.tick() => delay,
                _ = shutdown::wait_for(&mut shutdown) => break,
            };
            if let Some(delay) = backoff {
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = shutdown::wait_for(&mut shutdown) => break,
                }
            }
        }

        if let Some(unit) = self.watch.slot.swap(None) {
            let _ = unit.close();
        }
        tracing::info!(address = %self.address, "Refresh driver stopped");
    }

    /// Connect a fresh unit. Returns the delay to wait on failure.
    async fn install_unit(&mut self) -> Option<Duration> {
        match self.connect().await {
            Some(unit) => {
                self.backoff.reset();
                self.watch.slot.store(Some(Arc::new(unit)));
                None
            }
            None => {
                let delay = self.backoff.next_delay();
                tracing::debug!(
                    address = %self.address,
                    attempt = self.backoff.attempt(),
                    delay = ?delay,
                    "Retrying backend connect"
                );
                Some(delay)
            }
        }
    }

    async fn connect(&self) -> Option<BackendUnit> {
        match BackendUnit::connect_with(
            &self.dialer,
            self.target.as_str(),
            self.address.as_str(),
            &self.unit_config,
        )
        .await
        {
            Ok(unit) => Some(unit),
            Err(e) => {
                tracing::warn!(address = %self.address, error = %e, "Backend rejected");
                None
            }
        }
    }

    /// One refresh cycle. Returns the backoff to wait after an eviction.
    async fn tick(&mut self) -> Option<Duration> {
        let unit = self.watch.current()?;

        if !unit.is_connected() {
            if let Some(replacement) = self.connect().await {
                if replacement.is_connected() {
                    tracing::info!(address = %self.address, "Degraded backend became reachable");
                    self.watch.slot.store(Some(Arc::new(replacement)));
                }
            }
            return None;
        }

        let err = unit.refresh().await.err()?;
        self.watch.slot.store(None);
        let _ = unit.close();

        let delay = self.backoff.next_delay();
        tracing::warn!(
            address = %self.address,
            error = %err,
            attempt = self.backoff.attempt(),
            delay = ?delay,
            "Evicting backend unit"
        );
        Some(delay)
    }
}
