//! Backend unit.
//!
//! # Responsibilities
//! - Own the load report connection of a single backend
//! - Store the last reported score (lock-free reads)
//! - Count consecutive report failures and decide when to give up

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;
use tonic::Status;

use crate::backend::classify::{classify, Decision};
use crate::backend::error::BackendError;
use crate::config::BackendUnitConfig;
use crate::observability::metrics;
use crate::report::{Dialer, GrpcDialer, LoadReporter};

/// Connection state of a unit.
pub enum UnitState {
    /// Reporting channel is up.
    Connected(Arc<dyn LoadReporter>),
    /// Initial dial failed; the unit is inert and keeps its initial score.
    Disconnected,
    /// `close` released the connection.
    Closed,
}

impl fmt::Debug for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Connected(_) => f.write_str("Connected"),
            UnitState::Disconnected => f.write_str("Disconnected"),
            UnitState::Closed => f.write_str("Closed"),
        }
    }
}

/// Public view of a backend, as advertised to balancer clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSnapshot {
    pub address: String,
    pub score: i64,
}

/// Tracks the load score of one backend address.
///
/// `score` and `snapshot` may be called from any thread at any time.
/// `refresh` must be driven by a single caller; overlapping refreshes of the
/// same unit race on the failure counter.
pub struct BackendUnit {
    target: String,
    address: String,
    state: ArcSwap<UnitState>,
    score: AtomicI64,
    max_failures: u32,
    failures: AtomicU32,
    report_timeout: Option<Duration>,
}

impl BackendUnit {
    /// Dial `address` over gRPC and fetch the first score.
    pub async fn connect(
        target: impl Into<String>,
        address: impl Into<String>,
        config: &BackendUnitConfig,
    ) -> Result<Self, BackendError> {
        Self::connect_with(&GrpcDialer::new(), target, address, config).await
    }

    /// Like [`connect`](Self::connect) with a custom transport.
    ///
    /// An unreachable backend still yields a unit, in degraded mode. Only a
    /// backend that accepts the connection but fails its first report with a
    /// fatal error is rejected.
    pub async fn connect_with<D: Dialer + ?Sized>(
        dialer: &D,
        target: impl Into<String>,
        address: impl Into<String>,
        config: &BackendUnitConfig,
    ) -> Result<Self, BackendError> {
        let target = target.into();
        let address = address.into();

        tracing::info!(service = %target, address = %address, "Connecting to load reporter");
        let state = match dialer.dial(&address, config.dial_timeout()).await {
            Ok(reporter) => UnitState::Connected(reporter),
            Err(e) => {
                tracing::info!(
                    service = %target,
                    address = %address,
                    error = %e,
                    "Can't connect to load reporter"
                );
                metrics::record_dial_failure(&address);
                UnitState::Disconnected
            }
        };
        let connected = matches!(state, UnitState::Connected(_));

        let unit = Self {
            target,
            address,
            state: ArcSwap::from_pointee(state),
            score: AtomicI64::new(0),
            max_failures: config.max_failures,
            failures: AtomicU32::new(0),
            report_timeout: config.report_timeout(),
        };

        if connected {
            if let Err(e) = unit.refresh().await {
                unit.close()?;
                return Err(e);
            }
        }

        Ok(unit)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Last successfully reported score, 0 if none.
    pub fn score(&self) -> i64 {
        self.score.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            address: self.address.clone(),
            score: self.score(),
        }
    }

    /// Consecutive failures since the last successful report.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn is_connected(&self) -> bool {
        matches!(**self.state.load(), UnitState::Connected(_))
    }

    /// Fetch a fresh score from the backend.
    ///
    /// `Ok(())` means the backend stays in service, possibly with its old
    /// score. `Err` means it must be evicted.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        let reporter = match &**self.state.load() {
            UnitState::Connected(reporter) => reporter.clone(),
            UnitState::Disconnected => return Ok(()),
            UnitState::Closed => {
                return self.handle_error(BackendError::ConnectionClosing {
                    address: self.address.clone(),
                })
            }
        };

        let result = match self.report_timeout {
            Some(timeout) => tokio::time::timeout(timeout, reporter.load())
                .await
                .unwrap_or_else(|_| {
                    Err(Status::deadline_exceeded(format!(
                        "load report timed out after {timeout:?}"
                    )))
                }),
            None => reporter.load().await,
        };

        match result {
            Ok(score) => {
                self.failures.store(0, Ordering::Relaxed);
                self.score.store(score, Ordering::Relaxed);
                metrics::record_score(&self.address, score);
                tracing::debug!(service = %self.target, address = %self.address, score, "Load score updated");
                Ok(())
            }
            Err(status) => self.handle_error(BackendError::Report {
                address: self.address.clone(),
                status,
            }),
        }
    }

    /// Release the connection. The unit must not be refreshed afterwards.
    pub fn close(&self) -> Result<(), BackendError> {
        if !self.is_connected() {
            return Ok(());
        }

        let previous = self.state.swap(Arc::new(UnitState::Closed));
        drop(previous);
        tracing::debug!(service = %self.target, address = %self.address, "Load reporter connection closed");
        Ok(())
    }

    fn handle_error(&self, err: BackendError) -> Result<(), BackendError> {
        let (decision, failures) = classify(
            err.kind(),
            err.detail(),
            self.failures.load(Ordering::Relaxed),
            self.max_failures,
        );
        self.failures.store(failures, Ordering::Relaxed);

        if decision == Decision::Ignore {
            tracing::debug!(
                service = %self.target,
                address = %self.address,
                "Backend does not implement load reporting"
            );
            return Ok(());
        }

        metrics::record_report_error(&self.address, decision);
        tracing::warn!(
            service = %self.target,
            address = %self.address,
            failures,
            decision = decision.as_str(),
            error = %err,
            "Error retrieving load score"
        );

        if decision.is_fatal() {
            Err(err)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for BackendUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendUnit")
            .field("target", &self.target)
            .field("address", &self.address)
            .field("state", &**self.state.load())
            .field("score", &self.score())
            .field("failures", &self.failures())
            .field("max_failures", &self.max_failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::mock::{ScriptedDialer, ScriptedReporter};

    const ADDR: &str = "10.0.0.7:9000";

    async fn connected(
        script: impl IntoIterator<Item = Result<i64, Status>>,
        max_failures: u32,
    ) -> (BackendUnit, Arc<ScriptedReporter>) {
        let reporter = ScriptedReporter::new(script);
        let dialer = ScriptedDialer::reachable(reporter.clone());
        let config = BackendUnitConfig::with_max_failures(max_failures);
        let unit = BackendUnit::connect_with(&dialer, "search", ADDR, &config)
            .await
            .unwrap();
        (unit, reporter)
    }

    #[tokio::test]
    async fn test_connect_fetches_first_score() {
        let (unit, reporter) = connected([Ok(17)], 0).await;
        assert!(unit.is_connected());
        assert_eq!(unit.score(), 17);
        assert_eq!(reporter.calls(), 1);
        assert_eq!(unit.target(), "search");
        assert_eq!(
            unit.snapshot(),
            ServerSnapshot {
                address: ADDR.into(),
                score: 17
            }
        );
    }

    #[tokio::test]
    async fn test_successful_refresh_stores_score_and_resets_failures() {
        let (unit, reporter) = connected([Ok(1)], 5).await;

        reporter.push(Err(Status::deadline_exceeded("slow")));
        unit.refresh().await.unwrap();
        assert_eq!(unit.failures(), 1);
        assert_eq!(unit.score(), 1);

        reporter.push(Ok(-3));
        unit.refresh().await.unwrap();
        assert_eq!(unit.score(), -3);
        assert_eq!(unit.failures(), 0);
    }

    #[tokio::test]
    async fn test_unimplemented_keeps_score_and_failures() {
        let (unit, reporter) = connected([Ok(40)], 3).await;
        reporter.push(Err(Status::aborted("retry")));
        reporter.push(Err(Status::aborted("retry")));
        unit.refresh().await.unwrap();
        unit.refresh().await.unwrap();

        reporter.push(Err(Status::unimplemented("no LoadReport")));
        unit.refresh().await.unwrap();
        assert_eq!(unit.score(), 40);
        assert_eq!(unit.failures(), 2);
    }

    #[tokio::test]
    async fn test_unimplemented_backend_is_accepted() {
        let (unit, _) = connected([Err(Status::unimplemented("no LoadReport"))], 1).await;
        assert!(unit.is_connected());
        assert_eq!(unit.score(), 0);
    }

    #[tokio::test]
    async fn test_third_consecutive_recoverable_error_is_fatal() {
        let (unit, reporter) = connected([Ok(5)], 3).await;
        for _ in 0..3 {
            reporter.push(Err(Status::deadline_exceeded("timeout")));
        }

        assert!(unit.refresh().await.is_ok());
        assert!(unit.refresh().await.is_ok());
        let err = unit.refresh().await.unwrap_err();
        assert!(matches!(err, BackendError::Report { ref status, .. } if status.code() == tonic::Code::DeadlineExceeded));
        assert_eq!(unit.score(), 5);
    }

    #[tokio::test]
    async fn test_success_restarts_failure_budget() {
        let (unit, reporter) = connected([Ok(5)], 3).await;
        reporter.push(Err(Status::resource_exhausted("busy")));
        reporter.push(Err(Status::resource_exhausted("busy")));
        reporter.push(Ok(6));
        reporter.push(Err(Status::resource_exhausted("busy")));
        reporter.push(Err(Status::resource_exhausted("busy")));

        for _ in 0..5 {
            unit.refresh().await.unwrap();
        }
        assert_eq!(unit.score(), 6);
        assert_eq!(unit.failures(), 2);
    }

    #[tokio::test]
    async fn test_cancel_due_to_closing_is_fatal_immediately() {
        let (unit, reporter) = connected([Ok(5)], 0).await;
        reporter.push(Err(Status::cancelled("grpc: the client connection is closing")));
        assert!(unit.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_unclassified_error_is_fatal() {
        let (unit, reporter) = connected([Ok(5)], 10).await;
        reporter.push(Err(Status::unavailable("connection reset")));
        assert!(unit.refresh().await.is_err());
        assert_eq!(unit.failures(), 1);
    }

    #[tokio::test]
    async fn test_fatal_first_report_rejects_backend() {
        let reporter = ScriptedReporter::new([Err(Status::internal("boom"))]);
        let dialer = ScriptedDialer::reachable(reporter);
        let err = BackendUnit::connect_with(&dialer, "search", ADDR, &BackendUnitConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.address(), ADDR);
    }

    #[tokio::test]
    async fn test_recoverable_first_report_is_tolerated() {
        let (unit, _) = connected([Err(Status::deadline_exceeded("slow"))], 3).await;
        assert_eq!(unit.failures(), 1);
        assert_eq!(unit.score(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_degraded() {
        let dialer = ScriptedDialer::unreachable();
        let unit = BackendUnit::connect_with(&dialer, "search", ADDR, &BackendUnitConfig::default())
            .await
            .unwrap();

        assert!(!unit.is_connected());
        assert_eq!(dialer.dials(), 1);
        for _ in 0..5 {
            unit.refresh().await.unwrap();
        }
        assert_eq!(unit.score(), 0);
        assert_eq!(unit.failures(), 0);
        assert!(unit.close().is_ok());
        assert!(unit.refresh().await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_after_close_is_fatal() {
        let (unit, reporter) = connected([Ok(9)], 3).await;
        unit.close().unwrap();
        assert!(unit.close().is_ok());

        let err = unit.refresh().await.unwrap_err();
        assert!(matches!(err, BackendError::ConnectionClosing { .. }));
        assert_eq!(reporter.calls(), 1);
        assert_eq!(unit.score(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_timeout_counts_as_recoverable() {
        let reporter = ScriptedReporter::slow(Duration::from_secs(5), [Ok(1), Ok(2), Ok(3)]);
        let dialer = ScriptedDialer::reachable(reporter);
        let config = BackendUnitConfig {
            max_failures: 2,
            report_timeout_ms: Some(100),
            ..BackendUnitConfig::default()
        };

        let unit = BackendUnit::connect_with(&dialer, "search", ADDR, &config)
            .await
            .unwrap();
        assert_eq!(unit.failures(), 1);

        let err = unit.refresh().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_scores_visible_across_threads() {
        let (unit, reporter) = connected([Ok(1)], 0).await;
        let unit = Arc::new(unit);
        reporter.push(Ok(99));

        let reader = {
            let unit = unit.clone();
            tokio::spawn(async move {
                let score = unit.score();
                assert!(score == 1 || score == 99);
            })
        };
        unit.refresh().await.unwrap();
        reader.await.unwrap();
        assert_eq!(unit.score(), 99);
    }
}
