//! Scripted transport used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tonic::Status;

use super::{DialError, Dialer, LoadReporter};

/// Replays a fixed sequence of load report results.
#[derive(Default)]
pub struct ScriptedReporter {
    script: Mutex<VecDeque<Result<i64, Status>>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedReporter {
    pub fn new(script: impl IntoIterator<Item = Result<i64, Status>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Reporter whose every call takes `delay` before answering.
    pub fn slow(
        delay: Duration,
        script: impl IntoIterator<Item = Result<i64, Status>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            delay: Mutex::new(Some(delay)),
            calls: AtomicUsize::new(0),
        })
    }

    /// Make every later call take `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn push(&self, result: Result<i64, Status>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoadReporter for ScriptedReporter {
    async fn load(&self) -> Result<i64, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Status::unavailable("script exhausted")))
    }
}

/// Hands out prepared reporters; `None` entries simulate unreachable backends.
#[derive(Default)]
pub struct ScriptedDialer {
    outcomes: Mutex<VecDeque<Option<Arc<ScriptedReporter>>>>,
    dials: AtomicUsize,
}

impl ScriptedDialer {
    pub fn new(outcomes: impl IntoIterator<Item = Option<Arc<ScriptedReporter>>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            dials: AtomicUsize::new(0),
        }
    }

    pub fn reachable(reporter: Arc<ScriptedReporter>) -> Self {
        Self::new([Some(reporter)])
    }

    pub fn unreachable() -> Self {
        Self::new([None])
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn LoadReporter>, DialError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front().flatten();
        match next {
            Some(reporter) => Ok(reporter as Arc<dyn LoadReporter>),
            None => Err(DialError::Timeout {
                address: address.to_string(),
                timeout,
            }),
        }
    }
}
