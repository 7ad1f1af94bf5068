//! Shutdown coordination.

use tokio::sync::watch;

/// One-shot shutdown flag observed by long-running tasks.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Receiver that resolves `changed()` once shutdown is triggered.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until `rx` observes shutdown. Also returns if the sender is gone.
pub async fn wait_for(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|triggered| *triggered).await;
}
