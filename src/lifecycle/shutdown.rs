//! Process-wide stop signal.
//!
//! Ctrl+C/SIGTERM (or a test harness) fires it once; the HTTP server stops
//! accepting, lets in-flight proxy exchanges finish and returns.

use tokio::sync::broadcast;

/// Stop signal shared by the signal listener and the HTTP server.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for one listener. Receivers created after `trigger` never
    /// see the signal, so subscribe before serving.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with nobody listening");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the signal fires, or once every `Shutdown` handle is gone.
pub async fn stopped(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}
