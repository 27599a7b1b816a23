use tokio::sync::broadcast;
use tracing::debug;

/// Receives the page path whose cached render is stale after a mutation.
///
/// Calls are fire-and-forget and may repeat for the same path.
pub trait Revalidator: Send + Sync {
    fn revalidate(&self, path: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogRevalidator;

impl Revalidator for LogRevalidator {
    fn revalidate(&self, path: &str) {
        debug!(path, "revalidate");
    }
}

/// Fans paths out to in-process subscribers (page caches, SSE pushers).
#[derive(Debug, Clone)]
pub struct BroadcastRevalidator {
    tx: broadcast::Sender<String>,
}

impl BroadcastRevalidator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Revalidator for BroadcastRevalidator {
    fn revalidate(&self, path: &str) {
        debug!(path, subscribers = self.tx.receiver_count(), "revalidate");
        // no subscribers is not an error
        let _ = self.tx.send(path.to_string());
    }
}
