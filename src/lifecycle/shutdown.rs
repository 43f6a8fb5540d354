//! Shutdown coordination.

use tokio::sync::broadcast;

/// Fan-out of a single "stop" event to every long-running task.
///
/// Tasks subscribe before the event fires; a receiver created afterwards will
/// not observe it.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Calling it more than once is harmless.
    ///
    /// Returns how many tasks were still listening.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(tasks = notified, "Stop signal sent");
        notified
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` fires or its sender is gone.
pub async fn recv(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());

        // A second trigger is still delivered to live subscribers.
        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_recv_returns_when_sender_dropped() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        drop(shutdown);
        recv(rx).await;
    }

    #[test]
    fn test_trigger_without_listeners() {
        let shutdown = Shutdown::new();
        drop(shutdown.subscribe());
        assert_eq!(shutdown.trigger(), 0);
    }
}
