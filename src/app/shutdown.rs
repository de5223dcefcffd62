use tokio::sync::watch;

/// Sending half of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half of the shutdown signal. Cheap to clone, one per task.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // Receivers may all be gone already
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered, or the trigger was dropped.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_trigger() {
        let (trigger, mut shutdown) = channel();
        assert!(!shutdown.is_triggered());

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), shutdown.cancelled())
            .await
            .expect("shutdown should resolve");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_trigger_dropped() {
        let (trigger, mut shutdown) = channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), shutdown.cancelled())
            .await
            .expect("dropped trigger should release waiters");
    }

    #[tokio::test]
    async fn test_cancelled_pending_without_trigger() {
        let (_trigger, mut shutdown) = channel();
        let result = tokio::time::timeout(Duration::from_millis(20), shutdown.cancelled()).await;
        assert!(result.is_err());
    }
}
