//! Consumer of the new-resource queue.
//!
//! Each step drains whatever the monitor has queued, submits it as one
//! dispatch call, records successes in the ledger and hands them to the
//! tracker. Ids of the drained batch leave the in-flight set afterwards;
//! anything that failed is picked up again by the next feed poll.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::app::{Result, Shutdown};
use crate::config::format_interval;
use crate::dispatcher::{group_by_name, DownloadDispatcher};
use crate::domain::{LedgerRecord, Resource};
use crate::notifier::{notify_all, Notifier};
use crate::queue::{InFlight, ResourceReceiver, ResourceSender};
use crate::store::Ledger;

pub struct DispatchBridge {
    dispatcher: DownloadDispatcher,
    ledger: Arc<dyn Ledger + Send + Sync>,
    notifiers: Vec<Arc<dyn Notifier + Send + Sync>>,
    in_flight: InFlight,
    download_root: String,
}

impl DispatchBridge {
    pub fn new(
        dispatcher: DownloadDispatcher,
        ledger: Arc<dyn Ledger + Send + Sync>,
        notifiers: Vec<Arc<dyn Notifier + Send + Sync>>,
        in_flight: InFlight,
        download_root: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            ledger,
            notifiers,
            in_flight,
            download_root: download_root.into(),
        }
    }

    /// Drain, dispatch, record, forward, notify. Returns the number dispatched.
    ///
    /// Without a `downloading` queue nothing is tracked after dispatch. A
    /// ledger failure does not stop the accepted resources from being
    /// forwarded and announced, but the step still returns the error.
    pub async fn step(
        &self,
        rx: &mut ResourceReceiver,
        downloading: Option<&ResourceSender>,
    ) -> Result<usize> {
        let batch = rx.drain();
        if batch.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = batch.iter().map(|r| r.id.clone()).collect();
        info!(count = batch.len(), "Dispatching queued resources");

        let result = self.dispatcher.dispatch(batch, &self.download_root).await;
        let (dispatched, ledger_error) = match result {
            Ok(dispatched) => {
                let mut ledger_error = None;
                for resource in &dispatched {
                    if let Err(e) = self.record(resource) {
                        ledger_error.get_or_insert(e);
                    }
                }
                (dispatched, ledger_error)
            }
            Err(e) => {
                self.in_flight.release(ids.iter().map(String::as_str));
                return Err(e);
            }
        };
        // Recorded first, released second: the monitor checks in that order
        self.in_flight.release(ids.iter().map(String::as_str));

        if dispatched.len() < ids.len() {
            info!(
                dispatched = dispatched.len(),
                retry = ids.len() - dispatched.len(),
                "Undispatched resources will be retried on the next poll"
            );
        }

        let updates: Vec<(String, Vec<&str>)> = group_by_name(&dispatched)
            .into_iter()
            .map(|(name, resources)| {
                (name, resources.iter().map(|r| r.title.as_str()).collect())
            })
            .collect();
        notify_all(&self.notifiers, &updates).await;

        let count = dispatched.len();
        if let Some(downloading) = downloading {
            for resource in dispatched {
                if !downloading.push(resource) {
                    error!("Downloading queue closed, tracker will miss dispatched tasks");
                    break;
                }
            }
        }

        match ledger_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    /// Step immediately, then every `interval`, until shutdown.
    pub async fn run(
        &self,
        mut rx: ResourceReceiver,
        downloading: Option<ResourceSender>,
        interval: Duration,
        mut shutdown: Shutdown,
    ) {
        info!(
            interval = %format_interval(interval),
            tracking = downloading.is_some(),
            "Dispatch bridge started"
        );

        loop {
            tokio::select! {
                result = self.step(&mut rx, downloading.as_ref()) => {
                    if let Err(e) = result {
                        error!("Dispatch cycle failed: {}", e);
                    }
                }
                _ = shutdown.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Dispatch bridge stopped");
    }

    fn record(&self, resource: &Resource) -> Result<()> {
        let Some(record) = LedgerRecord::from_resource(resource) else {
            return Ok(());
        };
        match self.ledger.insert(&record) {
            Ok(true) => Ok(()),
            Ok(false) => {
                info!(id = %resource.id, "Resource was already in the ledger");
                Ok(())
            }
            Err(e) => {
                error!(id = %resource.id, "Failed to record dispatched resource: {}", e);
                Err(e)
            }
        }
    }
}
