//! Queues between the pipeline stages.
//!
//! ```text
//! RssMonitor → new_resource_queue → DispatchBridge → downloading_resource_queue → DownloadTracker
//! ```
//!
//! Both queues are unbounded tokio channels. The consumer of the new-resource
//! queue drains it without blocking; the tracker awaits items one by one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::Resource;

#[derive(Debug, Clone)]
pub struct ResourceSender {
    tx: mpsc::UnboundedSender<Resource>,
}

#[derive(Debug)]
pub struct ResourceReceiver {
    rx: mpsc::UnboundedReceiver<Resource>,
}

pub fn resource_queue() -> (ResourceSender, ResourceReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResourceSender { tx }, ResourceReceiver { rx })
}

impl ResourceSender {
    /// False once the receiving side is gone.
    pub fn push(&self, resource: Resource) -> bool {
        self.tx.send(resource).is_ok()
    }
}

impl ResourceReceiver {
    /// Everything currently queued, without waiting for more.
    pub fn drain(&mut self) -> Vec<Resource> {
        let mut batch = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(resource) => batch.push(resource),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub async fn recv(&mut self) -> Option<Resource> {
        self.rx.recv().await
    }
}

/// Ids queued for dispatch but not yet settled. Keeps the producer from
/// queueing the same release again while it waits for the consumer.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// False if the id was already in flight.
    pub fn claim(&self, id: &str) -> bool {
        match self.ids.lock() {
            Ok(mut ids) => ids.insert(id.to_string()),
            Err(_) => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().map(|ids| ids.contains(id)).unwrap_or(false)
    }

    pub fn release<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        if let Ok(mut held) = self.ids.lock() {
            for id in ids {
                held.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.lock().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
