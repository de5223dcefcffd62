//! Long-running service: monitor, bridge and tracker as tokio tasks.
//!
//! ```text
//! RssMonitor ─new─▶ DispatchBridge ─downloading─▶ DownloadTracker
//! ```
//!
//! SIGINT/SIGTERM fire the shared shutdown signal; every loop exits at its
//! next await point.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::app::shutdown::{self, ShutdownTrigger};
use crate::app::{AppContext, Result};
use crate::config::{format_interval, parse_interval};
use crate::queue::resource_queue;

/// Outcome of a single cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub queued: usize,
    pub dispatched: usize,
}

pub struct Daemon {
    ctx: Arc<AppContext>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Poll once, dispatch what was found, then return.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let (tx, mut rx) = resource_queue();

        let queued = self.ctx.monitor().poll_into(&tx).await?;
        let dispatched = self.ctx.bridge().step(&mut rx, None).await?;

        info!(queued, dispatched, "Cycle complete");
        Ok(CycleReport { queued, dispatched })
    }

    /// Run until a termination signal arrives.
    pub async fn run(&self) -> Result<()> {
        let config = &self.ctx.config;
        let Some(poll_interval) = config.rss.poll_interval()? else {
            info!("Poll interval is 0, running a single cycle");
            self.run_once().await?;
            return Ok(());
        };
        let dispatch_interval = interval(&config.dispatch.interval)?;
        let tracker_interval = interval(&config.tracker.interval)?;

        let (trigger, shutdown) = shutdown::channel();
        tokio::spawn(wait_for_signal(trigger));

        info!(
            poll = %format_interval(poll_interval),
            dispatch = %format_interval(dispatch_interval),
            pid = std::process::id(),
            "mikan-relay started"
        );

        let (new_tx, new_rx) = resource_queue();
        let (downloading_tx, tracker_task) = if config.tracker.enabled {
            let (downloading_tx, downloading_rx) = resource_queue();
            let tracker = self.ctx.tracker();
            let task = tokio::spawn(tracker.run(
                downloading_rx,
                tracker_interval,
                shutdown.clone(),
            ));
            (Some(downloading_tx), Some(task))
        } else {
            info!("Download tracking disabled");
            (None, None)
        };

        let monitor = self.ctx.monitor();
        let monitor_task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { monitor.run(new_tx, poll_interval, shutdown).await })
        };

        let bridge = self.ctx.bridge();
        let bridge_task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                bridge
                    .run(new_rx, downloading_tx, dispatch_interval, shutdown)
                    .await
            })
        };

        let tasks = [
            ("monitor", Some(monitor_task)),
            ("bridge", Some(bridge_task)),
            ("tracker", tracker_task),
        ];
        for (name, task) in tasks {
            let Some(task) = task else { continue };
            if let Err(e) = task.await {
                error!(task = name, "Task ended abnormally: {}", e);
            }
        }

        info!("mikan-relay shutting down");
        Ok(())
    }
}

fn interval(s: &str) -> Result<Duration> {
    parse_interval(s).map_err(crate::app::RelayError::Config)
}

async fn wait_for_signal(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    trigger.trigger();
}
