pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::app::Result;

pub use telegram::TelegramNotifier;

/// Destination for update digests.
#[async_trait]
pub trait Notifier {
    fn name(&self) -> &str;
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Multi-line digest of newly dispatched titles, grouped by anime.
pub fn format_digest<S: AsRef<str>>(updates: &[(String, Vec<S>)]) -> String {
    let names = updates
        .iter()
        .map(|(name, _)| format!("[{}]", name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut msg = format!("Your subscribed anime {} updated\n", names);
    for (name, titles) in updates {
        msg.push_str(&format!("[{}]:\n", name));
        msg.push_str(
            &titles
                .iter()
                .map(|t| t.as_ref())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        msg.push_str("\n\n");
    }
    msg
}

/// Send the same digest to every notifier. Individual failures are logged.
pub async fn notify_all<S: AsRef<str>>(
    notifiers: &[Arc<dyn Notifier + Send + Sync>],
    updates: &[(String, Vec<S>)],
) -> usize {
    if updates.is_empty() || notifiers.is_empty() {
        return 0;
    }

    let msg = format_digest(updates);
    let results = join_all(notifiers.iter().map(|n| {
        let msg = msg.as_str();
        async move { (n.name().to_string(), n.send_message(msg).await) }
    }))
    .await;

    let mut delivered = 0;
    for (name, result) in results {
        match result {
            Ok(()) => {
                delivered += 1;
                info!(notifier = %name, "Update notification sent");
            }
            Err(e) => warn!(notifier = %name, "Failed to send notification: {}", e),
        }
    }
    delivered
}
