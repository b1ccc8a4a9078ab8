//! Feed-observer emission: consume the store's change feed instead of
//! notifying from the request path.
//!
//! This strategy only works when the backend supports ordered change
//! notification. When it does not, the observer logs a warning and becomes a
//! no-op — realtime push is an enhancement over the polling fallback, never
//! a reason to crash. Feed errors are retried indefinitely with a fixed
//! backoff for the same reason.

use std::{sync::Arc, time::Duration};

use hark_core::store::ContactFeed;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{info, warn};

use crate::registry::RoomRegistry;

/// Fixed delay before resubscribing after the feed errors out or closes.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Spawn the feed-observer task.
///
/// Each observed mutation is delivered to the shared broadcast group (the
/// feed does not carry room targeting — deletions in particular arrive as a
/// bare id). Deployments wanting per-account routing use the synchronous
/// strategy instead; exactly one of the two is active.
pub fn spawn_feed_observer<F>(
  store: F,
  registry: Arc<RoomRegistry>,
) -> JoinHandle<()>
where
  F: ContactFeed + 'static,
{
  tokio::spawn(async move {
    loop {
      let Some(mut rx) = store.watch() else {
        warn!(
          "store does not support change observation; \
           feed-based realtime updates are disabled"
        );
        return;
      };
      info!("change feed observer subscribed");

      loop {
        match rx.recv().await {
          Ok(event) => {
            registry.deliver_to_broadcast(&event);
          }
          Err(RecvError::Lagged(skipped)) => {
            // Missed events are healed by the clients' next poll cycle.
            warn!(skipped, "change feed lagged; continuing");
          }
          Err(RecvError::Closed) => {
            warn!(
              backoff_secs = RECONNECT_BACKOFF.as_secs(),
              "change feed closed; resubscribing after backoff"
            );
            break;
          }
        }
      }

      tokio::time::sleep(RECONNECT_BACKOFF).await;
    }
  })
}
