//! In-process realtime fan-out.
//!
//! [`RealtimeHub`] implements [`RealtimeBroadcaster`] on a tokio broadcast
//! channel. Events are encoded once at publish time and every WebSocket
//! connection holds its own receiver. A receiver that falls more than
//! `capacity` frames behind loses the oldest frames instead of slowing
//! publishers down.

use complaint_desk_core::realtime::{BroadcastError, RealtimeBroadcaster, RealtimeEvent};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default number of frames buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast hub shared by the lifecycle service and the WebSocket handler.
#[derive(Clone, Debug)]
pub struct RealtimeHub {
    sender: broadcast::Sender<Arc<str>>,
}

impl RealtimeHub {
    /// Create a hub buffering up to `capacity` frames per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every frame published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }

    /// Number of connected subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RealtimeBroadcaster for RealtimeHub {
    fn publish(
        &self,
        event: RealtimeEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>> {
        Box::pin(async move {
            let frame = serde_json::to_string(&event)
                .map_err(|e| BroadcastError::Encoding(e.to_string()))?;

            // A send error only means nobody is listening.
            let delivered = self.sender.send(Arc::from(frame)).unwrap_or(0);
            tracing::debug!(event = event.name(), subscribers = delivered, "Realtime event published");
            Ok(())
        })
    }
}
