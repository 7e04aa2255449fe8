use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::ChatEvent;

/// In-process event bus backed by `tokio::broadcast`.
///
/// Every subscriber sees every event and filters by room. Delivery is
/// best-effort: with no subscribers the event is dropped, and a lagging
/// subscriber loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ChatEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers. Returns how many
    /// subscribers it reached; zero when nobody is listening.
    pub fn publish(&self, event: ChatEvent) -> usize {
        let room = event.room().to_string();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(%room, "no realtime subscribers, event dropped");
                0
            }
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
