use async_trait::async_trait;
use models::Id;

/// Cluster-visible user events published after a successful republish, so
/// peer replicas can invalidate any local cache of the affected blob. The
/// trait exists so tests can substitute a channel they can assert against
/// instead of standing up real cross-process pub/sub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    AccountUpdated { account_id: Id },
    LabelLinkUpdated,
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: Event);
}

/// In-process fan-out over a broadcast channel. `label_link_updated` events
/// are meant to coalesce at the subscriber (many mutations, one blob), which
/// this bus does not do itself -- coalescing is left to subscribers, since a
/// broadcast channel has no notion of event identity to dedupe on.
pub struct BroadcastEventBus {
    tx: tokio::sync::broadcast::Sender<Event>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn publish(&self, event: Event) {
        // No receivers is a normal state (e.g. single-node deployments); the
        // send error in that case carries no information worth logging.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = BroadcastEventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(Event::LabelLinkUpdated).await;
        assert_eq!(rx.recv().await.unwrap(), Event::LabelLinkUpdated);
    }
}
