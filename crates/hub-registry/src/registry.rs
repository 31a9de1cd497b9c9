use std::collections::HashMap;
use std::sync::Arc;

use models::Id;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::connected_hub::ConnectedHub;

/// The process-wide map of currently-connected hubs, guarded the way the
/// teacher guards its own shared connection maps: a `tokio::sync::RwLock`,
/// write-locked only on register/deregister, read-locked for the (possibly
/// long-running) broadcast fan-out.
#[derive(Default)]
pub struct HubRegistry {
    hubs: RwLock<HashMap<Id, Arc<ConnectedHub>>>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: Id) -> (Arc<ConnectedHub>, mpsc::Receiver<proto::CentralActivity>) {
        let (hub, rx) = ConnectedHub::new(id);
        let hub = Arc::new(hub);
        self.hubs.write().await.insert(id, hub.clone());
        (hub, rx)
    }

    /// Removes `id` from the registry, then drains its outbound channel
    /// non-blockingly until empty. This is required, not cosmetic: a
    /// broadcaster may already have read-locked the map and resolved this
    /// hub's sender before `deregister` takes the write lock, so a send can
    /// land after removal and would otherwise never be received (§4.5).
    pub async fn deregister(&self, id: Id, rx: &mut mpsc::Receiver<proto::CentralActivity>) {
        self.hubs.write().await.remove(&id);
        while rx.try_recv().is_ok() {}
    }

    /// Sends `activity` to every connected hub's channel, respecting
    /// cancellation. A slow hub blocks this call; send order among hubs is
    /// unspecified (§4.5, §5).
    pub async fn broadcast_activity(
        &self,
        activity: &proto::CentralActivity,
        cancel: &CancellationToken,
    ) {
        let hubs = self.hubs.read().await;
        for hub in hubs.values() {
            if cancel.is_cancelled() {
                return;
            }
            if hub.send(activity.clone()).await.is_err() {
                tracing::warn!(hub_id = %hub.id, "hub activity stream closed during broadcast");
            }
        }
    }

    pub async fn all_hub_ids(&self) -> Vec<Id> {
        self.hubs.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.hubs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_registered_hub() {
        let registry = HubRegistry::new();
        let (hub_a, mut rx_a) = registry.register(Id::generate()).await;
        let (_hub_b, mut rx_b) = registry.register(Id::generate()).await;

        let activity = proto::CentralActivity::default();
        let cancel = CancellationToken::new();

        let broadcast = tokio::spawn({
            let activity = activity.clone();
            let registry = Arc::new(registry);
            let registry_handle = registry.clone();
            async move { registry_handle.broadcast_activity(&activity, &cancel).await }
        });

        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
        broadcast.await.unwrap();
        drop(hub_a);
    }

    #[tokio::test]
    async fn deregister_drains_any_in_flight_send() {
        let registry = HubRegistry::new();
        let id = Id::generate();
        let (hub, mut rx) = registry.register(id).await;

        hub.send(proto::CentralActivity::default()).await.unwrap();
        registry.deregister(id, &mut rx).await;

        assert_eq!(registry.len().await, 0);
        assert!(rx.try_recv().is_err());
    }
}
