use std::sync::atomic::{AtomicU64, Ordering};

use models::Id;
use tokio::sync::mpsc;

/// A hub's in-memory presence for as long as its activity stream is open.
/// Grounded on the control server's connected-hub map from
/// `original_source/pkg/control/server.go`: an outbound channel the
/// broadcaster writes to, and two counters updated from inbound flow
/// records. The channel is given capacity 1 (the closest stdlib-backed
/// analogue of the original's unbuffered channel, since `tokio::mpsc`
/// requires at least one slot) so a slow hub applies backpressure to the
/// broadcaster rather than letting activity queue unboundedly.
pub struct ConnectedHub {
    pub id: Id,
    tx: mpsc::Sender<proto::CentralActivity>,
    messages: AtomicU64,
    bytes: AtomicU64,
}

impl ConnectedHub {
    pub fn new(id: Id) -> (Self, mpsc::Receiver<proto::CentralActivity>) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                id,
                tx,
                messages: AtomicU64::new(0),
                bytes: AtomicU64::new(0),
            },
            rx,
        )
    }

    pub async fn send(&self, activity: proto::CentralActivity) -> Result<(), proto::CentralActivity> {
        self.tx.send(activity).await.map_err(|e| e.0)
    }

    pub fn record_flow(&self, num_messages: u64, num_bytes: u64) {
        self.messages.fetch_add(num_messages, Ordering::Relaxed);
        self.bytes.fetch_add(num_bytes, Ordering::Relaxed);
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}
