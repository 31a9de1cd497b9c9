use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::activity_event::ActivityEvent;
use crate::context::ServerContext;
use crate::fanout::apply_event;
use tokens::KeySource;

/// The activity-reader task of §2's control flow: tails the activity log
/// from its own `ActivityReader` and rebroadcasts every batch through the
/// hub fan-out, covering mutations committed by other control-plane
/// replicas (this process's own RPC handlers already broadcast directly,
/// before this task ever sees the row -- so a row this task delivers for a
/// locally-originated mutation is a harmless duplicate, per §4.2's
/// at-least-once delivery contract).
///
/// A malformed row is logged and skipped rather than aborting the task:
/// one bad payload must not stall fan-out for every hub (§7).
pub async fn run<K: KeySource + Send + Sync + 'static>(
    ctx: Arc<ServerContext<K>>,
    mut reader: activity::ActivityReader,
    cancel: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = reader.rx.recv() => batch,
        };

        let Some(batch) = batch else {
            tracing::warn!("activity log reader channel closed, stopping replay task");
            break;
        };

        for entry in batch {
            let event: ActivityEvent = match serde_json::from_slice(&entry.event) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(id = entry.id, ?err, "skipping malformed activity log row");
                    continue;
                }
            };

            if let Err(err) = apply_event(&ctx, &event, &cancel).await {
                tracing::warn!(id = entry.id, ?err, "failed to replay activity log row");
            }
        }
    }

    reader.close().await;
}
