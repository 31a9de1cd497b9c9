use std::sync::Arc;

use prost::Message;
use tokio_util::sync::CancellationToken;

use crate::blob_store::BlobStore;
use crate::event_bus::{Event, EventBus};
use crate::MaterializerError;

const BLOB_KEY: &str = "label_links";

pub struct LabelLinkMaterializer {
    pool: sqlx::PgPool,
    blobs: Arc<dyn BlobStore>,
    events: Arc<dyn EventBus>,
}

impl LabelLinkMaterializer {
    pub fn new(pool: sqlx::PgPool, blobs: Arc<dyn BlobStore>, events: Arc<dyn EventBus>) -> Self {
        Self {
            pool,
            blobs,
            events,
        }
    }

    /// Republishes the single global label-links blob. Unlike the per-account
    /// route blob this has no lock: it is keyed by a fixed name and callers
    /// are expected to tolerate a last-write-wins race, since the event that
    /// follows is marked `coalesce = true` at the subscriber.
    pub async fn materialize(&self, cancel: &CancellationToken) -> Result<(), MaterializerError> {
        let mut links = Vec::new();
        catalog::for_each_label_link(&self.pool, cancel, |row| {
            links.push(proto::LabelLink {
                account_id: row.account_id.as_bytes().to_vec(),
                labels: Some(label_set_from_flattened(&row.labels)),
                target: Some(label_set_from_flattened(&row.target)),
            });
        })
        .await
        .map_err(|err| match err {
            catalog::CatalogError::Canceled => MaterializerError::Canceled,
            other => MaterializerError::Catalog(other),
        })?;

        let message = proto::LabelLinksBlob { label_links: links };
        let mut encoded = Vec::with_capacity(message.encoded_len());
        message.encode(&mut encoded)?;

        let compressed = zstd::encode_all(encoded.as_slice(), 0)
            .map_err(|e| MaterializerError::BlobStore(format!("zstd compression failed: {e}")))?;
        let digest_hex = hex::encode(md5::compute(&compressed).0);

        let etag = self
            .blobs
            .put(BLOB_KEY, bytes::Bytes::from(compressed), &digest_hex)
            .await?;
        if etag != digest_hex {
            return Err(MaterializerError::Corruption);
        }

        self.events.publish(Event::LabelLinkUpdated).await;
        Ok(())
    }
}

fn label_set_from_flattened(flattened: &str) -> proto::LabelSet {
    proto::LabelSet {
        labels: models::explode_labels(flattened)
            .into_iter()
            .map(|label| proto::LabelPair {
                name: label.name,
                value: label.value,
            })
            .collect(),
    }
}
