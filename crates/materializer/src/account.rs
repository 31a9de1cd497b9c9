use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio_util::sync::CancellationToken;

use crate::blob_store::BlobStore;
use crate::event_bus::{Event, EventBus};
use crate::lock_store::{LockAttempt, LockGuard, LockStore};
use crate::MaterializerError;
use models::Id;

const RETRY_BACKOFF: Duration = Duration::from_secs(5);

pub struct AccountMaterializer {
    pool: sqlx::PgPool,
    blobs: Arc<dyn BlobStore>,
    locks: Arc<dyn LockStore>,
    events: Arc<dyn EventBus>,
}

impl AccountMaterializer {
    pub fn new(
        pool: sqlx::PgPool,
        blobs: Arc<dyn BlobStore>,
        locks: Arc<dyn LockStore>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            pool,
            blobs,
            locks,
            events,
        }
    }

    /// Republishes `account_id`'s routing blob per §4.4: assemble, encode,
    /// compress, acquire a CAS lock keyed on the digest, upload, verify the
    /// ETag, publish. On a lock held by a byte-identical producer, returns
    /// success without uploading. On a lock held by a divergent producer,
    /// sleeps and recomputes from scratch before the next attempt -- the
    /// catalog may have moved underneath us.
    pub async fn materialize(
        &self,
        account_id: Id,
        cancel: &CancellationToken,
    ) -> Result<(), MaterializerError> {
        let lock_key = format!("account-{}", account_id.as_ulid());

        loop {
            let (compressed, digest_hex) = self.assemble(account_id, cancel).await?;

            match self.locks.try_acquire(&lock_key, &digest_hex).await? {
                LockAttempt::Acquired => {
                    let guard = LockGuard::new(self.locks.clone(), lock_key.clone());
                    let blob_key = format!("account_services/{}", account_id.as_ulid());
                    let result = self.upload_and_verify(&blob_key, compressed, &digest_hex).await;
                    result?;
                    guard.release().await?;
                    self.events
                        .publish(Event::AccountUpdated { account_id })
                        .await;
                    return Ok(());
                }
                LockAttempt::Held { attribute } => {
                    if attribute == digest_hex {
                        return Ok(());
                    }
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                }
            }
        }
    }

    async fn assemble(
        &self,
        account_id: Id,
        cancel: &CancellationToken,
    ) -> Result<(bytes::Bytes, String), MaterializerError> {
        let mut routes = Vec::new();
        catalog::for_each_service_in_account(&self.pool, account_id, cancel, |row| {
            routes.push(proto::ServiceRoute {
                hub_id: row.hub_id.as_bytes().to_vec(),
                service_id: row.service_id.as_bytes().to_vec(),
                r#type: row.r#type.clone(),
                labels: Some(proto::LabelSet {
                    labels: row
                        .labels
                        .iter()
                        .map(|pair| label_pair_from_flattened(pair))
                        .collect(),
                }),
            });
        })
        .await
        .map_err(|err| match err {
            catalog::CatalogError::Canceled => MaterializerError::Canceled,
            other => MaterializerError::Catalog(other),
        })?;

        let message = proto::AccountServicesBlob { services: routes };
        let mut encoded = Vec::with_capacity(message.encoded_len());
        message.encode(&mut encoded)?;

        let compressed = zstd::encode_all(encoded.as_slice(), 0)
            .map_err(|e| MaterializerError::BlobStore(format!("zstd compression failed: {e}")))?;
        let digest_hex = hex::encode(md5::compute(&compressed).0);

        Ok((bytes::Bytes::from(compressed), digest_hex))
    }

    async fn upload_and_verify(
        &self,
        key: &str,
        bytes: bytes::Bytes,
        digest_hex: &str,
    ) -> Result<(), MaterializerError> {
        let etag = self.blobs.put(key, bytes, digest_hex).await?;
        if etag != digest_hex {
            return Err(MaterializerError::Corruption);
        }
        Ok(())
    }
}

fn label_pair_from_flattened(pair: &str) -> proto::LabelPair {
    match pair.split_once('=') {
        Some((name, value)) => proto::LabelPair {
            name: name.to_string(),
            value: value.to_string(),
        },
        None => proto::LabelPair {
            name: pair.to_string(),
            value: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_pair_splits_on_first_equals() {
        let pair = label_pair_from_flattened("env=prod");
        assert_eq!(pair.name, "env");
        assert_eq!(pair.value, "prod");
    }

    #[test]
    fn label_pair_with_no_equals_has_empty_value() {
        let pair = label_pair_from_flattened("standalone");
        assert_eq!(pair.name, "standalone");
        assert_eq!(pair.value, "");
    }
}
