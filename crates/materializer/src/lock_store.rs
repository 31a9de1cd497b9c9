use crate::MaterializerError;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a `try_acquire`: either we now hold the lock, or someone else
/// does and `attribute` carries whatever they attached to it (the
/// materializer uses this slot for its MD5 digest, §4.4 step 4).
pub enum LockAttempt {
    Acquired,
    Held { attribute: String },
}

/// A distributed "fail if already locked" mutex keyed by string, with one
/// free-form attribute attached at acquisition time. Grounded on
/// `original_source/pkg/control/dynamo.go`'s conditional-put lock idiom,
/// abstracted the way the blob store is so the materializer's retry loop
/// never talks to `aws-sdk-dynamodb` directly.
#[async_trait]
pub trait LockStore: Send + Sync {
    async fn try_acquire(&self, key: &str, attribute: &str) -> Result<LockAttempt, MaterializerError>;
    async fn release(&self, key: &str) -> Result<(), MaterializerError>;
}

pub struct DynamoDbLockStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoDbLockStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl LockStore for DynamoDbLockStore {
    async fn try_acquire(&self, key: &str, attribute: &str) -> Result<LockAttempt, MaterializerError> {
        use aws_sdk_dynamodb::types::AttributeValue;

        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .item("lock_key", AttributeValue::S(key.to_string()))
            .item("attribute", AttributeValue::S(attribute.to_string()))
            .condition_expression("attribute_not_exists(lock_key)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(LockAttempt::Acquired),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false)
                {
                    let current = self
                        .client
                        .get_item()
                        .table_name(&self.table)
                        .key("lock_key", AttributeValue::S(key.to_string()))
                        .send()
                        .await
                        .map_err(|e| MaterializerError::LockStore(e.to_string()))?;

                    let attribute = current
                        .item()
                        .and_then(|item| item.get("attribute"))
                        .and_then(|v| v.as_s().ok())
                        .cloned()
                        .unwrap_or_default();

                    Ok(LockAttempt::Held { attribute })
                } else {
                    Err(MaterializerError::LockStore(err.to_string()))
                }
            }
        }
    }

    async fn release(&self, key: &str) -> Result<(), MaterializerError> {
        use aws_sdk_dynamodb::types::AttributeValue;
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("lock_key", AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| MaterializerError::LockStore(e.to_string()))?;
        Ok(())
    }
}

/// RAII guard releasing a held lock on drop, mirroring the teacher's scope-
/// guard idiom for external resources that must not leak across error
/// returns. Release happens on a detached task since `Drop` cannot `.await`;
/// a failure to release is logged but not otherwise actionable -- the lock
/// store's own TTL (if configured) is the backstop.
pub struct LockGuard {
    store: Arc<dyn LockStore>,
    key: String,
    released: bool,
}

impl LockGuard {
    pub fn new(store: Arc<dyn LockStore>, key: String) -> Self {
        Self {
            store,
            key,
            released: false,
        }
    }

    pub async fn release(mut self) -> Result<(), MaterializerError> {
        self.released = true;
        self.store.release(&self.key).await
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = self.store.clone();
        let key = self.key.clone();
        tokio::spawn(async move {
            if let Err(err) = store.release(&key).await {
                tracing::warn!(?err, key, "failed to release materializer lock on drop");
            }
        });
    }
}
