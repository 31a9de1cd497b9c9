use crate::MaterializerError;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;

/// A content-addressed object store: `put` uploads `bytes` under `key` with
/// the given Content-MD5 header and returns the store's ETag so the caller
/// can verify nothing mutated the payload in transit. Grounded on the
/// original implementation's S3 PUT-with-Content-MD5-and-ETag-check idiom
/// (`original_source/pkg/control/s3.go`), abstracted behind a trait the way
/// the teacher abstracts its own blob backends behind a small trait rather
/// than calling `aws-sdk-s3` directly from business logic.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, digest_hex: &str) -> Result<String, MaterializerError>;
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    kms_key_id: Option<String>,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>, kms_key_id: Option<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            kms_key_id,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Bytes, digest_hex: &str) -> Result<String, MaterializerError> {
        let digest_bytes = hex::decode(digest_hex)
            .map_err(|e| MaterializerError::BlobStore(format!("invalid digest: {e}")))?;
        let content_md5 = base64::engine::general_purpose::STANDARD.encode(&digest_bytes);

        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::Private)
            .content_md5(content_md5)
            .body(bytes.into());

        if let Some(kms_key_id) = &self.kms_key_id {
            req = req
                .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::AwsKms)
                .ssekms_key_id(kms_key_id);
        }

        let output = req
            .send()
            .await
            .map_err(|e| MaterializerError::BlobStore(e.to_string()))?;

        let etag = output
            .e_tag()
            .ok_or_else(|| MaterializerError::BlobStore("put_object response carried no ETag".into()))?;
        Ok(etag.trim_matches('"').to_string())
    }
}

