//! The routing materializer (C4): recomputes an account's route set (or the
//! global label-link set), compresses it, and republishes it to a blob
//! store under a distributed CAS lock. Grounded on
//! `original_source/pkg/control/s3.go` and `dynamo.go` for the upload/lock
//! protocol, expressed with the teacher's trait-seam style for external
//! dependencies (`aws-sdk-s3`, `aws-sdk-dynamodb` hidden behind small traits
//! so the retry loop itself is pure and unit-testable).

mod account;
mod blob_store;
mod error;
mod event_bus;
mod label_links;
mod lock_store;

pub use account::AccountMaterializer;
pub use blob_store::{BlobStore, S3BlobStore};
pub use error::MaterializerError;
pub use event_bus::{BroadcastEventBus, Event, EventBus};
pub use label_links::LabelLinkMaterializer;
pub use lock_store::{DynamoDbLockStore, LockAttempt, LockGuard, LockStore};
