/// Materializer-local error type. Folds into the crate-wide `control::Error`
/// at the RPC boundary via a `From` impl written alongside that enum.
#[derive(Debug, thiserror::Error)]
pub enum MaterializerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("encoding error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("blob store error: {0}")]
    BlobStore(String),

    #[error("lock store error: {0}")]
    LockStore(String),

    #[error("uploaded blob failed its integrity check")]
    Corruption,

    #[error("scan canceled")]
    Canceled,
}
