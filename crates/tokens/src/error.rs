#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("failed to encode/decode token body: {0}")]
    Encode(String),
    #[error("key source error: {0}")]
    KeySource(String),
}
