/// CatalogError distinguishes a backend failure from ordinary cancellation,
/// mirroring the crate-wide error model's `Backend`/`Canceled` split (see
/// `control::error::Error`, which wraps this).
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("scan canceled")]
    Canceled,
}
