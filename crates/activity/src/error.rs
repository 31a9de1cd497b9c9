#[derive(thiserror::Error, Debug)]
pub enum ActivityError {
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
}
