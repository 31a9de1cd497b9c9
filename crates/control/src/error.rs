/// The crate-wide error type (C8): every fallible operation in the server
/// boils down to one of these five variants before crossing the RPC
/// boundary. Grounded on the teacher's habit of a single `thiserror` enum
/// per binary crate with a `From<Error> for tonic::Status` impl at its edge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed")]
    BadAuthentication,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("data corruption detected: {0}")]
    Corruption(String),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("operation canceled")]
    Canceled,
}

impl From<catalog::CatalogError> for Error {
    fn from(err: catalog::CatalogError) -> Self {
        match err {
            catalog::CatalogError::Canceled => Error::Canceled,
            other => Error::Backend(other.into()),
        }
    }
}

impl From<activity::ActivityError> for Error {
    fn from(err: activity::ActivityError) -> Self {
        Error::Backend(err.into())
    }
}

impl From<tokens::TokenError> for Error {
    fn from(err: tokens::TokenError) -> Self {
        match err {
            tokens::TokenError::Malformed
            | tokens::TokenError::BadSignature
            | tokens::TokenError::Expired => Error::BadAuthentication,
            other => Error::Backend(other.into()),
        }
    }
}

impl From<materializer::MaterializerError> for Error {
    fn from(err: materializer::MaterializerError) -> Self {
        match err {
            materializer::MaterializerError::Canceled => Error::Canceled,
            materializer::MaterializerError::Corruption => {
                Error::Corruption("materialized blob failed its integrity check".into())
            }
            other => Error::Backend(other.into()),
        }
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        match err {
            Error::BadAuthentication => tonic::Status::unauthenticated(err.to_string()),
            Error::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            Error::Corruption(msg) => {
                tracing::error!(msg, "fatal corruption detected while handling request");
                tonic::Status::internal("internal error")
            }
            Error::Backend(source) => {
                tracing::error!(err = ?source, "backend error while handling request");
                tonic::Status::internal("internal error")
            }
            Error::Canceled => tonic::Status::cancelled("operation canceled"),
        }
    }
}
