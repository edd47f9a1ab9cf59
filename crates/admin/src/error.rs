use std::path::PathBuf;

use krn_client::api::ApiError;
use krn_client::media::UploadError;
use krn_client::session::SessionError;
use krn_core::error::CoreError;

use crate::store::StoreError;

/// Application-level error type.
///
/// Wraps [`CoreError`] for domain errors and the client crate's transport
/// errors, and adds variants that only arise in the application layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `krn_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A project store operation failed; the message is user-facing.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for application results.
pub type AppResult<T> = Result<T, AppError>;
