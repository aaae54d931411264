use messmate_types::InvalidProfile;
use thiserror::Error;

/// Transport and data-shape failures from the remote store. All
/// variants are retryable by re-invoking the failed operation; the
/// atomicity contract guarantees no partial multi-key write survives.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store path {path:?} has no segments")]
    EmptyPath { path: String },

    #[error("value at {path} is not an integer")]
    NotNumeric { path: String },

    #[error("malformed record at {path}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

/// Failures from the typed directory layer over the store.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Invalid(#[from] InvalidProfile),

    #[error(transparent)]
    Store(#[from] StoreError),
}
