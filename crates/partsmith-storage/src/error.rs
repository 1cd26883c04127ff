//! Storage error types.

use partsmith_auth::AuthError;

/// Errors returned by a [`StorageClient`](crate::StorageClient).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend has no in-progress upload with this id for this key.
    #[error("no such upload {upload_id} for key {key}")]
    NoSuchUpload {
        /// The upload id that was looked up.
        upload_id: String,
        /// The object key that was looked up.
        key: String,
    },

    /// The backend rejected the call or could not be reached.
    #[error("{0}")]
    Backend(String),

    /// The backend answered without a field the protocol needs.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// A pre-signed URL could not be produced.
    #[error("failed to presign request: {0}")]
    Presign(String),
}

impl From<AuthError> for StorageError {
    fn from(err: AuthError) -> Self {
        Self::Presign(err.to_string())
    }
}

/// Convenience result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
