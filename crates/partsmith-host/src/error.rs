//! Host adapter errors.

/// Errors raised while building a handler from host storage.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No storage is registered under this name.
    #[error("storage {0:?} is not registered")]
    UnknownStorage(String),

    /// The storage exists but is not backed by an object store.
    #[error("expected storage {name:?} to be backed by an object store, but was {description}")]
    NotObjectStorage {
        /// Registered name of the storage.
        name: String,
        /// Debug rendering of the storage.
        description: String,
    },
}

/// Result type for the host adapter.
pub type HostResult<T> = Result<T, HostError>;
