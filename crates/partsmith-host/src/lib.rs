//! Host integration for partsmith.
//!
//! A host application keeps its attachment storages in a [`StorageRegistry`].
//! The registry builds a [`MultipartHandler`](partsmith_http::MultipartHandler)
//! for any storage that exposes an object store, taking the bucket, key prefix
//! and visibility from the storage itself.
//!
//! Storages that cannot hand out an object store are rejected when the
//! handler is built, never on the first request.

pub mod error;
pub mod registry;
pub mod storage;

pub use error::{HostError, HostResult};
pub use registry::{HandlerOptions, StorageRegistry};
pub use storage::{HostStorage, ObjectStoreBinding, S3AttachmentStorage};
