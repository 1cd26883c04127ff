//! Host storage capability.

use std::fmt::Debug;
use std::sync::Arc;

use partsmith_storage::{OperationOptions, StorageClient};

/// What a storage must expose to serve multipart uploads.
#[derive(Debug, Clone)]
pub struct ObjectStoreBinding {
    /// Client bound to the storage's bucket.
    pub storage: Arc<dyn StorageClient>,
    /// Key prefix the storage writes under.
    pub prefix: Option<String>,
    /// Whether the storage's objects are publicly readable.
    pub public: bool,
    /// Options the storage applies to every upload.
    pub upload_options: OperationOptions,
}

/// An attachment storage known to the host.
///
/// Implementors that are backed by an object store return a binding from
/// [`object_store`](HostStorage::object_store). Everything else returns
/// `None` and cannot serve multipart uploads.
pub trait HostStorage: Send + Sync + Debug {
    /// The object store behind this storage, if there is one.
    fn object_store(&self) -> Option<ObjectStoreBinding>;
}

/// The host's S3-flavoured attachment storage.
#[derive(Debug, Clone)]
pub struct S3AttachmentStorage {
    storage: Arc<dyn StorageClient>,
    prefix: Option<String>,
    public: bool,
    upload_options: OperationOptions,
}

impl S3AttachmentStorage {
    /// Wrap a bucket-bound storage client.
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            prefix: None,
            public: false,
            upload_options: OperationOptions::default(),
        }
    }

    /// Write objects under `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Make stored objects publicly readable.
    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Options applied to every upload.
    #[must_use]
    pub fn with_upload_options(mut self, options: OperationOptions) -> Self {
        self.upload_options = options;
        self
    }

    /// The bucket objects are stored in.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.storage.bucket()
    }
}

impl HostStorage for S3AttachmentStorage {
    fn object_store(&self) -> Option<ObjectStoreBinding> {
        Some(ObjectStoreBinding {
            storage: Arc::clone(&self.storage),
            prefix: self.prefix.clone(),
            public: self.public,
            upload_options: self.upload_options.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use partsmith_storage::MemoryStorageClient;

    use super::*;

    #[test]
    fn test_should_expose_binding_for_s3_storage() {
        let storage = S3AttachmentStorage::new(Arc::new(MemoryStorageClient::new("my-bucket")))
            .with_prefix("cache")
            .with_public(true);

        assert_eq!(storage.bucket(), "my-bucket");
        let binding = storage.object_store().unwrap();
        assert_eq!(binding.storage.bucket(), "my-bucket");
        assert_eq!(binding.prefix.as_deref(), Some("cache"));
        assert!(binding.public);
        assert!(binding.upload_options.is_empty());
    }
}
