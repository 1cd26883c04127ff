//! Named host storages and the handlers built from them.

use std::collections::HashMap;
use std::sync::Arc;

use partsmith_http::{HandlerConfig, MultipartHandler, OperationOverrides};
use tracing::debug;

use crate::error::{HostError, HostResult};
use crate::storage::HostStorage;

/// Call-site options for [`StorageRegistry::multipart_handler`].
///
/// Anything left unset comes from the storage or the registry.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Override the storage's visibility.
    pub public: Option<bool>,
    /// Override the storage's key prefix.
    pub prefix: Option<String>,
    /// Per-operation overrides, applied over the registry's.
    pub overrides: OperationOverrides,
}

/// The host's storages, keyed by name, plus overrides shared by every
/// handler the registry builds.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use partsmith_host::{HandlerOptions, S3AttachmentStorage, StorageRegistry};
/// use partsmith_storage::MemoryStorageClient;
///
/// let mut registry = StorageRegistry::new();
/// registry.register(
///     "store",
///     Arc::new(S3AttachmentStorage::new(Arc::new(MemoryStorageClient::new("bucket")))),
/// );
///
/// let handler = registry.multipart_handler("store", HandlerOptions::default()).unwrap();
/// assert_eq!(handler.storage().bucket(), "bucket");
/// ```
#[derive(Debug, Default)]
pub struct StorageRegistry {
    storages: HashMap<String, Arc<dyn HostStorage>>,
    overrides: OperationOverrides,
}

impl StorageRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn HostStorage>) {
        self.storages.insert(name.into(), storage);
    }

    /// The storage registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn HostStorage>> {
        self.storages.get(name)
    }

    /// Merge `overrides` into the shared table. May be called repeatedly;
    /// the latest call wins per operation.
    pub fn configure(&mut self, overrides: &OperationOverrides) {
        self.overrides.extend(overrides);
    }

    /// Build a handler serving uploads into the storage named `storage_key`.
    ///
    /// # Errors
    ///
    /// [`HostError::UnknownStorage`] if nothing is registered under the name,
    /// [`HostError::NotObjectStorage`] if the storage has no object store.
    pub fn multipart_handler(
        &self,
        storage_key: &str,
        options: HandlerOptions,
    ) -> HostResult<MultipartHandler> {
        let storage = self
            .get(storage_key)
            .ok_or_else(|| HostError::UnknownStorage(storage_key.to_owned()))?;
        let binding = storage
            .object_store()
            .ok_or_else(|| HostError::NotObjectStorage {
                name: storage_key.to_owned(),
                description: format!("{storage:?}"),
            })?;

        let mut overrides = self.overrides.clone();
        overrides.extend(&options.overrides);

        let config = HandlerConfig {
            prefix: options.prefix.or(binding.prefix),
            public: options.public.unwrap_or(binding.public),
            upload_options: binding.upload_options,
            overrides,
        };
        debug!(
            storage = storage_key,
            bucket = binding.storage.bucket(),
            prefix = ?config.prefix,
            public = config.public,
            "built multipart handler for host storage"
        );

        Ok(MultipartHandler::new(binding.storage, config))
    }
}

#[cfg(test)]
mod tests {
    use partsmith_storage::{MemoryStorageClient, Operation, OperationOptions};

    use super::*;
    use crate::storage::{ObjectStoreBinding, S3AttachmentStorage};

    #[derive(Debug)]
    struct DiskStorage {
        directory: &'static str,
    }

    impl HostStorage for DiskStorage {
        fn object_store(&self) -> Option<ObjectStoreBinding> {
            None
        }
    }

    fn registry() -> StorageRegistry {
        let mut registry = StorageRegistry::new();
        registry.register(
            "s3",
            Arc::new(
                S3AttachmentStorage::new(Arc::new(MemoryStorageClient::new("my-bucket")))
                    .with_prefix("cache"),
            ),
        );
        registry.register("disk", Arc::new(DiskStorage { directory: "/tmp/uploads" }));
        registry
    }

    fn acl(value: &str) -> OperationOptions {
        OperationOptions {
            acl: Some(value.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_should_take_bucket_prefix_and_visibility_from_storage() {
        let handler = registry()
            .multipart_handler("s3", HandlerOptions::default())
            .unwrap();
        assert_eq!(handler.storage().bucket(), "my-bucket");
        assert_eq!(handler.config().prefix.as_deref(), Some("cache"));
        assert!(!handler.config().public);
    }

    #[test]
    fn test_should_let_call_site_options_win() {
        let handler = registry()
            .multipart_handler(
                "s3",
                HandlerOptions {
                    public: Some(true),
                    prefix: Some("other".to_owned()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(handler.config().prefix.as_deref(), Some("other"));
        assert!(handler.config().public);
    }

    #[test]
    fn test_should_merge_configured_overrides_in_order() {
        let mut registry = registry();
        registry.configure(
            &OperationOverrides::new()
                .with(Operation::CreateMultipartUpload, acl("private"))
                .with(Operation::ListParts, OperationOptions { max_parts: Some(5), ..Default::default() }),
        );
        registry.configure(
            &OperationOverrides::new().with(Operation::CreateMultipartUpload, acl("public-read")),
        );

        let handler = registry
            .multipart_handler("s3", HandlerOptions::default())
            .unwrap();
        let overrides = &handler.config().overrides;
        assert!(overrides.get(Operation::ListParts).is_some());
        assert!(matches!(
            overrides.get(Operation::CreateMultipartUpload),
            Some(partsmith_http::OptionsOverride::Static(o)) if o.acl.as_deref() == Some("public-read")
        ));
    }

    #[test]
    fn test_should_reject_storage_without_object_store() {
        let err = registry()
            .multipart_handler("disk", HandlerOptions::default())
            .unwrap_err();
        assert!(matches!(err, HostError::NotObjectStorage { ref name, .. } if name == "disk"));
        let message = err.to_string();
        assert!(message.contains("\"disk\""));
        assert!(message.contains("DiskStorage"));
        assert!(message.contains("/tmp/uploads"));
    }

    #[test]
    fn test_should_reject_unknown_storage() {
        let err = registry()
            .multipart_handler("cache", HandlerOptions::default())
            .unwrap_err();
        assert!(matches!(err, HostError::UnknownStorage(ref name) if name == "cache"));
    }
}
