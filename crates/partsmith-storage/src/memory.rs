//! In-process storage backend.
//!
//! Upload sessions live in a [`DashMap`] keyed by upload id. Part and object
//! URLs are real SigV4 query-signed URLs against a configurable endpoint, but
//! nothing listens there: tests stand in for the client's direct `PUT` with
//! [`MemoryStorageClient::upload_part`].
//!
//! Every trait call is appended to a journal so callers can observe exactly
//! which identifiers and options reached the backend.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use http::Method;
use parking_lot::Mutex;
use partsmith_auth::{Credentials, PresignRequest, Presigner};
use tracing::debug;

use crate::client::{DEFAULT_PRESIGN_EXPIRY, StorageClient, presign_expiry};
use crate::error::{StorageError, StorageResult};
use crate::options::{Operation, OperationOptions};
use crate::types::{CompletedPart, CompletedUpload, CreatedUpload, Part, PresignedPart};
use crate::utils::{compute_etag, encode_key, generate_upload_id};

const DEFAULT_ENDPOINT: &str = "http://localhost:4566";
const DEFAULT_REGION: &str = "us-east-1";

/// One recorded call against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCall {
    /// Which operation was invoked.
    pub operation: Operation,
    /// Object key argument.
    pub key: String,
    /// Upload id argument, for session-scoped operations.
    pub upload_id: Option<String>,
    /// Part number argument, for `prepare_upload_part`.
    pub part_number: Option<u32>,
    /// Options the call received.
    pub options: OperationOptions,
}

/// A stored part.
#[derive(Debug, Clone)]
struct StoredPart {
    size: u64,
    etag: String,
}

/// An in-progress upload session.
#[derive(Debug)]
struct MemorySession {
    key: String,
    options: OperationOptions,
    parts: BTreeMap<u32, StoredPart>,
}

/// An object assembled by a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Total size in bytes.
    pub size: u64,
    /// Number of parts the object was assembled from.
    pub part_count: usize,
    /// Options the upload was created with.
    pub options: OperationOptions,
}

/// In-process [`StorageClient`].
///
/// # Examples
///
/// ```
/// # tokio_test::block_on(async {
/// use partsmith_storage::{MemoryStorageClient, OperationOptions, StorageClient};
///
/// let storage = MemoryStorageClient::new("uploads");
/// let opts = OperationOptions::default();
/// let created = storage.create_multipart_upload("a.txt", &opts).await.unwrap();
/// storage.upload_part(&created.upload_id, "a.txt", 1, b"hello").unwrap();
/// let parts = storage.list_parts(&created.upload_id, "a.txt", &opts).await.unwrap();
/// assert_eq!(parts[0].size, 5);
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryStorageClient {
    bucket: String,
    endpoint: String,
    presigner: Presigner,
    default_expiry: Duration,
    sessions: DashMap<String, MemorySession>,
    objects: DashMap<String, StoredObject>,
    journal: Mutex<Vec<StorageCall>>,
    failures: Mutex<HashMap<Operation, String>>,
}

impl MemoryStorageClient {
    /// Create an empty backend for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            presigner: Presigner::new(
                Credentials::new("partsmith", "partsmith"),
                DEFAULT_REGION,
                "s3",
            ),
            default_expiry: DEFAULT_PRESIGN_EXPIRY,
            sessions: DashMap::new(),
            objects: DashMap::new(),
            journal: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Base URL that generated URLs point at (path-style).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Sign generated URLs with `presigner`.
    #[must_use]
    pub fn with_presigner(mut self, presigner: Presigner) -> Self {
        self.presigner = presigner;
        self
    }

    /// Validity of pre-signed URLs when no `expires_in` option is given.
    #[must_use]
    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    /// Store `data` as part `part_number` of the session and return its ETag.
    ///
    /// Uploading the same part number again replaces the earlier bytes.
    pub fn upload_part(
        &self,
        upload_id: &str,
        key: &str,
        part_number: u32,
        data: &[u8],
    ) -> StorageResult<String> {
        let mut session = self.session_mut(upload_id, key)?;
        let etag = compute_etag(data);
        session.parts.insert(
            part_number,
            StoredPart {
                size: data.len() as u64,
                etag: etag.clone(),
            },
        );
        Ok(etag)
    }

    /// Make the next call to `operation` fail with a backend error.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.failures.lock().insert(operation, message.into());
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<StorageCall> {
        self.journal.lock().clone()
    }

    /// Drop every recorded call. The journal is otherwise unbounded, so
    /// long-lived embeddings should clear it periodically.
    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    /// Calls received so far for `operation`.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> Vec<StorageCall> {
        self.journal
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Number of in-progress sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The object a completed upload produced at `key`, if any.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.clone())
    }

    fn record(
        &self,
        operation: Operation,
        key: &str,
        upload_id: Option<&str>,
        part_number: Option<u32>,
        options: &OperationOptions,
    ) -> StorageResult<()> {
        self.journal.lock().push(StorageCall {
            operation,
            key: key.to_owned(),
            upload_id: upload_id.map(str::to_owned),
            part_number,
            options: options.clone(),
        });
        match self.failures.lock().remove(&operation) {
            Some(message) => Err(StorageError::Backend(message)),
            None => Ok(()),
        }
    }

    fn session_mut(
        &self,
        upload_id: &str,
        key: &str,
    ) -> StorageResult<dashmap::mapref::one::RefMut<'_, String, MemorySession>> {
        self.sessions
            .get_mut(upload_id)
            .filter(|s| s.key == key)
            .ok_or_else(|| StorageError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
                key: key.to_owned(),
            })
    }

    fn object_base_url(&self, key: &str) -> String {
        format!("{}/{}{}", self.endpoint, self.bucket, encode_key(key))
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<CreatedUpload> {
        self.record(Operation::CreateMultipartUpload, key, None, None, options)?;

        let upload_id = generate_upload_id();
        self.sessions.insert(
            upload_id.clone(),
            MemorySession {
                key: key.to_owned(),
                options: options.clone(),
                parts: BTreeMap::new(),
            },
        );
        debug!(%upload_id, key, "created in-memory multipart upload");

        Ok(CreatedUpload {
            upload_id,
            key: key.to_owned(),
        })
    }

    async fn list_parts(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<Vec<Part>> {
        self.record(Operation::ListParts, key, Some(upload_id), None, options)?;

        let session = self.session_mut(upload_id, key)?;
        Ok(session
            .parts
            .iter()
            .map(|(part_number, part)| Part {
                part_number: *part_number,
                size: part.size,
                etag: part.etag.clone(),
            })
            .collect())
    }

    async fn prepare_upload_part(
        &self,
        upload_id: &str,
        key: &str,
        part_number: u32,
        options: &OperationOptions,
    ) -> StorageResult<PresignedPart> {
        self.record(
            Operation::PrepareUploadPart,
            key,
            Some(upload_id),
            Some(part_number),
            options,
        )?;

        let mut request = PresignRequest::new(Method::PUT, &self.object_base_url(key))?
            .query_param("partNumber", part_number.to_string())
            .query_param("uploadId", upload_id)
            .expires_in(presign_expiry(options, self.default_expiry));
        if let Some(md5) = &options.content_md5 {
            request = request.signed_header("content-md5", md5);
        }

        Ok(PresignedPart {
            url: self.presigner.presign(&request)?,
        })
    }

    async fn complete_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        parts: &[CompletedPart],
        public: bool,
        options: &OperationOptions,
        url_options: &OperationOptions,
    ) -> StorageResult<CompletedUpload> {
        self.record(
            Operation::CompleteMultipartUpload,
            key,
            Some(upload_id),
            None,
            options,
        )?;

        {
            let session = self.session_mut(upload_id, key)?;
            let mut size = 0;
            for part in parts {
                match session.parts.get(&part.part_number) {
                    Some(stored) if stored.etag == part.etag => size += stored.size,
                    _ => {
                        return Err(StorageError::Backend(format!(
                            "InvalidPart: part {} was not uploaded or its ETag does not match",
                            part.part_number
                        )));
                    }
                }
            }
            self.objects.insert(
                key.to_owned(),
                StoredObject {
                    size,
                    part_count: parts.len(),
                    options: session.options.clone(),
                },
            );
        }
        self.sessions.remove(upload_id);

        let location = self.object_url(key, public, url_options).await?;
        Ok(CompletedUpload { location })
    }

    async fn object_url(
        &self,
        key: &str,
        public: bool,
        options: &OperationOptions,
    ) -> StorageResult<String> {
        self.record(Operation::ObjectUrl, key, None, None, options)?;

        if public {
            return Ok(self.object_base_url(key));
        }

        let mut request = PresignRequest::new(Method::GET, &self.object_base_url(key))?
            .expires_in(presign_expiry(options, self.default_expiry));
        if let Some(disposition) = &options.response_content_disposition {
            request = request.query_param("response-content-disposition", disposition);
        }
        if let Some(content_type) = &options.response_content_type {
            request = request.query_param("response-content-type", content_type);
        }
        Ok(self.presigner.presign(&request)?)
    }

    async fn abort_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<()> {
        self.record(
            Operation::AbortMultipartUpload,
            key,
            Some(upload_id),
            None,
            options,
        )?;

        match self.sessions.remove_if(upload_id, |_, s| s.key == key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
                key: key.to_owned(),
            }),
        }
    }
}
