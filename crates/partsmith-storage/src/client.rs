//! The storage operation client interface.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::options::OperationOptions;
use crate::types::{CompletedPart, CompletedUpload, CreatedUpload, Part, PresignedPart};

/// Validity of pre-signed URLs when no `expires_in` option is given.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(900);

/// Bucket-bound multipart operations against an S3-compatible backend.
///
/// Each method performs exactly one logical backend interaction and does not
/// retry.
#[async_trait]
pub trait StorageClient: Send + Sync + Debug {
    /// The bucket every call targets.
    fn bucket(&self) -> &str;

    /// Start a multipart upload for `key`.
    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<CreatedUpload>;

    /// List every part uploaded to the session, in ascending part number.
    ///
    /// Backend pagination is drained. `max_parts` only sets the page size.
    async fn list_parts(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<Vec<Part>>;

    /// Pre-sign a `PUT` of part `part_number` of the session.
    async fn prepare_upload_part(
        &self,
        upload_id: &str,
        key: &str,
        part_number: u32,
        options: &OperationOptions,
    ) -> StorageResult<PresignedPart>;

    /// Assemble `parts` into the final object and return its location.
    ///
    /// `options` go to the assembly call only. The location is computed
    /// afterwards with [`StorageClient::object_url`], `public` and
    /// `url_options`.
    async fn complete_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        parts: &[CompletedPart],
        public: bool,
        options: &OperationOptions,
        url_options: &OperationOptions,
    ) -> StorageResult<CompletedUpload>;

    /// The URL an object can be read from: a stable unsigned URL when `public`,
    /// otherwise a pre-signed `GET`.
    async fn object_url(
        &self,
        key: &str,
        public: bool,
        options: &OperationOptions,
    ) -> StorageResult<String>;

    /// Discard the session and any uploaded parts.
    ///
    /// Fails with [`StorageError::NoSuchUpload`](crate::StorageError::NoSuchUpload)
    /// when the backend does not know the session.
    async fn abort_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<()>;
}

/// Resolve the presign validity from `options`, falling back to `default`.
pub(crate) fn presign_expiry(options: &OperationOptions, default: Duration) -> Duration {
    options.expires_in.map_or(default, Duration::from_secs)
}
