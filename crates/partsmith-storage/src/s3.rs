//! `aws-sdk-s3` backed storage client.
//!
//! Options map onto the SDK's typed request setters. Part and object URLs are
//! pre-signed locally through the SDK's presigning support, so preparing a part
//! never touches the network.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart as S3CompletedPart, ObjectCannedAcl, RequestPayer,
    ServerSideEncryption, StorageClass,
};
use partsmith_core::BrokerConfig;
use tracing::{debug, instrument};

use crate::client::{DEFAULT_PRESIGN_EXPIRY, StorageClient, presign_expiry};
use crate::error::{StorageError, StorageResult};
use crate::options::OperationOptions;
use crate::types::{CompletedPart, CompletedUpload, CreatedUpload, Part, PresignedPart};
use crate::utils::encode_key;

/// Storage client for S3 and S3-compatible endpoints.
#[derive(Debug, Clone)]
pub struct S3StorageClient {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    force_path_style: bool,
    default_expiry: Duration,
}

impl S3StorageClient {
    /// Wrap an existing SDK client bound to `bucket` in `region`.
    pub fn new(client: Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            force_path_style: false,
            default_expiry: DEFAULT_PRESIGN_EXPIRY,
        }
    }

    /// Build a client from broker configuration and the default AWS
    /// credential chain.
    pub async fn from_config(config: &BrokerConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_attempt_timeout(Duration::from_secs(config.backend_timeout_secs))
            .build();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.default_region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_force_path_style);
        if let Some(endpoint) = &config.s3_endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            config.default_region.clone(),
        )
        .with_endpoint(config.s3_endpoint_url.clone())
        .with_force_path_style(config.s3_force_path_style)
        .with_default_expiry(Duration::from_secs(config.presign_expires_secs))
    }

    /// Use a custom endpoint when building public object URLs.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint.map(|e| e.trim_end_matches('/').to_owned());
        self
    }

    /// Build public object URLs path-style (`endpoint/bucket/key`).
    #[must_use]
    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Validity of pre-signed URLs when no `expires_in` option is given.
    #[must_use]
    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    /// The stable, unsigned URL of `key`.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        let path = encode_key(key);
        match (&self.endpoint, self.force_path_style) {
            (Some(endpoint), true) => format!("{endpoint}/{}{path}", self.bucket),
            (Some(endpoint), false) => match endpoint.split_once("://") {
                Some((scheme, host)) => format!("{scheme}://{}.{host}{path}", self.bucket),
                None => format!("{endpoint}/{}{path}", self.bucket),
            },
            (None, true) => format!(
                "https://s3.{}.amazonaws.com/{}{path}",
                self.region, self.bucket
            ),
            (None, false) => format!(
                "https://{}.s3.{}.amazonaws.com{path}",
                self.bucket, self.region
            ),
        }
    }

    fn presigning_config(&self, options: &OperationOptions) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(presign_expiry(options, self.default_expiry))
            .map_err(|e| StorageError::Presign(e.to_string()))
    }
}

fn sdk_part_number(part_number: u32) -> StorageResult<i32> {
    i32::try_from(part_number)
        .map_err(|_| StorageError::Presign(format!("part number {part_number} out of range")))
}

fn to_metadata(options: &OperationOptions) -> Option<HashMap<String, String>> {
    if options.metadata.is_empty() {
        None
    } else {
        Some(
            options
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Map an SDK failure to a storage error, recognizing `NoSuchUpload` when the
/// call targeted an upload session.
fn map_sdk_error<E, R>(err: &SdkError<E, R>, upload: Option<(&str, &str)>) -> StorageError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    let code = err.as_service_error().and_then(|e| e.code());
    if let (Some("NoSuchUpload"), Some((upload_id, key))) = (code, upload) {
        return StorageError::NoSuchUpload {
            upload_id: upload_id.to_owned(),
            key: key.to_owned(),
        };
    }
    StorageError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl StorageClient for S3StorageClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    async fn create_multipart_upload(
        &self,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<CreatedUpload> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .set_acl(options.acl.as_deref().map(ObjectCannedAcl::from))
            .set_content_type(options.content_type.clone())
            .set_content_disposition(options.content_disposition.clone())
            .set_cache_control(options.cache_control.clone())
            .set_content_encoding(options.content_encoding.clone())
            .set_content_language(options.content_language.clone())
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_server_side_encryption(
                options
                    .server_side_encryption
                    .as_deref()
                    .map(ServerSideEncryption::from),
            )
            .set_ssekms_key_id(options.ssekms_key_id.clone())
            .set_metadata(to_metadata(options))
            .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(options.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, None))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::InvalidResponse("missing UploadId".to_owned()))?;
        debug!(upload_id, "created multipart upload");

        Ok(CreatedUpload {
            upload_id: upload_id.to_owned(),
            key: output.key().unwrap_or(key).to_owned(),
        })
    }

    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    async fn list_parts(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<Vec<Part>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_parts()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .set_max_parts(options.max_parts)
                .set_part_number_marker(marker.take())
                .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
                .set_expected_bucket_owner(options.expected_bucket_owner.clone())
                .send()
                .await
                .map_err(|e| map_sdk_error(&e, Some((upload_id, key))))?;

            for part in output.parts() {
                let part_number = part
                    .part_number()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| StorageError::InvalidResponse("part without PartNumber".to_owned()))?;
                parts.push(Part {
                    part_number,
                    size: part.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                    etag: part.e_tag().unwrap_or_default().to_owned(),
                });
            }

            match (output.is_truncated(), output.next_part_number_marker()) {
                (Some(true), Some(next)) => marker = Some(next.to_owned()),
                _ => break,
            }
        }

        parts.sort_by_key(|p| p.part_number);
        debug!(count = parts.len(), "listed parts");
        Ok(parts)
    }

    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    async fn prepare_upload_part(
        &self,
        upload_id: &str,
        key: &str,
        part_number: u32,
        options: &OperationOptions,
    ) -> StorageResult<PresignedPart> {
        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(sdk_part_number(part_number)?)
            .set_content_md5(options.content_md5.clone())
            .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(options.expected_bucket_owner.clone())
            .presigned(self.presigning_config(options)?)
            .await
            .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(PresignedPart {
            url: presigned.uri().to_owned(),
        })
    }

    #[instrument(skip(self, parts, options, url_options), fields(bucket = %self.bucket, parts = parts.len()))]
    async fn complete_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        parts: &[CompletedPart],
        public: bool,
        options: &OperationOptions,
        url_options: &OperationOptions,
    ) -> StorageResult<CompletedUpload> {
        let completed_parts = parts
            .iter()
            .map(|p| {
                Ok(S3CompletedPart::builder()
                    .part_number(sdk_part_number(p.part_number)?)
                    .e_tag(&p.etag)
                    .build())
            })
            .collect::<StorageResult<Vec<_>>>()?;

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(options.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, Some((upload_id, key))))?;

        let location = self.object_url(key, public, url_options).await?;
        Ok(CompletedUpload { location })
    }

    async fn object_url(
        &self,
        key: &str,
        public: bool,
        options: &OperationOptions,
    ) -> StorageResult<String> {
        if public {
            return Ok(self.public_url(key));
        }

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_response_content_disposition(options.response_content_disposition.clone())
            .set_response_content_type(options.response_content_type.clone())
            .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(options.expected_bucket_owner.clone())
            .presigned(self.presigning_config(options)?)
            .await
            .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned.uri().to_owned())
    }

    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    async fn abort_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        options: &OperationOptions,
    ) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .set_request_payer(options.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(options.expected_bucket_owner.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, Some((upload_id, key))))?;
        Ok(())
    }
}
