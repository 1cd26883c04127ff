//! The upload protocol handler.
//!
//! One method per route. Each validates its parameters, computes default
//! options, applies the configured override, and makes exactly one storage
//! call (batch presigning makes one per requested part).

use std::collections::BTreeSet;
use std::sync::Arc;

use partsmith_storage::{CompletedPart, Operation, OperationOptions, StorageClient, StorageError};
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::body::UploadResponseBody;
use crate::error::ApiError;
use crate::key::{content_disposition, generate_key};
use crate::overrides::OperationOverrides;
use crate::request::UploadRequest;
use crate::response::{json_response, no_content};
use crate::router::Route;

const MISSING_PART_FIELD: &str = "At least one part is missing \"PartNumber\" or \"ETag\" field";
const UPLOAD_NOT_FOUND: &str = "Upload doesn't exist for \"key\" parameter";

/// Handler configuration, fixed at construction.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct HandlerConfig {
    /// Prefix prepended to generated keys.
    #[builder(default, setter(strip_option, into))]
    pub prefix: Option<String>,

    /// Whether completed objects are publicly readable.
    #[builder(default = false)]
    pub public: bool,

    /// Base options for `create_multipart_upload`, below the computed ones.
    #[builder(default)]
    pub upload_options: OperationOptions,

    /// Per-operation overrides.
    #[builder(default)]
    pub overrides: OperationOverrides,
}

/// Serves the multipart upload protocol against one bucket-bound storage
/// client.
#[derive(Debug, Clone)]
pub struct MultipartHandler {
    storage: Arc<dyn StorageClient>,
    config: Arc<HandlerConfig>,
}

impl MultipartHandler {
    /// Create a handler.
    pub fn new(storage: Arc<dyn StorageClient>, config: HandlerConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    /// The storage client calls go to.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    /// The handler configuration.
    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Serve one resolved route.
    pub async fn handle(
        &self,
        route: &Route,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        info!(route = %route, "handling upload request");
        match route {
            Route::Preflight => Ok(no_content()),
            Route::Create => self.create(request).await,
            Route::ListParts { upload_id } => self.list_parts(upload_id, request).await,
            Route::PreparePart {
                upload_id,
                part_number,
            } => self.prepare_part(upload_id, part_number, request).await,
            Route::BatchPrepareParts { upload_id } => {
                self.batch_prepare_parts(upload_id, request).await
            }
            Route::Complete { upload_id } => self.complete(upload_id, request).await,
            Route::Abort { upload_id } => self.abort(upload_id, request).await,
        }
    }

    fn options_for(
        &self,
        operation: Operation,
        request: &UploadRequest,
        defaults: &OperationOptions,
    ) -> OperationOptions {
        self.config.overrides.apply(operation, request, defaults)
    }

    async fn create(
        &self,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let filename = request.param_str("filename");
        let key = generate_key(self.config.prefix.as_deref(), filename.as_deref());

        let computed = OperationOptions {
            content_type: request.param_str("type"),
            content_disposition: filename.as_deref().map(content_disposition),
            acl: self.config.public.then(|| "public-read".to_owned()),
            ..Default::default()
        };
        let defaults = self.config.upload_options.merged_with(&computed);
        let options = self.options_for(Operation::CreateMultipartUpload, request, &defaults);

        let created = self.storage.create_multipart_upload(&key, &options).await?;
        debug!(upload_id = %created.upload_id, key = %created.key, "upload session created");

        json_response(&created)
    }

    async fn list_parts(
        &self,
        upload_id: &str,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let key = request.require_str("key")?;
        let options =
            self.options_for(Operation::ListParts, request, &OperationOptions::default());

        let parts = self.storage.list_parts(upload_id, &key, &options).await?;
        json_response(&parts)
    }

    async fn prepare_part(
        &self,
        upload_id: &str,
        part_number: &str,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let key = request.require_str("key")?;
        let part_number =
            parse_part_number(part_number).ok_or_else(|| ApiError::invalid_param("partNumber"))?;
        let options = self.options_for(
            Operation::PrepareUploadPart,
            request,
            &OperationOptions::default(),
        );

        let presigned = self
            .storage
            .prepare_upload_part(upload_id, &key, part_number, &options)
            .await?;
        json_response(&presigned)
    }

    async fn batch_prepare_parts(
        &self,
        upload_id: &str,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let key = request.require_str("key")?;
        let raw = request.require_str("partNumbers")?;
        let part_numbers = raw
            .split(',')
            .map(|n| parse_part_number(n.trim()))
            .collect::<Option<BTreeSet<u32>>>()
            .filter(|set| !set.is_empty())
            .ok_or_else(|| ApiError::invalid_param("partNumbers"))?;
        let options = self.options_for(
            Operation::PrepareUploadPart,
            request,
            &OperationOptions::default(),
        );

        let mut urls = Map::new();
        for part_number in part_numbers {
            let presigned = self
                .storage
                .prepare_upload_part(upload_id, &key, part_number, &options)
                .await?;
            urls.insert(part_number.to_string(), Value::String(presigned.url));
        }
        json_response(&json!({ "presignedUrls": urls }))
    }

    async fn complete(
        &self,
        upload_id: &str,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let key = request.require_str("key")?;
        let parts = request
            .param("parts")
            .ok_or_else(|| ApiError::missing_param("parts"))?;
        let parts = parse_completed_parts(&parts)?;

        let defaults = OperationOptions::default();
        let options = self.options_for(Operation::CompleteMultipartUpload, request, &defaults);
        let url_options = self.options_for(Operation::ObjectUrl, request, &defaults);

        let completed = self
            .storage
            .complete_multipart_upload(
                upload_id,
                &key,
                &parts,
                self.config.public,
                &options,
                &url_options,
            )
            .await?;
        json_response(&completed)
    }

    async fn abort(
        &self,
        upload_id: &str,
        request: &UploadRequest,
    ) -> Result<http::Response<UploadResponseBody>, ApiError> {
        let key = request.require_str("key")?;
        let options = self.options_for(
            Operation::AbortMultipartUpload,
            request,
            &OperationOptions::default(),
        );

        match self
            .storage
            .abort_multipart_upload(upload_id, &key, &options)
            .await
        {
            Ok(()) => json_response(&json!({})),
            Err(StorageError::NoSuchUpload { .. }) => {
                Err(ApiError::NotFound(UPLOAD_NOT_FOUND.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// A positive integer part number.
fn parse_part_number(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|n| *n > 0)
}

fn parse_completed_parts(value: &Value) -> Result<Vec<CompletedPart>, ApiError> {
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::invalid_param("parts"))?;

    items
        .iter()
        .map(|item| {
            let part_number = match item.get("PartNumber") {
                Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Some(Value::String(s)) => s.parse().ok(),
                _ => None,
            };
            let etag = item.get("ETag").and_then(Value::as_str);
            match (part_number, etag) {
                (Some(part_number), Some(etag)) => Ok(CompletedPart {
                    part_number,
                    etag: etag.to_owned(),
                }),
                _ => Err(ApiError::Validation(MISSING_PART_FIELD.to_owned())),
            }
        })
        .collect()
}
