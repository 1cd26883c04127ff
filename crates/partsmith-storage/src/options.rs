//! Operation identifiers and auxiliary backend parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A backend operation that accepts option overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Start a multipart upload session.
    CreateMultipartUpload,
    /// List the parts uploaded so far.
    ListParts,
    /// Pre-sign the upload of one part.
    PrepareUploadPart,
    /// Assemble the uploaded parts into the final object.
    CompleteMultipartUpload,
    /// Produce the location URL of a completed object.
    ObjectUrl,
    /// Discard an in-progress upload.
    AbortMultipartUpload,
}

impl Operation {
    /// Every operation, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::CreateMultipartUpload,
        Self::ListParts,
        Self::PrepareUploadPart,
        Self::CompleteMultipartUpload,
        Self::ObjectUrl,
        Self::AbortMultipartUpload,
    ];

    /// The snake_case name used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateMultipartUpload => "create_multipart_upload",
            Self::ListParts => "list_parts",
            Self::PrepareUploadPart => "prepare_upload_part",
            Self::CompleteMultipartUpload => "complete_multipart_upload",
            Self::ObjectUrl => "object_url",
            Self::AbortMultipartUpload => "abort_multipart_upload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration name that matches no [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_owned()))
    }
}

/// Auxiliary parameters passed through to the backend.
///
/// Every field is optional. Backends ignore fields that do not apply to the
/// operation at hand (e.g. `acl` on `list_parts`).
///
/// # Examples
///
/// ```
/// use partsmith_storage::OperationOptions;
///
/// let defaults = OperationOptions {
///     acl: Some("public-read".into()),
///     content_type: Some("image/jpeg".into()),
///     ..Default::default()
/// };
/// let over = OperationOptions {
///     acl: Some("private".into()),
///     ..Default::default()
/// };
/// let merged = defaults.merged_with(&over);
/// assert_eq!(merged.acl.as_deref(), Some("private"));
/// assert_eq!(merged.content_type.as_deref(), Some("image/jpeg"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationOptions {
    /// Canned ACL, e.g. `public-read`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    /// Content type of the final object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Content disposition of the final object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// Cache-Control of the final object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// Content-Encoding of the final object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// Content-Language of the final object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// Storage class, e.g. `STANDARD_IA`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Server-side encryption algorithm, e.g. `AES256` or `aws:kms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<String>,
    /// KMS key id used with `aws:kms` encryption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssekms_key_id: Option<String>,
    /// User metadata (`x-amz-meta-*`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Request payer, e.g. `requester`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_payer: Option<String>,
    /// Expected bucket owner account id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_bucket_owner: Option<String>,
    /// Page size used when listing parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parts: Option<i32>,
    /// Validity of pre-signed URLs, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Content-MD5 the part upload must carry. Signed into part URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_md5: Option<String>,
    /// `response-content-disposition` for pre-signed GET URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_content_disposition: Option<String>,
    /// `response-content-type` for pre-signed GET URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_content_type: Option<String>,
}

impl OperationOptions {
    /// Overlay `over` on top of `self`.
    ///
    /// Fields set in `over` win. Metadata maps are unioned with `over` winning
    /// on conflicting keys.
    #[must_use]
    pub fn merged_with(&self, over: &Self) -> Self {
        let base = self;
        macro_rules! pick {
            ($field:ident) => {
                over.$field.clone().or_else(|| base.$field.clone())
            };
        }

        let mut metadata = self.metadata.clone();
        metadata.extend(over.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            acl: pick!(acl),
            content_type: pick!(content_type),
            content_disposition: pick!(content_disposition),
            cache_control: pick!(cache_control),
            content_encoding: pick!(content_encoding),
            content_language: pick!(content_language),
            storage_class: pick!(storage_class),
            server_side_encryption: pick!(server_side_encryption),
            ssekms_key_id: pick!(ssekms_key_id),
            metadata,
            request_payer: pick!(request_payer),
            expected_bucket_owner: pick!(expected_bucket_owner),
            max_parts: pick!(max_parts),
            expires_in: pick!(expires_in),
            content_md5: pick!(content_md5),
            response_content_disposition: pick!(response_content_disposition),
            response_content_type: pick!(response_content_type),
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
