//! Values exchanged with a storage backend.

use serde::{Deserialize, Serialize};

/// A freshly started multipart upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUpload {
    /// Backend-assigned upload id.
    pub upload_id: String,
    /// Object key the session writes to.
    pub key: String,
}

/// A part already uploaded to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// 1-based part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Size in bytes.
    #[serde(rename = "Size")]
    pub size: u64,
    /// Backend fingerprint of the part bytes.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// A part the client reports as uploaded, for completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-based part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// ETag returned by the part upload.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// A pre-signed part upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedPart {
    /// URL the client `PUT`s the part bytes to.
    pub url: String,
}

/// The result of assembling an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedUpload {
    /// Where the final object can be read from.
    pub location: String,
}
