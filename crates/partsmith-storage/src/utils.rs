//! Helpers shared by the storage backends.

use partsmith_auth::canonical::build_canonical_uri;
use rand::Rng;

/// Generate an opaque multipart upload id: 32 random bytes, hex-encoded.
pub(crate) fn generate_upload_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Compute an S3-style quoted MD5 ETag for `data`.
pub(crate) fn compute_etag(data: &[u8]) -> String {
    use md5::{Digest, Md5};
    format!("\"{}\"", hex::encode(Md5::digest(data)))
}

/// Percent-encode an object key for use in a URL path, keeping `/`.
pub(crate) fn encode_key(key: &str) -> String {
    build_canonical_uri(&format!("/{key}"))
}
