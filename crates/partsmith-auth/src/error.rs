//! Error types for SigV4 pre-signing.

/// Errors that can occur while producing a pre-signed URL.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The URL to sign could not be parsed or lacks a scheme or host.
    #[error("Invalid URL to presign: {0}")]
    InvalidUrl(String),

    /// The requested validity is zero or longer than SigV4 allows (7 days).
    #[error("Invalid presign expiry: {0} seconds (must be between 1 and 604800)")]
    InvalidExpiry(u64),
}
