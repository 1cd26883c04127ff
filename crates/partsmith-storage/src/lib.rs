//! Storage operation client for partsmith.
//!
//! [`StorageClient`] is the thin seam between the upload protocol handler and
//! an S3-compatible backend. Every method is a single round trip that takes
//! explicit identifiers plus an [`OperationOptions`] record of auxiliary
//! backend parameters.
//!
//! Two implementations ship with the crate:
//!
//! - [`S3StorageClient`] talks to S3 (or any S3-compatible endpoint) through
//!   `aws-sdk-s3`.
//! - [`MemoryStorageClient`] keeps sessions in process and records every call,
//!   for tests and embedding.

mod client;
mod error;
pub mod memory;
mod options;
pub mod s3;
mod types;
mod utils;

pub use client::{DEFAULT_PRESIGN_EXPIRY, StorageClient};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryStorageClient, StorageCall, StoredObject};
pub use options::{Operation, OperationOptions, UnknownOperation};
pub use s3::S3StorageClient;
pub use types::{CompletedPart, CompletedUpload, CreatedUpload, Part, PresignedPart};
