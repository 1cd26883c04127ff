//! Multipart upload protocol handler and HTTP service for partsmith.
//!
//! A browser-side uploader talks to this service to start a multipart upload,
//! obtain pre-signed URLs for each part, list what it has uploaded, and finally
//! complete or abort the upload. Part bytes never pass through here.
//!
//! # Routes
//!
//! Relative to the mount path, each also reachable under `/multipart`:
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `POST` | `/` | `{uploadId, key}` |
//! | `GET` | `/:uploadId?key=` | `[{PartNumber, Size, ETag}]` |
//! | `GET` | `/:uploadId/:partNumber?key=` | `{url}` |
//! | `GET` | `/:uploadId/batch?key=&partNumbers=1,2` | `{presignedUrls}` |
//! | `POST` | `/:uploadId/complete?key=` | `{location}` |
//! | `DELETE` | `/:uploadId?key=` | `{}` |
//! | `OPTIONS` | `/`, `/:uploadId/:partNumber` | bare `204` |

pub mod body;
pub mod error;
pub mod handler;
pub mod key;
pub mod overrides;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::UploadResponseBody;
pub use error::ApiError;
pub use handler::{HandlerConfig, MultipartHandler};
pub use overrides::{OperationOverrides, OptionsOverride, OverrideError};
pub use request::UploadRequest;
pub use service::{MultipartService, ServiceConfig};
