//! Route resolution for the upload protocol.
//!
//! Paths are resolved relative to the mount path. Each route is reachable both
//! at the root and under the `multipart` alias, so `/u1` and `/multipart/u1`
//! address the same upload. An upload literally named `multipart` is shadowed
//! by the alias.

use std::fmt;

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::ApiError;

const ALIAS: &str = "multipart";

/// A resolved protocol route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST /`
    Create,
    /// `GET /:uploadId`
    ListParts {
        /// Upload id path segment.
        upload_id: String,
    },
    /// `GET /:uploadId/batch`
    BatchPrepareParts {
        /// Upload id path segment.
        upload_id: String,
    },
    /// `GET /:uploadId/:partNumber`
    PreparePart {
        /// Upload id path segment.
        upload_id: String,
        /// Raw part number path segment, validated by the handler.
        part_number: String,
    },
    /// `POST /:uploadId/complete`
    Complete {
        /// Upload id path segment.
        upload_id: String,
    },
    /// `DELETE /:uploadId`
    Abort {
        /// Upload id path segment.
        upload_id: String,
    },
    /// `OPTIONS /` or `OPTIONS /:uploadId/:partNumber`
    Preflight,
}

impl Route {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::ListParts { .. } => "list_parts",
            Self::BatchPrepareParts { .. } => "batch_prepare_parts",
            Self::PreparePart { .. } => "prepare_part",
            Self::Complete { .. } => "complete",
            Self::Abort { .. } => "abort",
            Self::Preflight => "preflight",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a method and a mount-relative path to a [`Route`].
///
/// # Errors
///
/// Returns [`ApiError::RouteNotFound`] when nothing matches.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use partsmith_http::router::{Route, resolve_route};
///
/// assert_eq!(resolve_route(&Method::POST, "/multipart/").unwrap(), Route::Create);
/// assert_eq!(
///     resolve_route(&Method::DELETE, "/abc").unwrap(),
///     Route::Abort { upload_id: "abc".into() }
/// );
/// ```
pub fn resolve_route(method: &Method, path: &str) -> Result<Route, ApiError> {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect();
    if segments.first().is_some_and(|s| s == ALIAS) {
        segments.remove(0);
    }

    let route = match (method.as_str(), segments.as_slice()) {
        ("POST", []) => Route::Create,
        ("OPTIONS", [] | [_, _]) => Route::Preflight,
        ("GET", [upload_id]) => Route::ListParts {
            upload_id: upload_id.clone(),
        },
        ("DELETE", [upload_id]) => Route::Abort {
            upload_id: upload_id.clone(),
        },
        ("GET", [upload_id, batch]) if batch == "batch" => Route::BatchPrepareParts {
            upload_id: upload_id.clone(),
        },
        ("GET", [upload_id, part_number]) => Route::PreparePart {
            upload_id: upload_id.clone(),
            part_number: part_number.clone(),
        },
        ("POST", [upload_id, complete]) if complete == "complete" => Route::Complete {
            upload_id: upload_id.clone(),
        },
        _ => return Err(ApiError::RouteNotFound),
    };
    Ok(route)
}
