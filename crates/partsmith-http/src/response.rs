//! Response serialization and error formatting.

use http::StatusCode;
use serde::Serialize;

use crate::body::UploadResponseBody;
use crate::error::ApiError;

/// Content type of every JSON response.
pub const CONTENT_TYPE: &str = "application/json";

/// Serialize an error into its JSON body: `{ "error": "<message>" }`.
#[must_use]
pub fn error_to_json(error: &ApiError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "error": error.to_string() }))
        .expect("JSON serialization of error cannot fail")
}

/// Convert an [`ApiError`] into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &ApiError) -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(error.status_code())
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(UploadResponseBody::from_json(error_to_json(error)))
        .expect("valid error response")
}

/// Build a `200 OK` JSON response from a serializable value.
pub fn json_response<T: Serialize>(value: &T) -> Result<http::Response<UploadResponseBody>, ApiError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| ApiError::Internal(format!("failed to serialize response: {e}")))?;
    Ok(http::Response::builder()
        .status(StatusCode::OK)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(UploadResponseBody::from_json(json))
        .expect("valid JSON response"))
}

/// A bare `204 No Content` with no headers and no body.
#[must_use]
pub fn no_content() -> http::Response<UploadResponseBody> {
    let mut response = http::Response::new(UploadResponseBody::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_should_format_error_json() {
        let json = error_to_json(&ApiError::missing_param("key"));
        let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, serde_json::json!({"error": "Missing \"key\" parameter"}));
    }

    #[test]
    fn test_should_build_error_response_with_correct_status() {
        let resp = error_to_response(&ApiError::RouteNotFound);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers().get("content-type").unwrap(), CONTENT_TYPE);
    }

    #[test]
    fn test_should_report_unserializable_value_as_server_error() {
        let value = BTreeMap::from([((1, 2), "tuple keys are not JSON object keys")]);
        let err = json_response(&value).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_should_build_header_free_no_content() {
        let resp = no_content();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().is_empty());
    }
}
