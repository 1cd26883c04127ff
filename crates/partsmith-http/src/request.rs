//! The read-only view of an inbound request that handlers and option
//! overrides work from.

use bytes::Bytes;
use http::{HeaderMap, Method};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// An inbound request with its query string and body already parsed.
///
/// Parameters are looked up in the query string first and then in the body,
/// so `?key=a` wins over `{"key":"b"}`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl UploadRequest {
    /// Parse the query string and body of a request.
    ///
    /// An empty body is treated as no body. A form-encoded body becomes a flat
    /// object of strings. Anything else must be JSON.
    ///
    /// # Errors
    ///
    /// Returns `Invalid JSON body` when a non-empty body does not parse.
    pub fn from_parts(parts: &http::request::Parts, body: &Bytes) -> Result<Self, ApiError> {
        let query = parts.uri.query().map(parse_form).unwrap_or_default();
        let body = parse_body(&parts.headers, body)?;

        Ok(Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            headers: parts.headers.clone(),
            query,
            body,
        })
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full request path, mount prefix included.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Decoded query string pairs, in request order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The parsed body, if one was sent.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Look up a parameter in the query string, then in the body object.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<Value> {
        if let Some((_, v)) = self.query.iter().find(|(k, _)| k == name) {
            return Some(Value::String(v.clone()));
        }
        self.body
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|obj| obj.get(name))
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Look up a scalar parameter as a string. Numbers and booleans are
    /// rendered. Arrays and objects count as absent.
    #[must_use]
    pub fn param_str(&self, name: &str) -> Option<String> {
        match self.param(name)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`UploadRequest::param_str`], failing with `Missing "<name>" parameter`.
    pub fn require_str(&self, name: &str) -> Result<String, ApiError> {
        self.param_str(name)
            .ok_or_else(|| ApiError::missing_param(name))
    }
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Result<Option<Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let is_form = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        let text = std::str::from_utf8(body)
            .map_err(|_| ApiError::Validation("Invalid form body".to_owned()))?;
        let object: Map<String, Value> = parse_form(text)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Some(Value::Object(object)));
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|_| ApiError::Validation("Invalid JSON body".to_owned()))
}

/// Decode `application/x-www-form-urlencoded` pairs (`+` is a space).
fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
