//! Per-operation option overrides.
//!
//! An override is either a fixed [`OperationOptions`] record or a function of
//! the inbound request. Overrides are resolved right before each backend call
//! and merged over the options the handler computed itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use partsmith_storage::{Operation, OperationOptions, UnknownOperation};

use crate::request::UploadRequest;

/// Errors building overrides from configuration.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// The configuration value is not a JSON object.
    #[error("operation options must be a JSON object")]
    NotAnObject,

    /// A key names no operation.
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),

    /// The options for an operation do not deserialize.
    #[error("invalid options for {operation}: {source}")]
    InvalidOptions {
        /// The operation the options were given for.
        operation: Operation,
        /// The deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// A function computing options from the inbound request.
pub type OptionsFn = dyn Fn(&UploadRequest) -> OperationOptions + Send + Sync;

/// How the options for one operation are overridden.
#[derive(Clone)]
pub enum OptionsOverride {
    /// Always apply these options.
    Static(OperationOptions),
    /// Compute options from the request.
    Computed(Arc<OptionsFn>),
}

impl OptionsOverride {
    /// Wrap a closure as a computed override.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&UploadRequest) -> OperationOptions + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Produce the override's options for `request`.
    #[must_use]
    pub fn resolve(&self, request: &UploadRequest) -> OperationOptions {
        match self {
            Self::Static(options) => options.clone(),
            Self::Computed(f) => f(request),
        }
    }
}

impl fmt::Debug for OptionsOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(options) => f.debug_tuple("Static").field(options).finish(),
            Self::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

impl From<OperationOptions> for OptionsOverride {
    fn from(options: OperationOptions) -> Self {
        Self::Static(options)
    }
}

/// The override table: at most one override per operation.
///
/// # Examples
///
/// ```
/// use partsmith_http::overrides::{OperationOverrides, OptionsOverride};
/// use partsmith_storage::{Operation, OperationOptions, UnknownOperation};
///
/// let overrides = OperationOverrides::new()
///     .with(
///         Operation::ListParts,
///         OperationOptions { max_parts: Some(5), ..Default::default() },
///     )
///     .with(
///         Operation::CreateMultipartUpload,
///         OptionsOverride::computed(|req| OperationOptions {
///             acl: req.param_str("acl"),
///             ..Default::default()
///         }),
///     );
/// assert!(overrides.get(Operation::ListParts).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationOverrides {
    table: HashMap<Operation, OptionsOverride>,
}

impl OperationOverrides {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the override for `operation`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, operation: Operation, over: impl Into<OptionsOverride>) -> Self {
        self.set(operation, over);
        self
    }

    /// Set the override for `operation`, replacing any previous one.
    pub fn set(&mut self, operation: Operation, over: impl Into<OptionsOverride>) {
        self.table.insert(operation, over.into());
    }

    /// The override for `operation`, if any.
    #[must_use]
    pub fn get(&self, operation: Operation) -> Option<&OptionsOverride> {
        self.table.get(&operation)
    }

    /// Copy every entry of `other` into `self`. Entries of `other` win.
    pub fn extend(&mut self, other: &Self) {
        self.table
            .extend(other.table.iter().map(|(op, over)| (*op, over.clone())));
    }

    /// Whether no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Merge the override for `operation` (if any) over `defaults`.
    #[must_use]
    pub fn apply(
        &self,
        operation: Operation,
        request: &UploadRequest,
        defaults: &OperationOptions,
    ) -> OperationOptions {
        match self.get(operation) {
            Some(over) => defaults.merged_with(&over.resolve(request)),
            None => defaults.clone(),
        }
    }

    /// Build a table of static overrides from a JSON object keyed by
    /// operation name, e.g. `{"list_parts": {"max_parts": 5}}`.
    ///
    /// # Errors
    ///
    /// Fails on unknown operation names, unknown option fields, or a value
    /// that is not an object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, OverrideError> {
        let object = value.as_object().ok_or(OverrideError::NotAnObject)?;

        let mut overrides = Self::new();
        for (name, options) in object {
            let operation: Operation = name.parse()?;
            let options: OperationOptions = serde_json::from_value(options.clone())
                .map_err(|source| OverrideError::InvalidOptions { operation, source })?;
            overrides.set(operation, options);
        }
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request(uri: &str) -> UploadRequest {
        let (parts, ()) = http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        UploadRequest::from_parts(&parts, &Bytes::new()).unwrap()
    }

    #[test]
    fn test_should_apply_static_override_over_defaults() {
        let overrides = OperationOverrides::new().with(
            Operation::CreateMultipartUpload,
            OperationOptions {
                acl: Some("private".into()),
                ..Default::default()
            },
        );
        let defaults = OperationOptions {
            acl: Some("public-read".into()),
            content_type: Some("text/plain".into()),
            ..Default::default()
        };

        let options = overrides.apply(Operation::CreateMultipartUpload, &request("/"), &defaults);
        assert_eq!(options.acl.as_deref(), Some("private"));
        assert_eq!(options.content_type.as_deref(), Some("text/plain"));

        let untouched = overrides.apply(Operation::ListParts, &request("/"), &defaults);
        assert_eq!(untouched, defaults);
    }

    #[test]
    fn test_should_invoke_computed_override_with_request() {
        let overrides = OperationOverrides::new().with(
            Operation::ListParts,
            OptionsOverride::computed(|req| OperationOptions {
                max_parts: req.param_str("limit").and_then(|v| v.parse().ok()),
                ..Default::default()
            }),
        );

        let options = overrides.apply(
            Operation::ListParts,
            &request("/u1?key=k&limit=5"),
            &OperationOptions::default(),
        );
        assert_eq!(options.max_parts, Some(5));
    }

    #[test]
    fn test_should_let_later_entries_win_on_extend() {
        let mut base = OperationOverrides::new()
            .with(Operation::ListParts, OperationOptions { max_parts: Some(1), ..Default::default() })
            .with(Operation::ObjectUrl, OperationOptions { expires_in: Some(5), ..Default::default() });
        base.extend(
            &OperationOverrides::new()
                .with(Operation::ListParts, OperationOptions { max_parts: Some(9), ..Default::default() }),
        );

        let req = request("/");
        let defaults = OperationOptions::default();
        assert_eq!(base.apply(Operation::ListParts, &req, &defaults).max_parts, Some(9));
        assert_eq!(base.apply(Operation::ObjectUrl, &req, &defaults).expires_in, Some(5));
    }

    #[test]
    fn test_should_parse_static_overrides_from_json() {
        let overrides = OperationOverrides::from_json(&serde_json::json!({
            "prepare_upload_part": {"expires_in": 10},
            "create_multipart_upload": {"acl": "public-read"}
        }))
        .unwrap();
        let defaults = OperationOptions::default();
        let req = request("/");
        assert_eq!(
            overrides.apply(Operation::PrepareUploadPart, &req, &defaults).expires_in,
            Some(10)
        );
    }

    #[test]
    fn test_should_report_typed_errors_for_bad_override_json() {
        assert!(matches!(
            OperationOverrides::from_json(&serde_json::json!({"put_object": {}})),
            Err(OverrideError::UnknownOperation(UnknownOperation(name))) if name == "put_object"
        ));
        assert!(matches!(
            OperationOverrides::from_json(&serde_json::json!([])),
            Err(OverrideError::NotAnObject)
        ));

        let err = OperationOverrides::from_json(&serde_json::json!({"list_parts": {"max_part": 5}}))
            .unwrap_err();
        assert!(matches!(
            err,
            OverrideError::InvalidOptions { operation: Operation::ListParts, .. }
        ));
        assert!(err.to_string().starts_with("invalid options for list_parts:"));
    }
}
