//! Broker configuration.
//!
//! Provides [`BrokerConfig`] for configuring the multipart upload broker.
//! Values are loaded from environment variables at startup.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{BrokerError, BrokerResult};

/// Longest pre-signed URL validity SigV4 accepts (7 days).
const MAX_PRESIGN_EXPIRES_SECS: u64 = 604_800;

/// Broker configuration.
///
/// # Examples
///
/// ```
/// use partsmith_core::BrokerConfig;
///
/// let config = BrokerConfig::builder().bucket("uploads".into()).build();
/// assert_eq!(config.mount_path, "/s3/multipart");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    /// Bind address for the HTTP listener.
    #[builder(default = String::from("0.0.0.0:4580"))]
    pub gateway_listen: String,

    /// Path prefix the upload routes are mounted under.
    #[builder(default = String::from("/s3/multipart"))]
    pub mount_path: String,

    /// Destination bucket.
    pub bucket: String,

    /// Optional prefix prepended to every generated key.
    #[builder(default)]
    pub key_prefix: Option<String>,

    /// Whether completed objects are publicly readable.
    #[builder(default = false)]
    pub public: bool,

    /// Region used for signing and for public URLs.
    #[builder(default = String::from("us-east-1"))]
    pub default_region: String,

    /// Custom S3 endpoint (e.g. a local S3-compatible server).
    #[builder(default)]
    pub s3_endpoint_url: Option<String>,

    /// Use path-style addressing instead of virtual-hosted style.
    #[builder(default = false)]
    pub s3_force_path_style: bool,

    /// Default validity of pre-signed URLs, in seconds.
    #[builder(default = 900)]
    pub presign_expires_secs: u64,

    /// Per-attempt timeout for backend calls, in seconds.
    #[builder(default = 10)]
    pub backend_timeout_secs: u64,

    /// Static per-operation option overrides, keyed by operation name.
    #[builder(default)]
    pub operation_options: Option<serde_json::Value>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4580` |
    /// | `MOUNT_PATH` | `/s3/multipart` |
    /// | `BUCKET` | *(required)* |
    /// | `KEY_PREFIX` | *(unset)* |
    /// | `PUBLIC` | `false` |
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `S3_ENDPOINT_URL` | *(unset)* |
    /// | `S3_FORCE_PATH_STYLE` | `false` |
    /// | `PRESIGN_EXPIRES_SECS` | `900` |
    /// | `BACKEND_TIMEOUT_SECS` | `10` |
    /// | `OPERATION_OPTIONS` | *(unset)* |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// Fails if `BUCKET` is unset, a numeric setting does not parse, or
    /// `OPERATION_OPTIONS` is not a JSON object.
    pub fn from_env() -> BrokerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BrokerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> BrokerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("BUCKET").ok_or(BrokerError::MissingSetting("BUCKET"))?;
        let mut config = Self::builder().bucket(bucket).build();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("MOUNT_PATH") {
            config.mount_path = v;
        }
        config.key_prefix = lookup("KEY_PREFIX").filter(|v| !v.is_empty());
        if let Some(v) = lookup("PUBLIC") {
            config.public = parse_bool(&v);
        }
        if let Some(v) = lookup("DEFAULT_REGION") {
            config.default_region = v;
        }
        config.s3_endpoint_url = lookup("S3_ENDPOINT_URL").filter(|v| !v.is_empty());
        if let Some(v) = lookup("S3_FORCE_PATH_STYLE") {
            config.s3_force_path_style = parse_bool(&v);
        }
        if let Some(v) = lookup("PRESIGN_EXPIRES_SECS") {
            config.presign_expires_secs = parse_secs("PRESIGN_EXPIRES_SECS", &v)?;
        }
        if let Some(v) = lookup("BACKEND_TIMEOUT_SECS") {
            config.backend_timeout_secs = parse_secs("BACKEND_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("OPERATION_OPTIONS") {
            let value: serde_json::Value = serde_json::from_str(&v).map_err(|e| {
                BrokerError::Config(format!("OPERATION_OPTIONS is not valid JSON: {e}"))
            })?;
            if !value.is_object() {
                return Err(BrokerError::Config(
                    "OPERATION_OPTIONS must be a JSON object".to_owned(),
                ));
            }
            config.operation_options = Some(value);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// Check the configuration for values the broker cannot work with.
    ///
    /// # Errors
    ///
    /// Rejects an empty bucket and a presign expiry of zero or beyond 7 days.
    pub fn validate(&self) -> BrokerResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(BrokerError::Config("bucket must not be empty".to_owned()));
        }
        if self.presign_expires_secs == 0 || self.presign_expires_secs > MAX_PRESIGN_EXPIRES_SECS
        {
            return Err(BrokerError::Config(format!(
                "presign expiry must be between 1 and {MAX_PRESIGN_EXPIRES_SECS} seconds, got {}",
                self.presign_expires_secs
            )));
        }
        Ok(())
    }

    /// The mount path normalized to a leading slash and no trailing slash.
    /// The root mount is the empty string.
    #[must_use]
    pub fn normalized_mount_path(&self) -> String {
        let trimmed = self.mount_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_secs(name: &str, value: &str) -> BrokerResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| BrokerError::Config(format!("{name} must be a whole number of seconds")))
}
