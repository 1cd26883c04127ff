//! Error types for the partsmith core.

/// Core error type for partsmith configuration.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A required setting is absent.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting is present but unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for partsmith core operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
