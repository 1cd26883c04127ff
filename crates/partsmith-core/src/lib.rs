//! Configuration and shared error types for partsmith.
//!
//! The broker is configured once at startup from the environment and the
//! resulting [`BrokerConfig`] is treated as an immutable value afterwards.

mod config;
mod error;

pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult};
