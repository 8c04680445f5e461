//! Error types for guardian-core, one enum per domain.
//!
//! None of these are fatal to a session: the controller degrades to a safe
//! default wherever one exists, and the trigger/cancel path never returns
//! an error at all.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config directory could not be resolved or created
    #[error("Config directory unavailable at {path}: {source}")]
    DirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field left blank
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Errors from the hosted language-model oracles.
#[derive(Error, Debug)]
pub enum OracleError {
    /// No API key configured
    #[error("No API key configured for the oracle")]
    MissingApiKey,

    /// Transport failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be interpreted
    #[error("Failed to parse oracle response: {0}")]
    Parse(String),

    /// Response had no candidate text
    #[error("Oracle returned an empty response")]
    EmptyResponse,

    /// Endpoint URL could not be built
    #[error("Invalid oracle endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Device API failures (location, camera, speech).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device API not present on this platform
    #[error("{0} unavailable")]
    Unavailable(String),
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Parse(err.to_string())
    }
}
