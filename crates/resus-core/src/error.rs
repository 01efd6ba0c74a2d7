//! Core error types for resus-core.
//!
//! The state machine itself has almost no failure modes: it works on in-memory
//! state only. Errors come from driving a case outside its lifecycle and from
//! loading or saving configuration.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::case::CasePhase;

/// Core error type for resus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A clinical action was recorded while the case was not running.
    #[error("Case is not active (phase: {phase:?})")]
    CaseNotActive { phase: CasePhase },

    /// An ended case cannot be restarted; a new case has to be created.
    #[error("Case {0} has ended")]
    CaseEnded(Uuid),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Dot-path key does not name a configuration value
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No home directory to derive the data directory from
    #[error("Cannot determine the configuration directory")]
    NoDataDir,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
