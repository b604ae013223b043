//! Module error types.

use thiserror::Error;

/// Errors produced by module discovery and registration.
#[derive(Error, Debug)]
pub enum ModuleError {
    /// A manifest file exists but could not be parsed or type-checked.
    /// Discovery treats this as a warning: the module degrades to
    /// defaults derived from its directory name.
    #[error("invalid manifest at {path}: {reason}")]
    ManifestInvalid {
        /// Path of the offending manifest file.
        path: String,
        /// Parser or type-check failure description.
        reason: String,
    },

    /// A module's registration hook failed. Caught by the coordinator;
    /// the host proceeds without that module's contribution.
    #[error("registration failed: {0}")]
    Registration(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ModuleError>;
