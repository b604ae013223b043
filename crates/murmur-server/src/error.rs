//! Error types for the module-server base.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while serving.
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Discovery interaction failed.
    #[error(transparent)]
    Client(#[from] murmur_client::ClientError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
