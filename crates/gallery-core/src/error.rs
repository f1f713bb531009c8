//! Error types for gallery-core

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the gallery server
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted map could not be read or written
    #[error("Persistence error for {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A page template could not be loaded
    #[error("Cannot load page template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A suspicious-pattern rule failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An image directory could not be turned into a scan pattern
    #[error("Invalid scan pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Listener could not be bound
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Binding requires privileges the process does not have
    #[error("Permission denied binding port {port}")]
    PermissionDenied { port: u16 },
}
