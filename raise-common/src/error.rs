//! Common error types for RAISE workers

use thiserror::Error;

/// Common result type for RAISE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across RAISE workers
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Queue declaration, receive or publish error
    #[error("Queue error: {0}")]
    Queue(String),
}
