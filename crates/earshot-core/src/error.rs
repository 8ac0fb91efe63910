//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A native playback handle the backend does not know about
    #[error("Unknown playback handle: {0}")]
    UnknownHandle(u32),

    /// A clip the backend has no data for
    #[error("Unknown clip: {0}")]
    UnknownClip(u32),

    /// Failure reported by the native playback engine
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
