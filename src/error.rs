//! Error types for the pot simulator

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the simulator
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone or speaker unavailable, or the device refused a stream
    #[error("audio device error: {0}")]
    Device(String),

    /// A capture session ended with zero samples recorded
    #[error("no audio captured")]
    EmptyCapture,

    /// Audio encoding, decoding, or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Network-layer failure talking to the backend
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend error: {0}")]
    Backend(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
