//! Error types for the simulation core
//!
//! Every error here is recoverable: callers log and continue.

/// Error type for configuration loading and story control
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Story id not present in the catalog
    #[error("Unknown story: {0}")]
    UnknownStory(u32),

    /// Tuning values that cannot drive a simulation
    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),

    /// Story definition that cannot be played
    #[error("Invalid story: {0}")]
    InvalidStory(String),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation-core operations
pub type Result<T> = std::result::Result<T, Error>;
