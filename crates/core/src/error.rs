//! Error types shared by the window layer and the application.

use thiserror::Error;

/// Main error type for the course renderer's platform-facing code.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors raised outside the RHI (surface creation, extension queries)
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration value
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using the course renderer's Error type.
pub type Result<T> = std::result::Result<T, Error>;
