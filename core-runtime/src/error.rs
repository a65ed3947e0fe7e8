//! Error types for runtime infrastructure.

use thiserror::Error;

/// Errors produced while configuring or bootstrapping the engine runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging subsystem could not be initialized
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
