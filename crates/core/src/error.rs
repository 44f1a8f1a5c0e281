// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Running the bridge failed
    #[error("Process error: {0}")]
    Process(#[from] crate::port::ProcessError),

    /// Starting the mirroring viewer failed; the bridge itself is unaffected
    #[error("Viewer launch failed: {0}")]
    Launch(crate::port::ProcessError),

    #[error("Tool missing: {0}")]
    ToolMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
