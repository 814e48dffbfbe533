//! Error types for the timer daemon

use thiserror::Error;

/// Errors raised by the controller and its collaborators.
///
/// None of these ever change the timer's phase or countdown; callers log
/// them or turn them into a user-visible notice.
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("Failed to lock {0}")]
    LockPoisoned(&'static str),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Task service returned status {0}")]
    Status(u16),

    #[error("Invalid task service URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, TimerError>;
