//! Pomodoro Timer - A state-managed HTTP daemon for a focus/break timer
//!
//! This library provides the Pomodoro state machine, the controller that
//! drives its countdown and reports progress to an external task service,
//! and the HTTP API exposing it.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::TimerError;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
