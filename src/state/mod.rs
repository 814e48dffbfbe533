//! State management module
//!
//! This module contains the timer state machine, its settings and events,
//! and the controller that owns the single timer instance.

pub mod app_state;
pub mod events;
pub mod timer_config;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use events::{Notice, NoticeLevel, TimerAction, TimerEvent};
pub use timer_config::{TimerConfig, TimerConfigInput};
pub use timer_state::{Phase, TaskId, TaskSignal, Tick, TimerSnapshot, TimerState, Transition};
