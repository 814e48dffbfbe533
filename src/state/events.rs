//! Timer events and user notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer_state::{Phase, TaskId, TimerState};

/// Named inputs that change the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerAction {
    Start,
    Pause,
    Reset,
    Complete,
    TaskSelected,
}

/// Emitted on every transition for any observer (UI, telemetry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerEvent {
    pub action: TimerAction,
    pub phase: Phase,
    pub completed_cycles: u32,
    pub total_cycles: u32,
    pub associated_task_id: Option<TaskId>,
    pub remaining_seconds: u64,
    pub running: bool,
    pub timestamp: DateTime<Utc>,
}

impl TimerEvent {
    pub fn from_state(action: TimerAction, timer: &TimerState) -> Self {
        Self {
            action,
            phase: timer.phase(),
            completed_cycles: timer.completed_cycles(),
            total_cycles: timer.config().cycles_per_long_break,
            associated_task_id: timer.associated_task_id().cloned(),
            remaining_seconds: timer.remaining_seconds(),
            running: timer.is_running(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient user-visible message (toast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, "Task", message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Task", message)
    }
}
