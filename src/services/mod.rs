//! Collaborators of the timer
//!
//! This module contains the task service client, the key-value store used
//! for settings and the task association, and native notifications.

pub mod notifier;
pub mod store;
pub mod task_service;

// Re-export main types
pub use notifier::{DesktopNotifier, Notifier};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use task_service::{DisabledTaskService, HttpTaskService, TaskService, TaskStatus};
