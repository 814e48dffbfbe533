//! Native notifications for phase changes

use notify_rust::Notification;
use tracing::debug;

use crate::state::Notice;

/// Shows a notice outside the in-page notice stream.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> Result<(), String>;
}

/// Desktop notification through the platform notification daemon.
#[derive(Debug, Default, Clone)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), String> {
        debug!("Showing desktop notification: {}", notice.title);
        Notification::new()
            .summary(&notice.title)
            .body(&notice.message)
            .appname("pomodoro-timer")
            .timeout(5000)
            .show()
            .map(|_| ())
            .map_err(|e| format!("Failed to show desktop notification: {}", e))
    }
}
