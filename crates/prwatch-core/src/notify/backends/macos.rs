//! macOS notification sink using `osascript`.

use async_trait::async_trait;

use crate::notify::errors::NotifyError;
use crate::notify::traits::{Notification, NotificationSink};

/// macOS notification sink via `osascript -e 'display notification ...'`.
pub struct MacOsNotificationSink;

/// Escape a string for embedding in an AppleScript string literal.
fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn build_script(notification: &Notification) -> String {
    let mut script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(&notification.body),
        applescript_escape(&notification.title),
    );
    if let Some(subtitle) = notification.subtitle.as_deref() {
        script.push_str(&format!(" subtitle \"{}\"", applescript_escape(subtitle)));
    }
    script
}

#[async_trait]
impl NotificationSink for MacOsNotificationSink {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "macos") && which::which("osascript").is_ok()
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let output = tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(build_script(notification))
            .output()
            .await
            .map_err(|e| NotifyError::SendFailed {
                message: format!("osascript exec failed: {}", e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotifyError::SendFailed {
                message: format!("osascript exit {}: {}", output.status, stderr.trim()),
            })
        }
    }
}
