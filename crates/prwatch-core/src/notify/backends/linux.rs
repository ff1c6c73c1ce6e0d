//! Linux notification sink using notify-send (libnotify).

use async_trait::async_trait;

use crate::notify::errors::NotifyError;
use crate::notify::traits::{Notification, NotificationSink};

/// Linux notification sink via `notify-send` (libnotify).
pub struct LinuxNotificationSink;

/// `notify-send` has no subtitle slot; fold it into the body.
fn compose_body(notification: &Notification) -> String {
    let mut body = match notification.subtitle.as_deref() {
        Some(subtitle) => format!("{}\n{}", subtitle, notification.body),
        None => notification.body.clone(),
    };
    if let Some(url) = notification.url.as_deref() {
        body.push('\n');
        body.push_str(url);
    }
    body
}

#[async_trait]
impl NotificationSink for LinuxNotificationSink {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux") && which::which("notify-send").is_ok()
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let output = tokio::process::Command::new("notify-send")
            .arg("--app-name=prwatch")
            .arg(&notification.title)
            .arg(compose_body(notification))
            .output()
            .await
            .map_err(|e| NotifyError::SendFailed {
                message: format!("notify-send exec failed: {}", e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotifyError::SendFailed {
                message: format!("notify-send exit {}: {}", output.status, stderr.trim()),
            })
        }
    }
}
