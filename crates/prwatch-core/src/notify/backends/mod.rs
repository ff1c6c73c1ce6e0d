mod linux;
mod macos;

pub use linux::LinuxNotificationSink;
pub use macos::MacOsNotificationSink;
