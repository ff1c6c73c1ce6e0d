//! Host visibility and focus signals.
//!
//! The scheduler never talks to a window system directly; it reads the
//! current [`HostState`] and follows changes through a `watch` channel.
//! Headless hosts use [`HostSignalsHandle::default`], which stays visible
//! and focused forever.

use tokio::sync::watch;

/// Visibility/focus of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostState {
    pub hidden: bool,
    pub focused: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            hidden: false,
            focused: true,
        }
    }
}

/// Capability to observe host visibility and OS focus.
pub trait HostSignals: Send + Sync {
    fn is_hidden(&self) -> bool;

    fn is_focused(&self) -> bool;

    /// Change subscription for both signals.
    fn subscribe(&self) -> watch::Receiver<HostState>;
}

/// Watch-channel backed host signal holder.
///
/// The host (tray shell, CLI, tests) drives it with `set_hidden` and
/// `set_focused`; every clone shares the same state.
#[derive(Debug, Clone)]
pub struct HostSignalsHandle {
    tx: std::sync::Arc<watch::Sender<HostState>>,
}

impl HostSignalsHandle {
    pub fn new(initial: HostState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn state(&self) -> HostState {
        *self.tx.borrow()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.hidden != hidden;
            state.hidden = hidden;
            changed
        });
    }

    pub fn set_focused(&self, focused: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.focused != focused;
            state.focused = focused;
            changed
        });
    }
}

impl Default for HostSignalsHandle {
    fn default() -> Self {
        Self::new(HostState::default())
    }
}

impl HostSignals for HostSignalsHandle {
    fn is_hidden(&self) -> bool {
        self.tx.borrow().hidden
    }

    fn is_focused(&self) -> bool {
        self.tx.borrow().focused
    }

    fn subscribe(&self) -> watch::Receiver<HostState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_visible_and_focused() {
        let host = HostSignalsHandle::default();
        assert!(!host.is_hidden());
        assert!(host.is_focused());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let host = HostSignalsHandle::default();
        let mut rx = host.subscribe();

        host.set_hidden(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().hidden);

        host.set_focused(false);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().focused);
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let host = HostSignalsHandle::default();
        let rx = host.subscribe();
        host.set_hidden(false);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_clones_share_state() {
        let host = HostSignalsHandle::default();
        let clone = host.clone();
        clone.set_hidden(true);
        assert!(host.is_hidden());
        assert!(host.state().hidden);
    }
}
