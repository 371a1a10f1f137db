//! Registry of live windows and their inboxes.

use std::collections::{BTreeMap, BTreeSet};

use backplane_core::{Error, SyncEvent, WindowHandle};
use tokio::sync::mpsc;

/// A message delivered to one window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    Sync { channel: &'static str, event: SyncEvent },
}

pub type Inbox = mpsc::UnboundedSender<WindowEvent>;

/// Every live window, in handle order.
///
/// Handles of destroyed windows are remembered so a stale handle cannot be
/// registered again.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: BTreeMap<WindowHandle, Inbox>,
    /// Never pruned: one entry per window destroyed during the process
    /// lifetime, since handles are never reused.
    retired: BTreeSet<WindowHandle>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, window: WindowHandle, inbox: Inbox) -> Result<(), Error> {
        if self.retired.contains(&window) {
            return Err(Error::WindowRetired(window));
        }
        if self.windows.insert(window, inbox).is_some() {
            tracing::warn!(window = %window, "window registered twice, replacing inbox");
        }
        Ok(())
    }

    /// Remove a window. Returns false if it was not registered.
    pub fn unregister(&mut self, window: WindowHandle) -> bool {
        self.retired.insert(window);
        self.windows.remove(&window).is_some()
    }

    pub fn is_retired(&self, window: WindowHandle) -> bool {
        self.retired.contains(&window)
    }

    pub fn all_except(&self, origin: WindowHandle) -> Vec<WindowHandle> {
        self.windows.keys().copied().filter(|w| *w != origin).collect()
    }

    pub fn inbox(&self, window: WindowHandle) -> Option<&Inbox> {
        self.windows.get(&window)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbox() -> Inbox {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn test_all_except_excludes_origin() {
        let mut registry = WindowRegistry::new();
        for id in [3, 1, 2] {
            registry.register(WindowHandle(id), inbox()).unwrap();
        }

        assert_eq!(registry.all_except(WindowHandle(0)), vec![WindowHandle(1), WindowHandle(2), WindowHandle(3)]);
        assert_eq!(registry.all_except(WindowHandle(2)), vec![WindowHandle(1), WindowHandle(3)]);
        assert_eq!(registry.all_except(WindowHandle(9)).len(), 3);
    }

    #[test]
    fn test_unregister_retires_handle() {
        let mut registry = WindowRegistry::new();
        registry.register(WindowHandle(1), inbox()).unwrap();

        assert!(registry.unregister(WindowHandle(1)));
        assert!(!registry.unregister(WindowHandle(1)));
        assert_eq!(registry.len(), 0);
        assert!(registry.is_retired(WindowHandle(1)));
        assert!(matches!(
            registry.register(WindowHandle(1), inbox()),
            Err(Error::WindowRetired(WindowHandle(1)))
        ));
    }
}
