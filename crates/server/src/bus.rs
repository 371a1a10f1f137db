//! Fan-out of sync events to window inboxes.

use backplane_core::{Collection, SyncEvent, WindowHandle};

use crate::windows::{WindowEvent, WindowRegistry};

/// Deliver `event` on the sync channel of `collection` to every registered
/// window except `excluding`, in registry order.
///
/// Delivery never blocks and is never retried; a window whose inbox is
/// already closed is skipped. Returns the number of windows reached.
pub fn publish(registry: &WindowRegistry, collection: Collection, excluding: WindowHandle, event: &SyncEvent) -> usize {
    let channel = collection.sync_channel();
    let mut delivered = 0;
    for window in registry.all_except(excluding) {
        let Some(inbox) = registry.inbox(window) else {
            continue;
        };
        match inbox.send(WindowEvent::Sync { channel, event: event.clone() }) {
            Ok(()) => delivered += 1,
            Err(_) => tracing::debug!(window = %window, channel, "window inbox closed, skipping"),
        }
    }
    tracing::debug!(channel, origin = %excluding, delivered, "published sync event");
    delivered
}
