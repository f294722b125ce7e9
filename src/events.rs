//! Typed publish/subscribe hub between the polling loop and UI consumers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::campaign::Campaign;

/// Event names consumers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CampaignsUpdated,
}

/// Events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    /// The visible campaign list changed, or a dismissal needs re-evaluation.
    CampaignsUpdated { campaigns: Arc<[Campaign]> },
}

impl SdkEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SdkEvent::CampaignsUpdated { .. } => EventKind::CampaignsUpdated,
        }
    }
}

/// Subscriber handle. The same `Arc` must be passed to `off` to unsubscribe.
pub type Callback = Arc<dyn Fn(&SdkEvent) + Send + Sync>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&SdkEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered observer lists keyed by event kind.
///
/// Callbacks are identified by `Arc` pointer identity. Registering the same
/// callback twice delivers every event to it twice.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<HashMap<EventKind, Vec<Callback>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, callback: Callback) {
        self.subscribers
            .lock()
            .entry(kind)
            .or_default()
            .push(callback);
    }

    /// Remove the first registration of `callback`. Unknown callbacks are ignored.
    pub fn off(&self, kind: EventKind, callback: &Callback) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(&kind) {
            if let Some(pos) = list.iter().position(|c| Arc::ptr_eq(c, callback)) {
                list.remove(pos);
            }
        }
    }

    /// Deliver `event` to every callback registered for its kind, in
    /// registration order, on the caller's thread.
    ///
    /// The callback list is snapshotted before delivery and the lock is
    /// released, so callbacks may call `on`/`off`; those changes take effect
    /// from the next emit. A panicking callback unwinds into the caller and
    /// later callbacks are skipped.
    pub fn emit(&self, event: &SdkEvent) {
        let snapshot: Vec<Callback> = self
            .subscribers
            .lock()
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}
