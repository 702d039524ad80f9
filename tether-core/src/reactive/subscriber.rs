//! Subscriber types for the reactive layer.
//!
//! A subscription ties a change callback to a reactive cell. Cancelling the
//! subscription is the only way to stop the callback from running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::binding::CycleContext;

/// Unique identifier for a subscriber.
///
/// Every change callback and every tracking scope gets one. Bindings use it
/// to identify themselves when they read a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked when a cell changes or fires.
///
/// The callback receives the cycle context of the change so that the
/// already-updated set flows from the setter to every binding it reaches.
pub type ChangeFn = Arc<dyn Fn(&CycleContext) + Send + Sync>;

/// Capability that tears down one subscription.
///
/// The teardown runs at most once: either through [`Subscription::cancel`]
/// or when the subscription is dropped.
pub struct Subscription {
    id: SubscriberId,
    teardown: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriberId, teardown: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            id,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// The subscriber this subscription belongs to.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stop receiving change notifications.
    pub fn cancel(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Shared list of change callbacks owned by a reactive cell.
#[derive(Clone, Default)]
pub(crate) struct Notifiers {
    entries: Arc<RwLock<Vec<(SubscriberId, ChangeFn)>>>,
}

impl Notifiers {
    /// Register a callback and hand back the capability that removes it.
    pub(crate) fn subscribe(&self, on_change: ChangeFn) -> Subscription {
        let id = SubscriberId::new();
        self.entries.write().push((id, on_change));

        let entries = Arc::downgrade(&self.entries);
        Subscription::new(id, move || {
            if let Some(entries) = entries.upgrade() {
                entries.write().retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Invoke every callback registered at the time of the call.
    ///
    /// The list is snapshotted first, so callbacks may subscribe, cancel or
    /// set the same cell again without deadlocking.
    pub(crate) fn notify(&self, cx: &CycleContext) {
        let snapshot: SmallVec<[ChangeFn; 4]> = self
            .entries
            .read()
            .iter()
            .map(|(_, on_change)| Arc::clone(on_change))
            .collect();

        for on_change in snapshot {
            on_change(cx);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
