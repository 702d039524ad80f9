//! Signal Implementation
//!
//! A Signal is a plain value cell. It holds a value, reports reads to the
//! open tracking scope, and notifies its subscribers on every set.
//!
//! # Cycle context
//!
//! Every set carries a [`CycleContext`]. [`Signal::set`] starts a fresh
//! one; [`Signal::set_with`] forwards a caller-supplied context, which is
//! how a widget's own handle stays marked as already updated while the
//! change fans out.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock` and subscribers are
//! snapshotted before notification, so a subscriber may set the signal
//! again from inside its callback.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::TrackingScope;
use super::subscriber::{Notifiers, Subscription};
use crate::binding::CycleContext;

/// Stable identity of a reactive variable.
///
/// Signals, computed cells and triggers draw from the same counter, so ids
/// never collide across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl VariableId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VariableId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A reactive cell holding a value of type T.
///
/// Clones share the same value and subscribers.
///
/// ```rust,ignore
/// let level = Signal::new(0.5);
/// let _sub = level.subscribe(|_cx| println!("changed"));
/// level.set(0.7); // prints "changed"
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: VariableId,
    value: Arc<RwLock<T>>,
    notifiers: Notifiers,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: VariableId::next(),
            value: Arc::new(RwLock::new(value)),
            notifiers: Notifiers::default(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> VariableId {
        self.id
    }

    /// Get the current value, recording the read in the open tracking scope.
    pub fn get(&self) -> T {
        TrackingScope::record(self.id);
        self.get_untracked()
    }

    /// Get the current value without recording a read.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers in a fresh cycle.
    pub fn set(&self, value: T) {
        self.set_with(value, &CycleContext::new());
    }

    /// Set a new value and notify subscribers within an existing cycle.
    pub fn set_with(&self, value: T, cx: &CycleContext) {
        *self.value.write() = value;
        self.notifiers.notify(cx);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.read());
        self.set(next);
    }

    /// Register a change callback.
    ///
    /// The callback stays registered until the returned subscription is
    /// cancelled or dropped.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&CycleContext) + Send + Sync + 'static,
    {
        self.notifiers.subscribe(Arc::new(on_change))
    }

    /// Get the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.notifiers.len()
    }

    pub(super) fn shared_value(&self) -> Arc<RwLock<T>> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            notifiers: self.notifiers.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
