//! Computed Implementation
//!
//! A Computed cell projects one source signal through a forward function
//! and, optionally, maps writes back through an inverse. It is the smallest
//! derived cell that still exercises the public-set path: widgets bound to
//! a computed cell write through the inverse into the source, and the
//! source's change flows back out through the forward function.
//!
//! Only single-source projections are supported.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::TrackingScope;
use super::signal::{Signal, VariableId};
use super::subscriber::{Notifiers, Subscription};
use crate::binding::CycleContext;
use crate::error::{BindError, Result};

type Forward<T, S> = Arc<dyn Fn(&S) -> T + Send + Sync>;
type Inverse<T, S> = Arc<dyn Fn(&T) -> S + Send + Sync>;

/// A derived cell over a single source signal.
///
/// The projected value is cached and refreshed whenever the source changes.
/// Clones share the cache, the subscribers and the link to the source; the
/// link is released when the last clone is dropped.
pub struct Computed<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    id: VariableId,
    source: Signal<S>,
    inverse: Option<Inverse<T, S>>,
    value: Arc<RwLock<T>>,
    notifiers: Notifiers,
    _link: Arc<Subscription>,
}

impl<T, S> Computed<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    /// Create a bidirectional projection of `source`.
    pub fn new<F, I>(source: &Signal<S>, forward: F, inverse: I) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
        I: Fn(&T) -> S + Send + Sync + 'static,
    {
        Self::build(source, Arc::new(forward), Some(Arc::new(inverse)))
    }

    /// Create a projection that rejects public sets.
    pub fn read_only<F>(source: &Signal<S>, forward: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self::build(source, Arc::new(forward), None)
    }

    fn build(source: &Signal<S>, forward: Forward<T, S>, inverse: Option<Inverse<T, S>>) -> Self {
        let value = Arc::new(RwLock::new(forward(&source.get_untracked())));
        let notifiers = Notifiers::default();

        // The link captures the source's value cell, never the source's
        // notifier list, so it cannot keep itself alive.
        let link = source.subscribe({
            let source_value = source.shared_value();
            let value = Arc::clone(&value);
            let notifiers = notifiers.clone();
            move |cx| {
                let next = forward(&source_value.read());
                *value.write() = next;
                notifiers.notify(cx);
            }
        });

        Self {
            id: VariableId::next(),
            source: source.clone(),
            inverse,
            value,
            notifiers,
            _link: Arc::new(link),
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn source_id(&self) -> VariableId {
        self.source.id()
    }

    /// Whether public sets can be routed back to the source.
    pub fn is_writable(&self) -> bool {
        self.inverse.is_some()
    }

    /// Get the projected value.
    ///
    /// Records both this cell and its source in the open tracking scope.
    pub fn get(&self) -> T {
        TrackingScope::record(self.id);
        TrackingScope::record(self.source.id());
        self.value.read().clone()
    }

    /// Overwrite the cached projection without touching the source.
    ///
    /// This is the internal set: it bypasses the inverse and is replaced by
    /// the next change of the source.
    pub fn set_with(&self, value: T, cx: &CycleContext) {
        *self.value.write() = value;
        self.notifiers.notify(cx);
    }

    /// Route `value` through the inverse into the source, in a fresh cycle.
    pub fn public_set(&self, value: T) -> Result<()> {
        self.public_set_with(value, &CycleContext::new())
    }

    /// Route `value` through the inverse into the source.
    ///
    /// The source notifies its own subscribers first, then this cell
    /// refreshes and notifies its subscribers, all within `cx`.
    pub fn public_set_with(&self, value: T, cx: &CycleContext) -> Result<()> {
        let inverse = self.inverse.as_ref().ok_or(BindError::ReadOnly(self.id))?;
        self.source.set_with(inverse(&value), cx);
        Ok(())
    }

    /// Register a change callback.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&CycleContext) + Send + Sync + 'static,
    {
        self.notifiers.subscribe(Arc::new(on_change))
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifiers.len()
    }
}

impl<T, S> Clone for Computed<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            source: self.source.clone(),
            inverse: self.inverse.clone(),
            value: Arc::clone(&self.value),
            notifiers: self.notifiers.clone(),
            _link: Arc::clone(&self._link),
        }
    }
}

impl<T, S> Debug for Computed<T, S>
where
    T: Clone + Send + Sync + Debug + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id)
            .field("source", &self.source.id())
            .field("value", &*self.value.read())
            .field("writable", &self.is_writable())
            .finish()
    }
}
