//! Trigger Implementation
//!
//! A Trigger is a stateless pulse ("bang"). It carries no value: firing it
//! only tells subscribers that an occurrence happened.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::context::TrackingScope;
use super::signal::VariableId;
use super::subscriber::{Notifiers, Subscription};
use crate::binding::CycleContext;

/// A payload-free reactive cell.
#[derive(Clone)]
pub struct Trigger {
    id: VariableId,
    notifiers: Notifiers,
    pulses: Arc<AtomicU64>,
}

impl Trigger {
    pub fn new() -> Self {
        Self {
            id: VariableId::next(),
            notifiers: Notifiers::default(),
            pulses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    /// Record a read in the open tracking scope.
    ///
    /// There is nothing to return; this only registers the reader as a
    /// dependent.
    pub fn track(&self) {
        TrackingScope::record(self.id);
    }

    /// Fire in a fresh cycle.
    pub fn pulse(&self) {
        self.pulse_with(&CycleContext::new());
    }

    /// Fire within an existing cycle.
    pub fn pulse_with(&self, cx: &CycleContext) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
        self.notifiers.notify(cx);
    }

    /// Register a callback run on every pulse.
    pub fn subscribe<F>(&self, on_pulse: F) -> Subscription
    where
        F: Fn(&CycleContext) + Send + Sync + 'static,
    {
        self.notifiers.subscribe(Arc::new(on_pulse))
    }

    /// Number of times this trigger has fired.
    pub fn pulse_count(&self) -> u64 {
        self.pulses.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifiers.len()
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("pulses", &self.pulse_count())
            .finish()
    }
}
