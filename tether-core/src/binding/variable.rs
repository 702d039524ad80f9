//! The variable boundary seen by bindings.
//!
//! Bindings are keyed by variable identity and carry JSON payloads, so the
//! typed cells of the reactive layer are erased behind two object-safe
//! traits, one per kind. [`Variable`] is the tagged union of the two.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CycleContext;
use crate::error::{BindError, Result};
use crate::reactive::{ChangeFn, Computed, Signal, Subscription, Trigger, VariableId};

/// Payload exchanged with view handles.
pub type Value = serde_json::Value;

/// A value-carrying variable, seen through JSON payloads.
pub trait ValueCell: Send + Sync {
    fn id(&self) -> VariableId;

    /// Read the current value, recording the read in the open tracking scope.
    fn read(&self) -> Result<Value>;

    /// Internal set: bypasses any inverse routing.
    fn write(&self, value: Value, cx: &CycleContext) -> Result<()>;

    /// Public set: routes through the inverse when the cell is derived.
    fn public_write(&self, value: Value, cx: &CycleContext) -> Result<()> {
        self.write(value, cx)
    }

    fn watch(&self, on_change: ChangeFn) -> Subscription;
}

/// A pulse-only variable.
pub trait PulseCell: Send + Sync {
    fn id(&self) -> VariableId;

    /// Record a read in the open tracking scope. There is no payload.
    fn touch(&self);

    fn pulse(&self, cx: &CycleContext);

    fn watch(&self, on_pulse: ChangeFn) -> Subscription;
}

/// A variable a binding can observe.
#[derive(Clone)]
pub enum Variable {
    Value(Arc<dyn ValueCell>),
    Pulse(Arc<dyn PulseCell>),
}

impl Variable {
    pub fn value<C: ValueCell + 'static>(cell: C) -> Self {
        Self::Value(Arc::new(cell))
    }

    pub fn pulse<C: PulseCell + 'static>(cell: C) -> Self {
        Self::Pulse(Arc::new(cell))
    }

    pub fn id(&self) -> VariableId {
        match self {
            Self::Value(cell) => cell.id(),
            Self::Pulse(cell) => cell.id(),
        }
    }

    pub fn is_pulse(&self) -> bool {
        matches!(self, Self::Pulse(_))
    }

    /// Read the payload for delivery. Pulse variables only record the read
    /// and yield `None`.
    pub(crate) fn read(&self) -> Result<Option<Value>> {
        match self {
            Self::Value(cell) => cell.read().map(Some),
            Self::Pulse(cell) => {
                cell.touch();
                Ok(None)
            }
        }
    }

    pub(crate) fn watch(&self, on_change: ChangeFn) -> Subscription {
        match self {
            Self::Value(cell) => cell.watch(on_change),
            Self::Pulse(cell) => cell.watch(on_change),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(cell) => f.debug_tuple("Value").field(&cell.id()).finish(),
            Self::Pulse(cell) => f.debug_tuple("Pulse").field(&cell.id()).finish(),
        }
    }
}

fn encode<T: Serialize>(variable: VariableId, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| BindError::Encode { variable, source })
}

fn decode<T: DeserializeOwned>(variable: VariableId, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| BindError::Decode { variable, source })
}

impl<T> ValueCell for Signal<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn id(&self) -> VariableId {
        Signal::id(self)
    }

    fn read(&self) -> Result<Value> {
        encode(Signal::id(self), &self.get())
    }

    fn write(&self, value: Value, cx: &CycleContext) -> Result<()> {
        let value = decode(Signal::id(self), value)?;
        self.set_with(value, cx);
        Ok(())
    }

    fn watch(&self, on_change: ChangeFn) -> Subscription {
        self.subscribe(move |cx| on_change(cx))
    }
}

impl<T, S> ValueCell for Computed<T, S>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn id(&self) -> VariableId {
        Computed::id(self)
    }

    fn read(&self) -> Result<Value> {
        encode(Computed::id(self), &self.get())
    }

    fn write(&self, value: Value, cx: &CycleContext) -> Result<()> {
        let value = decode(Computed::id(self), value)?;
        self.set_with(value, cx);
        Ok(())
    }

    fn public_write(&self, value: Value, cx: &CycleContext) -> Result<()> {
        let value = decode(Computed::id(self), value)?;
        self.public_set_with(value, cx)
    }

    fn watch(&self, on_change: ChangeFn) -> Subscription {
        self.subscribe(move |cx| on_change(cx))
    }
}

impl PulseCell for Trigger {
    fn id(&self) -> VariableId {
        Trigger::id(self)
    }

    fn touch(&self) {
        self.track();
    }

    fn pulse(&self, cx: &CycleContext) {
        self.pulse_with(cx);
    }

    fn watch(&self, on_pulse: ChangeFn) -> Subscription {
        self.subscribe(move |cx| on_pulse(cx))
    }
}

impl<T> From<Signal<T>> for Variable
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        Self::value(signal)
    }
}

impl<T, S> From<Computed<T, S>> for Variable
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn from(computed: Computed<T, S>) -> Self {
        Self::value(computed)
    }
}

impl From<Trigger> for Variable {
    fn from(trigger: Trigger) -> Self {
        Self::pulse(trigger)
    }
}
