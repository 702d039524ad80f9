//! View attachment protocol.
//!
//! An [`Attachment`] is what a widget holds while it is live: the binding it
//! observes and its own handle. Opening one reads the initial value and
//! attaches the handle; inbound events go through
//! [`Attachment::handle_event`]; a `close` event is the only way to detach.
//!
//! A user-driven change is applied inside a cycle seeded with the widget's
//! own handle, so the resulting fan-out updates every other widget but never
//! echoes back into the one the user is touching.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{EventOutcome, HandleId, ViewEvent, ViewHandle};
use crate::binding::{Binding, BindingRegistry, CycleContext, Value, Variable};
use crate::error::Result;

/// A live widget's link to its binding.
pub struct Attachment {
    binding: Arc<Binding>,
    handle: Arc<dyn ViewHandle>,
    initial: Option<Value>,
    closed: AtomicBool,
}

impl Attachment {
    /// Bind `handle` to (`variable`, `attribute`).
    pub fn open(
        registry: &BindingRegistry,
        variable: &Variable,
        attribute: &str,
        handle: Arc<dyn ViewHandle>,
    ) -> Result<Self> {
        let binding = registry.get_or_create(variable, attribute);
        Self::with_binding(binding, handle)
    }

    /// Bind `handle` under the registry's default attribute.
    pub fn open_default(
        registry: &BindingRegistry,
        variable: &Variable,
        handle: Arc<dyn ViewHandle>,
    ) -> Result<Self> {
        Self::open(registry, variable, &registry.config().default_attribute, handle)
    }

    /// Attach `handle` to a binding obtained elsewhere, e.g. from
    /// [`BindingRegistry::get_or_create_batch`].
    ///
    /// The initial value is read before the handle is attached.
    pub fn with_binding(binding: Arc<Binding>, handle: Arc<dyn ViewHandle>) -> Result<Self> {
        let initial = binding.read_mapped()?;
        binding.attach(Arc::clone(&handle));

        Ok(Self {
            binding,
            handle,
            initial,
            closed: AtomicBool::new(false),
        })
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle.id()
    }

    /// Value to render before any update arrives. `None` for pulse widgets.
    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Parse and handle raw event text. Malformed text is ignored.
    pub fn handle_raw(&self, text: &str) -> EventOutcome {
        match ViewEvent::from_json(text) {
            Ok(event) => self.handle_event(event),
            Err(err) => {
                debug!(handle = %self.handle_id(), error = %err, "ignoring malformed event");
                EventOutcome::Ignored
            }
        }
    }

    /// Handle one event from the live widget.
    pub fn handle_event(&self, event: ViewEvent) -> EventOutcome {
        if self.is_closed() {
            debug!(handle = %self.handle_id(), "event after close ignored");
            return EventOutcome::Ignored;
        }

        let handle = self.handle_id();
        match (&event, self.binding.variable()) {
            (ViewEvent::Close, _) => {
                self.close();
                EventOutcome::Closed
            }
            (ViewEvent::Bang, Variable::Pulse(cell)) => {
                cell.pulse(&CycleContext::seeded(handle));
                EventOutcome::Fired
            }
            (ViewEvent::Change { .. }, Variable::Pulse(cell)) => match event.payload() {
                Some(_) => {
                    cell.pulse(&CycleContext::seeded(handle));
                    EventOutcome::Fired
                }
                None => EventOutcome::Ignored,
            },
            (ViewEvent::Bang, Variable::Value(_)) => {
                debug!(%handle, key = %self.binding.key(), "bang on a value binding ignored");
                EventOutcome::Ignored
            }
            (ViewEvent::Change { .. }, Variable::Value(cell)) => {
                let Some(value) = event.payload() else {
                    return EventOutcome::Ignored;
                };
                let cx = CycleContext::seeded(handle);
                match cell.public_write(value.clone(), &cx) {
                    Ok(()) => EventOutcome::Applied,
                    Err(err) => {
                        warn!(%handle, key = %self.binding.key(), error = %err, "change rejected");
                        EventOutcome::Ignored
                    }
                }
            }
        }
    }

    /// Detach from the binding. Returns false if already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.binding.detach(self.handle_id());
        debug!(handle = %self.handle_id(), key = %self.binding.key(), "view closed");
        true
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("key", self.binding.key())
            .field("handle", &self.handle_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}
