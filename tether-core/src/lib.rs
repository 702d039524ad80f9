//! Tether Core
//!
//! Keeps server-side reactive variables synchronized, in both directions,
//! with interactive widgets rendered in a remote client:
//!
//! - Deduplicated subscriptions: one binding per (variable, attribute)
//! - Ordered fan-out of every change to all attached view handles
//! - Self-echo suppression: a widget's own change is never written back
//!   into it
//! - Pulse ("bang") variables that fire without a payload
//!
//! Rendering, transport and markup are left to the embedding application.
//!
//! # Architecture
//!
//! - `reactive`: minimal value, computed and pulse cells
//! - `binding`: registry, bindings, propagation and the cycle context
//! - `view`: the handle trait, inbound widget events and the attachment
//!   protocol
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{Attachment, BindingRegistry, Signal, Variable, ViewEvent};
//!
//! let registry = BindingRegistry::new();
//! let volume = Variable::from(Signal::new(0.5));
//!
//! let knob = Attachment::open(&registry, &volume, "value", knob_handle)?;
//! let slider = Attachment::open(&registry, &volume, "value", slider_handle)?;
//!
//! // The user drags the slider: the knob is updated, the slider is not.
//! slider.handle_event(ViewEvent::change(0.7));
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod reactive;
pub mod view;

pub use binding::{Binding, BindingKey, BindingRegistry, CycleContext, MapFn, Value, Variable};
pub use config::RegistryConfig;
pub use error::{BindError, Result};
pub use reactive::{Computed, Signal, Trigger, VariableId};
pub use view::{Attachment, EventOutcome, HandleId, ViewEvent, ViewHandle};
