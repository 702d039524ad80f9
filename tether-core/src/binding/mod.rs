//! Binding Engine
//!
//! Keeps reactive variables and the view handles observing them in sync.
//!
//! # Pieces
//!
//! - [`BindingRegistry`]: one [`Binding`] per (variable, attribute) pair,
//!   created on first request, torn down only by [`BindingRegistry::clear_all`]
//!   or by dropping the registry.
//! - [`Binding`]: owns the variable subscription and the ordered set of
//!   attached handles, and runs the propagation pass.
//! - [`CycleContext`]: the handles already updated in one cycle. It is passed
//!   explicitly from the setter that starts a change to every binding the
//!   change reaches.
//! - [`Variable`]: the tagged value/pulse boundary to the reactive layer.
//!
//! # Data flow
//!
//! ```text
//! widget event ──► Attachment ──► public setter (cx seeded with own handle)
//!                                        │
//!                                        ▼
//!                               cell notifies subscribers (cx)
//!                                        │
//!                                        ▼
//!                          Binding::propagate(cx) ──► other handles
//! ```

mod cycle;
mod fanout;
mod key;
mod registry;
mod variable;

pub use cycle::CycleContext;
pub use fanout::{Binding, MapFn};
pub use key::BindingKey;
pub use registry::BindingRegistry;
pub use variable::{PulseCell, Value, ValueCell, Variable};
