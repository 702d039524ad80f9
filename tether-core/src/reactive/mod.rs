//! Reactive Primitives
//!
//! A deliberately small reactive layer that satisfies the boundary the
//! binding engine consumes: read the current value, set it internally, set
//! it publicly (through an inverse when the cell is derived), subscribe with
//! a cancellable subscription, and fire stateless pulses.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a plain value cell. Every set notifies subscribers.
//!
//! ## Computed cells
//!
//! A [`Computed`] projects one source signal. Public sets travel back
//! through an inverse function into the source; internal sets only touch the
//! cached projection.
//!
//! ## Triggers
//!
//! A [`Trigger`] holds no value. Firing it notifies subscribers that an
//! occurrence happened.
//!
//! # Cycle context
//!
//! Setters and change callbacks take a [`CycleContext`](crate::binding::CycleContext)
//! explicitly. A widget that originates a change seeds its own handle into
//! the context, and the context travels with the notification to every
//! binding the change reaches.
//!
//! # Tracking
//!
//! Reads inside a [`TrackingScope`] are recorded. Bindings open a scope
//! around each read so that a propagation run registers the cells it
//! depends on, including pulse cells that have no value to read.

mod signal;
mod computed;
mod trigger;
mod context;
mod subscriber;

pub use signal::{Signal, VariableId};
pub use computed::Computed;
pub use trigger::Trigger;
pub use context::{TrackedReads, TrackingScope};
pub use subscriber::{ChangeFn, SubscriberId, Subscription};
