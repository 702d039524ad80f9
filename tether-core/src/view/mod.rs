//! View side of the engine.
//!
//! Everything a widget implementation needs: the [`ViewHandle`] trait it
//! implements, the [`ViewEvent`]s its live instance sends, and the
//! [`Attachment`] that applies those events with self-echo suppression.

mod attachment;
mod event;
mod handle;

pub use attachment::Attachment;
pub use event::{EventOutcome, ViewEvent};
pub use handle::{HandleId, ViewHandle};

#[cfg(test)]
pub(crate) use handle::testing;
