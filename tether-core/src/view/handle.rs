//! View handles.
//!
//! A view handle is the server-side stand-in for one live widget instance in
//! a remote client. The engine never looks inside it; it only pushes values
//! or fire signals at it and compares identities.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::binding::{CycleContext, Value};

/// Identity of a view handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Generate a new unique handle ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Receiver side of a widget.
///
/// Implementations typically forward to the transport that talks to the
/// client. Both methods run synchronously inside a propagation pass and may
/// call back into the engine (attach, detach, set a variable).
///
/// `cx` is the cycle the delivery belongs to. A handle that sets a variable
/// in response should pass it on (`set_with(value, cx)`): handles already
/// updated in the cycle are then skipped, which stops chains of handles
/// feeding each other's variables from looping.
pub trait ViewHandle: Send + Sync {
    /// Stable identity, used for deduplication and self-echo suppression.
    fn id(&self) -> HandleId;

    /// Deliver a new (already mapped) value.
    fn update(&self, value: &Value, cx: &CycleContext);

    /// Deliver a pulse. Pulse bindings never carry a payload.
    fn fire(&self, cx: &CycleContext);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Delivery {
        Update(HandleId, Value),
        Fire(HandleId),
    }

    pub(crate) type Log = Arc<Mutex<Vec<Delivery>>>;

    /// Handle that appends every delivery to a shared log.
    pub(crate) struct Recorder {
        id: HandleId,
        log: Log,
    }

    impl Recorder {
        pub(crate) fn new(log: &Log) -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::new(),
                log: Arc::clone(log),
            })
        }
    }

    impl ViewHandle for Recorder {
        fn id(&self) -> HandleId {
            self.id
        }

        fn update(&self, value: &Value, _cx: &CycleContext) {
            self.log.lock().push(Delivery::Update(self.id, value.clone()));
        }

        fn fire(&self, _cx: &CycleContext) {
            self.log.lock().push(Delivery::Fire(self.id));
        }
    }
}
