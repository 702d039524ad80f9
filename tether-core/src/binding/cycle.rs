//! Propagation cycle context.
//!
//! The set of view handles already updated in the current cycle. One is
//! created per top-level change or per user-originated event and passed
//! explicitly down the setter and propagation path. It is `!Sync`: a cycle
//! never crosses threads.

use std::cell::RefCell;
use std::fmt;

use smallvec::SmallVec;

use crate::view::HandleId;

/// Handles already updated in one propagation cycle.
#[derive(Default)]
pub struct CycleContext {
    updated: RefCell<SmallVec<[HandleId; 4]>>,
}

impl CycleContext {
    /// An empty context, for changes that did not come from a widget.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context pre-seeded with the handle that originated the change.
    pub fn seeded(origin: HandleId) -> Self {
        let cx = Self::new();
        cx.mark(origin);
        cx
    }

    /// Whether `handle` has already been updated in this cycle.
    pub fn contains(&self, handle: HandleId) -> bool {
        self.updated.borrow().contains(&handle)
    }

    /// Mark `handle` as updated. Returns false if it already was.
    pub fn mark(&self, handle: HandleId) -> bool {
        let mut updated = self.updated.borrow_mut();
        if updated.contains(&handle) {
            return false;
        }
        updated.push(handle);
        true
    }

    pub fn len(&self) -> usize {
        self.updated.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updated.borrow().is_empty()
    }

    /// Handles in the order they were marked.
    pub fn updated(&self) -> Vec<HandleId> {
        self.updated.borrow().to_vec()
    }
}

impl fmt::Debug for CycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.updated.borrow().iter()).finish()
    }
}
