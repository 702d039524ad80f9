//! Tracking Scope
//!
//! A tracking scope records which variables a computation reads. Bindings
//! open a scope around every read of their variable, so each propagation
//! run registers as a dependent of the cells it touched, pulse cells
//! included.
//!
//! # Implementation
//!
//! A thread-local stack of open scopes. Reads are recorded into the
//! innermost scope only, so nested scopes keep their reads apart. A computed
//! cell's `get` records itself and its source, both into the same scope.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::{SubscriberId, VariableId};

/// Variables read inside one scope, in first-read order.
pub type TrackedReads = SmallVec<[VariableId; 4]>;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug)]
struct ScopeEntry {
    subscriber_id: SubscriberId,
    reads: TrackedReads,
}

/// Guard for an open tracking scope.
///
/// The scope is closed when the guard is finished or dropped, whichever
/// happens first.
pub struct TrackingScope {
    subscriber_id: SubscriberId,
    open: bool,
}

impl TrackingScope {
    /// Open a scope on behalf of the given subscriber.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeEntry {
                subscriber_id,
                reads: TrackedReads::new(),
            });
        });

        Self {
            subscriber_id,
            open: true,
        }
    }

    /// Whether any scope is open on this thread.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The subscriber owning the innermost scope.
    pub fn current_subscriber() -> Option<SubscriberId> {
        SCOPE_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Record a read of `variable` in the innermost scope.
    ///
    /// No-op outside a scope. Repeated reads are recorded once.
    pub fn record(variable: VariableId) {
        SCOPE_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.reads.contains(&variable) {
                    entry.reads.push(variable);
                }
            }
        });
    }

    /// Close the scope and return what was read inside it.
    pub fn finish(mut self) -> TrackedReads {
        self.open = false;
        self.pop().map(|entry| entry.reads).unwrap_or_default()
    }

    fn pop(&self) -> Option<ScopeEntry> {
        let popped = SCOPE_STACK.with(|stack| stack.borrow_mut().pop());
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.subscriber_id, self.subscriber_id,
                "TrackingScope mismatch: expected {:?}, got {:?}",
                self.subscriber_id, entry.subscriber_id
            );
        }
        popped
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        if self.open {
            self.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_subscriber().is_none());

        {
            let _scope = TrackingScope::enter(id);
            assert!(TrackingScope::is_active());
            assert_eq!(TrackingScope::current_subscriber(), Some(id));
        }

        assert!(!TrackingScope::is_active());
    }

    #[test]
    fn finish_returns_reads_once_each() {
        let scope = TrackingScope::enter(SubscriberId::new());
        let a = VariableId::from(1);
        let b = VariableId::from(2);

        TrackingScope::record(a);
        TrackingScope::record(b);
        TrackingScope::record(a);

        assert_eq!(scope.finish().as_slice(), &[a, b]);
        assert!(!TrackingScope::is_active());
    }

    #[test]
    fn record_outside_scope_is_ignored() {
        TrackingScope::record(VariableId::from(9));
        assert!(!TrackingScope::is_active());
    }

    #[test]
    fn nested_scopes_keep_reads_apart() {
        let outer = TrackingScope::enter(SubscriberId::new());
        TrackingScope::record(VariableId::from(1));

        let inner = TrackingScope::enter(SubscriberId::new());
        TrackingScope::record(VariableId::from(2));
        assert_eq!(inner.finish().as_slice(), &[VariableId::from(2)]);

        assert_eq!(outer.finish().as_slice(), &[VariableId::from(1)]);
    }
}
