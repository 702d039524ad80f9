//! Binding: subscription plus fan-out.
//!
//! A binding observes one (variable, attribute) pair on behalf of every
//! attached view handle. When the variable changes it runs a propagation
//! pass:
//!
//! 1. Read the current value inside a tracking scope. Pulse variables have
//!    nothing to read, but the read still runs so the pass registers as a
//!    dependent of the cell. The variables read are kept in
//!    [`Binding::tracked`].
//! 2. Visit the attached handles in attach order. A handle already in the
//!    cycle context is skipped; otherwise it is marked and receives the
//!    mapped value (or a fire signal for pulse bindings).
//!
//! # Draining
//!
//! Only one caller delivers for a binding at a time, and it holds no lock
//! while handle callbacks run. A change that arrives while a pass is in
//! flight, from a nested set on the same thread or from another thread,
//! marks the binding dirty and returns at once. The running caller notices
//! before its next delivery, abandons the stale value and runs again with a
//! fresh read. The last run therefore always delivers the latest value, and
//! two bindings whose handles set each other's variables never wait on
//! each other.
//!
//! On a rerun caused by a set within the same cycle, handles this binding
//! already updated with the stale value are updated again; origins seeded
//! elsewhere stay skipped. A rerun caused by another cycle skips exactly the
//! handles that cycle had already updated when it changed the variable.
//!
//! # Handle set
//!
//! The handle set sits behind a mutex and is snapshotted at the start of a
//! run, so handles may attach or detach (themselves included) while being
//! updated. A handle detached mid-run is not visited afterwards; the rest of
//! the snapshot is visited exactly once each.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::{BindingKey, CycleContext, Value, Variable};
use crate::error::Result;
use crate::reactive::{SubscriberId, Subscription, TrackedReads, TrackingScope, VariableId};
use crate::view::{HandleId, ViewHandle};

/// Transform applied to a value before it reaches view handles.
pub type MapFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

type HandleSet = SmallVec<[HandleId; 8]>;

/// Which handles a run leaves out.
#[derive(Debug)]
enum Skip {
    /// Handles in the draining caller's cycle, unless this drain updated
    /// them itself.
    Own,
    /// Handles another cycle had updated when it changed the variable.
    Foreign(HandleSet),
}

/// Who is delivering, and whether a newer change is waiting.
#[derive(Debug, Default)]
struct DrainState {
    draining: bool,
    /// Address of the draining caller's cycle context.
    owner: usize,
    rerun: Option<Skip>,
}

/// The subscription and fan-out record of one (variable, attribute) pair.
pub struct Binding {
    key: BindingKey,
    variable: Variable,
    map: Option<MapFn>,
    subscriber_id: SubscriberId,
    handles: Mutex<IndexMap<HandleId, Arc<dyn ViewHandle>>>,
    drain: Mutex<DrainState>,
    subscription: Mutex<Option<Subscription>>,
    tracked: Mutex<TrackedReads>,
    retired: AtomicBool,
}

impl Binding {
    /// Build a binding and subscribe it to its variable.
    ///
    /// The subscription holds only a weak reference back to the binding.
    pub(crate) fn install(key: BindingKey, variable: Variable, map: Option<MapFn>) -> Arc<Self> {
        let binding = Arc::new(Self {
            key,
            variable,
            map,
            subscriber_id: SubscriberId::new(),
            handles: Mutex::new(IndexMap::new()),
            drain: Mutex::new(DrainState::default()),
            subscription: Mutex::new(None),
            tracked: Mutex::new(TrackedReads::new()),
            retired: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&binding);
        let subscription = binding.variable.watch(Arc::new(move |cx: &CycleContext| {
            if let Some(binding) = weak.upgrade() {
                binding.propagate(cx);
            }
        }));
        *binding.subscription.lock() = Some(subscription);

        debug!(key = %binding.key, pulse = binding.is_pulse(), "binding created");
        binding
    }

    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn attribute(&self) -> &str {
        self.key.attribute()
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn variable_id(&self) -> VariableId {
        self.key.variable()
    }

    pub fn is_pulse(&self) -> bool {
        self.variable.is_pulse()
    }

    /// Attach a handle. Returns false if it was already attached.
    pub fn attach(&self, handle: Arc<dyn ViewHandle>) -> bool {
        let id = handle.id();
        let mut handles = self.handles.lock();
        if handles.contains_key(&id) {
            return false;
        }
        handles.insert(id, handle);
        debug!(key = %self.key, handle = %id, attached = handles.len(), "view attached");
        true
    }

    /// Detach a handle. Returns false if it was not attached.
    pub fn detach(&self, handle: HandleId) -> bool {
        let mut handles = self.handles.lock();
        let removed = handles.shift_remove(&handle).is_some();
        if removed {
            debug!(key = %self.key, %handle, attached = handles.len(), "view detached");
        }
        removed
    }

    pub fn is_attached(&self, handle: HandleId) -> bool {
        self.handles.lock().contains_key(&handle)
    }

    /// Attached handles in attach order.
    pub fn handle_ids(&self) -> Vec<HandleId> {
        self.handles.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Variables read during the last tracked read, in first-read order.
    pub fn tracked(&self) -> Vec<VariableId> {
        self.tracked.lock().to_vec()
    }

    /// Whether the registry has torn this binding down.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Whether a caller is delivering for this binding right now.
    pub fn is_propagating(&self) -> bool {
        self.drain.lock().draining
    }

    /// Read the current value as it would be delivered.
    ///
    /// Pulse bindings yield `None`. The read runs in a tracking scope owned
    /// by this binding.
    pub fn read_mapped(&self) -> Result<Option<Value>> {
        let scope = TrackingScope::enter(self.subscriber_id);
        let read = self.variable.read();
        *self.tracked.lock() = scope.finish();

        Ok(read?.map(|value| match &self.map {
            Some(map) => map(value),
            None => value,
        }))
    }

    /// Propagate a change made within `cx`.
    ///
    /// Called by the variable's subscription; also callable directly with a
    /// hand-built context. Returns once the change is delivered, or once it
    /// has been handed to the caller already delivering for this binding.
    pub fn propagate(&self, cx: &CycleContext) {
        if self.is_retired() {
            trace!(key = %self.key, "retired binding ignores change");
            return;
        }

        let owner = cx as *const CycleContext as usize;
        {
            let mut drain = self.drain.lock();
            if drain.draining {
                drain.rerun = Some(if drain.owner == owner {
                    Skip::Own
                } else {
                    Skip::Foreign(cx.updated().into_iter().collect())
                });
                trace!(key = %self.key, "pass in flight, rerun queued");
                return;
            }
            drain.draining = true;
            drain.owner = owner;
        }

        let mut delivered = HandleSet::new();
        let mut skip = Skip::Own;
        loop {
            self.run(cx, &skip, &mut delivered);

            let mut drain = self.drain.lock();
            match drain.rerun.take() {
                Some(next) if !self.is_retired() => skip = next,
                _ => {
                    drain.draining = false;
                    return;
                }
            }
        }
    }

    /// One run over the handle snapshot. Stops early once a newer change is
    /// queued.
    fn run(&self, cx: &CycleContext, skip: &Skip, delivered: &mut HandleSet) {
        let payload = match self.read_mapped() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %self.key, error = %err, "propagation aborted");
                return;
            }
        };

        let snapshot: SmallVec<[(HandleId, Arc<dyn ViewHandle>); 8]> = self
            .handles
            .lock()
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();

        for (id, handle) in snapshot {
            if self.drain.lock().rerun.is_some() {
                trace!(key = %self.key, "newer change queued, restarting");
                return;
            }
            if !self.is_attached(id) {
                continue;
            }

            let skipped = match skip {
                Skip::Own => cx.contains(id) && !delivered.contains(&id),
                Skip::Foreign(updated) => updated.contains(&id),
            };
            if skipped {
                trace!(key = %self.key, handle = %id, "already updated in this cycle");
                continue;
            }

            cx.mark(id);
            if !delivered.contains(&id) {
                delivered.push(id);
            }
            match &payload {
                Some(value) => {
                    trace!(key = %self.key, handle = %id, %value, "update");
                    handle.update(value, cx);
                }
                None => {
                    trace!(key = %self.key, handle = %id, "fire");
                    handle.fire(cx);
                }
            }
        }
    }

    /// Cancel the subscription. Returns false if already retired.
    pub(crate) fn retire(&self) -> bool {
        if self.retired.swap(true, Ordering::SeqCst) {
            return false;
        }
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        true
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("variable", &self.variable)
            .field("handles", &self.handle_ids())
            .field("retired", &self.is_retired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, Signal, Trigger};
    use crate::view::testing::{Delivery, Log, Recorder};
    use serde_json::json;
    use std::sync::Weak;

    fn bind(variable: impl Into<Variable>) -> Arc<Binding> {
        let variable = variable.into();
        Binding::install(BindingKey::new(variable.id(), "value"), variable, None)
    }

    #[test]
    fn attach_is_idempotent() {
        let binding = bind(Signal::new(0));
        let log = Log::default();
        let a = Recorder::new(&log);

        assert!(binding.attach(a.clone()));
        assert!(!binding.attach(a.clone()));
        assert_eq!(binding.len(), 1);
    }

    #[test]
    fn detach_unknown_handle_is_noop() {
        let binding = bind(Signal::new(0));
        assert!(!binding.detach(HandleId::new()));
        assert!(binding.is_empty());
    }

    #[test]
    fn change_reaches_every_handle_in_attach_order() {
        let level = Signal::new(0.5);
        let binding = bind(level.clone());
        let log = Log::default();
        let handles: Vec<_> = (0..3).map(|_| Recorder::new(&log)).collect();
        for handle in &handles {
            binding.attach(handle.clone());
        }

        level.set(0.25);

        let expected: Vec<_> = handles
            .iter()
            .map(|h| Delivery::Update(h.id(), json!(0.25)))
            .collect();
        assert_eq!(*log.lock(), expected);
    }

    #[test]
    fn seeded_handle_is_skipped() {
        let binding = bind(Signal::new(1));
        let log = Log::default();
        let a = Recorder::new(&log);
        let b = Recorder::new(&log);
        binding.attach(a.clone());
        binding.attach(b.clone());

        let cx = CycleContext::seeded(b.id());
        binding.propagate(&cx);

        assert_eq!(*log.lock(), vec![Delivery::Update(a.id(), json!(1))]);
        assert_eq!(cx.updated(), vec![b.id(), a.id()]);
    }

    #[test]
    fn map_is_applied_before_delivery() {
        let level = Signal::new(2);
        let variable = Variable::from(level.clone());
        let map: MapFn = Arc::new(|v: Value| json!({ "display": v }));
        let key = BindingKey::new(variable.id(), "label");
        let binding = Binding::install(key, variable, Some(map));
        let log = Log::default();
        let a = Recorder::new(&log);
        binding.attach(a.clone());

        level.set(3);

        assert_eq!(
            *log.lock(),
            vec![Delivery::Update(a.id(), json!({ "display": 3 }))]
        );
    }

    #[test]
    fn pulse_binding_fires_without_payload() {
        let bang = Trigger::new();
        let binding = bind(bang.clone());
        let log = Log::default();
        let a = Recorder::new(&log);
        binding.attach(a.clone());

        bang.pulse();

        assert_eq!(*log.lock(), vec![Delivery::Fire(a.id())]);
        assert_eq!(binding.tracked(), vec![bang.id()]);
    }

    #[test]
    fn tracked_reads_include_computed_source() {
        let source = Signal::new(1);
        let doubled = Computed::read_only(&source, |v: &i32| v * 2);
        let binding = bind(doubled.clone());

        source.set(2);

        assert_eq!(binding.tracked(), vec![doubled.id(), source.id()]);
    }

    /// Detaches itself from its binding on the first update it receives.
    struct SelfDetaching {
        id: HandleId,
        binding: Mutex<Weak<Binding>>,
        log: Log,
    }

    impl ViewHandle for SelfDetaching {
        fn id(&self) -> HandleId {
            self.id
        }

        fn update(&self, value: &Value, _cx: &CycleContext) {
            self.log.lock().push(Delivery::Update(self.id, value.clone()));
            if let Some(binding) = self.binding.lock().upgrade() {
                binding.detach(self.id);
            }
        }

        fn fire(&self, _cx: &CycleContext) {}
    }

    #[test]
    fn self_detach_during_pass_skips_nobody() {
        let level = Signal::new(0);
        let binding = bind(level.clone());
        let log = Log::default();

        let a = Recorder::new(&log);
        let quitter = Arc::new(SelfDetaching {
            id: HandleId::new(),
            binding: Mutex::new(Arc::downgrade(&binding)),
            log: log.clone(),
        });
        let c = Recorder::new(&log);
        binding.attach(a.clone());
        binding.attach(quitter.clone());
        binding.attach(c.clone());

        level.set(1);
        assert_eq!(
            *log.lock(),
            vec![
                Delivery::Update(a.id(), json!(1)),
                Delivery::Update(quitter.id, json!(1)),
                Delivery::Update(c.id(), json!(1)),
            ]
        );
        assert_eq!(binding.handle_ids(), vec![a.id(), c.id()]);

        log.lock().clear();
        level.set(2);
        assert_eq!(
            *log.lock(),
            vec![
                Delivery::Update(a.id(), json!(2)),
                Delivery::Update(c.id(), json!(2)),
            ]
        );
    }

    /// Detaches another handle when updated.
    struct Evictor {
        id: HandleId,
        victim: HandleId,
        binding: Weak<Binding>,
    }

    impl ViewHandle for Evictor {
        fn id(&self) -> HandleId {
            self.id
        }

        fn update(&self, _value: &Value, _cx: &CycleContext) {
            if let Some(binding) = self.binding.upgrade() {
                binding.detach(self.victim);
            }
        }

        fn fire(&self, _cx: &CycleContext) {}
    }

    #[test]
    fn handle_detached_earlier_in_pass_is_not_visited() {
        let level = Signal::new(0);
        let binding = bind(level.clone());
        let log = Log::default();
        let victim = Recorder::new(&log);
        let evictor = Arc::new(Evictor {
            id: HandleId::new(),
            victim: victim.id(),
            binding: Arc::downgrade(&binding),
        });
        binding.attach(evictor);
        binding.attach(victim.clone());

        level.set(1);

        assert!(log.lock().is_empty());
        assert!(!binding.is_attached(victim.id()));
    }

    #[test]
    fn retired_binding_stops_delivering() {
        let level = Signal::new(0);
        let binding = bind(level.clone());
        let log = Log::default();
        binding.attach(Recorder::new(&log));
        assert_eq!(level.subscriber_count(), 1);

        assert!(binding.retire());
        assert!(!binding.retire());
        assert_eq!(level.subscriber_count(), 0);

        level.set(1);
        binding.propagate(&CycleContext::new());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn unencodable_value_aborts_the_pass() {
        // Non-string map keys cannot be encoded as JSON.
        let table = Signal::new(std::collections::BTreeMap::from([((1, 2), 3)]));
        let variable = Variable::value(MapAsValue(table.clone()));
        let binding = Binding::install(BindingKey::new(variable.id(), "value"), variable, None);
        let log = Log::default();
        binding.attach(Recorder::new(&log));

        binding.propagate(&CycleContext::new());
        assert!(log.lock().is_empty());
    }

    /// Value cell over a map whose keys do not serialize as JSON strings.
    struct MapAsValue(Signal<std::collections::BTreeMap<(i32, i32), i32>>);

    impl crate::binding::ValueCell for MapAsValue {
        fn id(&self) -> VariableId {
            self.0.id()
        }

        fn read(&self) -> Result<Value> {
            serde_json::to_value(self.0.get()).map_err(|source| crate::error::BindError::Encode {
                variable: self.0.id(),
                source,
            })
        }

        fn write(&self, _value: Value, _cx: &CycleContext) -> Result<()> {
            Ok(())
        }

        fn watch(&self, on_change: crate::reactive::ChangeFn) -> Subscription {
            self.0.subscribe(move |cx| on_change(cx))
        }
    }

    /// Sets its own variable to 2 the first time it sees 1.
    struct Bumper {
        id: HandleId,
        level: Signal<i64>,
        same_cycle: bool,
        log: Log,
    }

    impl ViewHandle for Bumper {
        fn id(&self) -> HandleId {
            self.id
        }

        fn update(&self, value: &Value, cx: &CycleContext) {
            self.log.lock().push(Delivery::Update(self.id, value.clone()));
            if *value == json!(1) {
                if self.same_cycle {
                    self.level.set_with(2, cx);
                } else {
                    self.level.set(2);
                }
            }
        }

        fn fire(&self, _cx: &CycleContext) {}
    }

    fn bumped_pass(same_cycle: bool) {
        let level = Signal::new(0_i64);
        let binding = bind(level.clone());
        let log = Log::default();
        let before = Recorder::new(&log);
        let bumper = Arc::new(Bumper {
            id: HandleId::new(),
            level: level.clone(),
            same_cycle,
            log: log.clone(),
        });
        let after = Recorder::new(&log);
        binding.attach(before.clone());
        binding.attach(bumper.clone());
        binding.attach(after.clone());

        level.set(1);

        assert_eq!(level.get(), 2);
        assert_eq!(
            *log.lock(),
            vec![
                Delivery::Update(before.id(), json!(1)),
                Delivery::Update(bumper.id, json!(1)),
                Delivery::Update(before.id(), json!(2)),
                Delivery::Update(bumper.id, json!(2)),
                Delivery::Update(after.id(), json!(2)),
            ]
        );
        assert!(!binding.is_propagating());
    }

    #[test]
    fn handle_setting_its_variable_restarts_the_pass() {
        bumped_pass(false);
    }

    #[test]
    fn same_cycle_set_from_handle_restarts_the_pass() {
        bumped_pass(true);
    }

    #[test]
    fn seeded_origin_is_skipped_for_the_whole_cycle() {
        let level = Signal::new(0_i64);
        let binding = bind(level.clone());
        let log = Log::default();
        let origin = Recorder::new(&log);
        let bumper = Arc::new(Bumper {
            id: HandleId::new(),
            level: level.clone(),
            same_cycle: true,
            log: log.clone(),
        });
        binding.attach(origin.clone());
        binding.attach(bumper.clone());

        level.set_with(1, &CycleContext::seeded(origin.id()));

        assert_eq!(
            *log.lock(),
            vec![
                Delivery::Update(bumper.id, json!(1)),
                Delivery::Update(bumper.id, json!(2)),
            ]
        );
    }
}
