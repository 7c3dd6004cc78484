//! `Trace`: the record of one full simulated execution (spec section 3).

use crate::event::{Event, EventId, EventKind, MAX_THREADS};
use crate::symbolic_expr::SymbolicExpr;
use crate::thread::ThreadId;
use std::collections::HashMap;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TraceType {
    Unique,
    Redundant,
    Failed,
}

/// One half of a lock/unlock pair for a given mutex.
#[derive(Clone, Debug)]
pub struct LockPair {
    pub thread_id: ThreadId,
    pub lock_event: EventId,
    /// Absent when the pair is incomplete (trace ended while held).
    pub unlock_event: Option<EventId>,
}

/// A recorded `cond_wait`: the wait event, plus the lock-reacquire event
/// conceptually embedded in the wait primitive (spec section 3).
#[derive(Clone, Debug)]
pub struct WaitLock {
    pub wait_event: EventId,
    pub lock_by_wait: Option<EventId>,
}

/// Any constant value tracked for a global's initializer/final value.
/// Kept generic over small integers; the encoder widens as needed under
/// the configured `Theory`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConstValue(pub i64);

#[derive(Default)]
pub struct Trace {
    pub id: u32,
    next_event_id: u64,
    next_thread_event_id: HashMap<ThreadId, u64>,

    /// Arena: all events, indexed by `EventId::index`.
    arena: Vec<Event>,
    /// Per-thread event lists (indices into `arena`), spec section 3.
    pub thread_events: HashMap<ThreadId, Vec<EventId>>,
    /// Total execution order: merge of per-thread lists in recording order.
    pub path: Vec<EventId>,

    pub create_thread_point: HashMap<EventId, ThreadId>,
    pub join_thread_point: HashMap<EventId, ThreadId>,

    pub read_set: HashMap<String, Vec<EventId>>,
    pub write_set: HashMap<String, Vec<EventId>>,
    pub read_set_related_to_branch: HashMap<String, Vec<EventId>>,
    pub write_set_related_to_branch: HashMap<String, Vec<EventId>>,

    pub all_lock_unlock: HashMap<String, Vec<LockPair>>,
    pub all_wait: HashMap<String, Vec<WaitLock>>,
    pub all_signal: HashMap<String, Vec<EventId>>,
    pub all_barrier: HashMap<String, Vec<EventId>>,

    pub global_variable_initializer: HashMap<String, ConstValue>,
    pub global_variable_initializer_related_to_branch: HashMap<String, ConstValue>,
    pub global_variable_final: HashMap<String, ConstValue>,

    /// Raw per-execution symbolic-expression logs (spec section 3).
    pub store_expr: Vec<(EventId, SymbolicExpr)>,
    pub br_expr: Vec<(EventId, SymbolicExpr)>,
    pub assert_expr: Vec<(EventId, SymbolicExpr)>,
    pub rw_expr: Vec<(EventId, SymbolicExpr)>,
    pub path_condition: Vec<SymbolicExpr>,
    pub path_condition_related_to_branch: Vec<SymbolicExpr>,

    /// Derived by the expression filter (spec section 4.5).
    pub br_related_symbolic_expr: Vec<std::collections::HashSet<String>>,
    pub assert_related_symbolic_expr: Vec<std::collections::HashSet<String>>,
    pub all_related_symbolic_exprs: HashMap<String, std::collections::HashSet<String>>,
    pub related_symbolic_expr: std::collections::HashSet<String>,
    /// `name -> thread touching it`, `0` meaning shared, `-1` meaning
    /// "written by nobody relevant" (spec section 4.5 step 3).
    pub var_thread: HashMap<String, i64>,

    /// Taint book-keeping (spec section 3 / 4.7).
    pub taint_symbolic_expr: std::collections::HashSet<String>,
    pub untaint_symbolic_expr: std::collections::HashSet<String>,
    pub potential_taint: std::collections::HashSet<String>,
    pub dtam_serial: std::collections::HashSet<String>,
    pub dtam_parallel: std::collections::HashSet<String>,
    pub dtam_hybrid: std::collections::HashSet<String>,
    pub taint_pts: std::collections::HashSet<String>,
    pub no_taint_pts: std::collections::HashSet<String>,

    pub trace_type: TraceType,
}

impl Default for TraceType {
    fn default() -> Self {
        TraceType::Unique
    }
}

impl Trace {
    pub fn new(id: u32) -> Self {
        Trace { id, ..Default::default() }
    }

    pub fn event(&self, id: EventId) -> &Event {
        debug_assert_eq!(id.trace_id, self.id);
        &self.arena[id.index as usize]
    }

    pub fn event_mut(&mut self, id: EventId) -> &mut Event {
        debug_assert_eq!(id.trace_id, self.id);
        &mut self.arena[id.index as usize]
    }

    pub fn events(&self) -> &[Event] {
        &self.arena
    }

    /// Creates and inserts a new `NORMAL`/`IGNORE`/`VIRTUAL` event for
    /// `thread_id`, assigning `event_id`/`thread_event_id` and appending
    /// it to both the per-thread list and `path` (spec section 4.1 step 2).
    pub fn insert_event(&mut self, thread_id: ThreadId, kind: EventKind) -> EventId {
        let index = self.arena.len() as u32;
        let id = EventId::new(self.id, index);
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        let thread_event_id = {
            let counter = self.next_thread_event_id.entry(thread_id).or_insert(0);
            let v = *counter;
            *counter += 1;
            v
        };
        let event = Event::new(id, thread_id, event_id, thread_event_id, kind);
        self.arena.push(event);
        self.thread_events.entry(thread_id).or_default().push(id);
        self.path.push(id);
        id
    }

    pub fn insert_read(&mut self, name: &str, id: EventId) {
        self.read_set.entry(name.to_owned()).or_default().push(id);
    }

    pub fn insert_write(&mut self, name: &str, id: EventId) {
        self.write_set.entry(name.to_owned()).or_default().push(id);
    }

    pub fn insert_lock(&mut self, mutex: &str, thread_id: ThreadId, lock_event: EventId) {
        self.all_lock_unlock.entry(mutex.to_owned()).or_default().push(LockPair {
            thread_id,
            lock_event,
            unlock_event: None,
        });
    }

    /// Completes the most recent incomplete lock pair for `mutex` owned by
    /// `thread_id`.
    pub fn insert_unlock(&mut self, mutex: &str, thread_id: ThreadId, unlock_event: EventId) -> crate::error::MtaResult<()> {
        let pairs = self
            .all_lock_unlock
            .get_mut(mutex)
            .ok_or_else(|| crate::error::MtaError::InvariantViolation(format!("unlock of never-locked mutex `{mutex}`")))?;
        let pair = pairs
            .iter_mut()
            .rev()
            .find(|p| p.thread_id == thread_id && p.unlock_event.is_none())
            .ok_or_else(|| {
                crate::error::MtaError::InvariantViolation(format!(
                    "unlock of `{mutex}` by thread {thread_id} with no matching open lock"
                ))
            })?;
        pair.unlock_event = Some(unlock_event);
        Ok(())
    }

    pub fn insert_wait(&mut self, cond: &str, wait_event: EventId, lock_by_wait: Option<EventId>) {
        self.all_wait.entry(cond.to_owned()).or_default().push(WaitLock { wait_event, lock_by_wait });
    }

    pub fn insert_signal(&mut self, cond: &str, event: EventId) {
        self.all_signal.entry(cond.to_owned()).or_default().push(event);
    }

    pub fn insert_barrier(&mut self, barrier: &str, event: EventId) {
        self.all_barrier.entry(barrier.to_owned()).or_default().push(event);
    }

    pub fn insert_thread_create(&mut self, event: EventId, spawned: ThreadId) {
        self.create_thread_point.insert(event, spawned);
    }

    pub fn insert_thread_join(&mut self, event: EventId, joined: ThreadId) {
        self.join_thread_point.insert(event, joined);
    }

    pub fn thread_ids(&self) -> impl Iterator<Item = &ThreadId> {
        self.thread_events.keys()
    }

    /// Resolves `latest_write_same_thread` for every read event that
    /// touches a tracked global, scanning the per-thread event list in
    /// program order (spec section 3). Run once during encoding prep.
    pub fn resolve_latest_write_same_thread(&mut self) {
        for (_, events) in self.thread_events.clone() {
            let mut last_write: HashMap<String, EventId> = HashMap::new();
            for id in events {
                let name = self.event(id).name.clone();
                let is_write = self.write_set.get(&name).map(|v| v.contains(&id)).unwrap_or(false);
                if !name.is_empty() {
                    if let Some(&prev) = last_write.get(&name) {
                        self.event_mut(id).latest_write_same_thread = Some(prev);
                    }
                }
                if is_write {
                    last_write.insert(name, id);
                }
            }
        }
    }

    /// Trace-monotonicity invariant check (testable property 1): per
    /// thread, `event_id`/`thread_event_id` strictly increasing, and
    /// `path` is in non-decreasing `event_id` order within a thread.
    pub fn check_monotonicity(&self) -> crate::error::MtaResult<()> {
        for (tid, events) in &self.thread_events {
            let mut prev_event_id = None;
            let mut prev_thread_event_id = None;
            for &id in events {
                let e = self.event(id);
                if let Some(p) = prev_event_id {
                    if e.event_id <= p {
                        return Err(crate::error::MtaError::InvariantViolation(format!(
                            "thread {tid}: event_id not strictly increasing at {id}"
                        )));
                    }
                }
                if let Some(p) = prev_thread_event_id {
                    if e.thread_event_id <= p {
                        return Err(crate::error::MtaError::InvariantViolation(format!(
                            "thread {tid}: thread_event_id not strictly increasing at {id}"
                        )));
                    }
                }
                prev_event_id = Some(e.event_id);
                prev_thread_event_id = Some(e.thread_event_id);
            }
        }
        Ok(())
    }

    /// Every `wait` must have at least one `signal` from a different
    /// thread (spec section 3); else the trace is `FAILED`.
    pub fn check_wait_has_signal(&mut self) {
        for (cond, waits) in self.all_wait.clone() {
            let signalers: Vec<ThreadId> =
                self.all_signal.get(&cond).map(|sigs| sigs.iter().map(|s| self.event(*s).thread_id).collect()).unwrap_or_default();
            for w in &waits {
                let waiter = self.event(w.wait_event).thread_id;
                if !signalers.iter().any(|&s| s != waiter) {
                    self.trace_type = TraceType::Failed;
                    return;
                }
            }
        }
    }

    /// Lock-pairing invariant (testable property 2): every pair has
    /// matching thread ids and `lock.event_id < unlock.event_id`, and no
    /// two locked regions of the same mutex/thread interleave.
    pub fn check_lock_pairing(&self) -> crate::error::MtaResult<()> {
        for (mutex, pairs) in &self.all_lock_unlock {
            for p in pairs {
                if let Some(unlock) = p.unlock_event {
                    let lock_ev = self.event(p.lock_event);
                    let unlock_ev = self.event(unlock);
                    if lock_ev.thread_id != unlock_ev.thread_id {
                        return Err(crate::error::MtaError::InvariantViolation(format!(
                            "mutex `{mutex}`: lock/unlock thread mismatch"
                        )));
                    }
                    if lock_ev.event_id >= unlock_ev.event_id {
                        return Err(crate::error::MtaError::InvariantViolation(format!(
                            "mutex `{mutex}`: lock does not precede unlock"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub const MAX_THREADS: usize = MAX_THREADS;
}
