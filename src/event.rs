//! The `Event` type and its arena handle.
//!
//! Per the design notes in spec section 9, ownership is arena-based: a
//! `Trace` owns its `Event`s in a single `Vec`, and every cross-reference
//! (`latest_write_same_thread`, lock/wait/signal/barrier tables, `Prefix`
//! entries) is an `EventId` handle rather than a raw pointer or
//! `Rc<RefCell<Event>>`. This replaces the original's cyclic
//! `Event*`/`Trace*` back-pointers with indices, which is what makes the
//! dedup and replay paths serializable.

use crate::symbolic_expr::SymbolicExpr;
use crate::thread::ThreadId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Hard cap on simulated threads, baked into the vector-clock width (spec
/// section 3: "length <= MAX_THREADS (16 in source)").
pub const MAX_THREADS: usize = 16;

// Compile-time half of spec section 9's "expose both as compile-time
// constants; assert on overflow rather than quietly truncating": a vector
// clock lives inline up to `MAX_THREADS` entries (see `VectorClock` below).
// `Thread::tid` indexes directly into it, so the cap must stay small
// enough to index safely and not so large the inline storage defeats its
// own purpose.
static_assertions::const_assert!(MAX_THREADS > 0 && MAX_THREADS <= 64);

/// A thread's vector clock: one entry per live thread, inline up to
/// `MAX_THREADS` (spec section 3) so the common case never heap-allocates.
pub type VectorClock = SmallVec<[u32; MAX_THREADS]>;

/// Opaque handle into a `Trace`'s event arena. Never outlives the owning
/// `Trace` in practice (traces are never freed until the run ends).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EventId {
    pub trace_id: u32,
    pub index: u32,
}

impl EventId {
    pub fn new(trace_id: u32, index: u32) -> Self {
        EventId { trace_id, index }
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}#{}", self.trace_id, self.index)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum EventKind {
    /// Participates in the encoding and has an associated instruction.
    Normal,
    /// Dropped before encoding.
    Ignore,
    /// No underlying instruction (thread start/end markers).
    Virtual,
}

/// A single observable step of one simulated thread (spec section 3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub thread_id: ThreadId,
    /// Per-trace monotone id, assigned from `Trace::next_event_id`.
    pub event_id: u64,
    /// Per-thread monotone id.
    pub thread_event_id: u64,
    pub kind: EventKind,

    /// Logical location touched by this event, e.g. `"x"`. Empty for
    /// events that touch no named location.
    pub name: String,
    /// Disambiguated per-access name: `kind_letter + memory_id + '_' +
    /// address + ('S'|'L') + access_ordinal` (spec section 4.1 item 3).
    pub global_name: String,

    pub is_global: bool,
    pub is_condition_inst: bool,
    /// The concrete side actually taken, only meaningful when
    /// `is_condition_inst` is set.
    pub br_condition: Option<bool>,
    /// Set by the expression filter (spec section 4.5).
    pub is_event_related_to_branch: bool,

    /// Back-edge to the last write of `name` in the same thread,
    /// established during encoding prep (spec section 3).
    pub latest_write_same_thread: Option<EventId>,

    /// Length <= `MAX_THREADS`.
    pub vector_clock: VectorClock,

    pub called_function: Option<String>,
    pub inst_parameter: Vec<SymbolicExpr>,
    pub related_symbolic_expr: Vec<SymbolicExpr>,

    /// Event-clustering name used by the encoder's memory-model formula
    /// (spec section 4.1 "Event clustering" / section 4.6 item 3). Events
    /// collapsed into the same cluster share an `event_name` so that
    /// ordering constraints between them become trivially true.
    pub event_name: String,
}

impl Event {
    pub fn new(id: EventId, thread_id: ThreadId, event_id: u64, thread_event_id: u64, kind: EventKind) -> Self {
        Event {
            id,
            thread_id,
            event_id,
            thread_event_id,
            kind,
            name: String::new(),
            global_name: String::new(),
            is_global: false,
            is_condition_inst: false,
            br_condition: None,
            is_event_related_to_branch: false,
            latest_write_same_thread: None,
            vector_clock: VectorClock::new(),
            called_function: None,
            inst_parameter: Vec::new(),
            related_symbolic_expr: Vec::new(),
            event_name: String::new(),
        }
    }

    pub fn set_vector_clock(&mut self, vc: impl Into<VectorClock>) {
        let vc = vc.into();
        assert!(
            vc.len() <= MAX_THREADS,
            "vector clock width {} exceeds MAX_THREADS ({MAX_THREADS})",
            vc.len()
        );
        self.vector_clock = vc;
    }

    /// Happens-before per the vector clock: `self` hb `other` iff `self`'s
    /// clock is componentwise <= `other`'s and they differ in at least one
    /// component (used by DTAM's hybrid closure, spec section 4.7).
    pub fn happens_before(&self, other: &Event) -> bool {
        if self.vector_clock.is_empty() || other.vector_clock.is_empty() {
            return false;
        }
        let len = self.vector_clock.len().max(other.vector_clock.len());
        let at = |v: &[u32], i: usize| v.get(i).copied().unwrap_or(0);
        let mut strictly_less = false;
        for i in 0..len {
            let a = at(&self.vector_clock, i);
            let b = at(&other.vector_clock, i);
            if a > b {
                return false;
            }
            if a < b {
                strictly_less = true;
            }
        }
        strictly_less
    }
}
