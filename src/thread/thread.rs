use super::ThreadId;
use crate::event::{EventId, VectorClock};

/// Runtime state of a simulated thread (spec section 4.3).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ThreadState {
    Runnable,
    MutexBlocked,
    CondBlocked,
    BarrierBlocked,
    JoinBlocked,
    Terminated,
}

/// A simulated thread. `stack`/`address_space_ref` from spec section 4.3
/// belong to the out-of-scope Interpreter; the core only needs the
/// scheduling-relevant fields, so they are represented here as an opaque
/// handle the Interpreter owns.
#[derive(Clone, Debug)]
pub struct Thread {
    pub tid: ThreadId,
    pub parent: Option<ThreadId>,
    pub state: ThreadState,
    /// Last event recorded for this thread, if any.
    pub last_event: Option<EventId>,
    pub vector_clock: VectorClock,
}

impl Thread {
    pub fn new(tid: ThreadId, parent: Option<ThreadId>) -> Self {
        Thread {
            tid,
            parent,
            state: ThreadState::Runnable,
            last_event: None,
            vector_clock: VectorClock::from_elem(0, crate::event::MAX_THREADS),
        }
    }

    /// A thread is schedulable iff `Runnable` or `MutexBlocked` (the latter
    /// because the scheduler may re-check the mutex) — spec section 4.3.
    pub fn is_schedulable(&self) -> bool {
        matches!(self.state, ThreadState::Runnable | ThreadState::MutexBlocked)
    }

    pub fn tick(&mut self) {
        if (self.tid as usize) < self.vector_clock.len() {
            self.vector_clock[self.tid as usize] += 1;
        }
    }
}
