//! `ExecutionState` (spec section 4.4): per-exploration state bundling the
//! thread list, scheduler, and synchronization managers. The address space
//! and constraint set belong to the out-of-scope Interpreter; the core
//! only keeps the scheduling-relevant state.

use crate::error::{MtaError, MtaResult};
use crate::event::VectorClock;
use crate::prefix::Prefix;
use crate::sync::{BarrierManager, CondManager, MutexManager};
use crate::thread::scheduler::{GuidedThreadScheduler, Scheduler, SchedulerVariant};
use crate::thread::{Thread, ThreadId, ThreadState};
use std::collections::HashMap;

pub struct ExecutionState {
    pub threads: HashMap<ThreadId, Thread>,
    pub scheduler: Box<dyn Scheduler>,
    pub mutexes: MutexManager,
    pub conds: CondManager,
    pub barriers: BarrierManager,
    /// `tid -> [tid]`: threads that have been joined by `tid`.
    pub joined_by: HashMap<ThreadId, Vec<ThreadId>>,
    /// Vector clock of whichever thread most recently released each named
    /// mutex, piggybacked onto the next successful locker (spec section
    /// 4.7's happens-before pruning needs lock/unlock to carry a hb edge
    /// the same way thread-create/join and wait/signal do).
    release_vector_clock: HashMap<String, VectorClock>,
    next_tid: ThreadId,
}

impl ExecutionState {
    pub fn new(scheduler: SchedulerVariant) -> Self {
        Self::bootstrap(Box::new(scheduler))
    }

    /// Same as `new`, but wraps `sub` in a `GuidedThreadScheduler` that
    /// forces `prefix`'s schedule until exhausted (spec section 4.9,
    /// `state_with_guided_scheduler(p)`).
    pub fn new_guided(sub: SchedulerVariant, prefix: &Prefix) -> Self {
        Self::bootstrap(Box::new(GuidedThreadScheduler::new(sub, prefix)))
    }

    fn bootstrap(scheduler: Box<dyn Scheduler>) -> Self {
        let mut state = ExecutionState {
            threads: HashMap::new(),
            scheduler,
            mutexes: MutexManager::new(),
            conds: CondManager::new(),
            barriers: BarrierManager::new(),
            joined_by: HashMap::new(),
            release_vector_clock: HashMap::new(),
            next_tid: 0,
        };
        let _ = state.create_thread(None);
        state
    }

    /// Allocates a new thread id, capped at `MAX_THREADS` (spec section 4.3).
    pub fn create_thread(&mut self, parent: Option<ThreadId>) -> MtaResult<ThreadId> {
        if self.next_tid as usize >= crate::event::MAX_THREADS {
            return Err(MtaError::InvariantViolation(format!(
                "thread id allocation exceeds MAX_THREADS ({})",
                crate::event::MAX_THREADS
            )));
        }
        let tid = self.next_tid;
        self.next_tid += 1;
        self.threads.insert(tid, Thread::new(tid, parent));
        self.scheduler.add(tid);
        Ok(tid)
    }

    pub fn thread(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.get(&tid)
    }

    pub fn thread_mut(&mut self, tid: ThreadId) -> Option<&mut Thread> {
        self.threads.get_mut(&tid)
    }

    /// Moves `tid` out of the runnable set into the given blocked state,
    /// invoking scheduler `remove` (spec section 4.4 / 5).
    pub fn swap_out_thread(&mut self, tid: ThreadId, state: ThreadState) {
        if let Some(t) = self.threads.get_mut(&tid) {
            t.state = state;
        }
        self.scheduler.remove(tid);
    }

    /// Moves `tid` back into the runnable/mutex-blocked set, invoking
    /// scheduler `add`.
    pub fn swap_in_thread(&mut self, tid: ThreadId, state: ThreadState) {
        if let Some(t) = self.threads.get_mut(&tid) {
            t.state = state;
        }
        self.scheduler.add(tid);
    }

    pub fn switch_to_mutex_blocked(&mut self, tid: ThreadId) {
        self.swap_out_thread(tid, ThreadState::MutexBlocked);
    }

    pub fn switch_to_runnable(&mut self, tid: ThreadId) {
        self.swap_in_thread(tid, ThreadState::Runnable);
    }

    pub fn reschedule(&mut self) {
        self.scheduler.reschedule();
    }

    /// Whether any live thread is still schedulable; false means the
    /// execution has nothing left to run.
    pub fn has_schedulable_thread(&self) -> bool {
        self.threads.values().any(|t| t.is_schedulable())
    }

    /// Advances `tid`'s own vector-clock component and returns the new
    /// value, to be stamped onto the event just recorded for it (spec
    /// section 3: every `NORMAL` event carries a vector clock).
    pub fn tick_vector_clock(&mut self, tid: ThreadId) -> VectorClock {
        match self.threads.get_mut(&tid) {
            Some(t) => {
                t.tick();
                t.vector_clock.clone()
            }
            None => VectorClock::new(),
        }
    }

    pub fn vector_clock_of(&self, tid: ThreadId) -> VectorClock {
        self.threads.get(&tid).map(|t| t.vector_clock.clone()).unwrap_or_default()
    }

    /// Componentwise-max merges `other` into `tid`'s own clock — the
    /// message-passing rule applied at every synchronization edge (thread
    /// create/join, mutex unlock/lock, wait/signal, barrier release).
    pub fn merge_vector_clock(&mut self, tid: ThreadId, other: &VectorClock) {
        let Some(t) = self.threads.get_mut(&tid) else { return };
        if t.vector_clock.len() < other.len() {
            t.vector_clock.resize(other.len(), 0);
        }
        for (i, &o) in other.iter().enumerate() {
            t.vector_clock[i] = t.vector_clock[i].max(o);
        }
    }

    /// Records `tid`'s clock as the most recent release of mutex `name`
    /// (called on a successful `unlock`).
    pub fn record_mutex_release(&mut self, name: &str, tid: ThreadId) {
        let vc = self.vector_clock_of(tid);
        self.release_vector_clock.insert(name.to_owned(), vc);
    }

    /// Merges the clock of whichever thread last released mutex `name`
    /// into `tid` (called on a successful, non-blocked `lock`).
    pub fn adopt_mutex_release(&mut self, name: &str, tid: ThreadId) {
        if let Some(vc) = self.release_vector_clock.get(name).cloned() {
            self.merge_vector_clock(tid, &vc);
        }
    }

    pub fn select_next(&mut self) -> MtaResult<ThreadId> {
        match self.scheduler.select_next() {
            Some(tid) => {
                if self.thread(tid).map(|t| t.is_schedulable()).unwrap_or(false) {
                    Ok(tid)
                } else {
                    Err(MtaError::ScheduleExhausted(tid))
                }
            }
            None => Err(MtaError::InvariantViolation("scheduler has no runnable thread".into())),
        }
    }
}
