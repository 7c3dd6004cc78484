//! `CondManager` (spec section 4.2). `wait` atomically unlocks the mutex
//! and transitions the thread to `CondBlocked`; `signal`/`broadcast` pop
//! one/all waiters per the condition's own FIFO scheduling policy.

use crate::error::{MtaError, MtaResult};
use crate::sync::mutex_manager::MutexManager;
use crate::thread::ThreadId;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Copy, Debug)]
pub struct WaitParam {
    pub tid: ThreadId,
}

#[derive(Default)]
pub struct CondManager {
    /// FIFO queue of waiters per condition name. The condition's own
    /// scheduling policy in spec section 4.2 is FIFO by default; `signal`
    /// pops the head.
    waiters: HashMap<String, VecDeque<WaitParam>>,
}

impl CondManager {
    pub fn new() -> Self {
        CondManager::default()
    }

    /// Unlocks `mutex` (must be held by `tid`, else `BadSyncCall`), then
    /// queues `tid` as a waiter. The caller is responsible for
    /// transitioning the thread to `CondBlocked` afterwards.
    pub fn wait(&mut self, cond: &str, mutex: &str, tid: ThreadId, mutexes: &mut MutexManager) -> MtaResult<()> {
        if mutexes.locked_by(mutex) != Some(tid) {
            return Err(MtaError::not_owner(tid, "cond_wait", mutex));
        }
        mutexes.unlock(mutex, tid)?;
        self.waiters.entry(cond.to_owned()).or_default().push_back(WaitParam { tid });
        Ok(())
    }

    /// Pops one waiter (to be re-queued as `MutexBlocked`, acquiring
    /// `mutex`). Empty signal is a silent no-op returning `None`.
    pub fn signal(&mut self, cond: &str) -> Option<WaitParam> {
        self.waiters.get_mut(cond).and_then(|q| q.pop_front())
    }

    /// Pops all waiters. Empty broadcast is a silent no-op.
    pub fn broadcast(&mut self, cond: &str) -> Vec<WaitParam> {
        self.waiters.get_mut(cond).map(|q| q.drain(..).collect()).unwrap_or_default()
    }

    pub fn waiting_count(&self, cond: &str) -> usize {
        self.waiters.get(cond).map(|q| q.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_requires_holding_mutex() {
        let mut c = CondManager::new();
        let mut m = MutexManager::new();
        m.init("mu").unwrap();
        let err = c.wait("cv", "mu", 1, &mut m).unwrap_err();
        assert!(matches!(err, MtaError::BadSyncCall(_)));
    }

    #[test]
    fn wait_unlocks_and_queues() {
        let mut c = CondManager::new();
        let mut m = MutexManager::new();
        m.init("mu").unwrap();
        m.lock("mu", 1).unwrap();
        c.wait("cv", "mu", 1, &mut m).unwrap();
        assert!(!m.is_locked("mu"));
        assert_eq!(c.waiting_count("cv"), 1);
    }

    #[test]
    fn signal_pops_fifo_order() {
        let mut c = CondManager::new();
        let mut m = MutexManager::new();
        m.init("mu").unwrap();
        for tid in [1, 2] {
            m.lock("mu", tid).unwrap();
            c.wait("cv", "mu", tid, &mut m).unwrap();
        }
        assert_eq!(c.signal("cv").unwrap().tid, 1);
        assert_eq!(c.signal("cv").unwrap().tid, 2);
        assert!(c.signal("cv").is_none());
    }

    #[test]
    fn broadcast_drains_all_waiters() {
        let mut c = CondManager::new();
        let mut m = MutexManager::new();
        m.init("mu").unwrap();
        for tid in [1, 2, 3] {
            m.lock("mu", tid).unwrap();
            c.wait("cv", "mu", tid, &mut m).unwrap();
        }
        let woken = c.broadcast("cv");
        assert_eq!(woken.len(), 3);
        assert_eq!(c.waiting_count("cv"), 0);
    }

    #[test]
    fn empty_signal_is_noop() {
        let mut c = CondManager::new();
        assert!(c.signal("cv").is_none());
    }
}
