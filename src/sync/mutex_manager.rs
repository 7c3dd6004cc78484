//! `MutexManager` (spec section 4.2). Each named mutex is `{id, name,
//! locked, locked_thread_id}`; re-entrancy is not modeled.

use crate::error::{MtaError, MtaResult};
use crate::thread::ThreadId;
use std::collections::HashMap;

struct Mutex {
    id: u32,
    locked: bool,
    locked_thread_id: Option<ThreadId>,
}

#[derive(Default)]
pub struct MutexManager {
    mutexes: HashMap<String, Mutex>,
    next_id: u32,
}

/// Outcome of a `lock` call: either the caller acquired it immediately, or
/// must be transitioned to `MutexBlocked` by the caller.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LockOutcome {
    Acquired,
    Blocked,
}

impl MutexManager {
    pub fn new() -> Self {
        MutexManager::default()
    }

    pub fn init(&mut self, name: &str) -> MtaResult<()> {
        if self.mutexes.contains_key(name) {
            return Err(MtaError::BadSyncCall(format!("mutex `{name}` already initialized")));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.mutexes.insert(name.to_owned(), Mutex { id, locked: false, locked_thread_id: None });
        Ok(())
    }

    fn get_mut(&mut self, name: &str) -> MtaResult<&mut Mutex> {
        self.mutexes
            .get_mut(name)
            .ok_or_else(|| MtaError::BadSyncCall(format!("mutex `{name}` used before init")))
    }

    /// Blocks (returns `Blocked`) if held by another thread; otherwise
    /// marks locked and returns `Acquired`.
    pub fn lock(&mut self, name: &str, tid: ThreadId) -> MtaResult<LockOutcome> {
        let m = self.get_mut(name)?;
        if m.locked {
            if m.locked_thread_id == Some(tid) {
                return Err(MtaError::BadSyncCall(format!(
                    "thread {tid} attempted to re-lock `{name}`; re-entrancy is not modeled"
                )));
            }
            Ok(LockOutcome::Blocked)
        } else {
            m.locked = true;
            m.locked_thread_id = Some(tid);
            Ok(LockOutcome::Acquired)
        }
    }

    /// Fails with `BadSyncCall` (`NotOwner`) if `tid` does not hold the
    /// mutex.
    pub fn unlock(&mut self, name: &str, tid: ThreadId) -> MtaResult<()> {
        let m = self.get_mut(name)?;
        if m.locked_thread_id != Some(tid) {
            return Err(MtaError::not_owner(tid, "unlock", name));
        }
        m.locked = false;
        m.locked_thread_id = None;
        Ok(())
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.mutexes.get(name).map(|m| m.locked).unwrap_or(false)
    }

    pub fn locked_by(&self, name: &str) -> Option<ThreadId> {
        self.mutexes.get(name).and_then(|m| m.locked_thread_id)
    }
}
