//! `RecorderListener` (spec section 4.1): classifies each instruction,
//! creates the corresponding `Event`, and updates the sync managers /
//! trace tables.

use crate::error::{MtaError, MtaResult};
use crate::event::{EventId, EventKind};
use crate::execution_state::ExecutionState;
use crate::interpreter::{KInstruction, Opcode};
use crate::sync::mutex_manager::LockOutcome;
use crate::thread::{ThreadId, ThreadState};
use crate::trace::Trace;
use std::collections::HashMap;

#[derive(Default)]
pub struct RecorderListener {
    /// Per-(thread, location) access ordinal, used to build `global_name`
    /// (spec section 4.1 item 3).
    access_ordinal: HashMap<(ThreadId, String), u64>,
}

impl RecorderListener {
    /// Classifies `ki` and creates its `NORMAL` event, returning the id.
    pub fn record(
        &mut self,
        trace: &mut Trace,
        state: &mut ExecutionState,
        thread_id: ThreadId,
        ki: &KInstruction,
    ) -> MtaResult<Option<EventId>> {
        if ki.is_thread_op() {
            return self.record_thread_op(trace, state, thread_id, ki);
        }

        let kind = EventKind::Normal;
        let id = trace.insert_event(thread_id, kind);
        stamp_vector_clock(trace, state, thread_id, id);

        if let Some(access) = &ki.access {
            self.record_global_access(trace, thread_id, id, access);
        }

        if ki.opcode == Opcode::Br {
            let e = trace.event_mut(id);
            e.is_condition_inst = true;
            e.br_condition = ki.branch_taken;
        }

        if let Some(callee) = &ki.callee {
            trace.event_mut(id).called_function = Some(callee.clone());
        }

        if let Some(result) = &ki.result_expr {
            trace.event_mut(id).related_symbolic_expr.push(result.clone());
        }

        trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
        Ok(Some(id))
    }

    fn record_global_access(&mut self, trace: &mut Trace, thread_id: ThreadId, id: EventId, access: &crate::interpreter::MemoryAccess) {
        let key = (thread_id, access.name.clone());
        let ordinal = self.access_ordinal.entry(key).or_insert(0);
        let this_ordinal = *ordinal;
        *ordinal += 1;

        let kind_letter = if access.is_load { 'L' } else { 'S' };
        let global_name = format!(
            "{kind_letter}{}_{}_{}{}",
            access.memory_id,
            access.address,
            if access.is_load { 'L' } else { 'S' },
            this_ordinal
        );

        let e = trace.event_mut(id);
        e.name = access.name.clone();
        e.global_name = global_name;
        e.is_global = true;

        if access.is_load {
            trace.insert_read(&access.name, id);
        } else {
            trace.insert_write(&access.name, id);
        }
    }

    /// Calls whose callee starts with `pthread` are thread ops (spec
    /// section 4.1 item 1): create/join/lock/unlock/wait/signal/broadcast/
    /// barrier_wait. Each updates the relevant manager and trace table,
    /// then records a matching `NORMAL` event so it still participates in
    /// the encoding.
    fn record_thread_op(
        &mut self,
        trace: &mut Trace,
        state: &mut ExecutionState,
        thread_id: ThreadId,
        ki: &KInstruction,
    ) -> MtaResult<Option<EventId>> {
        let callee = ki.callee.as_deref().unwrap_or("");
        let object = ki
            .result_expr
            .as_ref()
            .and_then(|e| e.root_name())
            .unwrap_or("obj")
            .to_owned();

        match callee {
            "pthread_create" => {
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                let child = state.create_thread(Some(thread_id))?;
                // The child starts synchronized-with the creator at the
                // create point (spec section 4.6.4's partial-order edge
                // has a happens-before counterpart for DTAM's hybrid
                // closure, spec section 4.7).
                let creator_vc = state.vector_clock_of(thread_id);
                state.merge_vector_clock(child, &creator_vc);
                trace.insert_thread_create(id, child);
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_join" => {
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                // The joined thread id travels in the call's result_expr
                // root name by convention of the mock interpreter.
                if let Some(joined) = ki.result_expr.as_ref().and_then(|e| e.root_name()).and_then(|s| s.parse::<ThreadId>().ok()) {
                    trace.insert_thread_join(id, joined);
                    state.joined_by.entry(thread_id).or_default().push(joined);
                    let joined_vc = state.vector_clock_of(joined);
                    state.merge_vector_clock(thread_id, &joined_vc);
                }
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_mutex_lock" => {
                let outcome = state.mutexes.lock(&object, thread_id)?;
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                trace.insert_lock(&object, thread_id, id);
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                if outcome == LockOutcome::Blocked {
                    state.switch_to_mutex_blocked(thread_id);
                } else {
                    state.adopt_mutex_release(&object, thread_id);
                }
                Ok(Some(id))
            }
            "pthread_mutex_unlock" => {
                state.mutexes.unlock(&object, thread_id)?;
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                state.record_mutex_release(&object, thread_id);
                trace.insert_unlock(&object, thread_id, id)?;
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_cond_wait" => {
                let mutex = ki
                    .inst_parameter_hint()
                    .unwrap_or_else(|| object.clone());
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                let mut mutexes = std::mem::take(&mut state.mutexes);
                let wait_result = state.conds.wait(&object, &mutex, thread_id, &mut mutexes);
                state.mutexes = mutexes;
                wait_result?;
                trace.insert_wait(&object, id, None);
                state.swap_out_thread(thread_id, ThreadState::CondBlocked);
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_cond_signal" => {
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                if let Some(woken) = state.conds.signal(&object) {
                    let signaler_vc = state.vector_clock_of(thread_id);
                    state.merge_vector_clock(woken.tid, &signaler_vc);
                    state.swap_in_thread(woken.tid, ThreadState::MutexBlocked);
                }
                trace.insert_signal(&object, id);
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_cond_broadcast" => {
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                let signaler_vc = state.vector_clock_of(thread_id);
                for woken in state.conds.broadcast(&object) {
                    state.merge_vector_clock(woken.tid, &signaler_vc);
                    state.swap_in_thread(woken.tid, ThreadState::MutexBlocked);
                }
                trace.insert_signal(&object, id);
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            "pthread_barrier_wait" => {
                let result = state.barriers.wait(&object, thread_id)?;
                let id = trace.insert_event(thread_id, EventKind::Normal);
                stamp_vector_clock(trace, state, thread_id, id);
                trace.insert_barrier(&object, id);
                if result.released {
                    // Every waiter of this round becomes mutually
                    // synchronized: merge all their clocks together before
                    // re-admitting the ones that were actually removed
                    // from the scheduler (spec section 5: "unblocking
                    // re-invokes add"); the caller itself was never
                    // removed, so it stays runnable without a swap_in.
                    let mut merged = state.vector_clock_of(thread_id);
                    for &woken in &result.blocked_threads {
                        let vc = state.vector_clock_of(woken);
                        for (i, &v) in vc.iter().enumerate() {
                            if i < merged.len() {
                                merged[i] = merged[i].max(v);
                            } else {
                                merged.push(v);
                            }
                        }
                    }
                    for &woken in &result.blocked_threads {
                        state.merge_vector_clock(woken, &merged);
                        if woken != thread_id {
                            state.swap_in_thread(woken, ThreadState::Runnable);
                        }
                    }
                } else {
                    state.swap_out_thread(thread_id, ThreadState::BarrierBlocked);
                }
                trace.event_mut(id).event_name = format!("{}:{}", ki.file, ki.line);
                Ok(Some(id))
            }
            other => Err(MtaError::BadSyncCall(format!("unrecognized pthread call `{other}`"))),
        }
    }
}

/// Advances `thread_id`'s own vector-clock component and stamps the result
/// onto the just-created event (spec section 3: every event carries a
/// vector clock, length <= `MAX_THREADS`).
fn stamp_vector_clock(trace: &mut Trace, state: &mut ExecutionState, thread_id: ThreadId, id: EventId) {
    let vc = state.tick_vector_clock(thread_id);
    trace.event_mut(id).set_vector_clock(vc);
}

impl KInstruction {
    /// Test/mock convenience: the mock interpreter stows the mutex name a
    /// `cond_wait` call should unlock in `branch_condition_expr`'s root
    /// name, since the real engine would resolve it from the call's second
    /// argument instead.
    fn inst_parameter_hint(&self) -> Option<String> {
        self.branch_condition_expr.as_ref().and_then(|e| e.root_name()).map(|s| s.to_owned())
    }
}
