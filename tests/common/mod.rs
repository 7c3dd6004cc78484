//! Shared scaffolding for the scenario tests (spec section 8): a
//! `ProgramDriver` that plays back one fixed, per-thread instruction
//! script against whatever scheduler `ExecutionState` hands it, plus
//! small `KInstruction` builders matching `RecorderListener`'s mock
//! interpreter conventions (the joined thread id / sync object name
//! travels in `result_expr`'s root name; `cond_wait`'s mutex hint travels
//! in `branch_condition_expr`'s root name).

use mta_verify::error::MtaResult;
use mta_verify::execution_state::ExecutionState;
use mta_verify::interpreter::{InstructionObserver, KInstruction, MemoryAccess, Opcode, ProgramDriver};
use mta_verify::symbolic_expr::SymbolicExpr;
use mta_verify::thread::ThreadId;
use mta_verify::trace::Trace;
use std::collections::HashMap;

/// Plays back `programs[tid]` in order on thread `tid`, letting
/// `ExecutionState`'s scheduler (FIFS, round-robin, or a guided replay)
/// decide which thread actually gets to run next. A thread with no more
/// instructions, or none scripted for it at all (spawned threads beyond
/// what the scenario cares about), is simply terminated.
pub struct MockInterpreter {
    pub programs: Vec<Vec<KInstruction>>,
}

impl MockInterpreter {
    pub fn new(programs: Vec<Vec<KInstruction>>) -> Self {
        MockInterpreter { programs }
    }
}

impl ProgramDriver for MockInterpreter {
    fn drive(&mut self, trace: &mut Trace, state: &mut ExecutionState, observer: &mut dyn InstructionObserver) -> MtaResult<()> {
        let mut cursor: HashMap<ThreadId, usize> = HashMap::new();

        // Safety cap: every scripted program is finite, so a well-formed
        // scenario always terminates long before this is reached.
        for _ in 0..10_000 {
            if !state.has_schedulable_thread() {
                break;
            }
            let tid = match state.select_next() {
                Ok(tid) => tid,
                Err(_) => break,
            };

            let at = *cursor.get(&tid).unwrap_or(&0);
            let done = self.programs.get(tid as usize).map(|p| at >= p.len()).unwrap_or(true);
            if done {
                state.swap_out_thread(tid, mta_verify::thread::ThreadState::Terminated);
                continue;
            }

            let ki = self.programs[tid as usize][at].clone();
            observer.after_execute_instruction(trace, state, tid, &ki)?;
            cursor.insert(tid, at + 1);
        }
        Ok(())
    }
}

/// Recreates `RecorderListener`'s `global_name` formula so a test can
/// embed, in a later instruction's `result_expr`, the exact variable name
/// a given access will be assigned — letting e.g. `t = x; t += 1; x = t;`
/// actually chain through the read-from formula instead of being a free
/// variable.
pub fn global_name(memory_id: u64, address: u64, is_load: bool, ordinal: u64) -> String {
    let k = if is_load { 'L' } else { 'S' };
    format!("{k}{memory_id}_{address}_{k}{ordinal}")
}

pub fn store(file: &str, line: u32, name: &str, memory_id: u64, address: u64, value: SymbolicExpr) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Store,
        callee: None,
        access: Some(MemoryAccess { name: name.into(), is_load: false, memory_id, address }),
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(value),
    }
}

pub fn load(file: &str, line: u32, name: &str, memory_id: u64, address: u64, global_name: &str) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Load,
        callee: None,
        access: Some(MemoryAccess { name: name.into(), is_load: true, memory_id, address }),
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(SymbolicExpr::read(name, global_name, 64)),
    }
}

pub fn branch(file: &str, line: u32, cond: SymbolicExpr, taken: bool) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Br,
        callee: None,
        access: None,
        branch_taken: Some(taken),
        branch_condition_expr: Some(cond),
        result_expr: None,
    }
}

pub fn assert_ki(file: &str, line: u32, cond: SymbolicExpr) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Call,
        callee: Some("__mta_assert".into()),
        access: None,
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(cond),
    }
}

pub fn taint_source(file: &str, line: u32, name: &str) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Call,
        callee: Some("__mta_taint_source".into()),
        access: None,
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(SymbolicExpr::read(name, name, 64)),
    }
}

fn obj_call(file: &str, line: u32, callee: &str, object: &str) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Call,
        callee: Some(callee.into()),
        access: None,
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(SymbolicExpr::read(object, object, 64)),
    }
}

pub fn pthread_create(file: &str, line: u32) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Call,
        callee: Some("pthread_create".into()),
        access: None,
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: None,
    }
}

pub fn pthread_join(file: &str, line: u32, joined: ThreadId) -> KInstruction {
    KInstruction {
        file: file.into(),
        line,
        opcode: Opcode::Call,
        callee: Some("pthread_join".into()),
        access: None,
        branch_taken: None,
        branch_condition_expr: None,
        result_expr: Some(SymbolicExpr::read(joined.to_string(), joined.to_string(), 64)),
    }
}

pub fn mutex_lock(file: &str, line: u32, mutex: &str) -> KInstruction {
    obj_call(file, line, "pthread_mutex_lock", mutex)
}

pub fn mutex_unlock(file: &str, line: u32, mutex: &str) -> KInstruction {
    obj_call(file, line, "pthread_mutex_unlock", mutex)
}

pub fn cond_wait(file: &str, line: u32, cond: &str, mutex: &str) -> KInstruction {
    let mut ki = obj_call(file, line, "pthread_cond_wait", cond);
    ki.branch_condition_expr = Some(SymbolicExpr::read(mutex, mutex, 64));
    ki
}

pub fn cond_signal(file: &str, line: u32, cond: &str) -> KInstruction {
    obj_call(file, line, "pthread_cond_signal", cond)
}

pub fn cond_broadcast(file: &str, line: u32, cond: &str) -> KInstruction {
    obj_call(file, line, "pthread_cond_broadcast", cond)
}

pub fn barrier_wait(file: &str, line: u32, barrier: &str) -> KInstruction {
    obj_call(file, line, "pthread_barrier_wait", barrier)
}
