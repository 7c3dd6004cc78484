//! The `Interpreter` contract consumed by the core (spec section 6). The
//! underlying single-thread symbolic execution engine is explicitly out of
//! scope (spec section 1); this module only defines the seam the core's
//! listener pipeline is notified through, and the handful of primitive
//! operations listeners call while mirror-executing synchronization calls.

use crate::execution_state::ExecutionState;
use crate::symbolic_expr::SymbolicExpr;
use crate::thread::ThreadId;
use crate::trace::Trace;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Opcode {
    Load,
    Store,
    Br,
    Call,
    Ret,
    Other,
}

#[derive(Clone, Debug)]
pub struct MemoryAccess {
    pub name: String,
    pub is_load: bool,
    pub memory_id: u64,
    pub address: u64,
}

/// A single bitcode-level instruction as the Interpreter presents it to
/// the core. Carries the debug file/line and, for call sites, the callee
/// name (spec section 6: "Each `ki` exposes: opcode, operands, debug
/// file/line, and callee name for call sites").
#[derive(Clone, Debug)]
pub struct KInstruction {
    pub file: String,
    pub line: u32,
    pub opcode: Opcode,
    pub callee: Option<String>,
    pub access: Option<MemoryAccess>,
    /// For a two-way conditional branch, the concrete side actually taken.
    pub branch_taken: Option<bool>,
    pub branch_condition_expr: Option<SymbolicExpr>,
    pub result_expr: Option<SymbolicExpr>,
}

impl KInstruction {
    pub fn is_thread_op(&self) -> bool {
        self.opcode == Opcode::Call && self.callee.as_deref().map(|c| c.starts_with("pthread")).unwrap_or(false)
    }

    pub fn is_global_op(&self) -> bool {
        self.access.is_some()
    }
}

/// Notified by the Interpreter at three points per instruction (spec
/// section 4.1): `before_main`, `before_execute_instruction`,
/// `after_execute_instruction`. Implemented by `listener::ListenerPipeline`.
pub trait InstructionObserver {
    fn before_main(&mut self, trace: &mut Trace, state: &mut ExecutionState);
    fn before_execute_instruction(&mut self, trace: &mut Trace, state: &mut ExecutionState, thread_id: ThreadId, ki: &KInstruction) -> crate::error::MtaResult<()>;
    fn after_execute_instruction(&mut self, trace: &mut Trace, state: &mut ExecutionState, thread_id: ThreadId, ki: &KInstruction) -> crate::error::MtaResult<()>;
    fn execution_failed(&mut self, trace: &mut Trace, thread_id: ThreadId, ki: &KInstruction, message: &str);
}

/// Drives one full guided symbolic execution: steps the out-of-scope
/// single-thread engine forward, notifying `observer` at the three points
/// spec section 4.1 enumerates (`before_main`, `before_execute_instruction`,
/// `after_execute_instruction`), until every thread has terminated or the
/// guided schedule is exhausted with nothing left runnable. This is the
/// `interpret(state)` call in the top-level loop (spec section 4.9); the
/// core only ever consumes the engine through this seam.
pub trait ProgramDriver {
    fn drive(
        &mut self,
        trace: &mut Trace,
        state: &mut ExecutionState,
        observer: &mut dyn InstructionObserver,
    ) -> crate::error::MtaResult<()>;
}

/// Primitive operations the out-of-scope Interpreter exposes and that
/// listeners call while mirror-executing sync ops (argument marshalling
/// for `pthread_create`, `malloc`/`calloc`/`free`, vaarg bookkeeping) on
/// their own scratch stack, without disturbing the Interpreter's main
/// stack (spec section 4.1).
pub trait Interpreter {
    fn eval(&self, thread_id: ThreadId, operand_index: usize) -> SymbolicExpr;
    fn bind_local(&mut self, thread_id: ThreadId, slot: usize, value: SymbolicExpr);
    fn bind_argument(&mut self, thread_id: ThreadId, index: usize, value: SymbolicExpr);
    fn execute_memory_operation(&mut self, thread_id: ThreadId, access: &MemoryAccess, value: Option<SymbolicExpr>) -> SymbolicExpr;
    fn get_memory_object(&self, address: u64) -> Option<u64>;
    fn resolve_exact(&self, address: u64) -> Option<u64>;
    /// Forks the state on a symbolic branch condition, returning whether
    /// the true side is feasible independently of the false side (the core
    /// never calls this directly — it is here only so mirror-executed sync
    /// primitives can fork state the same way ordinary instructions do).
    fn fork_state(&mut self, condition: &SymbolicExpr) -> bool;
}
