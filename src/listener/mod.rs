pub mod recorder;
pub mod symbolic;
pub mod taint;

pub use recorder::RecorderListener;
pub use symbolic::SymbolicListener;
pub use taint::TaintListener;

use crate::error::MtaResult;
use crate::execution_state::ExecutionState;
use crate::interpreter::{InstructionObserver, KInstruction};
use crate::thread::ThreadId;
use crate::trace::Trace;
use std::collections::HashMap;

/// A stack frame in a listener's mirror-executed address space (spec
/// section 4.1): listeners symbolically execute side effects of sync
/// primitives (argument marshalling for `pthread_create`, heap
/// bookkeeping) without disturbing the Interpreter's own stack.
#[derive(Default, Clone, Debug)]
pub struct ScratchFrame {
    pub locals: Vec<crate::symbolic_expr::SymbolicExpr>,
}

/// Per-thread scratch stack shared by every listener in the pipeline, so
/// none of them needs its own copy of the mirrored address space.
#[derive(Default)]
pub struct ScratchStack {
    frames: HashMap<ThreadId, Vec<ScratchFrame>>,
}

impl ScratchStack {
    pub fn push(&mut self, tid: ThreadId) {
        self.frames.entry(tid).or_default().push(ScratchFrame::default());
    }

    pub fn pop(&mut self, tid: ThreadId) -> Option<ScratchFrame> {
        self.frames.get_mut(&tid).and_then(|s| s.pop())
    }

    pub fn top_mut(&mut self, tid: ThreadId) -> Option<&mut ScratchFrame> {
        self.frames.get_mut(&tid).and_then(|s| s.last_mut())
    }

    pub fn depth(&self, tid: ThreadId) -> usize {
        self.frames.get(&tid).map(|s| s.len()).unwrap_or(0)
    }
}

/// Three observers the Interpreter notifies on every instruction (spec
/// section 2 / 4.1): `RecorderListener` captures events/globals/sync
/// calls, `SymbolicListener` captures path conditions and symbolic
/// read/write expressions, `TaintListener` propagates taint tags. They
/// share `scratch`.
pub struct ListenerPipeline {
    pub recorder: RecorderListener,
    pub symbolic: SymbolicListener,
    pub taint: TaintListener,
    pub scratch: ScratchStack,
}

impl ListenerPipeline {
    pub fn new(dtam_enabled: bool) -> Self {
        ListenerPipeline {
            recorder: RecorderListener::default(),
            symbolic: SymbolicListener::default(),
            taint: TaintListener::new(dtam_enabled),
            scratch: ScratchStack::default(),
        }
    }
}

impl InstructionObserver for ListenerPipeline {
    fn before_main(&mut self, _trace: &mut Trace, _state: &mut ExecutionState) {}

    fn before_execute_instruction(
        &mut self,
        _trace: &mut Trace,
        _state: &mut ExecutionState,
        _thread_id: ThreadId,
        _ki: &KInstruction,
    ) -> MtaResult<()> {
        Ok(())
    }

    fn after_execute_instruction(
        &mut self,
        trace: &mut Trace,
        state: &mut ExecutionState,
        thread_id: ThreadId,
        ki: &KInstruction,
    ) -> MtaResult<()> {
        let id = self.recorder.record(trace, state, thread_id, ki)?;
        if let Some(id) = id {
            self.symbolic.record(trace, id, ki);
            if self.taint.enabled {
                self.taint.record(trace, id, ki);
            }
        }
        Ok(())
    }

    fn execution_failed(&mut self, trace: &mut Trace, _thread_id: ThreadId, _ki: &KInstruction, message: &str) {
        log::warn!("execution failed: {message}");
        trace.trace_type = crate::trace::TraceType::Failed;
    }
}
