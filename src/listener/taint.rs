//! `TaintListener` (spec section 4.1): propagates taint tags as the trace
//! is recorded. This is the *serial* (single-execution, intra-thread
//! dataflow) half of tainting; the post-hoc parallel/hybrid closures over
//! the full event graph are `taint::dtam::Dtam`'s job (spec section 4.7).

use crate::event::EventId;
use crate::interpreter::KInstruction;
use crate::trace::Trace;
use std::collections::HashSet;

pub struct TaintListener {
    pub enabled: bool,
    tainted: HashSet<String>,
}

impl TaintListener {
    pub fn new(enabled: bool) -> Self {
        TaintListener { enabled, tainted: HashSet::new() }
    }

    /// Marks `name` as a taint source, seeding `trace.dtam_serial` (spec
    /// glossary: DTAM's "user seed set").
    pub fn mark_source(&mut self, trace: &mut Trace, name: &str) {
        self.tainted.insert(name.to_owned());
        trace.dtam_serial.insert(name.to_owned());
        trace.taint_symbolic_expr.insert(name.to_owned());
    }

    pub fn record(&mut self, trace: &mut Trace, id: EventId, ki: &KInstruction) {
        if ki.callee.as_deref() == Some("__mta_taint_source") {
            if let Some(name) = ki.result_expr.as_ref().and_then(|e| e.root_name()) {
                let name = name.to_owned();
                self.mark_source(trace, &name);
            }
            return;
        }

        let Some(access) = &ki.access else { return };
        if access.is_load {
            return;
        }

        let Some(expr) = &ki.result_expr else { return };
        let mut referenced = HashSet::new();
        expr.referenced_names(&mut referenced);

        if referenced.iter().any(|n| self.tainted.contains(n)) {
            self.tainted.insert(access.name.clone());
            trace.taint_symbolic_expr.insert(access.name.clone());
        } else if self.tainted.remove(&access.name) {
            trace.untaint_symbolic_expr.insert(access.name.clone());
        }

        let _ = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::interpreter::{MemoryAccess, Opcode};
    use crate::symbolic_expr::SymbolicExpr;

    #[test]
    fn taint_propagates_through_assignment() {
        let mut trace = Trace::new(1);
        let mut listener = TaintListener::new(true);
        let src_id = trace.insert_event(0, EventKind::Normal);
        let ki_source = KInstruction {
            file: "f.c".into(),
            line: 1,
            opcode: Opcode::Call,
            callee: Some("__mta_taint_source".into()),
            access: None,
            branch_taken: None,
            branch_condition_expr: None,
            result_expr: Some(SymbolicExpr::read("y", "y_L0", 64)),
        };
        listener.record(&mut trace, src_id, &ki_source);
        assert!(trace.dtam_serial.contains("y"));

        let store_id = trace.insert_event(0, EventKind::Normal);
        let ki_store = KInstruction {
            file: "f.c".into(),
            line: 2,
            opcode: Opcode::Store,
            callee: None,
            access: Some(MemoryAccess { name: "z".into(), is_load: false, memory_id: 2, address: 8 }),
            branch_taken: None,
            branch_condition_expr: None,
            result_expr: Some(SymbolicExpr::read("y", "y_L0", 64)),
        };
        listener.record(&mut trace, store_id, &ki_store);
        assert!(trace.taint_symbolic_expr.contains("z"));
    }
}
