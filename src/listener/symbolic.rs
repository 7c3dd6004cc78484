//! `SymbolicListener` (spec section 4.1): appends every symbolic
//! expression observed on a memory access, branch, or assertion to
//! `rw_expr`, `br_expr`, `assert_expr`, tagged with the owning event.

use crate::event::EventId;
use crate::interpreter::{KInstruction, Opcode};
use crate::trace::Trace;

#[derive(Default)]
pub struct SymbolicListener;

impl SymbolicListener {
    pub fn record(&mut self, trace: &mut Trace, id: EventId, ki: &KInstruction) {
        if let Some(expr) = &ki.result_expr {
            if ki.access.is_some() {
                trace.rw_expr.push((id, expr.clone()));
                if ki.callee.as_deref() == Some("__mta_assert") {
                    trace.assert_expr.push((id, expr.clone()));
                } else if !matches!(ki.opcode, Opcode::Br) {
                    trace.store_expr.push((id, expr.clone()));
                }
            }
            if ki.callee.as_deref() == Some("__mta_assert") {
                if !trace.assert_expr.iter().any(|(e, _)| *e == id) {
                    trace.assert_expr.push((id, expr.clone()));
                }
            }
        }

        if ki.opcode == Opcode::Br {
            if let Some(cond) = &ki.branch_condition_expr {
                trace.br_expr.push((id, cond.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::interpreter::MemoryAccess;
    use crate::symbolic_expr::SymbolicExpr;

    #[test]
    fn branch_expr_recorded_on_br_instruction() {
        let mut trace = Trace::new(1);
        let id = trace.insert_event(0, EventKind::Normal);
        let ki = KInstruction {
            file: "f.c".into(),
            line: 3,
            opcode: Opcode::Br,
            callee: None,
            access: None,
            branch_taken: Some(true),
            branch_condition_expr: Some(SymbolicExpr::read("x", "x_L0", 64)),
            result_expr: None,
        };
        SymbolicListener::default().record(&mut trace, id, &ki);
        assert_eq!(trace.br_expr.len(), 1);
    }

    #[test]
    fn store_expr_recorded_on_memory_access() {
        let mut trace = Trace::new(1);
        let id = trace.insert_event(0, EventKind::Normal);
        let ki = KInstruction {
            file: "f.c".into(),
            line: 3,
            opcode: Opcode::Store,
            callee: None,
            access: Some(MemoryAccess { name: "x".into(), is_load: false, memory_id: 1, address: 0 }),
            branch_taken: None,
            branch_condition_expr: None,
            result_expr: Some(SymbolicExpr::Constant { value: 2, width: 64 }),
        };
        SymbolicListener::default().record(&mut trace, id, &ki);
        assert_eq!(trace.rw_expr.len(), 1);
        assert_eq!(trace.store_expr.len(), 1);
    }
}
