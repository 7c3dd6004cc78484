//! Symbolic taint / Potential Taint Set refinement (spec section 4.7):
//! for each DTAM `parallel \ serial` candidate, check feasibility of the
//! candidate actually carrying tainted data under the full encoding.

use crate::encoder::formulas::assert_taint_tags;
use crate::encoder::solver::{SatResult, Solver};
use crate::encoder::Encoder;
use crate::trace::Trace;
use std::collections::HashSet;

impl<S: Solver> Encoder<S> {
    /// Computes `taint_pts`/`no_taint_pts` over `trace.dtam_parallel \
    /// trace.dtam_serial` (staged through `trace.potential_taint`, which
    /// holds exactly the still-undetermined candidates): asserts `v_tag
    /// == true` for each candidate `v` against the real taint-propagation
    /// constraints `assert_taint_tags` pins into the solver (grounded in
    /// `trace.taint_symbolic_expr`/`untaint_symbolic_expr`, the serial
    /// taint log `listener::TaintListener` maintains), checks, and on SAT
    /// promotes every candidate whose tag is simultaneously true in the
    /// model (spec section 4.7).
    pub fn symbolic_taint(&mut self, trace: &mut Trace) {
        let candidates: HashSet<String> = trace.dtam_parallel.difference(&trace.dtam_serial).cloned().collect();
        trace.potential_taint = candidates.clone();
        if candidates.is_empty() {
            return;
        }

        let seeds: HashSet<String> =
            trace.dtam_serial.union(&trace.taint_symbolic_expr).cloned().collect::<HashSet<_>>().difference(&trace.untaint_symbolic_expr).cloned().collect();
        let names: HashSet<String> = trace
            .write_set
            .keys()
            .cloned()
            .chain(trace.read_set.keys().cloned())
            .chain(seeds.iter().cloned())
            .chain(candidates.iter().cloned())
            .collect();
        assert_taint_tags(&mut self.solver, trace, &self.order_vars, &seeds, &names);

        for v in &candidates {
            if !trace.potential_taint.contains(v) {
                continue;
            }

            self.solver.push();
            let tag = self.solver.bool_const(&format!("{v}_tag"));
            let is_true = self.solver.bool_val(true);
            let c = self.solver.eq(tag, is_true);
            self.solver.assert(c);

            match self.solver.check() {
                SatResult::Sat => {
                    if let Some(model) = self.solver.get_model() {
                        for other in &candidates {
                            if !trace.potential_taint.contains(other) {
                                continue;
                            }
                            if model.eval_bool(&format!("{other}_tag")).unwrap_or(false) {
                                trace.taint_pts.insert(other.clone());
                                trace.potential_taint.remove(other);
                            }
                        }
                    }
                    trace.taint_pts.insert(v.clone());
                    trace.potential_taint.remove(v);
                }
                SatResult::Unsat => {
                    trace.no_taint_pts.insert(v.clone());
                    trace.potential_taint.remove(v);
                }
                SatResult::Unknown => {
                    log::warn!("solver returned UNKNOWN refining symbolic taint for `{v}`, marking untainted");
                    trace.no_taint_pts.insert(v.clone());
                    trace.potential_taint.remove(v);
                }
            }
            self.solver.pop();
        }
    }
}
