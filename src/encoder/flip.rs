//! Branch flipping (spec section 4.6, "Branch flipping"): for every
//! recorded branch, try to force the opposite side and enqueue the
//! resulting schedule as a new `Prefix` when feasible.

use crate::encoder::formulas::dominance_constraints;
use crate::encoder::kquery_bridge::{named_term, translate};
use crate::encoder::solver::{SatResult, Solver};
use crate::encoder::Encoder;
use crate::error::MtaResult;
use crate::filter::filter_useless_with_set;
use crate::prefix::Prefix;
use crate::runtime_data_manager::RuntimeDataManager;
use crate::trace::Trace;

#[derive(Default, Debug, Clone, Copy)]
pub struct FlipStats {
    pub sat: u32,
    pub unsat: u32,
    pub unsat_by_pre_solve: u32,
    pub solver_unknown: u32,
}

impl<S: Solver> Encoder<S> {
    pub fn flip_if_branches(&mut self, trace: &mut Trace, rdm: &mut RuntimeDataManager) -> MtaResult<FlipStats> {
        let mut stats = FlipStats::default();

        for (i, (b_id, b_expr)) in trace.br_expr.clone().iter().enumerate() {
            let mut extra_names = std::collections::HashSet::new();
            b_expr.referenced_names(&mut extra_names);

            if !filter_useless_with_set(trace, &extra_names) {
                stats.unsat_by_pre_solve += 1;
                continue;
            }

            self.solver.push();

            let negated = translate(&mut self.solver, self.theory, b_expr);
            let negated = self.solver.not(negated);
            self.solver.assert(negated);

            for c in dominance_constraints(&mut self.solver, self.theory, trace, &self.order_vars, *b_id, &trace.assert_expr) {
                self.solver.assert(c);
            }
            for c in dominance_constraints(&mut self.solver, self.theory, trace, &self.order_vars, *b_id, &trace.br_expr) {
                self.solver.assert(c);
            }

            self.concretize_unrelated_reads(trace, i, *b_id);

            let event = trace.event(*b_id);
            let taken = event.br_condition.unwrap_or(true);
            let location = event.event_name.clone();
            let line = location.rsplit(':').next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);

            match self.solver.check() {
                SatResult::Sat => {
                    if let Some(model) = self.solver.get_model() {
                        let name = Prefix::branch_flip_name(trace.id, line, &location, taken, true);
                        let prefix = self.build_prefix_from_model(&model, trace, name);
                        rdm.add_prefix(prefix);
                    }
                    stats.sat += 1;
                }
                SatResult::Unsat => {
                    stats.unsat += 1;
                }
                SatResult::Unknown => {
                    log::warn!("solver returned UNKNOWN flipping branch at {location}, skipping");
                    stats.solver_unknown += 1;
                }
            }

            self.solver.pop();
        }

        Ok(stats)
    }

    /// Forces every read *outside* branch `i`'s name closure to keep the
    /// value it actually observed in this run, so the flip isolates the
    /// branch's own condition instead of drifting unrelated reads (spec
    /// section 4.6: "read-value concretization for reads not in the
    /// branch's name closure").
    fn concretize_unrelated_reads(&mut self, trace: &Trace, branch_index: usize, branch_event: crate::event::EventId) {
        let Some(closure) = trace.br_related_symbolic_expr.get(branch_index) else { return };
        let branch_thread = trace.event(branch_event).thread_id;

        for (name, reads) in &trace.read_set_related_to_branch {
            if closure.contains(name) {
                continue;
            }
            for &r in reads {
                if trace.event(r).thread_id != branch_thread {
                    continue;
                }
                let Some(observed) = trace.event(r).related_symbolic_expr.first() else { continue };
                let observed_term = translate(&mut self.solver, self.theory, observed);
                let r_var = named_term(&mut self.solver, self.theory, &trace.event(r).global_name, 64);
                let pin = self.solver.eq(r_var, observed_term);
                self.solver.assert(pin);
            }
        }
    }
}
