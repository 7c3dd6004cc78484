//! Assertion verification (spec section 4.6, "Assertion verification"):
//! fail-fast — the first satisfiable negated assertion stops the outer
//! exploration loop and seeds a counterexample prefix.

use crate::encoder::formulas::dominance_constraints;
use crate::encoder::kquery_bridge::translate;
use crate::encoder::solver::{Model, SatResult, Solver};
use crate::encoder::Encoder;
use crate::error::{MtaError, MtaResult};
use crate::prefix::Prefix;
use crate::runtime_data_manager::RuntimeDataManager;
use crate::trace::Trace;

impl<S: Solver> Encoder<S> {
    /// Checks every recorded assertion in program order. On the first SAT
    /// (the assertion can fail), reconstructs the witnessing schedule as a
    /// `Prefix`, enqueues it, and returns `Err(AssertionFailure)` to stop
    /// further exploration of *this* trace. `SolverError`/`UNKNOWN` is
    /// logged and treated as "skip this assertion, continue with next"
    /// (spec section 7).
    pub fn verify_assertion(&mut self, trace: &Trace, rdm: &mut RuntimeDataManager) -> MtaResult<()> {
        for (i, (a_id, a_expr)) in trace.assert_expr.iter().enumerate() {
            self.solver.push();

            let negated = translate(&mut self.solver, self.theory, a_expr);
            let negated = self.solver.not(negated);
            self.solver.assert(negated);

            for c in dominance_constraints(&mut self.solver, self.theory, trace, &self.order_vars, *a_id, &trace.assert_expr) {
                self.solver.assert(c);
            }
            for c in dominance_constraints(&mut self.solver, self.theory, trace, &self.order_vars, *a_id, &trace.br_expr) {
                self.solver.assert(c);
            }

            let location = trace.event(*a_id).event_name.clone();
            match self.solver.check() {
                SatResult::Sat => {
                    if let Some(model) = self.solver.get_model() {
                        let prefix = self.build_prefix_from_model(&model, trace, crate::prefix::Prefix::assertion_name(&location));
                        rdm.add_prefix(prefix);
                    }
                    self.solver.pop();
                    log::warn!("assertion violated at {location} (assertion #{i})");
                    return Err(MtaError::AssertionFailure { location });
                }
                SatResult::Unsat => {
                    self.solver.pop();
                }
                SatResult::Unknown => {
                    log::warn!("solver returned UNKNOWN verifying assertion at {location}, skipping");
                    self.solver.pop();
                }
            }
        }
        Ok(())
    }

    /// Samples a model by reading each event's order variable and sorting
    /// ascending, producing the per-thread schedule a `Prefix` records
    /// (spec section 4.6, "The model is sampled by...").
    pub(crate) fn build_prefix_from_model(&self, model: &S::Model, trace: &Trace, name: String) -> Prefix {
        let mut scored: Vec<(i64, crate::event::EventId)> = trace
            .events()
            .iter()
            .filter_map(|e| {
                let key = self.order_vars.key_of(e.id);
                model.eval_int(&format!("E_{key}")).map(|v| (v, e.id))
            })
            .collect();
        scored.sort_by_key(|(v, _)| *v);

        let order: Vec<crate::thread::ThreadId> = scored.iter().map(|(_, id)| trace.event(*id).thread_id).collect();
        Prefix::new(name, order)
    }
}
