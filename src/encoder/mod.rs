pub mod flip;
pub mod formulas;
pub mod kquery_bridge;
pub mod solver;
pub mod verify;

pub use flip::FlipStats;
pub use solver::{Model, SatResult, Solver, Z3Solver};

use crate::config::{ClusterLevel, Theory, VerifierConfig};
use crate::trace::Trace;
use formulas::OrderVars;

/// Owns one solver context's worth of encoding state for a single Trace:
/// the shared order-variable table and the six asserted sub-formulas
/// (spec section 4.6). Reused by `verify_assertion` and
/// `flip_if_branches`, which bracket their own speculative queries in
/// `push`/`pop` on top of this persistent base.
pub struct Encoder<S: Solver> {
    pub solver: S,
    pub theory: Theory,
    pub cluster_level: ClusterLevel,
    pub(crate) order_vars: OrderVars<S>,
}

impl<S: Solver> Encoder<S> {
    /// Builds the order-variable table and asserts all six sub-formulas
    /// for `trace` into a fresh solver (spec section 4.6: "Operates on an
    /// already-filtered Trace").
    pub fn encode(mut solver: S, cfg: &VerifierConfig, trace: &Trace) -> Self {
        let order_vars = OrderVars::build(&mut solver, trace, cfg.cluster_level);

        formulas::assert_initial_value(&mut solver, cfg.theory, trace);
        formulas::assert_path_condition(&mut solver, cfg.theory, trace);
        formulas::assert_memory_model(&mut solver, trace, &order_vars);
        formulas::assert_partial_order(&mut solver, trace, &order_vars);
        formulas::assert_read_from(&mut solver, cfg.theory, trace, &order_vars);
        formulas::assert_synchronization(&mut solver, trace, &order_vars);

        Encoder { solver, theory: cfg.theory, cluster_level: cfg.cluster_level, order_vars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::solver::Z3Solver;
    use crate::event::EventKind;
    use crate::trace::ConstValue;

    #[test]
    fn encode_unconstrained_trace_is_sat() {
        let mut trace = Trace::new(1);
        let w = trace.insert_event(0, EventKind::Normal);
        trace.event_mut(w).name = "x".into();
        trace.event_mut(w).global_name = "x_S0".into();
        trace.insert_write("x", w);
        trace.global_variable_initializer_related_to_branch.insert("x".into(), ConstValue(0));
        crate::filter::filter_useless(&mut trace);

        let cfg = VerifierConfig::default();
        let mut encoder = Encoder::encode(Z3Solver::new(), &cfg, &trace);
        assert_eq!(encoder.solver.check(), SatResult::Sat);
    }
}
