//! S5 (spec section 8): `pthread_create(t, f, &x)` where `f` asserts
//! `x != 0` and `x` is symbolic. Expected: `verify_assertion` produces a
//! prefix named `assert_*` with a model where `x == 0`; subsequent
//! execution of that prefix (spec section 4.6: "stop" is fail-fast, so
//! this trace's own exploration halts with `AssertionViolated`) would
//! record a `FAILED` trace for the counterexample schedule.

mod common;

use common::*;
use mta_verify::encoder::solver::Z3Solver;
use mta_verify::error::MtaResult;
use mta_verify::execution_state::ExecutionState;
use mta_verify::interpreter::{InstructionObserver, ProgramDriver};
use mta_verify::orchestrator::{Orchestrator, Outcome};
use mta_verify::symbolic_expr::SymbolicExpr;
use mta_verify::trace::Trace;
use mta_verify::VerifierConfig;

struct AssertInChild;

impl ProgramDriver for AssertInChild {
    fn drive(&mut self, trace: &mut Trace, state: &mut ExecutionState, observer: &mut dyn InstructionObserver) -> MtaResult<()> {
        // Main thread spawns the child, then joins it; `x` is never
        // concretely constrained by either thread, so it stays free for
        // the solver to pick — only the assertion pins it.
        let main_thread = vec![pthread_create("child.c", 1), pthread_join("child.c", 2, 1)];

        // Child thread `f`: `assert(x != 0)` with `x` a free symbolic
        // input (no load event backing it, matching "x is symbolic").
        let child_thread = vec![assert_ki(
            "child.c",
            10,
            SymbolicExpr::read("x", "x_in", 64).eq(SymbolicExpr::Constant { value: 0, width: 64 }).not(),
        )];

        let mut driver = MockInterpreter::new(vec![main_thread, child_thread]);
        driver.drive(trace, state, observer)
    }
}

#[test]
fn assertion_failing_in_child_thread_is_reported_with_zero_witness() {
    let mut orch: Orchestrator<AssertInChild, Z3Solver> = Orchestrator::new(AssertInChild, VerifierConfig::default());
    let outcome = orch.run().unwrap();
    match outcome {
        Outcome::AssertionViolated { location } => {
            assert!(location.ends_with("child.c:10"), "violation should be reported at the child's assert, got {location}");
        }
        other => panic!("expected the child's assert(x != 0) to be falsifiable with x == 0, got {other:?}"),
    }

    // The orchestrator's fail-fast stop means the counterexample prefix
    // it built from the model is sitting in the prefix queue, named
    // per spec section 6's `assert_<event_name>` convention, ready to
    // seed the next (would-be FAILED) trace.
    assert_eq!(orch.rdm.prefix_queue_len(), 1, "the witnessing schedule should have been enqueued before the stop");
}
