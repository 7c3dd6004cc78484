//! S1 (spec section 8): two threads run `t = x; t = t + 1; x = t;` with
//! no synchronization; a third read checks `assert(x == 2)`. Since the
//! read-from formula's order variables are free (not pinned to the
//! concrete recording order), both threads' first reads may independently
//! pick up the untouched initial value, so the lost update is reachable
//! even though this single recorded execution happened to run thread 0
//! fully before thread 1.

mod common;

use common::*;
use mta_verify::encoder::solver::Z3Solver;
use mta_verify::interpreter::ProgramDriver;
use mta_verify::orchestrator::{Orchestrator, Outcome};
use mta_verify::symbolic_expr::{BinOp, SymbolicExpr};
use mta_verify::trace::Trace;
use mta_verify::VerifierConfig;

struct LostUpdate;

impl ProgramDriver for LostUpdate {
    fn drive(
        &mut self,
        trace: &mut Trace,
        state: &mut mta_verify::execution_state::ExecutionState,
        observer: &mut dyn mta_verify::interpreter::InstructionObserver,
    ) -> mta_verify::error::MtaResult<()> {
        // thread 0 (memory_id=1, address=0 for "x"): create thread 1, then
        // read-increment-write x.
        let t0_read_global = global_name(1, 0, true, 0);
        let thread0 = vec![
            pthread_create("race.c", 1),
            load("race.c", 2, "x", 1, 0, &t0_read_global),
            store(
                "race.c",
                3,
                "x",
                1,
                0,
                SymbolicExpr::bin(BinOp::Add, SymbolicExpr::read("x", &t0_read_global, 64), SymbolicExpr::Constant { value: 1, width: 64 }),
            ),
        ];

        // thread 1: same read-increment-write, then a final read and the
        // assertion.
        let t1_read_global = global_name(1, 0, true, 0);
        let t1_final_global = global_name(1, 0, true, 2);
        let thread1 = vec![
            load("race.c", 5, "x", 1, 0, &t1_read_global),
            store(
                "race.c",
                6,
                "x",
                1,
                0,
                SymbolicExpr::bin(BinOp::Add, SymbolicExpr::read("x", &t1_read_global, 64), SymbolicExpr::Constant { value: 1, width: 64 }),
            ),
            load("race.c", 7, "x", 1, 0, &t1_final_global),
            assert_ki("race.c", 8, SymbolicExpr::read("x", &t1_final_global, 64).eq(SymbolicExpr::Constant { value: 2, width: 64 })),
        ];

        let mut driver = MockInterpreter::new(vec![thread0, thread1]);
        driver.drive(trace, state, observer)
    }
}

#[test]
fn unsynchronized_lost_update_is_detected() {
    let mut orch: Orchestrator<LostUpdate, Z3Solver> = Orchestrator::new(LostUpdate, VerifierConfig::default());
    let outcome = orch.run().unwrap();
    assert!(matches!(outcome, Outcome::AssertionViolated { .. }), "expected the lost update to violate assert(x == 2), got {outcome:?}");
}
