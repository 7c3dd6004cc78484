//! S6 (spec section 8): `y` is marked a taint source, `z = f(y)` is
//! stored from it, and a branch `if (z > 0)` reads `z` back — a single
//! thread, data-race-free path. Expected: `dtam_serial == {y}`,
//! `dtam_parallel` is a superset of `{y, z}`, and `symbolic_taint`
//! (PTS) places `z` in `taint_pts` (it's a parallel-but-not-serial
//! candidate that the sync-aware formula can't rule out).

mod common;

use common::*;
use mta_verify::config::VerifierConfig;
use mta_verify::encoder::solver::Z3Solver;
use mta_verify::encoder::Encoder;
use mta_verify::execution_state::ExecutionState;
use mta_verify::filter::filter_useless;
use mta_verify::interpreter::ProgramDriver;
use mta_verify::listener::ListenerPipeline;
use mta_verify::symbolic_expr::{BinOp, SymbolicExpr};
use mta_verify::thread::SchedulerVariant;
use mta_verify::trace::Trace;

#[test]
fn taint_propagates_from_source_through_store_to_branch_read() {
    let mut trace = Trace::new(1);
    let mut state = ExecutionState::new(SchedulerVariant::Fifs(Default::default()));

    let z_load_name = global_name(1, 0, true, 1);
    let program = vec![
        taint_source("taint.c", 1, "y"),
        store("taint.c", 2, "z", 1, 0, SymbolicExpr::read("y", "y", 64)),
        load("taint.c", 3, "z", 1, 0, &z_load_name),
        branch(
            "taint.c",
            4,
            SymbolicExpr::bin(BinOp::Slt, SymbolicExpr::Constant { value: 0, width: 64 }, SymbolicExpr::read("z", &z_load_name, 64)),
            true,
        ),
    ];

    let mut listeners = ListenerPipeline::new(true);
    listeners.before_main(&mut trace, &mut state);
    let mut driver = MockInterpreter::new(vec![program]);
    driver.drive(&mut trace, &mut state, &mut listeners).unwrap();

    trace.resolve_latest_write_same_thread();
    assert_eq!(trace.dtam_serial, ["y".to_string()].into_iter().collect(), "y alone is the seeded taint source");

    filter_useless(&mut trace);
    mta_verify::taint::run(&mut trace);

    assert!(trace.dtam_parallel.contains("y"));
    assert!(trace.dtam_parallel.contains("z"), "z = f(y) should be reachable in the parallel closure");

    let cfg = VerifierConfig::default();
    let mut encoder = Encoder::<Z3Solver>::encode(Z3Solver::new(), &cfg, &trace);
    encoder.symbolic_taint(&mut trace);

    assert!(trace.taint_pts.contains("z"), "z should be promoted into the potential taint set");
    assert!(!trace.taint_pts.contains("y"), "y is already serially tainted, not a PTS candidate");
}
