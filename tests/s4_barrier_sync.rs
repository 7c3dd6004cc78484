//! S4 (spec section 8): three threads hit a barrier initialized to 3,
//! then each reads a shared variable set by thread 0 before the barrier.
//! Expected: the encoder assigns identical order variables to the three
//! barrier wait events (checked directly below, since the default
//! `ClusterLevel::SourceLine` keys each event's order variable by its
//! `file:line`, which the test controls), and every post-barrier read
//! must observe the pre-barrier write — checked via `verify_assertion`
//! reporting no violation for `assert(x == 1)` in all three threads.

mod common;

use common::*;
use mta_verify::config::VerifierConfig;
use mta_verify::encoder::solver::{SatResult, Solver, Z3Solver};
use mta_verify::encoder::Encoder;
use mta_verify::execution_state::ExecutionState;
use mta_verify::filter::filter_useless;
use mta_verify::interpreter::ProgramDriver;
use mta_verify::listener::ListenerPipeline;
use mta_verify::runtime_data_manager::RuntimeDataManager;
use mta_verify::symbolic_expr::SymbolicExpr;
use mta_verify::thread::SchedulerVariant;
use mta_verify::trace::{ConstValue, Trace};

#[test]
fn barrier_orders_all_waiters_identically_and_reads_see_pre_barrier_write() {
    let mut trace = Trace::new(1);
    let mut state = ExecutionState::new(SchedulerVariant::Fifs(Default::default()));
    state.barriers.init("b", Some(3)).unwrap();

    let t0_final = global_name(3, 0, true, 1);
    let thread0 = vec![
        pthread_create("barrier.c", 1),
        pthread_create("barrier.c", 2),
        store("barrier.c", 3, "x", 3, 0, SymbolicExpr::Constant { value: 1, width: 64 }),
        barrier_wait("barrier.c", 4, "b"),
        load("barrier.c", 5, "x", 3, 0, &t0_final),
        assert_ki("barrier.c", 6, SymbolicExpr::read("x", &t0_final, 64).eq(SymbolicExpr::Constant { value: 1, width: 64 })),
    ];

    // Different `memory_id`s for thread1/thread2's reads keep their
    // `global_name`s distinct even though both are each thread's first
    // access to "x" (ordinal 0) — the shared *location name* "x" is what
    // ties them into the same read-from formula, not the value variable.
    let t1_final = global_name(4, 0, true, 0);
    let thread1 = vec![
        barrier_wait("barrier.c", 10, "b"),
        load("barrier.c", 11, "x", 4, 0, &t1_final),
        assert_ki("barrier.c", 12, SymbolicExpr::read("x", &t1_final, 64).eq(SymbolicExpr::Constant { value: 1, width: 64 })),
    ];

    let t2_final = global_name(5, 0, true, 0);
    let thread2 = vec![
        barrier_wait("barrier.c", 20, "b"),
        load("barrier.c", 21, "x", 5, 0, &t2_final),
        assert_ki("barrier.c", 22, SymbolicExpr::read("x", &t2_final, 64).eq(SymbolicExpr::Constant { value: 1, width: 64 })),
    ];

    let mut listeners = ListenerPipeline::new(false);
    listeners.before_main(&mut trace, &mut state);
    let mut driver = MockInterpreter::new(vec![thread0, thread1, thread2]);
    driver.drive(&mut trace, &mut state, &mut listeners).unwrap();

    trace.resolve_latest_write_same_thread();
    trace.check_wait_has_signal();
    trace.check_lock_pairing().unwrap();
    trace.global_variable_initializer.insert("x".into(), ConstValue(0));

    assert_eq!(trace.all_barrier.get("b").map(|v| v.len()), Some(3), "all three barrier waits should be recorded");

    filter_useless(&mut trace);

    let cfg = VerifierConfig::default();
    let mut encoder = Encoder::<Z3Solver>::encode(Z3Solver::new(), &cfg, &trace);

    // Every barrier-wait event got a distinct event_name ("barrier.c:4",
    // ":10", ":20"), so their order variables are distinct solver
    // constants; the barrier-rounds constraint (spec section 4.6.6)
    // equates them. Contradicting that equality must be UNSAT.
    encoder.solver.push();
    let e0 = encoder.solver.int_const("E_barrier.c:4");
    let e1 = encoder.solver.int_const("E_barrier.c:10");
    let distinct = encoder.solver.not(encoder.solver.eq(e0, e1));
    encoder.solver.assert(distinct);
    assert_eq!(encoder.solver.check(), SatResult::Unsat, "the three barrier waits must share one order variable");
    encoder.solver.pop();

    let mut rdm = RuntimeDataManager::new();
    let result = encoder.verify_assertion(&trace, &mut rdm);
    assert!(result.is_ok(), "every thread's post-barrier read must observe the pre-barrier write, got {result:?}");
}
