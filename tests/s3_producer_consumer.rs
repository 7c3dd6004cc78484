//! S3 (spec section 8): a consumer waits on condition `c` (mutex `m`
//! held) for a producer to store into a shared buffer and signal; the
//! consumer then reads the buffer and, after joining the producer,
//! asserts it observed a non-negative value. With exactly one recorded
//! wait and one recorded signal, the synchronization formula's
//! `Σ_s m(c,w,s) >= 1` constraint forces a match — the full encoding
//! must stay satisfiable and `verify_assertion` must report no violation.

mod common;

use common::*;
use mta_verify::config::VerifierConfig;
use mta_verify::encoder::solver::{SatResult, Z3Solver};
use mta_verify::encoder::Encoder;
use mta_verify::execution_state::ExecutionState;
use mta_verify::filter::filter_useless;
use mta_verify::interpreter::ProgramDriver;
use mta_verify::listener::ListenerPipeline;
use mta_verify::runtime_data_manager::RuntimeDataManager;
use mta_verify::symbolic_expr::{BinOp, SymbolicExpr};
use mta_verify::thread::SchedulerVariant;
use mta_verify::trace::{ConstValue, Trace};

#[test]
fn producer_consumer_matches_wait_to_signal_without_violation() {
    let mut trace = Trace::new(1);
    let mut state = ExecutionState::new(SchedulerVariant::Fifs(Default::default()));
    state.mutexes.init("m").unwrap();

    let consumer_final = global_name(2, 0, true, 0);
    let thread0 = vec![
        pthread_create("prodcons.c", 1),
        mutex_lock("prodcons.c", 2, "m"),
        cond_wait("prodcons.c", 3, "c", "m"),
        load("prodcons.c", 4, "buf", 2, 0, &consumer_final),
        mutex_unlock("prodcons.c", 5, "m"),
        pthread_join("prodcons.c", 6, 1),
        assert_ki(
            "prodcons.c",
            7,
            SymbolicExpr::bin(BinOp::Sle, SymbolicExpr::Constant { value: 0, width: 64 }, SymbolicExpr::read("buf", &consumer_final, 64)),
        ),
    ];

    let thread1 = vec![
        mutex_lock("prodcons.c", 10, "m"),
        store("prodcons.c", 11, "buf", 2, 0, SymbolicExpr::Constant { value: 1, width: 64 }),
        cond_signal("prodcons.c", 12, "c"),
        mutex_unlock("prodcons.c", 13, "m"),
    ];

    let mut listeners = ListenerPipeline::new(false);
    listeners.before_main(&mut trace, &mut state);
    let mut driver = MockInterpreter::new(vec![thread0, thread1]);
    driver.drive(&mut trace, &mut state, &mut listeners).unwrap();

    trace.resolve_latest_write_same_thread();
    trace.check_wait_has_signal();
    trace.check_lock_pairing().unwrap();
    trace.global_variable_initializer.insert("buf".into(), ConstValue(0));

    assert_eq!(trace.all_wait.get("c").map(|w| w.len()), Some(1), "one cond_wait should be recorded");
    assert_eq!(trace.all_signal.get("c").map(|s| s.len()), Some(1), "one signal should be recorded");
    assert_eq!(trace.trace_type, mta_verify::trace::TraceType::Unique, "wait has a cross-thread signal, trace should not be FAILED");

    filter_useless(&mut trace);

    let cfg = VerifierConfig::default();
    let mut encoder = Encoder::<Z3Solver>::encode(Z3Solver::new(), &cfg, &trace);
    assert_eq!(encoder.solver.check(), SatResult::Sat, "matching constraints alone must stay satisfiable");

    let mut rdm = RuntimeDataManager::new();
    let result = encoder.verify_assertion(&trace, &mut rdm);
    assert!(result.is_ok(), "buffer non-negative assertion should hold, got {result:?}");
}
