//! Top-level exploration loop (spec section 4.9):
//!
//! ```text
//! rdm.create_trace(1)
//! interpret(initial_state)
//! loop:
//!     encoder.encode(trace_i)
//!     if !encoder.verify_assertion(): report and stop
//!     encoder.flip_if_branches()
//!     if dtam_enabled: dtam.run(); encoder.symbolic_taint()
//!     p = rdm.next_prefix()
//!     if p is None: break
//!     rdm.create_trace(i+1)
//!     interpret(state_with_guided_scheduler(p))
//! ```
//!
//! `Orchestrator` owns the `RuntimeDataManager`, the configuration, and a
//! `ProgramDriver` (the out-of-scope single-thread engine, or a
//! `MockInterpreter` in tests) — it is the only piece of the core that
//! ties the listener pipeline, the filter, the encoder, and the taint
//! analyzer together into one run.

use crate::config::VerifierConfig;
use crate::encoder::solver::Solver;
use crate::encoder::Encoder;
use crate::error::{MtaError, MtaResult};
use crate::execution_state::ExecutionState;
use crate::interpreter::ProgramDriver;
use crate::listener::ListenerPipeline;
use crate::output;
use crate::runtime_data_manager::RuntimeDataManager;
use crate::thread::scheduler::SchedulerVariant;
use crate::trace::TraceType;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of a full `Orchestrator::run` (spec section 6 CLI exit codes:
/// "0 if no assertion violation was found... non-zero if any assertion
/// violation was reported").
#[derive(Debug)]
pub enum Outcome {
    /// Every explored trace's assertions were UNSAT; exploration exhausted
    /// the prefix work list or hit `max_iterations`.
    NoViolationFound,
    /// `verify_assertion` found a satisfiable negated assertion; the
    /// location is the owning event's `event_name`.
    AssertionViolated { location: String },
}

pub struct Orchestrator<D: ProgramDriver, S: Solver + Default> {
    pub rdm: RuntimeDataManager,
    pub config: VerifierConfig,
    driver: D,
    output_dir: Option<PathBuf>,
    _solver: std::marker::PhantomData<S>,
}

impl<D: ProgramDriver, S: Solver + Default> Orchestrator<D, S> {
    pub fn new(driver: D, config: VerifierConfig) -> Self {
        Orchestrator { rdm: RuntimeDataManager::new(), config, driver, output_dir: None, _solver: std::marker::PhantomData }
    }

    /// Enables writing `output_info/`-style files under `root` as each
    /// trace/prefix is processed (spec section 6).
    pub fn with_output_dir(mut self, root: &Path) -> MtaResult<Self> {
        self.output_dir = Some(output::ensure_output_dir(root)?);
        Ok(self)
    }

    pub fn run(&mut self) -> MtaResult<Outcome> {
        let mut state = ExecutionState::new(SchedulerVariant::Fifs(Default::default()));
        let mut listeners = ListenerPipeline::new(self.config.dtam_enabled);

        self.rdm.create_trace();
        self.run_one_execution(&mut state, &mut listeners)?;

        let mut iterations = 0usize;
        loop {
            match self.process_current_trace()? {
                Some(outcome) => return Ok(outcome),
                None => {}
            }

            iterations += 1;
            if iterations >= self.config.max_iterations {
                log::warn!("max_iterations ({}) reached, stopping exploration", self.config.max_iterations);
                break;
            }

            let Some(prefix) = self.rdm.next_prefix() else { break };
            let mut state = ExecutionState::new_guided(SchedulerVariant::Fifs(Default::default()), &prefix);
            let mut listeners = ListenerPipeline::new(self.config.dtam_enabled);
            self.rdm.create_trace();
            self.run_one_execution(&mut state, &mut listeners)?;
        }

        output::write_statistics_if_enabled(self.output_dir.as_deref(), &self.rdm.stats)?;
        Ok(Outcome::NoViolationFound)
    }

    /// Exposes the accumulated statistics for callers (e.g. the CLI
    /// binary) that want to print a summary after `run` returns.
    pub fn statistics(&self) -> &crate::stats::Statistics {
        &self.rdm.stats
    }

    fn run_one_execution(&mut self, state: &mut ExecutionState, listeners: &mut ListenerPipeline) -> MtaResult<()> {
        let started = Instant::now();
        {
            let trace = self.rdm.current_trace_mut();
            listeners.before_main(trace, state);
        }

        let result = {
            let trace = self.rdm.current_trace_mut();
            self.driver.drive(trace, state, listeners)
        };
        self.rdm.stats.running_time += started.elapsed();

        match result {
            Ok(()) => {}
            Err(MtaError::ScheduleExhausted(_)) => {
                // A guided prefix mandated an unschedulable thread; the
                // state is terminated (spec section 7), the trace stands
                // as recorded so far.
            }
            Err(e) => return Err(e),
        }

        let trace = self.rdm.current_trace_mut();
        trace.resolve_latest_write_same_thread();
        trace.check_wait_has_signal();
        if trace.check_lock_pairing().is_err() {
            trace.trace_type = TraceType::Failed;
        }
        Ok(())
    }

    /// Encodes, verifies, flips branches, and optionally taints the
    /// current trace. Returns `Some(outcome)` when the run should stop
    /// (an assertion was violated), `None` to continue exploring.
    ///
    /// The current trace is moved out of the `RuntimeDataManager` for the
    /// duration of this call and restored before returning: `Encoder`'s
    /// verify/flip/taint steps need to read the trace while also handing
    /// new prefixes to `self.rdm`, which a borrow of `self.rdm`'s own
    /// storage can't do at the same time.
    fn process_current_trace(&mut self) -> MtaResult<Option<Outcome>> {
        let is_untested = self.rdm.is_current_trace_untested();
        self.rdm.stats.record_trace(self.rdm.current_trace());

        let mut trace = self.rdm.take_current_trace();
        if !is_untested {
            trace.trace_type = TraceType::Redundant;
        }
        if trace.trace_type == TraceType::Failed || !is_untested {
            self.rdm.restore_current_trace(trace);
            return Ok(None);
        }

        crate::filter::filter_useless(&mut trace);

        let solve_started = Instant::now();
        let mut encoder = Encoder::<S>::encode(S::default(), &self.config, &trace);
        let verify_result = encoder.verify_assertion(&trace, &mut self.rdm);
        self.rdm.stats.solving_time += solve_started.elapsed();

        if let Err(MtaError::AssertionFailure { location }) = verify_result {
            self.rdm.stats.assertion_failures += 1;
            self.write_trace_outputs(&trace);
            self.rdm.restore_current_trace(trace);
            return Ok(Some(Outcome::AssertionViolated { location }));
        }
        verify_result?;

        let flip_started = Instant::now();
        let flip_stats = encoder.flip_if_branches(&mut trace, &mut self.rdm)?;
        self.rdm.stats.solving_time += flip_started.elapsed();
        self.rdm.stats.record_flip(&flip_stats);

        if self.config.dtam_enabled {
            let dtam_started = Instant::now();
            crate::taint::run(&mut trace);
            self.rdm.stats.dtam_time += dtam_started.elapsed();

            let pts_started = Instant::now();
            encoder.symbolic_taint(&mut trace);
            self.rdm.stats.pts_time += pts_started.elapsed();
        }

        self.write_trace_outputs(&trace);
        self.rdm.restore_current_trace(trace);
        Ok(None)
    }

    fn write_trace_outputs(&self, trace: &crate::trace::Trace) {
        let Some(dir) = &self.output_dir else { return };
        let stem = format!("Trace{}", trace.id);
        let _ = output::write_event_dump(dir, &stem, trace);
        let _ = output::write_solver_dump(
            dir,
            &stem,
            &format!("; trace {} encoded with {} events\n", trace.id, trace.events().len()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::solver::Z3Solver;
    use crate::event::EventKind;
    use crate::interpreter::{InstructionObserver, KInstruction, Opcode};
    use crate::symbolic_expr::SymbolicExpr;
    use crate::thread::ThreadId;
    use crate::trace::Trace;

    /// Drives a single fixed instruction sequence on thread 0: write
    /// `x = 0`, then `assert(x == 1)` — deliberately false, to exercise
    /// the stop-on-violation path end to end.
    struct OneShotAssertFails;

    impl ProgramDriver for OneShotAssertFails {
        fn drive(&mut self, trace: &mut Trace, state: &mut ExecutionState, observer: &mut dyn InstructionObserver) -> MtaResult<()> {
            let tid: ThreadId = 0;
            let write = KInstruction {
                file: "f.c".into(),
                line: 1,
                opcode: Opcode::Store,
                callee: None,
                access: Some(crate::interpreter::MemoryAccess { name: "x".into(), is_load: false, memory_id: 1, address: 0 }),
                branch_taken: None,
                branch_condition_expr: None,
                result_expr: Some(SymbolicExpr::Constant { value: 0, width: 64 }),
            };
            observer.after_execute_instruction(trace, state, tid, &write)?;
            trace.global_variable_initializer.insert("x".into(), crate::trace::ConstValue(0));
            trace.global_variable_initializer_related_to_branch.insert("x".into(), crate::trace::ConstValue(0));

            let assertion = KInstruction {
                file: "f.c".into(),
                line: 2,
                opcode: Opcode::Call,
                callee: Some("__mta_assert".into()),
                access: None,
                branch_taken: None,
                branch_condition_expr: None,
                result_expr: Some(SymbolicExpr::read("x", "x_S0", 64).eq(SymbolicExpr::Constant { value: 1, width: 64 })),
            };
            observer.after_execute_instruction(trace, state, tid, &assertion)?;
            Ok(())
        }
    }

    #[test]
    fn run_reports_violation_for_false_assertion() {
        let mut orch: Orchestrator<OneShotAssertFails, Z3Solver> = Orchestrator::new(OneShotAssertFails, VerifierConfig::default());
        let outcome = orch.run().unwrap();
        assert!(matches!(outcome, Outcome::AssertionViolated { .. }));
    }

    struct OneShotNoAssertions;

    impl ProgramDriver for OneShotNoAssertions {
        fn drive(&mut self, trace: &mut Trace, state: &mut ExecutionState, observer: &mut dyn InstructionObserver) -> MtaResult<()> {
            let ki = KInstruction {
                file: "f.c".into(),
                line: 1,
                opcode: Opcode::Other,
                callee: None,
                access: None,
                branch_taken: None,
                branch_condition_expr: None,
                result_expr: None,
            };
            observer.after_execute_instruction(trace, state, 0, &ki)?;
            let _ = EventKind::Normal;
            Ok(())
        }
    }

    #[test]
    fn run_with_no_assertions_finds_no_violation() {
        let mut cfg = VerifierConfig::default();
        cfg.max_iterations = 5;
        let mut orch: Orchestrator<OneShotNoAssertions, Z3Solver> = Orchestrator::new(OneShotNoAssertions, cfg);
        let outcome = orch.run().unwrap();
        assert!(matches!(outcome, Outcome::NoViolationFound));
    }
}
