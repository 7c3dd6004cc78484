//! CLI entry point (spec section 6): one positional program argument plus
//! `--dtam`/`MTA_DTAM` and the other `VerifierConfig` switches, exit code 0
//! when no assertion violation was found and non-zero otherwise.

use anyhow::Context;
use mta_verify::config::{Cli, VerifierConfig};
use mta_verify::encoder::solver::Z3Solver;
use mta_verify::error::MtaResult;
use mta_verify::execution_state::ExecutionState;
use mta_verify::interpreter::{InstructionObserver, ProgramDriver};
use mta_verify::orchestrator::{Orchestrator, Outcome};
use mta_verify::trace::Trace;
use structopt::StructOpt;

/// Wires a compiled program's bitcode to an `Interpreter` and drives it
/// through the listener pipeline. The single-thread symbolic execution
/// engine itself is out of scope for this crate (spec section 1) — that
/// engine is expected to be linked in separately and exposed through this
/// trait; this binary cannot ship one, so `drive` fails clearly rather
/// than pretending to execute `program`.
struct UnlinkedEngineDriver;

impl ProgramDriver for UnlinkedEngineDriver {
    fn drive(
        &mut self,
        _trace: &mut Trace,
        _state: &mut ExecutionState,
        _observer: &mut dyn InstructionObserver,
    ) -> MtaResult<()> {
        Err(mta_verify::error::MtaError::InvariantViolation(
            "no symbolic execution engine is linked into this build; \
             implement interpreter::ProgramDriver against your bitcode \
             interpreter and rebuild"
                .into(),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    mta_verify::logging::init();

    let cli = Cli::from_args();
    let config = VerifierConfig::from_cli(&cli);
    log::info!("verifying {} (dtam={})", cli.program.display(), config.dtam_enabled);

    let mut orchestrator: Orchestrator<UnlinkedEngineDriver, Z3Solver> =
        Orchestrator::new(UnlinkedEngineDriver, config)
            .with_output_dir(&std::env::current_dir().context("resolving working directory")?)
            .context("preparing output_info/ directory")?;

    match orchestrator.run().context("exploration failed")? {
        Outcome::NoViolationFound => {
            log::info!("explored {} trace(s), no assertion violation found", orchestrator.rdm.explored_trace_count());
            Ok(())
        }
        Outcome::AssertionViolated { location } => {
            eprintln!("assertion violated at {location}");
            std::process::exit(1);
        }
    }
}
