pub mod dtam;
pub mod pts;

pub use dtam::Dtam;

use crate::trace::Trace;

/// Runs both DTAM closures and writes `dtam_parallel`/`dtam_hybrid` back
/// onto the trace (spec section 4.7). `symbolic_taint` (solver-backed) is
/// a separate step on `Encoder`, since it needs an already-encoded
/// formula to check candidates against.
pub fn run(trace: &mut Trace) {
    let graph = Dtam::build(trace);
    let parallel = graph.parallel(&trace.dtam_serial);
    let hybrid = graph.hybrid(&trace.dtam_serial, trace);
    trace.dtam_parallel = parallel;
    trace.dtam_hybrid = hybrid;
}
