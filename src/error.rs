use crate::thread::ThreadId;

/// Error kinds produced and classified by the core (see spec section 7).
///
/// `InvariantViolation` and `BadSyncCall` mark the owning `Trace` as
/// `TraceType::Failed` and short-circuit encoding for that trace only.
/// `SolverError` is always a "log + skip" condition. `ScheduleExhausted`
/// terminates the offending simulated thread. `AssertionFailure` is the
/// only kind that stops the outer exploration loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MtaError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("solver error: {0}")]
    SolverError(String),

    #[error("bad sync call: {0}")]
    BadSyncCall(String),

    #[error("schedule exhausted: thread {0} is not schedulable")]
    ScheduleExhausted(ThreadId),

    #[error("assertion failure at {location}")]
    AssertionFailure { location: String },
}

pub type MtaResult<T> = Result<T, MtaError>;

impl MtaError {
    pub fn not_owner(tid: ThreadId, op: &str, object: &str) -> Self {
        MtaError::BadSyncCall(format!(
            "thread {tid} attempted {op} on `{object}` without holding it"
        ))
    }
}
