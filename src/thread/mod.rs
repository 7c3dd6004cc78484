pub mod scheduler;
pub mod thread;

pub use scheduler::{GuidedThreadScheduler, Scheduler, SchedulerVariant};
pub use thread::{Thread, ThreadState};

/// Thread ids are allocated monotonically, capped by `crate::event::MAX_THREADS`
/// (the vector-clock width). `0` is reserved for the main thread.
pub type ThreadId = u32;
