use crate::event::EventId;
use crate::thread::ThreadId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ordered event list plus a thread-id map, used to force the next
/// guided execution (spec section 3). Consumed once: `GuidedThreadScheduler`
/// walks `order` and is exhausted after the last entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prefix {
    pub name: String,
    /// The forced schedule: for each step, which thread must run next.
    pub order: Vec<ThreadId>,
    /// `event -> spawned thread id`, used to resolve `pthread_create`
    /// targets deterministically while replaying the prefix.
    pub thread_id_map: HashMap<EventId, ThreadId>,
}

impl Prefix {
    pub fn new(name: impl Into<String>, order: Vec<ThreadId>) -> Self {
        Prefix { name: name.into(), order, thread_id_map: HashMap::new() }
    }

    /// `Trace<id>-L<line>-<event_name>-<taken>-<flipped>` (spec section 6).
    pub fn branch_flip_name(trace_id: u32, line: u32, event_name: &str, taken: bool, flipped: bool) -> String {
        format!(
            "Trace{trace_id}-L{line}-{event_name}-{}-{}",
            taken, flipped
        )
    }

    /// `assert_<event_name>` (spec section 6).
    pub fn assertion_name(event_name: &str) -> String {
        format!("assert_{event_name}")
    }
}
