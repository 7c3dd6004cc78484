//! `RuntimeDataManager` (spec section 4.8): owns every `Trace` produced
//! during exploration, deduplicates equivalent traces via a canonical
//! abstract, and serves the FIFO prefix work list. Replaces the source's
//! static `nextID`/`next_thread_id` counters and process-wide output
//! directory with explicit fields (spec section 9 design notes).

use crate::prefix::Prefix;
use crate::stats::Statistics;
use crate::trace::Trace;
use std::collections::{HashSet, VecDeque};

/// A canonical, order-insensitive-within-thread summary of a trace, used
/// for the dedup check (spec section 4.8 / testable property 6): the
/// per-thread sequence of event kinds plus a summary of which mutexes,
/// conditions, and barriers were touched, in the order each thread first
/// touched them.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TraceAbstract {
    per_thread_kinds: Vec<(u32, Vec<crate::event::EventKind>)>,
    sync_summary: Vec<String>,
}

impl TraceAbstract {
    pub fn of(trace: &Trace) -> Self {
        let mut per_thread_kinds: Vec<(u32, Vec<crate::event::EventKind>)> = trace
            .thread_events
            .iter()
            .map(|(&tid, events)| (tid, events.iter().map(|&id| trace.event(id).kind).collect()))
            .collect();
        per_thread_kinds.sort_by_key(|(tid, _)| *tid);

        let mut sync_summary = Vec::new();
        let mut mutexes: Vec<&String> = trace.all_lock_unlock.keys().collect();
        mutexes.sort();
        for m in mutexes {
            sync_summary.push(format!("lock:{m}:{}", trace.all_lock_unlock[m].len()));
        }
        let mut conds: Vec<&String> = trace.all_wait.keys().collect();
        conds.sort();
        for c in conds {
            let signals = trace.all_signal.get(c).map(|v| v.len()).unwrap_or(0);
            sync_summary.push(format!("cond:{c}:{}:{signals}", trace.all_wait[c].len()));
        }
        let mut barriers: Vec<&String> = trace.all_barrier.keys().collect();
        barriers.sort();
        for b in barriers {
            sync_summary.push(format!("barrier:{b}:{}", trace.all_barrier[b].len()));
        }

        TraceAbstract { per_thread_kinds, sync_summary }
    }
}

pub struct RuntimeDataManager {
    next_trace_id: u32,
    traces: Vec<Trace>,
    tested_set: HashSet<TraceAbstract>,
    prefix_queue: VecDeque<Prefix>,
    pub stats: Statistics,
}

impl Default for RuntimeDataManager {
    fn default() -> Self {
        RuntimeDataManager {
            next_trace_id: 1,
            traces: Vec::new(),
            tested_set: HashSet::new(),
            prefix_queue: VecDeque::new(),
            stats: Statistics::default(),
        }
    }
}

impl RuntimeDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates and returns a new current `Trace`.
    pub fn create_trace(&mut self) -> &mut Trace {
        let id = self.next_trace_id;
        self.next_trace_id += 1;
        self.traces.push(Trace::new(id));
        self.traces.last_mut().unwrap()
    }

    pub fn current_trace(&self) -> &Trace {
        self.traces.last().expect("create_trace must be called before current_trace")
    }

    pub fn current_trace_mut(&mut self) -> &mut Trace {
        self.traces.last_mut().expect("create_trace must be called before current_trace_mut")
    }

    /// Moves the current trace out of the owned list so it can be passed
    /// by value alongside `&mut self` (e.g. to `Encoder::verify_assertion`,
    /// which needs to borrow both the trace and the manager's prefix queue
    /// at once). Pair with `restore_current_trace`.
    pub fn take_current_trace(&mut self) -> Trace {
        self.traces.pop().expect("create_trace must be called before take_current_trace")
    }

    pub fn restore_current_trace(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    /// Computes the current trace's abstract and records it; returns
    /// `true` the first time a given abstract is seen, `false` on every
    /// later equivalent trace (testable property 6).
    pub fn is_current_trace_untested(&mut self) -> bool {
        let abstr = TraceAbstract::of(self.current_trace());
        self.tested_set.insert(abstr)
    }

    pub fn add_prefix(&mut self, prefix: Prefix) {
        self.prefix_queue.push_back(prefix);
    }

    pub fn next_prefix(&mut self) -> Option<Prefix> {
        self.prefix_queue.pop_front()
    }

    pub fn prefix_queue_len(&self) -> usize {
        self.prefix_queue.len()
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn explored_trace_count(&self) -> usize {
        self.traces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn create_trace_assigns_monotone_ids() {
        let mut rdm = RuntimeDataManager::new();
        assert_eq!(rdm.create_trace().id, 1);
        assert_eq!(rdm.create_trace().id, 2);
    }

    #[test]
    fn dedup_flags_equivalent_traces_after_first() {
        let mut rdm = RuntimeDataManager::new();
        rdm.create_trace().insert_event(0, EventKind::Normal);
        assert!(rdm.is_current_trace_untested());

        rdm.create_trace().insert_event(0, EventKind::Normal);
        assert!(!rdm.is_current_trace_untested());
    }

    #[test]
    fn prefix_queue_is_fifo() {
        let mut rdm = RuntimeDataManager::new();
        rdm.add_prefix(Prefix::new("a", vec![0]));
        rdm.add_prefix(Prefix::new("b", vec![1]));
        assert_eq!(rdm.next_prefix().unwrap().name, "a");
        assert_eq!(rdm.next_prefix().unwrap().name, "b");
        assert!(rdm.next_prefix().is_none());
    }
}
