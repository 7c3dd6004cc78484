//! DTAM — Dynamic Taint Analysis Module (spec section 4.7), grounded in
//! `original_source/lib/Encode/DTAM.cpp`: builds an affectation graph over
//! the trace's read/write points and computes two reachability closures
//! from the serially-tainted seed set.

use crate::event::EventId;
use crate::trace::Trace;
use std::collections::{HashMap, HashSet};

/// One node of the affectation graph: a named location touched by the
/// trace. Edges point from the names a store reads to the name it writes.
#[derive(Default)]
pub struct Dtam {
    edges: HashMap<String, HashSet<String>>,
}

impl Dtam {
    /// Builds the graph: each store inserts edges from its operand reads
    /// to itself; each load is purely an edge target (spec section 4.7).
    pub fn build(trace: &Trace) -> Self {
        let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
        for (id, expr) in &trace.store_expr {
            let written = trace.event(*id).name.clone();
            if written.is_empty() {
                continue;
            }
            let mut operands = HashSet::new();
            expr.referenced_names(&mut operands);
            for operand in operands {
                if operand != written {
                    edges.entry(operand).or_default().insert(written.clone());
                }
            }
        }
        Dtam { edges }
    }

    /// `parallel`: reachability closure from `dtam_serial` over the full
    /// graph, no happens-before pruning.
    pub fn parallel(&self, seeds: &HashSet<String>) -> HashSet<String> {
        self.closure(seeds, |_, _| true)
    }

    /// `hybrid`: same closure, but an edge `u -> v` is only followed when
    /// some write of `u` happens-before some subsequent read/write of `v`
    /// — eliminating propagation through impossible interleavings.
    pub fn hybrid(&self, seeds: &HashSet<String>, trace: &Trace) -> HashSet<String> {
        self.closure(seeds, |u, v| edge_is_happens_before_feasible(trace, u, v))
    }

    fn closure(&self, seeds: &HashSet<String>, keep_edge: impl Fn(&str, &str) -> bool) -> HashSet<String> {
        let mut reached: HashSet<String> = seeds.clone();
        let mut frontier: Vec<String> = seeds.iter().cloned().collect();
        while let Some(name) = frontier.pop() {
            let Some(targets) = self.edges.get(&name) else { continue };
            for target in targets {
                if !keep_edge(&name, target) {
                    continue;
                }
                if reached.insert(target.clone()) {
                    frontier.push(target.clone());
                }
            }
        }
        reached
    }
}

/// Whether any event touching `u` happens-before any event touching `v`,
/// via the per-event vector clocks (spec glossary: happens-before). When
/// neither side carries a real vector clock (the trace never recorded
/// one, e.g. a hand-built test fixture) there is nothing to prune against,
/// so the edge is kept rather than silently discarded.
fn edge_is_happens_before_feasible(trace: &Trace, u: &str, v: &str) -> bool {
    let u_events = events_touching(trace, u);
    let v_events = events_touching(trace, v);
    let clocks_tracked = u_events.iter().chain(&v_events).any(|&id| !trace.event(id).vector_clock.is_empty());
    if !clocks_tracked {
        return true;
    }
    for &ue in &u_events {
        for &ve in &v_events {
            if ue == ve {
                continue;
            }
            if trace.event(ue).happens_before(trace.event(ve)) {
                return true;
            }
        }
    }
    false
}

fn events_touching(trace: &Trace, name: &str) -> Vec<EventId> {
    let mut out = Vec::new();
    if let Some(v) = trace.read_set.get(name) {
        out.extend(v.iter().copied());
    }
    if let Some(v) = trace.write_set.get(name) {
        out.extend(v.iter().copied());
    }
    out
}
