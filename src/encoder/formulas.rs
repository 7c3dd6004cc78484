//! The six sub-formulas of the encoding (spec section 4.6): initial
//! value, path condition, memory-model ordering, partial order,
//! read-from, synchronization. Each builder asserts directly into the
//! solver rather than returning a term to assert, mirroring
//! `original_source`'s `Encode.cpp` pass structure (one pass per
//! concern, all sharing the same `E(e)` order-variable table).

use crate::config::{ClusterLevel, Theory};
use crate::encoder::kquery_bridge::{named_term, translate};
use crate::encoder::solver::Solver;
use crate::event::{Event, EventId, EventKind};
use crate::symbolic_expr::SymbolicExpr;
use crate::trace::Trace;
use std::collections::{HashMap, HashSet};

/// `E_FINAL`'s value is a plain integer literal, not a variable, fixed
/// per trace once the unique-event count is known (spec section 4.6.3).
pub fn e_final(unique_event_count: usize) -> i64 {
    unique_event_count as i64 + 100
}

/// Assigns an order-variable *name* to each event by clustering
/// (spec section 4.1's `ClusterLevel`): same key ⇒ same `E(e)`.
pub fn cluster_key(event: &Event, level: ClusterLevel) -> String {
    match level {
        ClusterLevel::Bitcode => format!("{}#{}", event.thread_id, event.event_id),
        ClusterLevel::SourceLine | ClusterLevel::BasicBlock => event.event_name.clone(),
    }
}

/// Per-trace table of order-variable names and their solver terms,
/// shared across all six formula builders and by `verify_assertion` /
/// `flip_if_branches` for dominance constraints and model sampling.
pub struct OrderVars<S: Solver> {
    pub cluster_level: ClusterLevel,
    pub event_key: HashMap<EventId, String>,
    pub terms: HashMap<String, S::Expr>,
    pub unique_event_count: usize,
}

impl<S: Solver> OrderVars<S> {
    pub fn build(solver: &mut S, trace: &Trace, cluster_level: ClusterLevel) -> Self {
        let mut event_key = HashMap::new();
        let mut terms = HashMap::new();
        // IGNORE/VIRTUAL events are dropped from encoding (spec section 3):
        // they never get an order variable and never participate below.
        for event in trace.events().iter().filter(|e| e.kind == EventKind::Normal) {
            let key = cluster_key(event, cluster_level);
            event_key.insert(event.id, key.clone());
            terms.entry(key.clone()).or_insert_with(|| solver.int_const(&format!("E_{key}")));
        }
        let unique_event_count = terms.len();
        OrderVars { cluster_level, event_key, terms, unique_event_count }
    }

    pub fn term(&self, id: EventId) -> S::Expr {
        let key = &self.event_key[&id];
        self.terms[key].clone()
    }

    pub fn key_of(&self, id: EventId) -> &str {
        &self.event_key[&id]
    }
}

/// 4.6.1 Initial-value formula: `name_Init == g0` for every tracked
/// global with a known initializer.
pub fn assert_initial_value<S: Solver>(solver: &mut S, theory: Theory, trace: &Trace) {
    for (name, value) in &trace.global_variable_initializer_related_to_branch {
        let lhs = named_term(solver, theory, &format!("{name}_Init"), 64);
        let rhs = const_for_theory(solver, theory, value.0);
        let eq = solver.eq(lhs, rhs);
        solver.assert(eq);
    }
}

fn const_for_theory<S: Solver>(solver: &mut S, theory: Theory, value: i64) -> S::Expr {
    match theory {
        Theory::BitVector64 => solver.bv_val(value, 64),
        Theory::Integer => solver.int_val(value),
    }
}

/// 4.6.2 Path condition: conjunction of the branch-relevant path
/// condition, each translated via the KQuery bridge.
pub fn assert_path_condition<S: Solver>(solver: &mut S, theory: Theory, trace: &Trace) {
    for expr in &trace.path_condition_related_to_branch {
        let t = translate(solver, theory, expr);
        solver.assert(t);
    }
}

/// 4.6.3 Memory-model formula: `E_INIT = 0`, thread-start/end bounds,
/// and per-thread consecutive-distinct-event ordering.
pub fn assert_memory_model<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    let e_init = solver.int_val(0);
    let e_final = solver.int_val(e_final(order_vars.unique_event_count));

    for tid in trace.thread_ids() {
        // IGNORE/VIRTUAL events are dropped from encoding (spec section 3):
        // they carry no order variable, so they're excluded here too.
        let events: Vec<EventId> = trace.thread_events[tid]
            .iter()
            .copied()
            .filter(|&id| trace.event(id).kind == EventKind::Normal)
            .collect();
        if events.is_empty() {
            continue;
        }
        let first = order_vars.term(events[0]);
        let c = solver.order_lt(e_init.clone(), first);
        solver.assert(c);

        let last = order_vars.term(*events.last().unwrap());
        let c = solver.order_lt(last, e_final.clone());
        solver.assert(c);

        let mut prev_key: Option<String> = None;
        let mut prev_term: Option<S::Expr> = None;
        for &id in &events {
            let key = order_vars.key_of(id).to_owned();
            let term = order_vars.term(id);
            if let (Some(pk), Some(pt)) = (&prev_key, prev_term.clone()) {
                if *pk != key {
                    let c = solver.order_lt(pt, term.clone());
                    solver.assert(c);
                }
            }
            prev_key = Some(key);
            prev_term = Some(term);
        }
    }
}

/// 4.6.4 Partial-order formula: thread-create and thread-join edges.
pub fn assert_partial_order<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    for (&creator, &child) in &trace.create_thread_point {
        if let Some(first) = trace.thread_events.get(&child).and_then(|v| v.first()) {
            let a = order_vars.term(creator);
            let b = order_vars.term(*first);
            let c = solver.order_lt(a, b);
            solver.assert(c);
        }
    }
    for (&joiner, &joined) in &trace.join_thread_point {
        if let Some(last) = trace.thread_events.get(&joined).and_then(|v| v.last()) {
            let a = order_vars.term(*last);
            let b = order_vars.term(joiner);
            let c = solver.order_lt(a, b);
            solver.assert(c);
        }
    }
}

/// 4.6.5 Read-from formula.
pub fn assert_read_from<S: Solver>(solver: &mut S, theory: Theory, trace: &Trace, order_vars: &OrderVars<S>) {
    for (name, reads) in &trace.read_set_related_to_branch {
        let writes = trace.write_set_related_to_branch.get(name).cloned().unwrap_or_default();
        for &r in reads {
            let r_event = trace.event(r);
            let t_r = r_event.thread_id;

            let mut candidates: Vec<EventId> = writes.iter().copied().filter(|&w| trace.event(w).thread_id != t_r).collect();
            if let Some(same_thread_w) = r_event.latest_write_same_thread {
                if trace.write_set_related_to_branch.get(name).map(|v| v.contains(&same_thread_w)).unwrap_or(false) {
                    candidates.push(same_thread_w);
                }
            }
            if candidates.is_empty() {
                continue;
            }

            let width = 64;
            let r_value = named_term(solver, theory, &r_event.global_name, width);
            let r_order = order_vars.term(r);

            // (a) reads the initial value.
            let mut init_conjuncts = Vec::new();
            for &w in &candidates {
                let w_order = order_vars.term(w);
                init_conjuncts.push(solver.order_lt(r_order.clone(), w_order));
            }
            let init_value = named_term(solver, theory, &format!("{name}_Init"), width);
            init_conjuncts.push(solver.eq(r_value.clone(), init_value));
            let reads_init = solver.and(&init_conjuncts);

            // (b) reads some w in candidates.
            let mut disjuncts = vec![reads_init];
            for (idx, &w) in candidates.iter().enumerate() {
                let w_event = trace.event(w);
                let w_value = named_term(solver, theory, &w_event.global_name, width);
                let w_order = order_vars.term(w);

                let mut conjuncts = vec![
                    solver.eq(r_value.clone(), w_value),
                    solver.order_lt(w_order.clone(), r_order.clone()),
                ];

                for (other_idx, &w_other) in candidates.iter().enumerate() {
                    if other_idx == idx {
                        continue;
                    }
                    if trace.event(w_other).thread_id == w_event.thread_id {
                        continue;
                    }
                    let wo_order = order_vars.term(w_other);
                    let before = solver.order_lt(wo_order.clone(), w_order.clone());
                    let after = solver.order_lt(r_order.clone(), wo_order);
                    let either = solver.or(&[before, after]);
                    conjuncts.push(either);
                }

                if let Some(&next_w) = next_write_same_thread(trace, name, w).as_ref() {
                    let next_order = order_vars.term(next_w);
                    conjuncts.push(solver.order_lt(r_order.clone(), next_order));
                }

                disjuncts.push(solver.and(&conjuncts));
            }

            let formula = solver.or(&disjuncts);
            solver.assert(formula);
        }
    }
}

fn next_write_same_thread(trace: &Trace, name: &str, w: EventId) -> Option<EventId> {
    let writes = trace.write_set.get(name)?;
    let tid = trace.event(w).thread_id;
    let thread_writes: Vec<EventId> = writes.iter().copied().filter(|&id| trace.event(id).thread_id == tid).collect();
    let pos = thread_writes.iter().position(|&id| id == w)?;
    thread_writes.get(pos + 1).copied()
}

/// 4.6.6 Synchronization formula: lock-pair mutual exclusion, wait/signal
/// matching variables, barrier round equalities.
pub fn assert_synchronization<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    assert_lock_pairing(solver, trace, order_vars);
    assert_wait_signal_matching(solver, trace, order_vars);
    assert_barrier_rounds(solver, trace, order_vars);
}

fn assert_lock_pairing<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    for pairs in trace.all_lock_unlock.values() {
        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (pi, pj) = (&pairs[i], &pairs[j]);
                if pi.thread_id == pj.thread_id {
                    continue;
                }
                let (Some(ui), Some(uj)) = (pi.unlock_event, pj.unlock_event) else { continue };
                let before = solver.order_lt(order_vars.term(ui), order_vars.term(pj.lock_event));
                let after = solver.order_lt(order_vars.term(uj), order_vars.term(pi.lock_event));
                let either = solver.or(&[before, after]);
                solver.assert(either);
            }
        }
    }
}

fn assert_wait_signal_matching<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    for (cond, waits) in &trace.all_wait {
        let signals = trace.all_signal.get(cond).cloned().unwrap_or_default();
        if waits.is_empty() || signals.is_empty() {
            continue;
        }

        let mut match_vars: HashMap<(EventId, EventId), S::Expr> = HashMap::new();
        for w in waits {
            for &s in &signals {
                let name = format!("m_{}_{}_{}", cond, order_vars.key_of(w.wait_event), order_vars.key_of(s));
                let var = solver.bool_const(&name);
                if trace.event(w.wait_event).thread_id == trace.event(s).thread_id {
                    let is_false = solver.bool_val(false);
                    let fixed = solver.eq(var.clone(), is_false);
                    solver.assert(fixed);
                }
                match_vars.insert((w.wait_event, s), var);
            }
        }

        for &s in &signals {
            let sum: Vec<S::Expr> =
                waits.iter().map(|w| ite_bool_to_int(solver, match_vars[&(w.wait_event, s)].clone())).collect();
            let total = sum_terms(solver, &sum);
            let at_most_one = solver.order_lt(total, solver.int_val(2));
            solver.assert(at_most_one);
        }

        for w in waits {
            let sum: Vec<S::Expr> =
                signals.iter().map(|&s| ite_bool_to_int(solver, match_vars[&(w.wait_event, s)].clone())).collect();
            let total = sum_terms(solver, &sum);
            let at_least_one = solver.order_lt(solver.int_val(0), total);
            solver.assert(at_least_one);
        }

        for w in waits {
            for &s in &signals {
                let m = match_vars[&(w.wait_event, s)].clone();
                let mut implied = vec![solver.order_lt(order_vars.term(w.wait_event), order_vars.term(s))];
                if let Some(lock_by_wait) = w.lock_by_wait {
                    implied.push(solver.order_lt(order_vars.term(s), order_vars.term(lock_by_wait)));
                }
                let conj = solver.and(&implied);
                let imp = solver.implies(m, conj);
                solver.assert(imp);
            }
        }
    }
}

fn ite_bool_to_int<S: Solver>(solver: &mut S, b: S::Expr) -> S::Expr {
    let one = solver.int_val(1);
    let zero = solver.int_val(0);
    solver.ite(b, one, zero)
}

fn sum_terms<S: Solver>(solver: &mut S, terms: &[S::Expr]) -> S::Expr {
    terms.iter().cloned().reduce(|a, b| solver.bin_op(Theory::Integer, crate::symbolic_expr::BinOp::Add, a, b)).unwrap_or_else(|| solver.int_val(0))
}

fn assert_barrier_rounds<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>) {
    for events in trace.all_barrier.values() {
        for round in barrier_rounds(events, trace) {
            if round.len() < 2 {
                continue;
            }
            let first = order_vars.term(round[0]);
            for &e in &round[1..] {
                let c = solver.eq(first.clone(), order_vars.term(e));
                solver.assert(c);
            }
        }
    }
}

/// The trace only records a flat per-barrier event list, not explicit
/// rounds; we recover round boundaries by noting a thread cannot reach
/// the same barrier twice in one round.
fn barrier_rounds(events: &[EventId], trace: &Trace) -> Vec<Vec<EventId>> {
    let mut rounds = Vec::new();
    let mut current = Vec::new();
    let mut seen = HashSet::new();
    for &id in events {
        let tid = trace.event(id).thread_id;
        if seen.contains(&tid) {
            rounds.push(std::mem::take(&mut current));
            seen.clear();
        }
        seen.insert(tid);
        current.push(id);
    }
    if !current.is_empty() {
        rounds.push(current);
    }
    rounds
}

/// Dominance constraints shared by `verify_assertion` and
/// `flip_if_branches`: for each other recorded assertion/branch `j`
/// preceding `target` — same-thread ⇒ enforce unconditionally,
/// cross-thread ⇒ enforce only if `E(j) < E(target)`.
pub fn dominance_constraints<S: Solver>(
    solver: &mut S,
    theory: Theory,
    trace: &Trace,
    order_vars: &OrderVars<S>,
    target: EventId,
    others: &[(EventId, SymbolicExpr)],
) -> Vec<S::Expr> {
    let target_event = trace.event(target);
    let mut out = Vec::new();
    for (other_id, other_expr) in others {
        if *other_id == target {
            continue;
        }
        let other_event = trace.event(*other_id);
        let translated = translate(solver, theory, other_expr);
        if other_event.thread_id == target_event.thread_id {
            if other_event.event_id < target_event.event_id {
                out.push(translated);
            }
        } else {
            let dominates = solver.order_lt(order_vars.term(*other_id), order_vars.term(target));
            out.push(solver.implies(dominates, translated));
        }
    }
    out
}

/// Taint-tag propagation, consumed by `taint::pts::symbolic_taint` (spec
/// section 4.7): defines one `{name}_tag` bool per relevant location and
/// pins each to its real taint provenance instead of leaving it free, so
/// asserting `v_tag == true` afterward is an actual feasibility query
/// under the synchronization-aware encoding rather than a vacuous one.
///
/// A name already confirmed tainted along the recorded execution (`seeds`,
/// built by the caller from `trace.taint_symbolic_expr` minus
/// `trace.untaint_symbolic_expr`, unioned with `trace.dtam_serial`'s
/// marked sources) gets `tag == true` outright. Every other name's tag is
/// defined as the disjunction, over every store that writes it from a
/// tainted operand, of "that operand is tainted AND (some write of the
/// operand precedes this store under the model's own order variables, or
/// the operand has no write event of its own, e.g. a bare source)" —
/// tying propagation to the same `E(e)` terms the read-from and
/// partial-order formulas use, so a candidate whose only taint path
/// requires an ordering the rest of the encoding already rules out comes
/// back tag == false (UNSAT when asserted true) instead of floating free.
pub fn assert_taint_tags<S: Solver>(solver: &mut S, trace: &Trace, order_vars: &OrderVars<S>, seeds: &HashSet<String>, names: &HashSet<String>) {
    for name in names {
        let tag = solver.bool_const(&format!("{name}_tag"));

        if seeds.contains(name) {
            let is_true = solver.bool_val(true);
            let eq = solver.eq(tag, is_true);
            solver.assert(eq);
            continue;
        }

        let mut disjuncts = Vec::new();
        for (w, expr) in &trace.store_expr {
            if trace.event(*w).name != *name {
                continue;
            }
            let mut operands = HashSet::new();
            expr.referenced_names(&mut operands);
            for op in &operands {
                if op == name {
                    continue;
                }
                let op_tag = solver.bool_const(&format!("{op}_tag"));
                match trace.write_set.get(op) {
                    // `op` is itself a stored location: the propagation edge only
                    // holds in models where some write of `op` precedes this store.
                    Some(op_writes) => {
                        for &ow in op_writes {
                            let before = solver.order_lt(order_vars.term(ow), order_vars.term(*w));
                            disjuncts.push(solver.and(&[op_tag.clone(), before]));
                        }
                    }
                    // `op` has no write event of its own (e.g. a bare taint source
                    // introduced via a call, never a `Store`): there's nothing to
                    // order against, so the edge holds whenever `op` is tainted.
                    None => disjuncts.push(op_tag.clone()),
                }
            }
        }

        let rhs = if disjuncts.is_empty() { solver.bool_val(false) } else { solver.or(&disjuncts) };
        let eq = solver.eq(tag, rhs);
        solver.assert(eq);
    }
}
