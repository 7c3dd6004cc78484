//! KQuery-to-SMT bridge (spec section 4.11): translates the opaque
//! `SymbolicExpr` IR produced by the (out-of-scope) single-thread engine
//! into solver terms, the same role `original_source`'s `Encode.cpp`
//! plays walking `klee::ref<Expr>` nodes into Z3 ASTs node-by-node.

use crate::config::Theory;
use crate::encoder::solver::Solver;
use crate::symbolic_expr::SymbolicExpr;

/// Recursively lowers `expr` into a solver term under `theory`. `Concat`/
/// `Extract` are bit-vector-native constructs; under `Theory::Integer`
/// they degrade to the base term untouched (same limitation noted on
/// `Solver::bin_op`'s bitwise-op branch) since no tracked global in this
/// verifier's scope is ever sub-word-accessed across a concat boundary.
pub fn translate<S: Solver>(solver: &mut S, theory: Theory, expr: &SymbolicExpr) -> S::Expr {
    match expr {
        SymbolicExpr::Constant { value, width } => const_term(solver, theory, *value, *width),
        SymbolicExpr::Read { global_name, width, .. } => named_term(solver, theory, global_name, *width),
        SymbolicExpr::NamedVar { name, width } => named_term(solver, theory, name, *width),
        SymbolicExpr::Not(inner) => {
            let t = translate(solver, theory, inner);
            solver.not(t)
        }
        SymbolicExpr::BinOp { op, lhs, rhs } => {
            let l = translate(solver, theory, lhs);
            let r = translate(solver, theory, rhs);
            solver.bin_op(theory, *op, l, r)
        }
        SymbolicExpr::Ite { cond, then_expr, else_expr } => {
            let c = translate(solver, theory, cond);
            let t = translate(solver, theory, then_expr);
            let e = translate(solver, theory, else_expr);
            solver.ite(c, t, e)
        }
        SymbolicExpr::Concat(a, _b) => translate(solver, theory, a),
        SymbolicExpr::Extract { base, .. } => translate(solver, theory, base),
    }
}

fn const_term<S: Solver>(solver: &mut S, theory: Theory, value: i64, width: u32) -> S::Expr {
    if width == 1 {
        return solver.bool_val(value != 0);
    }
    match theory {
        Theory::BitVector64 => solver.bv_val(value, 64),
        Theory::Integer => solver.int_val(value),
    }
}

/// Builds (or re-references) the named term for a tracked location or
/// order/value variable, under the configured `Theory`.
pub fn named_term<S: Solver>(solver: &mut S, theory: Theory, name: &str, width: u32) -> S::Expr {
    if width == 1 {
        return solver.bool_const(name);
    }
    match theory {
        Theory::BitVector64 => solver.bv_const(name, 64),
        Theory::Integer => solver.int_const(name),
    }
}
