//! Opaque symbolic-expression IR produced by the (out-of-scope) single
//! thread symbolic engine.
//!
//! `original_source`'s `Encode.cpp` walks the engine's own `klee::ref<Expr>`
//! node-by-node into Z3 ASTs. Since that engine is out of scope here (spec
//! section 1), we model its output as this opaque enum instead, carrying
//! only the node shapes the bridge actually switches on (constants, reads,
//! concat/extract, the arithmetic/bitwise/comparison op set, select/ite,
//! not/and/or). `encoder::kquery_bridge` translates this into `z3::ast`
//! terms.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    Eq,
    Ult,
    Ule,
    Slt,
    Sle,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SymbolicExpr {
    /// A concrete constant of the given bit width.
    Constant { value: i64, width: u32 },
    /// A symbolic read of `name` at a symbolic or concrete offset,
    /// represented by the pre-resolved `global_name` the recorder
    /// assigned to this access.
    Read { root_name: String, global_name: String, width: u32 },
    Not(Box<SymbolicExpr>),
    BinOp { op: BinOp, lhs: Box<SymbolicExpr>, rhs: Box<SymbolicExpr> },
    /// select(cond, a, b)
    Ite { cond: Box<SymbolicExpr>, then_expr: Box<SymbolicExpr>, else_expr: Box<SymbolicExpr> },
    Concat(Box<SymbolicExpr>, Box<SymbolicExpr>),
    Extract { base: Box<SymbolicExpr>, offset: u32, width: u32 },
    /// A reference to a named order/value variable materialized during
    /// encoding (e.g. `x_Init`, `x_Final`, a tag variable for taint).
    NamedVar { name: String, width: u32 },
}

impl SymbolicExpr {
    pub fn bool_const(v: bool) -> Self {
        SymbolicExpr::Constant { value: v as i64, width: 1 }
    }

    pub fn named(name: impl Into<String>, width: u32) -> Self {
        SymbolicExpr::NamedVar { name: name.into(), width }
    }

    pub fn read(root_name: impl Into<String>, global_name: impl Into<String>, width: u32) -> Self {
        SymbolicExpr::Read { root_name: root_name.into(), global_name: global_name.into(), width }
    }

    pub fn not(self) -> Self {
        SymbolicExpr::Not(Box::new(self))
    }

    pub fn bin(op: BinOp, lhs: SymbolicExpr, rhs: SymbolicExpr) -> Self {
        SymbolicExpr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn eq(self, rhs: SymbolicExpr) -> Self {
        SymbolicExpr::bin(BinOp::Eq, self, rhs)
    }

    /// The set of root location names this expression transitively reads
    /// from. Used by the expression filter's closure computation (spec
    /// section 4.5).
    pub fn referenced_names(&self, out: &mut std::collections::HashSet<String>) {
        match self {
            SymbolicExpr::Constant { .. } => {}
            SymbolicExpr::Read { root_name, .. } => {
                out.insert(root_name.clone());
            }
            SymbolicExpr::NamedVar { .. } => {}
            SymbolicExpr::Not(e) => e.referenced_names(out),
            SymbolicExpr::BinOp { lhs, rhs, .. } => {
                lhs.referenced_names(out);
                rhs.referenced_names(out);
            }
            SymbolicExpr::Ite { cond, then_expr, else_expr } => {
                cond.referenced_names(out);
                then_expr.referenced_names(out);
                else_expr.referenced_names(out);
            }
            SymbolicExpr::Concat(a, b) => {
                a.referenced_names(out);
                b.referenced_names(out);
            }
            SymbolicExpr::Extract { base, .. } => base.referenced_names(out),
        }
    }

    /// The "root location name" every expression carries as an unambiguous
    /// sub-term (spec section 4.1), used to tag raw expression log
    /// entries before filtering.
    pub fn root_name(&self) -> Option<&str> {
        match self {
            SymbolicExpr::Read { root_name, .. } => Some(root_name),
            SymbolicExpr::Not(e) => e.root_name(),
            SymbolicExpr::BinOp { lhs, .. } => lhs.root_name(),
            SymbolicExpr::Ite { cond, .. } => cond.root_name(),
            SymbolicExpr::Concat(a, _) => a.root_name(),
            SymbolicExpr::Extract { base, .. } => base.root_name(),
            SymbolicExpr::Constant { .. } | SymbolicExpr::NamedVar { .. } => None,
        }
    }
}
