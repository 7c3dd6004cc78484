//! Solver contract consumed by the encoder (spec section 6): push/pop
//! discipline, expression builders, and a queryable model. `Z3Solver` is
//! the production adapter over the `z3` crate; anything implementing
//! `Solver` can stand in, which is what the formula builders in
//! `encoder::formulas` are generic over.

use crate::config::Theory;
use crate::symbolic_expr::BinOp;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// A satisfying model, queried by the order-variable and value-variable
/// names the encoder assigned (spec section 4.6). Opaque over the
/// backing solver so callers never see its native ast types.
pub trait Model {
    fn eval_int(&self, name: &str) -> Option<i64>;
    fn eval_bool(&self, name: &str) -> Option<bool>;
}

/// Push/pop-disciplined solver context plus expression builders for
/// booleans, bit-vectors, and integers (spec section 6). Every
/// speculative query made by `verify_assertion` / `flip_if_branches` is
/// bracketed in a `push`/`pop` pair.
pub trait Solver {
    type Expr: Clone;
    type Model: Model;

    fn push(&mut self);
    fn pop(&mut self);
    fn assert(&mut self, expr: Self::Expr);
    fn check(&mut self) -> SatResult;
    fn get_model(&self) -> Option<Self::Model>;

    fn bool_val(&mut self, value: bool) -> Self::Expr;
    fn bool_const(&mut self, name: &str) -> Self::Expr;
    fn int_val(&mut self, value: i64) -> Self::Expr;
    fn int_const(&mut self, name: &str) -> Self::Expr;
    fn bv_val(&mut self, value: i64, width: u32) -> Self::Expr;
    fn bv_const(&mut self, name: &str, width: u32) -> Self::Expr;

    fn not(&mut self, e: Self::Expr) -> Self::Expr;
    fn and(&mut self, exprs: &[Self::Expr]) -> Self::Expr;
    fn or(&mut self, exprs: &[Self::Expr]) -> Self::Expr;
    fn implies(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr;
    fn eq(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr;
    /// Strict `<` over integer-sorted order variables (spec section 4.6
    /// memory-model formula always uses integer order variables,
    /// independent of the tracked-value `Theory`).
    fn order_lt(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr;
    fn ite(&mut self, cond: Self::Expr, then_expr: Self::Expr, else_expr: Self::Expr) -> Self::Expr;

    /// Translates one `BinOp` under the configured value `Theory`.
    fn bin_op(&mut self, theory: Theory, op: BinOp, lhs: Self::Expr, rhs: Self::Expr) -> Self::Expr;
}

/// Production adapter over the real `z3` SMT solver. The `z3` crate's
/// `Context`/`Solver` are lifetime-parameterized over each other; we leak
/// the context to `'static` once per `Z3Solver` so `Expr = Dynamic<'static>`
/// can be stored and returned freely instead of threading a lifetime
/// through every formula builder.
pub struct Z3Solver {
    ctx: &'static z3::Context,
    solver: z3::Solver<'static>,
}

impl Z3Solver {
    pub fn new() -> Self {
        let cfg = z3::Config::new();
        let ctx: &'static z3::Context = Box::leak(Box::new(z3::Context::new(&cfg)));
        let solver = z3::Solver::new(ctx);
        Z3Solver { ctx, solver }
    }

    fn as_bool(e: &z3::ast::Dynamic<'static>) -> z3::ast::Bool<'static> {
        e.as_bool().expect("expected boolean-sorted expression")
    }

    fn as_int(e: &z3::ast::Dynamic<'static>) -> z3::ast::Int<'static> {
        e.as_int().expect("expected integer-sorted expression")
    }

    fn as_bv(e: &z3::ast::Dynamic<'static>) -> z3::ast::BV<'static> {
        e.as_bv().expect("expected bit-vector-sorted expression")
    }
}

pub struct Z3Model {
    ctx: &'static z3::Context,
    model: z3::Model<'static>,
}

impl Model for Z3Model {
    fn eval_int(&self, name: &str) -> Option<i64> {
        use z3::ast::Ast;
        let v = z3::ast::Int::new_const(self.ctx, name);
        self.model.eval(&v, true).and_then(|r| r.as_i64())
    }

    fn eval_bool(&self, name: &str) -> Option<bool> {
        use z3::ast::Ast;
        let v = z3::ast::Bool::new_const(self.ctx, name);
        self.model.eval(&v, true).and_then(|r| r.as_bool())
    }
}

impl Solver for Z3Solver {
    type Expr = z3::ast::Dynamic<'static>;
    type Model = Z3Model;

    fn push(&mut self) {
        self.solver.push();
    }

    fn pop(&mut self) {
        self.solver.pop(1);
    }

    fn assert(&mut self, expr: Self::Expr) {
        self.solver.assert(&Self::as_bool(&expr));
    }

    fn check(&mut self) -> SatResult {
        match self.solver.check() {
            z3::SatResult::Sat => SatResult::Sat,
            z3::SatResult::Unsat => SatResult::Unsat,
            z3::SatResult::Unknown => SatResult::Unknown,
        }
    }

    fn get_model(&self) -> Option<Self::Model> {
        self.solver.get_model().map(|model| Z3Model { ctx: self.ctx, model })
    }

    fn bool_val(&mut self, value: bool) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::Bool::from_bool(self.ctx, value).into()
    }

    fn bool_const(&mut self, name: &str) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::Bool::new_const(self.ctx, name).into()
    }

    fn int_val(&mut self, value: i64) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::Int::from_i64(self.ctx, value).into()
    }

    fn int_const(&mut self, name: &str) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::Int::new_const(self.ctx, name).into()
    }

    fn bv_val(&mut self, value: i64, width: u32) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::BV::from_i64(self.ctx, value, width).into()
    }

    fn bv_const(&mut self, name: &str, width: u32) -> Self::Expr {
        use z3::ast::Ast;
        z3::ast::BV::new_const(self.ctx, name, width).into()
    }

    fn not(&mut self, e: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        Self::as_bool(&e).not().into()
    }

    fn and(&mut self, exprs: &[Self::Expr]) -> Self::Expr {
        use z3::ast::Ast;
        let bools: Vec<z3::ast::Bool> = exprs.iter().map(Self::as_bool).collect();
        let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
        z3::ast::Bool::and(self.ctx, &refs).into()
    }

    fn or(&mut self, exprs: &[Self::Expr]) -> Self::Expr {
        use z3::ast::Ast;
        let bools: Vec<z3::ast::Bool> = exprs.iter().map(Self::as_bool).collect();
        let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
        z3::ast::Bool::or(self.ctx, &refs).into()
    }

    fn implies(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        Self::as_bool(&a).implies(&Self::as_bool(&b)).into()
    }

    fn eq(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        a._eq(&b).into()
    }

    fn order_lt(&mut self, a: Self::Expr, b: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        Self::as_int(&a).lt(&Self::as_int(&b)).into()
    }

    fn ite(&mut self, cond: Self::Expr, then_expr: Self::Expr, else_expr: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        Self::as_bool(&cond).ite(&then_expr, &else_expr)
    }

    fn bin_op(&mut self, theory: Theory, op: BinOp, lhs: Self::Expr, rhs: Self::Expr) -> Self::Expr {
        use z3::ast::Ast;
        match theory {
            Theory::BitVector64 => {
                let l = Self::as_bv(&lhs);
                let r = Self::as_bv(&rhs);
                match op {
                    BinOp::Add => l.bvadd(&r).into(),
                    BinOp::Sub => l.bvsub(&r).into(),
                    BinOp::Mul => l.bvmul(&r).into(),
                    BinOp::UDiv => l.bvudiv(&r).into(),
                    BinOp::SDiv => l.bvsdiv(&r).into(),
                    BinOp::URem => l.bvurem(&r).into(),
                    BinOp::SRem => l.bvsrem(&r).into(),
                    BinOp::And => l.bvand(&r).into(),
                    BinOp::Or => l.bvor(&r).into(),
                    BinOp::Xor => l.bvxor(&r).into(),
                    BinOp::Shl => l.bvshl(&r).into(),
                    BinOp::LShr => l.bvlshr(&r).into(),
                    BinOp::AShr => l.bvashr(&r).into(),
                    BinOp::Eq => l._eq(&r).into(),
                    BinOp::Ult => l.bvult(&r).into(),
                    BinOp::Ule => l.bvule(&r).into(),
                    BinOp::Slt => l.bvslt(&r).into(),
                    BinOp::Sle => l.bvsle(&r).into(),
                }
            }
            Theory::Integer => {
                let l = Self::as_int(&lhs);
                let r = Self::as_int(&rhs);
                match op {
                    BinOp::Add => z3::ast::Int::add(self.ctx, &[&l, &r]).into(),
                    BinOp::Sub => z3::ast::Int::sub(self.ctx, &[&l, &r]).into(),
                    BinOp::Mul => z3::ast::Int::mul(self.ctx, &[&l, &r]).into(),
                    BinOp::UDiv | BinOp::SDiv => l.div(&r).into(),
                    BinOp::URem | BinOp::SRem => l.rem(&r).into(),
                    // Bitwise ops have no native integer-sort counterpart;
                    // widen to the fixed bit-vector width, compute, narrow
                    // back. Approximate under the integer theory by design
                    // (spec section 6 treats `Theory` as a tracked-value
                    // sort choice, not a formula-shape choice).
                    BinOp::And | BinOp::Or | BinOp::Xor | BinOp::Shl | BinOp::LShr | BinOp::AShr => {
                        let lb = l.int2bv(64);
                        let rb = r.int2bv(64);
                        let result = match op {
                            BinOp::And => lb.bvand(&rb),
                            BinOp::Or => lb.bvor(&rb),
                            BinOp::Xor => lb.bvxor(&rb),
                            BinOp::Shl => lb.bvshl(&rb),
                            BinOp::LShr => lb.bvlshr(&rb),
                            BinOp::AShr => lb.bvashr(&rb),
                            _ => unreachable!(),
                        };
                        result.bv2int(true).into()
                    }
                    BinOp::Eq => l._eq(&r).into(),
                    BinOp::Ult | BinOp::Ule | BinOp::Slt | BinOp::Sle => {
                        let strict = matches!(op, BinOp::Ult | BinOp::Slt);
                        if strict { l.lt(&r).into() } else { l.le(&r).into() }
                    }
                }
            }
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}
