#![forbid(unsafe_code)]

//! Lowering of contract expressions to Z3 terms over bit-vectors, booleans,
//! strings and arrays.
//!
//! A `Translator` owns the symbol table and term metadata for exactly one
//! verification call; it is never reused.

use std::ops::{Deref, DerefMut};

use covenant_ast::{no_span, BinOp, Expr, ExprKind, Ident, QuantBinder, Span, StringComparison, StringOp, UnaryOp};
use tracing::{debug, warn};
use z3::ast::{self, Array, Ast, Bool, Dynamic, BV};
use z3::{Context, Sort};

use crate::config::{SmtProfile, VerifyOptions};
use crate::diagnose::{Reason, Unsupported};
use crate::scope::{length_symbol, Binding, SymbolTable};
use crate::tracker::TermTracker;
use crate::types::{resolve_type, BvInfo, SmtType};
use crate::width::{self, CompareMode, Extension, Operand};

type Z3String<'ctx> = z3::ast::String<'ctx>;

/// Element type assumed for arrays that are used without a declaration.
pub const DEFAULT_ARRAY_ELEMENT: &str = "i32";

#[derive(Clone, Debug)]
pub enum Term<'ctx> {
    Bool(Bool<'ctx>),
    BitVec(BV<'ctx>),
    Str(Z3String<'ctx>),
    Array(Array<'ctx>),
}

impl<'ctx> Term<'ctx> {
    pub fn as_dynamic(&self) -> Dynamic<'ctx> {
        match self {
            Term::Bool(b) => Dynamic::from_ast(b),
            Term::BitVec(v) => Dynamic::from_ast(v),
            Term::Str(s) => Dynamic::from_ast(s),
            Term::Array(a) => Dynamic::from_ast(a),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Bool(_) => "bool",
            Term::BitVec(_) => "integer",
            Term::Str(_) => "string",
            Term::Array(_) => "array",
        }
    }

    pub fn as_bool(&self) -> Option<&Bool<'ctx>> {
        match self {
            Term::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bv(&self) -> Option<&BV<'ctx>> {
        match self {
            Term::BitVec(v) => Some(v),
            _ => None,
        }
    }
}

pub struct Translator<'ctx> {
    ctx: &'ctx Context,
    symbols: SymbolTable<Term<'ctx>>,
    tracker: TermTracker<Dynamic<'ctx>>,
    warnings: Vec<String>,
    profile: SmtProfile,
    max_binders: usize,
    bound_counter: u32,
}

impl<'ctx> Translator<'ctx> {
    pub fn new(ctx: &'ctx Context, options: &VerifyOptions) -> Self {
        Self {
            ctx,
            symbols: SymbolTable::new(),
            tracker: TermTracker::new(),
            warnings: Vec::new(),
            profile: options.profile,
            max_binders: options.max_quantifier_binders,
            bound_counter: 0,
        }
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn symbols(&self) -> &SymbolTable<Term<'ctx>> {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable<Term<'ctx>> {
        &mut self.symbols
    }

    pub fn lookup(&self, name: &str) -> Option<&Term<'ctx>> {
        self.symbols.get(name).map(|b| &b.term)
    }

    pub fn kind_of(&self, term: &Term<'ctx>) -> Option<SmtType> {
        self.tracker.kind(&term.as_dynamic())
    }

    /// Width/signedness of a bit-vector term (signed 32-bit if untracked).
    pub fn bv_info(&self, v: &BV<'ctx>) -> BvInfo {
        self.tracker.bv_info(&Dynamic::from_ast(v))
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub(crate) fn truncate_warnings(&mut self, len: usize) {
        self.warnings.truncate(len);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    // ---- declarations ----

    pub fn declare(&mut self, name: &str, type_name: &str) -> bool {
        self.try_declare(name, type_name, no_span()).is_ok()
    }

    /// Declare a free symbol. Arrays also get their `name$length` companion.
    /// Fails without side effects on unsupported types or duplicate names.
    ///
    /// Free symbols are global: a declaration made while a quantifier scope is
    /// open outlives that scope.
    pub fn try_declare(&mut self, name: &str, type_name: &str, span: Span) -> Result<Term<'ctx>, Unsupported> {
        let ty = resolve_type(type_name).map_err(|e| Unsupported::parameter(name, type_name, span, e))?;

        let len_name = length_symbol(name);
        let is_array = matches!(ty, SmtType::Array { .. });
        if self.symbols.contains(name) || (is_array && self.symbols.contains(&len_name)) {
            return Err(Unsupported::at(Reason::Duplicate(name.to_string()), name, span));
        }

        let term = self.make_const(name, ty);
        if is_array {
            let len_ty = SmtType::BitVec(BvInfo::U32);
            let len = self.make_const(&len_name, len_ty);
            self.symbols.insert_global(
                len_name,
                Binding {
                    term: len,
                    ty: len_ty,
                    type_name: "uint".to_string(),
                },
            );
        }
        self.symbols.insert_global(
            name,
            Binding {
                term: term.clone(),
                ty,
                type_name: type_name.to_string(),
            },
        );
        debug!(name, ty = %ty, depth = self.symbols.depth(), "declared symbol");
        Ok(term)
    }

    fn make_const(&mut self, name: &str, ty: SmtType) -> Term<'ctx> {
        let ctx = self.ctx;
        let term = match ty {
            SmtType::BitVec(info) => Term::BitVec(BV::new_const(ctx, name, info.width)),
            SmtType::Bool => Term::Bool(Bool::new_const(ctx, name)),
            SmtType::String => Term::Str(Z3String::new_const(ctx, name)),
            SmtType::Array { elem } => Term::Array(Array::new_const(
                ctx,
                name,
                &Sort::bitvector(ctx, BvInfo::INDEX.width),
                &Sort::bitvector(ctx, elem.width),
            )),
        };
        self.track(term, ty)
    }

    fn track(&mut self, term: Term<'ctx>, kind: SmtType) -> Term<'ctx> {
        self.tracker.record(term.as_dynamic(), kind);
        term
    }

    fn bool_term(&mut self, b: Bool<'ctx>) -> Term<'ctx> {
        self.track(Term::Bool(b), SmtType::Bool)
    }

    fn bv_term(&mut self, v: BV<'ctx>, info: BvInfo) -> Term<'ctx> {
        self.track(Term::BitVec(v), SmtType::BitVec(info))
    }

    // ---- entry points ----

    /// Lower one expression; `None` is the normal outcome for unsupported input.
    pub fn translate(&mut self, expr: &Expr) -> Option<Term<'ctx>> {
        self.translate_checked(expr).ok()
    }

    /// Lower a contract clause, which must be boolean.
    pub fn translate_bool(&mut self, expr: &Expr) -> Result<Bool<'ctx>, Unsupported> {
        self.expect_bool(expr, "contract")
    }

    pub fn translate_checked(&mut self, expr: &Expr) -> Result<Term<'ctx>, Unsupported> {
        let ctx = self.ctx;
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(self.int_literal(*n)),
            ExprKind::FloatLit(_) => Err(Unsupported::new(Reason::Literal("floating-point"), expr)),
            ExprKind::BoolLit(b) => Ok(self.bool_term(Bool::from_bool(ctx, *b))),
            ExprKind::StringLit(s) => {
                let lit = Z3String::from_str(ctx, s)
                    .map_err(|_| Unsupported::new(Reason::Literal("NUL-containing string"), expr))?;
                Ok(self.track(Term::Str(lit), SmtType::String))
            }
            ExprKind::Ident(id) => self
                .lookup(&id.node)
                .cloned()
                .ok_or_else(|| Unsupported::new(Reason::UnknownVariable(id.node.clone()), expr)),
            ExprKind::Unary { op, expr: inner } => self.unary(*op, inner),
            ExprKind::Binary { left, op, right } => self.binary(left, *op, right, expr),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.conditional(cond, then_expr, else_expr, expr),
            ExprKind::ForAll { binders, body } => self.quantifier(true, binders, body, expr),
            ExprKind::Exists { binders, body } => self.quantifier(false, binders, body, expr),
            ExprKind::Implies { premise, conclusion } => {
                let p = self.expect_bool(premise, "==>")?;
                let q = self.expect_bool(conclusion, "==>")?;
                Ok(self.bool_term(Bool::or(ctx, &[&p.not(), &q])))
            }
            ExprKind::Index { array, index } => self.array_select(array, index, expr),
            ExprKind::Length { array } => self.array_length(array, expr),
            ExprKind::StringOp {
                op,
                receiver,
                args,
                comparison,
            } => self.string_op(*op, receiver, args, *comparison, expr),
            ExprKind::Call { callee, .. } => Err(Unsupported::new(Reason::Call(callee.node.clone()), expr)),
        }
    }

    fn expect_bool(&mut self, expr: &Expr, op: &str) -> Result<Bool<'ctx>, Unsupported> {
        match self.translate_checked(expr)? {
            Term::Bool(b) => Ok(b),
            other => Err(Unsupported::operand_kind(op, "bool", other.kind_name(), expr)),
        }
    }

    fn expect_bv(&mut self, expr: &Expr, op: &str) -> Result<(BV<'ctx>, BvInfo), Unsupported> {
        match self.translate_checked(expr)? {
            Term::BitVec(v) => {
                let info = self.bv_info(&v);
                Ok((v, info))
            }
            other => Err(Unsupported::operand_kind(op, "integer", other.kind_name(), expr)),
        }
    }

    fn expect_str(&mut self, expr: &Expr, op: &str) -> Result<Z3String<'ctx>, Unsupported> {
        match self.translate_checked(expr)? {
            Term::Str(s) => Ok(s),
            other => Err(Unsupported::operand_kind(op, "string", other.kind_name(), expr)),
        }
    }

    // ---- literals ----

    /// Integer literals are always signed 32-bit; wider values are truncated.
    fn int_literal(&mut self, value: i64) -> Term<'ctx> {
        let truncated = value as i32;
        if i64::from(truncated) != value {
            self.warn(format!(
                "integer literal {value} does not fit in 32 bits; modeled as {truncated}"
            ));
        }
        let v = BV::from_i64(self.ctx, i64::from(truncated), BvInfo::I32.width);
        self.bv_term(v, BvInfo::I32)
    }

    // ---- width normalization ----

    fn extend(&mut self, v: &BV<'ctx>, info: BvInfo, ext: Extension) -> BV<'ctx> {
        let (out, extra) = match ext {
            Extension::None => return v.clone(),
            Extension::Sign(n) => (v.sign_ext(n), n),
            Extension::Zero(n) => (v.zero_ext(n), n),
        };
        let widened = BvInfo {
            width: info.width + extra,
            signed: info.signed,
        };
        self.tracker.record(Dynamic::from_ast(&out), SmtType::BitVec(widened));
        out
    }

    fn normalize(&mut self, l: &BV<'ctx>, li: BvInfo, r: &BV<'ctx>, ri: BvInfo) -> (BV<'ctx>, BV<'ctx>, u32) {
        let plan = width::plan_normalization(li, ri);
        let l = self.extend(l, li, plan.left);
        let r = self.extend(r, ri, plan.right);
        (l, r, plan.width)
    }

    fn compare_mode(&self, l: &BV<'ctx>, li: BvInfo, r: &BV<'ctx>, ri: BvInfo) -> CompareMode {
        width::choose_compare_mode(
            Operand {
                info: li,
                literal: l.as_u64(),
            },
            Operand {
                info: ri,
                literal: r.as_u64(),
            },
        )
    }

    // ---- operators ----

    fn unary(&mut self, op: UnaryOp, inner: &Expr) -> Result<Term<'ctx>, Unsupported> {
        let sym = op.symbol();
        match op {
            UnaryOp::Not => {
                let b = self.expect_bool(inner, sym)?;
                Ok(self.bool_term(b.not()))
            }
            UnaryOp::Neg => {
                let (v, info) = self.expect_bv(inner, sym)?;
                Ok(self.bv_term(v.bvneg(), info))
            }
            UnaryOp::BitNot => {
                let (v, info) = self.expect_bv(inner, sym)?;
                Ok(self.bv_term(v.bvnot(), info))
            }
        }
    }

    fn binary(&mut self, left: &Expr, op: BinOp, right: &Expr, expr: &Expr) -> Result<Term<'ctx>, Unsupported> {
        let ctx = self.ctx;
        let sym = op.symbol();
        match op {
            BinOp::And | BinOp::Or => {
                let l = self.expect_bool(left, sym)?;
                let r = self.expect_bool(right, sym)?;
                let b = if op == BinOp::And {
                    Bool::and(ctx, &[&l, &r])
                } else {
                    Bool::or(ctx, &[&l, &r])
                };
                Ok(self.bool_term(b))
            }
            BinOp::Eq | BinOp::Ne => {
                let l = self.translate_checked(left)?;
                let r = self.translate_checked(right)?;
                let eq = self.equality(&l, &r, sym, expr)?;
                Ok(self.bool_term(if op == BinOp::Eq { eq } else { eq.not() }))
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                let (l, li) = self.expect_bv(left, sym)?;
                let (r, ri) = self.expect_bv(right, sym)?;
                let signed = self.compare_mode(&l, li, &r, ri).is_signed();
                let (l, r, _) = self.normalize(&l, li, &r, ri);
                let b = match (op, signed) {
                    (BinOp::Lt, true) => l.bvslt(&r),
                    (BinOp::Lt, false) => l.bvult(&r),
                    (BinOp::Gt, true) => l.bvsgt(&r),
                    (BinOp::Gt, false) => l.bvugt(&r),
                    (BinOp::Le, true) => l.bvsle(&r),
                    (BinOp::Le, false) => l.bvule(&r),
                    (_, true) => l.bvsge(&r),
                    (_, false) => l.bvuge(&r),
                };
                Ok(self.bool_term(b))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul => {
                let (l, li) = self.expect_bv(left, sym)?;
                let (r, ri) = self.expect_bv(right, sym)?;
                let (l, r, _) = self.normalize(&l, li, &r, ri);
                let v = match op {
                    BinOp::Add => l.bvadd(&r),
                    BinOp::Sub => l.bvsub(&r),
                    _ => l.bvmul(&r),
                };
                Ok(self.bv_term(v, width::arithmetic_result(li, ri)))
            }
            BinOp::Div | BinOp::Rem => {
                let (l, li) = self.expect_bv(left, sym)?;
                let (r, ri) = self.expect_bv(right, sym)?;
                let signed = self.compare_mode(&l, li, &r, ri).is_signed();
                let (l, r, w) = self.normalize(&l, li, &r, ri);
                let v = match (op, signed) {
                    (BinOp::Div, true) => l.bvsdiv(&r),
                    (BinOp::Div, false) => l.bvudiv(&r),
                    (_, true) => l.bvsrem(&r),
                    (_, false) => l.bvurem(&r),
                };
                Ok(self.bv_term(v, BvInfo { width: w, signed }))
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                let l = self.translate_checked(left)?;
                let r = self.translate_checked(right)?;
                match (&l, &r) {
                    (Term::Bool(a), Term::Bool(b)) => {
                        let out = match op {
                            BinOp::BitAnd => Bool::and(ctx, &[a, b]),
                            BinOp::BitOr => Bool::or(ctx, &[a, b]),
                            _ => a.xor(b),
                        };
                        Ok(self.bool_term(out))
                    }
                    (Term::BitVec(a), Term::BitVec(b)) => {
                        let (ai, bi) = (self.bv_info(a), self.bv_info(b));
                        let (a, b, _) = self.normalize(a, ai, b, bi);
                        let out = match op {
                            BinOp::BitAnd => a.bvand(&b),
                            BinOp::BitOr => a.bvor(&b),
                            _ => a.bvxor(&b),
                        };
                        Ok(self.bv_term(out, width::arithmetic_result(ai, bi)))
                    }
                    _ => Err(Unsupported::operand_kind(
                        sym,
                        "matching bool or integer",
                        &format!("{} and {}", l.kind_name(), r.kind_name()),
                        expr,
                    )),
                }
            }
            BinOp::Shl | BinOp::Shr => {
                let (l, li) = self.expect_bv(left, sym)?;
                let (r, ri) = self.expect_bv(right, sym)?;
                let (l, r, w) = self.normalize(&l, li, &r, ri);
                let v = match op {
                    BinOp::Shl => l.bvshl(&r),
                    _ if li.signed => l.bvashr(&r),
                    _ => l.bvlshr(&r),
                };
                Ok(self.bv_term(
                    v,
                    BvInfo {
                        width: w,
                        signed: li.signed,
                    },
                ))
            }
        }
    }

    /// Bit-for-bit equality after width normalization; signedness is irrelevant.
    fn equality(&mut self, l: &Term<'ctx>, r: &Term<'ctx>, op: &str, expr: &Expr) -> Result<Bool<'ctx>, Unsupported> {
        match (l, r) {
            (Term::BitVec(a), Term::BitVec(b)) => {
                let (ai, bi) = (self.bv_info(a), self.bv_info(b));
                let (a, b, _) = self.normalize(a, ai, b, bi);
                Ok(a._eq(&b))
            }
            (Term::Bool(a), Term::Bool(b)) => Ok(a._eq(b)),
            (Term::Str(a), Term::Str(b)) => Ok(a._eq(b)),
            _ => Err(Unsupported::operand_kind(
                op,
                "matching bool, integer or string",
                &format!("{} and {}", l.kind_name(), r.kind_name()),
                expr,
            )),
        }
    }

    fn conditional(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        expr: &Expr,
    ) -> Result<Term<'ctx>, Unsupported> {
        let c = self.expect_bool(cond, "?:")?;
        let t = self.translate_checked(then_expr)?;
        let e = self.translate_checked(else_expr)?;
        match (&t, &e) {
            (Term::Bool(a), Term::Bool(b)) => Ok(self.bool_term(c.ite(a, b))),
            (Term::Str(a), Term::Str(b)) => Ok(self.track(Term::Str(c.ite(a, b)), SmtType::String)),
            (Term::BitVec(a), Term::BitVec(b)) => {
                // Z3 rejects `ite` over different sorts: widen like a binary operator.
                let (ai, bi) = (self.bv_info(a), self.bv_info(b));
                let (a, b, _) = self.normalize(a, ai, b, bi);
                Ok(self.bv_term(c.ite(&a, &b), width::arithmetic_result(ai, bi)))
            }
            _ => Err(Unsupported::operand_kind(
                "?:",
                "matching bool, integer or string",
                &format!("{} and {}", t.kind_name(), e.kind_name()),
                expr,
            )),
        }
    }

    // ---- quantifiers ----

    fn quantifier(
        &mut self,
        universal: bool,
        binders: &[QuantBinder],
        body: &Expr,
        expr: &Expr,
    ) -> Result<Term<'ctx>, Unsupported> {
        if !self.profile.allows_quantifiers() {
            return Err(Unsupported::new(
                Reason::QuantifiersDisabled(self.profile.name().to_string()),
                expr,
            ));
        }
        if binders.len() > self.max_binders {
            return Err(Unsupported::new(
                Reason::TooManyBinders {
                    found: binders.len(),
                    max: self.max_binders,
                },
                expr,
            ));
        }

        let q = {
            let mut scoped = ScopeGuard::enter(self);
            scoped.quantified_body(universal, binders, body)?
        };
        Ok(self.bool_term(q))
    }

    fn quantified_body(&mut self, universal: bool, binders: &[QuantBinder], body: &Expr) -> Result<Bool<'ctx>, Unsupported> {
        let mut bounds: Vec<Dynamic<'ctx>> = Vec::new();
        for b in binders {
            let node = format!("{}: {}", b.name.node, b.ty);
            let ty = resolve_type(&b.ty).map_err(|e| Unsupported::at(Reason::Type(e), node.clone(), b.span))?;
            if matches!(ty, SmtType::Array { .. }) {
                return Err(Unsupported::at(Reason::ArrayBinder(b.name.node.clone()), node, b.span));
            }

            self.bound_counter += 1;
            let internal = format!("{}!q{}", b.name.node, self.bound_counter);
            let term = self.make_const(&internal, ty);
            bounds.push(term.as_dynamic());
            self.symbols.insert(
                b.name.node.clone(),
                Binding {
                    term,
                    ty,
                    type_name: b.ty.clone(),
                },
            );
        }

        let kw = if universal { "forall" } else { "exists" };
        let body_b = self.expect_bool(body, kw)?;
        let bound_refs: Vec<&dyn Ast<'ctx>> = bounds.iter().map(|d| d as &dyn Ast<'ctx>).collect();
        Ok(if universal {
            ast::forall_const(self.ctx, &bound_refs, &[], &body_b)
        } else {
            ast::exists_const(self.ctx, &bound_refs, &[], &body_b)
        })
    }

    // ---- arrays ----

    /// Resolve `array`, declaring it with the default element type if unknown.
    fn array_binding(&mut self, array: &Ident, expr: &Expr) -> Result<(Array<'ctx>, BvInfo), Unsupported> {
        let found = self.symbols.get(&array.node).map(|b| (b.term.clone(), b.ty));
        match found {
            Some((Term::Array(a), SmtType::Array { elem })) => Ok((a, elem)),
            Some((_, ty)) => Err(Unsupported::new(
                Reason::NotAnArray {
                    name: array.node.clone(),
                    kind: ty.kind_name(),
                },
                expr,
            )),
            None => {
                self.warn(format!(
                    "array `{}` is not declared; assuming `{DEFAULT_ARRAY_ELEMENT}[]`",
                    array.node
                ));
                self.try_declare(&array.node, &format!("{DEFAULT_ARRAY_ELEMENT}[]"), array.span)?;
                self.array_binding(array, expr)
            }
        }
    }

    fn array_select(&mut self, array: &Ident, index: &Expr, expr: &Expr) -> Result<Term<'ctx>, Unsupported> {
        let (arr, elem) = self.array_binding(array, expr)?;
        let (idx, info) = self.expect_bv(index, "[]")?;
        let idx = self.extend(&idx, info, width::index_extension(info));
        let v = arr.select(&idx).as_bv().ok_or_else(|| {
            Unsupported::new(
                Reason::Solver(format!("select on `{}` did not yield a bit-vector", array.node)),
                expr,
            )
        })?;
        Ok(self.bv_term(v, elem))
    }

    fn array_length(&mut self, array: &Ident, expr: &Expr) -> Result<Term<'ctx>, Unsupported> {
        if let Some(Term::Str(_)) = self.lookup(&array.node) {
            // z3 0.12 exposes no `str.len`.
            return Err(Unsupported::new(Reason::StringOperation("Length".to_string()), expr));
        }
        self.array_binding(array, expr)?;
        let len_name = length_symbol(&array.node);
        self.lookup(&len_name)
            .cloned()
            .ok_or_else(|| Unsupported::new(Reason::UnknownVariable(len_name), expr))
    }

    // ---- strings (ordinal semantics only) ----

    fn string_op(
        &mut self,
        op: StringOp,
        receiver: &Expr,
        args: &[Expr],
        comparison: Option<StringComparison>,
        expr: &Expr,
    ) -> Result<Term<'ctx>, Unsupported> {
        let ctx = self.ctx;
        let name = op.name();

        if let Some(mode) = comparison.filter(|m| !m.is_ordinal()) {
            warn!(op = name, mode = mode.name(), "non-ordinal string comparison downgraded to ordinal");
            self.warn(format!(
                "`{expr}`: StringComparison.{} is not modeled; verified with ordinal semantics instead",
                mode.name()
            ));
        }

        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(Unsupported::new(
                    Reason::Arity {
                        op: name.to_string(),
                        expected,
                        found: args.len(),
                    },
                    expr,
                ))
            }
        };

        match op {
            StringOp::IsNullOrEmpty => {
                // No null in the string theory: empty is the only such value.
                arity("0", args.is_empty())?;
                let s = self.expect_str(receiver, name)?;
                let empty = Z3String::from_str(ctx, "")
                    .map_err(|e| Unsupported::new(Reason::Solver(e.to_string()), expr))?;
                Ok(self.bool_term(s._eq(&empty)))
            }
            StringOp::Contains | StringOp::StartsWith | StringOp::EndsWith | StringOp::Equals => {
                arity("1", args.len() == 1)?;
                let s = self.expect_str(receiver, name)?;
                let other = self.expect_str(&args[0], name)?;
                let b = match op {
                    StringOp::Contains => s.contains(&other),
                    StringOp::StartsWith => other.prefix(&s),
                    StringOp::EndsWith => other.suffix(&s),
                    _ => s._eq(&other),
                };
                Ok(self.bool_term(b))
            }
            StringOp::Concat => {
                arity("at least 1", !args.is_empty())?;
                let mut parts = vec![self.expect_str(receiver, name)?];
                for a in args {
                    parts.push(self.expect_str(a, name)?);
                }
                let refs = parts.iter().collect::<Vec<_>>();
                Ok(self.track(Term::Str(Z3String::concat(ctx, &refs)), SmtType::String))
            }
            // Length and Substring need `str.len`/`str.substr`, which z3 0.12 does not bind.
            StringOp::Length
            | StringOp::Substring
            | StringOp::ToUpper
            | StringOp::ToLower
            | StringOp::Trim
            | StringOp::PadLeft
            | StringOp::PadRight
            | StringOp::Split
            | StringOp::Join
            | StringOp::Format
            | StringOp::RegexMatch => Err(Unsupported::new(Reason::StringOperation(name.to_string()), expr)),
        }
    }
}

/// An open quantifier scope. Popped on drop, so bound names never leak even
/// when translation unwinds.
struct ScopeGuard<'a, 'ctx> {
    translator: &'a mut Translator<'ctx>,
}

impl<'a, 'ctx> ScopeGuard<'a, 'ctx> {
    fn enter(translator: &'a mut Translator<'ctx>) -> Self {
        translator.symbols.push_scope();
        Self { translator }
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.translator.symbols.pop_scope();
    }
}

impl<'ctx> Deref for ScopeGuard<'_, 'ctx> {
    type Target = Translator<'ctx>;

    fn deref(&self) -> &Translator<'ctx> {
        &*self.translator
    }
}

impl<'ctx> DerefMut for ScopeGuard<'_, 'ctx> {
    fn deref_mut(&mut self) -> &mut Translator<'ctx> {
        &mut *self.translator
    }
}
