#![forbid(unsafe_code)]

use std::fmt;

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Placeholder span for synthesized nodes (tests, `result` bindings).
pub fn no_span() -> Span {
    span(0, 0)
}

pub type Ident = Spanned<String>;

pub fn ident(name: impl Into<String>) -> Ident {
    Spanned::new(no_span(), name.into())
}

/// A typed function parameter as produced by the binder.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    /// Source-level type name (`i32`, `uint`, `string`, `long[]`, ...).
    pub ty: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            span: no_span(),
            name: ident(name),
            ty: ty.into(),
        }
    }
}

/// One `requires`/`ensures` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct Contract {
    pub span: Span,
    pub expr: Expr,
    /// User-supplied failure message; carried through verbatim.
    pub message: Option<String>,
}

impl Contract {
    pub fn new(expr: Expr) -> Self {
        Self {
            span: expr.span,
            expr,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Everything the verifier needs to know about one contract-bearing function.
#[derive(Clone, Debug, PartialEq)]
pub struct FnContracts {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub output_type: Option<String>,
    pub requires: Vec<Contract>,
    pub ensures: Vec<Contract>,
    /// Symbolic value of `result`, when the caller can express the body as one expression.
    pub result_value: Option<Expr>,
}

impl FnContracts {
    pub fn new(name: impl Into<String>, params: Vec<Param>, output_type: Option<&str>) -> Self {
        Self {
            span: no_span(),
            name: ident(name),
            params,
            output_type: output_type.map(str::to_string),
            requires: Vec::new(),
            ensures: Vec::new(),
            result_value: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuantBinder {
    pub span: Span,
    pub name: Ident,
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `cond ? then_expr : else_expr`
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    ForAll {
        binders: Vec<QuantBinder>,
        body: Box<Expr>,
    },
    Exists {
        binders: Vec<QuantBinder>,
        body: Box<Expr>,
    },
    /// `premise ==> conclusion`
    Implies {
        premise: Box<Expr>,
        conclusion: Box<Expr>,
    },
    /// `array[index]`
    Index {
        array: Ident,
        index: Box<Expr>,
    },
    /// `array.Length`
    Length {
        array: Ident,
    },
    /// `receiver.Op(args..)`, or `string.Op(receiver)` for static helpers.
    StringOp {
        op: StringOp,
        receiver: Box<Expr>,
        args: Vec<Expr>,
        comparison: Option<StringComparison>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,

    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringOp {
    Length,
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    Concat,
    IsNullOrEmpty,
    Substring,

    ToUpper,
    ToLower,
    Trim,
    PadLeft,
    PadRight,
    Split,
    Join,
    Format,
    RegexMatch,
}

impl StringOp {
    pub fn name(self) -> &'static str {
        match self {
            StringOp::Length => "Length",
            StringOp::Contains => "Contains",
            StringOp::StartsWith => "StartsWith",
            StringOp::EndsWith => "EndsWith",
            StringOp::Equals => "Equals",
            StringOp::Concat => "Concat",
            StringOp::IsNullOrEmpty => "IsNullOrEmpty",
            StringOp::Substring => "Substring",
            StringOp::ToUpper => "ToUpper",
            StringOp::ToLower => "ToLower",
            StringOp::Trim => "Trim",
            StringOp::PadLeft => "PadLeft",
            StringOp::PadRight => "PadRight",
            StringOp::Split => "Split",
            StringOp::Join => "Join",
            StringOp::Format => "Format",
            StringOp::RegexMatch => "IsMatch",
        }
    }

    /// Static helpers are written `string.Op(x)` rather than `x.Op()`.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            StringOp::IsNullOrEmpty | StringOp::Concat | StringOp::Join | StringOp::Format | StringOp::RegexMatch
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringComparison {
    Ordinal,
    OrdinalIgnoreCase,
    CurrentCulture,
    CurrentCultureIgnoreCase,
    InvariantCulture,
    InvariantCultureIgnoreCase,
}

impl StringComparison {
    pub fn name(self) -> &'static str {
        match self {
            StringComparison::Ordinal => "Ordinal",
            StringComparison::OrdinalIgnoreCase => "OrdinalIgnoreCase",
            StringComparison::CurrentCulture => "CurrentCulture",
            StringComparison::CurrentCultureIgnoreCase => "CurrentCultureIgnoreCase",
            StringComparison::InvariantCulture => "InvariantCulture",
            StringComparison::InvariantCultureIgnoreCase => "InvariantCultureIgnoreCase",
        }
    }

    pub fn is_ordinal(self) -> bool {
        self == StringComparison::Ordinal
    }
}

// Builders for synthesized trees. Every node gets `no_span()`.
impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            span: no_span(),
            kind,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(ident(name)))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLit(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::FloatLit(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::BoolLit(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::StringLit(value.into()))
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn conditional(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn forall(binders: &[(&str, &str)], body: Expr) -> Self {
        Self::new(ExprKind::ForAll {
            binders: make_binders(binders),
            body: Box::new(body),
        })
    }

    pub fn exists(binders: &[(&str, &str)], body: Expr) -> Self {
        Self::new(ExprKind::Exists {
            binders: make_binders(binders),
            body: Box::new(body),
        })
    }

    pub fn implies(premise: Expr, conclusion: Expr) -> Self {
        Self::new(ExprKind::Implies {
            premise: Box::new(premise),
            conclusion: Box::new(conclusion),
        })
    }

    pub fn index(array: impl Into<String>, index: Expr) -> Self {
        Self::new(ExprKind::Index {
            array: ident(array),
            index: Box::new(index),
        })
    }

    pub fn length(array: impl Into<String>) -> Self {
        Self::new(ExprKind::Length { array: ident(array) })
    }

    pub fn string_op(op: StringOp, receiver: Expr, args: Vec<Expr>, comparison: Option<StringComparison>) -> Self {
        Self::new(ExprKind::StringOp {
            op,
            receiver: Box::new(receiver),
            args,
            comparison,
        })
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: ident(callee),
            args,
        })
    }
}

fn make_binders(binders: &[(&str, &str)]) -> Vec<QuantBinder> {
    binders
        .iter()
        .map(|(name, ty)| QuantBinder {
            span: no_span(),
            name: ident(*name),
            ty: ty.to_string(),
        })
        .collect()
}

/// Source-like rendering, used to name sub-expressions in diagnostics.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(id) => write!(f, "{}", id.node),
            ExprKind::IntLit(n) => write!(f, "{n}"),
            ExprKind::FloatLit(x) => write!(f, "{x:?}"),
            ExprKind::BoolLit(b) => write!(f, "{b}"),
            ExprKind::StringLit(s) => write!(f, "{s:?}"),
            ExprKind::Unary { op, expr } => {
                write!(f, "{}", op.symbol())?;
                write_operand(f, expr)
            }
            ExprKind::Binary { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                write_operand(f, cond)?;
                write!(f, " ? ")?;
                write_operand(f, then_expr)?;
                write!(f, " : ")?;
                write_operand(f, else_expr)
            }
            ExprKind::ForAll { binders, body } => write_quantifier(f, "forall", binders, body),
            ExprKind::Exists { binders, body } => write_quantifier(f, "exists", binders, body),
            ExprKind::Implies { premise, conclusion } => {
                write_operand(f, premise)?;
                write!(f, " ==> ")?;
                write_operand(f, conclusion)
            }
            ExprKind::Index { array, index } => write!(f, "{}[{index}]", array.node),
            ExprKind::Length { array } => write!(f, "{}.Length", array.node),
            ExprKind::StringOp {
                op,
                receiver,
                args,
                comparison,
            } => {
                let mut rendered: Vec<String> = Vec::new();
                if op.is_static() {
                    rendered.push(receiver.to_string());
                }
                rendered.extend(args.iter().map(|a| a.to_string()));
                if let Some(cmp) = comparison {
                    rendered.push(format!("StringComparison.{}", cmp.name()));
                }
                let joined = rendered.join(", ");
                if op.is_static() {
                    write!(f, "string.{}({joined})", op.name())
                } else if *op == StringOp::Length {
                    write_operand(f, receiver)?;
                    write!(f, ".Length")
                } else {
                    write_operand(f, receiver)?;
                    write!(f, ".{}({joined})", op.name())
                }
            }
            ExprKind::Call { callee, args } => {
                let joined = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "{}({joined})", callee.node)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match &expr.kind {
        ExprKind::Binary { .. }
        | ExprKind::Conditional { .. }
        | ExprKind::Implies { .. }
        | ExprKind::ForAll { .. }
        | ExprKind::Exists { .. } => write!(f, "({expr})"),
        _ => write!(f, "{expr}"),
    }
}

fn write_quantifier(f: &mut fmt::Formatter<'_>, kw: &str, binders: &[QuantBinder], body: &Expr) -> fmt::Result {
    let bs = binders
        .iter()
        .map(|b| format!("{}: {}", b.name.node, b.ty))
        .collect::<Vec<_>>()
        .join(", ");
    write!(f, "{kw} {bs} :: {body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_binary_with_parens() {
        let e = Expr::binary(
            Expr::binary(Expr::ident("a"), BinOp::Add, Expr::ident("b")),
            BinOp::Gt,
            Expr::ident("a"),
        );
        assert_eq!(e.to_string(), "(a + b) > a");
    }

    #[test]
    fn renders_quantifier_and_implication() {
        let body = Expr::implies(
            Expr::binary(Expr::ident("i"), BinOp::Ge, Expr::int(0)),
            Expr::binary(Expr::index("xs", Expr::ident("i")), BinOp::Ne, Expr::int(-1)),
        );
        let e = Expr::forall(&[("i", "int")], body);
        assert_eq!(e.to_string(), "forall i: int :: (i >= 0) ==> (xs[i] != -1)");
    }

    #[test]
    fn renders_string_ops_with_comparison_mode() {
        let e = Expr::string_op(
            StringOp::StartsWith,
            Expr::ident("name"),
            vec![Expr::string("ab")],
            Some(StringComparison::OrdinalIgnoreCase),
        );
        assert_eq!(e.to_string(), "name.StartsWith(\"ab\", StringComparison.OrdinalIgnoreCase)");

        let e = Expr::string_op(StringOp::IsNullOrEmpty, Expr::ident("s"), vec![], None);
        assert_eq!(e.to_string(), "string.IsNullOrEmpty(s)");

        let e = Expr::string_op(StringOp::Length, Expr::ident("s"), vec![], None);
        assert_eq!(e.to_string(), "s.Length");
    }

    #[test]
    fn contract_keeps_user_message() {
        let c = Contract::new(Expr::bool(true)).with_message("must hold");
        assert_eq!(c.message.as_deref(), Some("must hold"));
    }

    #[test]
    fn spanned_map_preserves_span() {
        let s = Spanned::new(span(3, 4), 7u32).map(|n| n * 2);
        assert_eq!(s.node, 14);
        assert_eq!(s.span, span(3, 4));
    }
}
