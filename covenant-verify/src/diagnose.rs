#![forbid(unsafe_code)]

//! Why an expression has no SMT term.
//!
//! The translator returns these directly, so there is one dispatch table for
//! both building terms and explaining their absence.

use covenant_ast::{Expr, Span};
use miette::Diagnostic;
use thiserror::Error;

use crate::types::UnsupportedType;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Reason {
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("`{op}` expects {expected} operands, found {found}")]
    OperandKind {
        op: String,
        expected: &'static str,
        found: String,
    },

    #[error("`{op}` expects {expected} argument(s), found {found}")]
    Arity {
        op: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{0} literals are not supported")]
    Literal(&'static str),

    #[error("string operation `{0}` is not modeled by the ordinal string theory")]
    StringOperation(String),

    #[error("calls to `{0}` cannot be verified")]
    Call(String),

    #[error("{0} ({reason})", reason = .0.reason())]
    Type(UnsupportedType),

    #[error("quantifiers are disabled under SMT profile {0}")]
    QuantifiersDisabled(String),

    #[error("too many quantifier binders ({found}, max {max})")]
    TooManyBinders { found: usize, max: usize },

    #[error("cannot quantify over array `{0}`")]
    ArrayBinder(String),

    #[error("`{0}` is already declared")]
    Duplicate(String),

    #[error("`{name}` is a {kind}, not an array")]
    NotAnArray { name: String, kind: &'static str },

    #[error("solver rejected the term: {0}")]
    Solver(String),
}

/// The first concrete reason a sub-expression could not be translated.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("cannot verify `{node}`: {reason}")]
#[diagnostic(code(covenant::verify::unsupported))]
#[allow(unused_assignments)]
pub struct Unsupported {
    pub reason: Reason,
    /// Source-like rendering of the offending node.
    pub node: String,
    #[label]
    pub span: Span,
}

impl Unsupported {
    pub fn new(reason: Reason, expr: &Expr) -> Self {
        Self {
            reason,
            node: expr.to_string(),
            span: expr.span,
        }
    }

    pub fn at(reason: Reason, node: impl Into<String>, span: Span) -> Self {
        Self {
            reason,
            node: node.into(),
            span,
        }
    }

    pub fn parameter(name: &str, type_name: &str, span: Span, source: UnsupportedType) -> Self {
        Self::at(Reason::Type(source), format!("parameter {name}: {type_name}"), span)
    }

    pub fn operand_kind(op: &str, expected: &'static str, found: &str, expr: &Expr) -> Self {
        Self::new(
            Reason::OperandKind {
                op: op.to_string(),
                expected,
                found: found.to_string(),
            },
            expr,
        )
    }
}

#[cfg(feature = "z3")]
impl<'ctx> crate::translate::Translator<'ctx> {
    /// Explain why `expr` does not translate.
    ///
    /// Runs the checked translation against a copy of the symbol table; any
    /// declaration or warning produced while explaining is discarded, including
    /// arrays declared globally from inside a quantifier.
    pub fn diagnose(&mut self, expr: &Expr) -> Option<Unsupported> {
        let warnings = self.warnings().len();
        let saved = self.symbols().clone();
        let outcome = self.translate_checked(expr);
        *self.symbols_mut() = saved;
        self.truncate_warnings(warnings);
        outcome.err()
    }
}
