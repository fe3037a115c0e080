#![forbid(unsafe_code)]

//! Verification entry points.
//!
//! Each call builds a fresh translator and solver session, runs exactly one
//! bounded satisfiability check, and never returns an error: every outcome,
//! including a solver fault, is a `VerificationResult`.

use std::time::Instant;

use covenant_ast::{Contract, Expr, FnContracts, Param};
use tracing::info;

use crate::config::VerifyOptions;
use crate::result::{ContractKind, ContractReport, VerificationResult};

/// Inputs of one postcondition check.
#[derive(Clone, Copy, Debug)]
pub struct PostconditionQuery<'a> {
    pub params: &'a [Param],
    /// Declares a `result` symbol of this type when present.
    pub output_type: Option<&'a str>,
    pub preconditions: &'a [Contract],
    pub postcondition: &'a Contract,
    /// Assumed `result == value` when the caller can express the body symbolically.
    pub result_value: Option<&'a Expr>,
}

impl<'a> PostconditionQuery<'a> {
    pub fn new(params: &'a [Param], output_type: Option<&'a str>, postcondition: &'a Contract) -> Self {
        Self {
            params,
            output_type,
            preconditions: &[],
            postcondition,
            result_value: None,
        }
    }

    pub fn with_preconditions(mut self, preconditions: &'a [Contract]) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_result_value(mut self, value: &'a Expr) -> Self {
        self.result_value = Some(value);
        self
    }
}

/// Name of the synthetic symbol standing for a function's return value.
pub const RESULT_SYMBOL: &str = "result";

#[derive(Clone, Debug, Default)]
pub struct VerificationEngine {
    options: VerifyOptions,
}

impl VerificationEngine {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Is there at least one input satisfying `precondition`?
    pub fn verify_precondition(&self, params: &[Param], precondition: &Contract) -> VerificationResult {
        let started = Instant::now();
        let result = self
            .precondition_impl(params, precondition, started)
            .with_user_message(precondition.message.as_deref());
        info!(
            kind = "requires",
            status = %result.status(),
            elapsed_ms = result.duration().as_millis() as u64,
            "precondition checked"
        );
        result
    }

    /// Does the postcondition hold for every input satisfying the preconditions?
    pub fn verify_postcondition(&self, query: &PostconditionQuery<'_>) -> VerificationResult {
        let started = Instant::now();
        let result = self
            .postcondition_impl(query, started)
            .with_user_message(query.postcondition.message.as_deref());
        info!(
            kind = "ensures",
            status = %result.status(),
            elapsed_ms = result.duration().as_millis() as u64,
            "postcondition checked"
        );
        result
    }

    /// Check every clause of `f`: each `requires` alone for satisfiability,
    /// each `ensures` under all of the `requires`.
    pub fn verify_function(&self, f: &FnContracts) -> Vec<ContractReport> {
        let mut reports = Vec::with_capacity(f.requires.len() + f.ensures.len());

        for (i, pre) in f.requires.iter().enumerate() {
            reports.push(ContractReport {
                function: f.name.node.clone(),
                kind: ContractKind::Requires,
                index: i + 1,
                span: pre.span,
                result: self.verify_precondition(&f.params, pre),
            });
        }

        for (i, post) in f.ensures.iter().enumerate() {
            let query = PostconditionQuery {
                params: &f.params,
                output_type: f.output_type.as_deref(),
                preconditions: &f.requires,
                postcondition: post,
                result_value: f.result_value.as_ref(),
            };
            reports.push(ContractReport {
                function: f.name.node.clone(),
                kind: ContractKind::Ensures,
                index: i + 1,
                span: post.span,
                result: self.verify_postcondition(&query),
            });
        }

        reports
    }
}

#[cfg(not(feature = "z3"))]
impl VerificationEngine {
    fn precondition_impl(&self, _params: &[Param], _pre: &Contract, started: Instant) -> VerificationResult {
        no_z3(started)
    }

    fn postcondition_impl(&self, _query: &PostconditionQuery<'_>, started: Instant) -> VerificationResult {
        no_z3(started)
    }
}

#[cfg(not(feature = "z3"))]
fn no_z3(started: Instant) -> VerificationResult {
    VerificationResult::new(
        crate::result::VerificationStatus::Unproven,
        Some(crate::solver::NO_Z3_MESSAGE.to_string()),
        Vec::new(),
        started.elapsed(),
    )
}

#[cfg(feature = "z3")]
mod z3_backend {
    use std::any::Any;
    use std::panic::{self, AssertUnwindSafe};
    use std::time::{Duration, Instant};

    use covenant_ast::{BinOp, Contract, Expr, Param};
    use tracing::{debug, warn};
    use z3::Model;

    use super::{PostconditionQuery, VerificationEngine, RESULT_SYMBOL};
    use crate::counterexample::{render_bits, render_bool, render_string, Counterexample, CounterexampleBinding};
    use crate::diagnose::Unsupported;
    use crate::result::{VerificationResult, VerificationStatus};
    use crate::scope::Binding;
    use crate::solver::z3_session::{self, Verdict};
    use crate::translate::{Term, Translator};

    const NEVER_SATISFIABLE: &str = "precondition is never satisfiable.";

    impl VerificationEngine {
        pub(super) fn precondition_impl(&self, params: &[Param], pre: &Contract, started: Instant) -> VerificationResult {
            guarded(started, || {
                let ctx = z3_session::new_context();
                let mut tr = Translator::new(&ctx, &self.options);

                let goal = match declare_params(&mut tr, params).and_then(|()| tr.translate_bool(&pre.expr)) {
                    Ok(goal) => goal,
                    Err(e) => return VerificationResult::unsupported(e, tr.take_warnings(), started.elapsed()),
                };

                let solver = z3_session::bounded_solver(&ctx, &self.options);
                solver.assert(&goal);
                debug!(
                    timeout_ms = self.options.effective_timeout_ms(),
                    assertions = 1,
                    "checking precondition satisfiability"
                );

                let (status, message) = match z3_session::check(&solver) {
                    Verdict::Sat(_) => (VerificationStatus::Proven, None),
                    Verdict::Unsat => (VerificationStatus::Disproven, Some(NEVER_SATISFIABLE.to_string())),
                    Verdict::Unknown(reason) => return unknown_result(&reason, tr.take_warnings(), started.elapsed()),
                };
                VerificationResult::new(status, message, tr.take_warnings(), started.elapsed())
            })
        }

        pub(super) fn postcondition_impl(&self, query: &PostconditionQuery<'_>, started: Instant) -> VerificationResult {
            guarded(started, || {
                let ctx = z3_session::new_context();
                let mut tr = Translator::new(&ctx, &self.options);

                let assumptions = match build_assumptions(&mut tr, query) {
                    Ok(a) => a,
                    Err(e) => return VerificationResult::unsupported(e, tr.take_warnings(), started.elapsed()),
                };
                let goal = match tr.translate_bool(&query.postcondition.expr) {
                    Ok(g) => g,
                    Err(e) => return VerificationResult::unsupported(e, tr.take_warnings(), started.elapsed()),
                };

                let solver = z3_session::bounded_solver(&ctx, &self.options);
                for a in &assumptions {
                    solver.assert(a);
                }
                solver.assert(&goal.not());
                debug!(
                    timeout_ms = self.options.effective_timeout_ms(),
                    assertions = assumptions.len() + 1,
                    "searching for a postcondition counterexample"
                );

                match z3_session::check(&solver) {
                    Verdict::Unsat => {
                        VerificationResult::new(VerificationStatus::Proven, None, tr.take_warnings(), started.elapsed())
                    }
                    Verdict::Sat(model) => {
                        let cex = counterexample(&tr, model.as_ref());
                        VerificationResult::disproven_with(cex, None, tr.take_warnings(), started.elapsed())
                    }
                    Verdict::Unknown(reason) => unknown_result(&reason, tr.take_warnings(), started.elapsed()),
                }
            })
        }
    }

    fn declare_params(tr: &mut Translator<'_>, params: &[Param]) -> Result<(), Unsupported> {
        for p in params {
            tr.try_declare(&p.name.node, &p.ty, p.span)?;
        }
        Ok(())
    }

    /// Parameters, `result`, its binding, and every precondition, in that order.
    fn build_assumptions<'ctx>(
        tr: &mut Translator<'ctx>,
        query: &PostconditionQuery<'_>,
    ) -> Result<Vec<z3::ast::Bool<'ctx>>, Unsupported> {
        declare_params(tr, query.params)?;
        if let Some(ty) = query.output_type {
            tr.try_declare(RESULT_SYMBOL, ty, query.postcondition.span)?;
        }

        let mut out = Vec::with_capacity(query.preconditions.len() + 1);
        if let Some(value) = query.result_value {
            let binding = Expr::binary(Expr::ident(RESULT_SYMBOL).at(value.span), BinOp::Eq, value.clone()).at(value.span);
            out.push(tr.translate_bool(&binding)?);
        }
        for pre in query.preconditions {
            out.push(tr.translate_bool(&pre.expr)?);
        }
        Ok(out)
    }

    /// Timeouts and incomplete theories are never treated as a verdict.
    fn unknown_result(reason: &str, warnings: Vec<String>, elapsed: Duration) -> VerificationResult {
        debug!(reason, "solver returned unknown");
        VerificationResult::new(
            VerificationStatus::Unproven,
            Some(format!("solver returned unknown: {reason}")),
            warnings,
            elapsed,
        )
    }

    /// Every declared symbol, including array length companions.
    fn counterexample<'ctx>(tr: &Translator<'ctx>, model: Option<&Model<'ctx>>) -> Counterexample {
        let bindings = tr
            .symbols()
            .iter()
            .map(|(name, binding)| {
                let value = match model {
                    Some(m) => evaluate(m, binding),
                    None => Err("solver produced no model".to_string()),
                };
                CounterexampleBinding {
                    name: name.clone(),
                    type_name: binding.type_name.clone(),
                    value,
                }
            })
            .collect();
        Counterexample::new(bindings)
    }

    fn evaluate<'ctx>(model: &Model<'ctx>, binding: &Binding<Term<'ctx>>) -> Result<String, String> {
        let missing = || "model has no value".to_string();
        match &binding.term {
            Term::BitVec(v) => {
                let val = model.eval(v, true).ok_or_else(missing)?;
                Ok(match val.as_u64() {
                    Some(bits) => render_bits(bits, binding.ty),
                    None => val.to_string(),
                })
            }
            Term::Bool(b) => {
                let val = model.eval(b, true).ok_or_else(missing)?;
                val.as_bool()
                    .map(render_bool)
                    .ok_or_else(|| format!("not a boolean constant: {val}"))
            }
            Term::Str(s) => {
                let val = model.eval(s, true).ok_or_else(missing)?;
                val.as_string()
                    .map(|text| render_string(&text))
                    .ok_or_else(|| format!("not a string constant: {val}"))
            }
            Term::Array(a) => model.eval(a, true).map(|v| v.to_string()).ok_or_else(missing),
        }
    }

    /// Z3 faults surface as panics in the bindings; they become `Unproven`.
    fn guarded(started: Instant, check: impl FnOnce() -> VerificationResult) -> VerificationResult {
        match panic::catch_unwind(AssertUnwindSafe(check)) {
            Ok(result) => result,
            Err(payload) => {
                let text = panic_text(payload.as_ref());
                warn!(error = %text, "solver fault");
                VerificationResult::new(
                    VerificationStatus::Unproven,
                    Some(format!("solver error: {text}")),
                    Vec::new(),
                    started.elapsed(),
                )
            }
        }
    }

    fn panic_text(payload: &(dyn Any + Send)) -> String {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown solver failure".to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn panics_become_unproven_with_their_text() {
            let r = guarded(Instant::now(), || panic!("Z3 error: invalid argument"));
            assert_eq!(r.status(), VerificationStatus::Unproven);
            assert_eq!(r.message(), Some("solver error: Z3 error: invalid argument"));
        }

        #[test]
        fn unknown_verdict_is_unproven_and_keeps_the_reason() {
            let r = unknown_result("timeout", vec!["ordinal fallback".to_string()], Duration::from_millis(3));
            assert_eq!(r.status(), VerificationStatus::Unproven);
            assert_eq!(r.message(), Some("solver returned unknown: timeout"));
            assert_eq!(r.warnings().len(), 1);
            assert!(r.counterexample().is_none());
        }
    }
}
