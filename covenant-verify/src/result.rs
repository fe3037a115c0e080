#![forbid(unsafe_code)]

use std::fmt;
use std::time::Duration;

use covenant_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

use crate::counterexample::Counterexample;
use crate::diagnose::Unsupported;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Logically true within the modeled theories.
    Proven,
    /// Logically false; see the counterexample or message.
    Disproven,
    /// Timeout, `unknown`, or a solver fault.
    Unproven,
    /// Not expressible in the modeled theories.
    Unsupported,
}

impl VerificationStatus {
    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Proven => "proven",
            VerificationStatus::Disproven => "disproven",
            VerificationStatus::Unproven => "unproven",
            VerificationStatus::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one verification call. Advisory only: the runtime check is
/// emitted whatever the status is.
#[derive(Clone, Debug)]
pub struct VerificationResult {
    status: VerificationStatus,
    message: Option<String>,
    counterexample: Option<Counterexample>,
    diagnostic: Option<Unsupported>,
    user_message: Option<String>,
    warnings: Vec<String>,
    duration: Duration,
}

impl VerificationResult {
    pub(crate) fn new(status: VerificationStatus, message: Option<String>, warnings: Vec<String>, duration: Duration) -> Self {
        Self {
            status,
            message,
            counterexample: None,
            diagnostic: None,
            user_message: None,
            warnings,
            duration,
        }
    }

    pub(crate) fn unsupported(diagnostic: Unsupported, warnings: Vec<String>, duration: Duration) -> Self {
        Self {
            status: VerificationStatus::Unsupported,
            message: Some(diagnostic.to_string()),
            counterexample: None,
            diagnostic: Some(diagnostic),
            user_message: None,
            warnings,
            duration,
        }
    }

    pub(crate) fn disproven_with(
        counterexample: Counterexample,
        message: Option<String>,
        warnings: Vec<String>,
        duration: Duration,
    ) -> Self {
        Self {
            status: VerificationStatus::Disproven,
            message,
            counterexample: Some(counterexample),
            diagnostic: None,
            user_message: None,
            warnings,
            duration,
        }
    }

    pub(crate) fn with_user_message(mut self, message: Option<&str>) -> Self {
        self.user_message = message.map(str::to_string);
        self
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn is_proven(&self) -> bool {
        self.status == VerificationStatus::Proven
    }

    /// Explanation, diagnostic, or raw solver error text.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn counterexample(&self) -> Option<&Counterexample> {
        self.counterexample.as_ref()
    }

    /// Why the contract could not be translated, with the offending node's span.
    pub fn diagnostic(&self) -> Option<&Unsupported> {
        self.diagnostic.as_ref()
    }

    /// Failure message attached to the contract in source, untouched.
    pub fn user_message(&self) -> Option<&str> {
        self.user_message.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `disproven (4ms): counterexample a = 0, b = 0`
    pub fn summary_line(&self) -> String {
        let mut line = format!("{} ({}ms)", self.status, self.duration.as_millis());
        if let Some(cex) = &self.counterexample {
            line.push_str(&format!(": counterexample {cex}"));
        } else if let Some(msg) = &self.message {
            line.push_str(&format!(": {msg}"));
        }
        if !self.warnings.is_empty() {
            line.push_str(&format!(" [{} warning(s)]", self.warnings.len()));
        }
        line
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractKind {
    Requires,
    Ensures,
}

impl ContractKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ContractKind::Requires => "requires",
            ContractKind::Ensures => "ensures",
        }
    }
}

/// One checked clause of one function.
#[derive(Clone, Debug)]
pub struct ContractReport {
    pub function: String,
    pub kind: ContractKind,
    /// 1-based position among clauses of the same kind.
    pub index: usize,
    pub span: Span,
    pub result: VerificationResult,
}

impl ContractReport {
    /// `requires #1 of clamp: proven (3ms)`
    pub fn line(&self) -> String {
        let mut line = format!(
            "{} #{} of {}: {}",
            self.kind.keyword(),
            self.index,
            self.function,
            self.result.summary_line()
        );
        if let Some(user) = self.result.user_message() {
            line.push_str(&format!(" -- \"{user}\""));
        }
        line
    }

    pub fn to_diagnostic(&self) -> ContractDiagnostic {
        let mut help: Vec<String> = Vec::new();
        if let Some(msg) = self.result.message() {
            help.push(msg.to_string());
        }
        if let Some(cex) = self.result.counterexample() {
            help.push(format!("counterexample: {cex}"));
        }
        for w in self.result.warnings() {
            help.push(format!("warning: {w}"));
        }
        let span = self.result.diagnostic().map_or(self.span, |d| d.span);
        ContractDiagnostic {
            message: format!(
                "{} #{} of `{}` is {}",
                self.kind.keyword(),
                self.index,
                self.function,
                self.result.status()
            ),
            span,
            help: (!help.is_empty()).then(|| help.join("\n")),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(covenant::verify::contract), severity(Advice))]
#[allow(unused_assignments)]
pub struct ContractDiagnostic {
    pub message: String,
    #[label]
    pub span: Span,
    #[help]
    pub help: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counterexample::CounterexampleBinding;

    fn sample_disproven() -> VerificationResult {
        VerificationResult::disproven_with(
            Counterexample::new(vec![
                CounterexampleBinding::evaluated("a", "int", "0"),
                CounterexampleBinding::evaluated("b", "int", "0"),
            ]),
            None,
            vec!["comparison mode ignored".to_string()],
            Duration::from_millis(4),
        )
    }

    #[test]
    fn summary_line_prefers_counterexample() {
        let r = sample_disproven();
        assert_eq!(r.summary_line(), "disproven (4ms): counterexample a = 0, b = 0 [1 warning(s)]");
    }

    #[test]
    fn summary_line_falls_back_to_message() {
        let r = VerificationResult::new(
            VerificationStatus::Disproven,
            Some("precondition is never satisfiable.".to_string()),
            Vec::new(),
            Duration::from_millis(1),
        );
        assert_eq!(r.summary_line(), "disproven (1ms): precondition is never satisfiable.");
        assert!(r.counterexample().is_none());
    }

    #[test]
    fn report_line_carries_user_message_verbatim() {
        let report = ContractReport {
            function: "add".to_string(),
            kind: ContractKind::Ensures,
            index: 1,
            span: covenant_ast::no_span(),
            result: sample_disproven().with_user_message(Some("sum must grow")),
        };
        let line = report.line();
        assert!(line.starts_with("ensures #1 of add: disproven"), "{line}");
        assert!(line.ends_with("-- \"sum must grow\""), "{line}");

        let diag = report.to_diagnostic();
        assert_eq!(diag.message, "ensures #1 of `add` is disproven");
        let help = diag.help.expect("help");
        assert!(help.contains("counterexample: a = 0, b = 0"));
        assert!(help.contains("warning: comparison mode ignored"));
    }

    #[test]
    fn contract_diagnostic_labels_the_clause_and_is_advice() {
        let report = ContractReport {
            function: "clamp".to_string(),
            kind: ContractKind::Requires,
            index: 2,
            span: covenant_ast::span(10, 6),
            result: sample_disproven(),
        };
        let diag = report.to_diagnostic();
        assert_eq!(diag.severity(), Some(miette::Severity::Advice));
        assert_eq!(diag.code().map(|c| c.to_string()).as_deref(), Some("covenant::verify::contract"));

        let labels: Vec<_> = diag.labels().expect("labels").collect();
        assert_eq!(labels.len(), 1);
        assert_eq!((labels[0].offset(), labels[0].len()), (10, 6));
    }
}
