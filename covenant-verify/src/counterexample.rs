// Counterexample: solver model -> typed, source-level assignments.
//
// Every declared symbol appears in the report, including ones whose model
// evaluation failed. Bindings are sorted by name so output is deterministic.

use std::fmt;

use crate::types::SmtType;
use crate::width::bits_to_decimal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterexampleBinding {
    pub name: String,
    /// Type name as the caller declared it (`int`, `ulong`, `i32[]`, ...).
    pub type_name: String,
    /// Rendered value, or why the model could not produce one.
    pub value: Result<String, String>,
}

impl CounterexampleBinding {
    pub fn evaluated(name: impl Into<String>, type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: Ok(value.into()),
        }
    }

    pub fn failed(name: impl Into<String>, type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: Err(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.value.is_err()
    }
}

impl fmt::Display for CounterexampleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Ok(v) => write!(f, "{} = {v}", self.name),
            Err(reason) => write!(f, "{} = <evaluation failed: {reason}>", self.name),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counterexample {
    bindings: Vec<CounterexampleBinding>,
}

impl Counterexample {
    pub fn new(mut bindings: Vec<CounterexampleBinding>) -> Self {
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        Self { bindings }
    }

    pub fn bindings(&self) -> &[CounterexampleBinding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&CounterexampleBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Rendered value of `name`, if it evaluated.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|b| b.value.as_deref().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Multi-line form for the explain panel: `name : type = value`.
    pub fn display_table(&self) -> String {
        self.bindings
            .iter()
            .map(|b| match &b.value {
                Ok(v) => format!("{} : {} = {v}", b.name, b.type_name),
                Err(reason) => format!("{} : {} = <evaluation failed: {reason}>", b.name, b.type_name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .bindings
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{joined}")
    }
}

/// Render a bit-vector model value given its raw bits.
pub fn render_bits(bits: u64, ty: SmtType) -> String {
    match ty {
        SmtType::BitVec(info) => bits_to_decimal(bits, info),
        _ => bits.to_string(),
    }
}

pub fn render_bool(value: bool) -> String {
    value.to_string()
}

pub fn render_string(value: &str) -> String {
    format!("{value:?}")
}
