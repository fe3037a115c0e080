#![forbid(unsafe_code)]

//! Type/width registry: maps source type names onto the sorts the verifier models.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Width and signedness of a fixed-width machine integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BvInfo {
    pub width: u32,
    pub signed: bool,
}

impl BvInfo {
    pub const fn signed(width: u32) -> Self {
        Self { width, signed: true }
    }

    pub const fn unsigned(width: u32) -> Self {
        Self { width, signed: false }
    }

    /// Default for integer literals and untracked bit-vectors.
    pub const I32: BvInfo = BvInfo::signed(32);
    /// Companion `$length` symbols of arrays.
    pub const U32: BvInfo = BvInfo::unsigned(32);
    /// Array index domain.
    pub const INDEX: BvInfo = BvInfo::unsigned(64);
}

impl fmt::Display for BvInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.width)
    }
}

/// The semantic kind of a declared symbol or constructed term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SmtType {
    BitVec(BvInfo),
    Bool,
    String,
    Array { elem: BvInfo },
}

impl SmtType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SmtType::BitVec(_) => "integer",
            SmtType::Bool => "bool",
            SmtType::String => "string",
            SmtType::Array { .. } => "array",
        }
    }

    pub fn bv_info(&self) -> Option<BvInfo> {
        match self {
            SmtType::BitVec(info) => Some(*info),
            _ => None,
        }
    }
}

impl fmt::Display for SmtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtType::BitVec(info) => write!(f, "{info}"),
            SmtType::Bool => write!(f, "bool"),
            SmtType::String => write!(f, "string"),
            SmtType::Array { elem } => write!(f, "{elem}[]"),
        }
    }
}

/// Why a type name has no model. Each variant has its own stable reason string.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum UnsupportedType {
    #[error("floating-point type `{0}` is not supported")]
    #[diagnostic(code(covenant::verify::float_type))]
    FloatingPoint(String),

    #[error("dynamic type `{0}` has no SMT model")]
    #[diagnostic(code(covenant::verify::dynamic_type))]
    Dynamic(String),

    #[error("function-typed `{0}` cannot be verified")]
    #[diagnostic(code(covenant::verify::delegate_type))]
    Delegate(String),

    #[error("array `{name}` has element type `{elem}`; only integer elements are modeled")]
    #[diagnostic(code(covenant::verify::array_element_type))]
    ArrayElement { name: String, elem: String },

    #[error("unknown type `{0}`")]
    #[diagnostic(code(covenant::verify::unknown_type))]
    Unknown(String),
}

impl UnsupportedType {
    /// Short, distinguishable cause used in reports and tests.
    pub fn reason(&self) -> &'static str {
        match self {
            UnsupportedType::FloatingPoint(_) => "floating-point not supported",
            UnsupportedType::Dynamic(_) => "dynamic/object types not supported",
            UnsupportedType::Delegate(_) => "function/delegate types not supported",
            UnsupportedType::ArrayElement { .. } => "array element type not supported",
            UnsupportedType::Unknown(_) => "unrecognized type",
        }
    }
}

const FLOAT_NAMES: &[&str] = &["f16", "f32", "f64", "float", "double", "decimal", "single", "half"];
const DYNAMIC_NAMES: &[&str] = &["object", "dynamic", "any"];

/// Resolve a source type name (case-insensitive, with aliases) to its modeled sort.
pub fn resolve_type(name: &str) -> Result<SmtType, UnsupportedType> {
    let trimmed = name.trim();
    if let Some(elem_name) = trimmed.strip_suffix("[]") {
        return match resolve_scalar(elem_name.trim(), trimmed)? {
            SmtType::BitVec(elem) => Ok(SmtType::Array { elem }),
            _ => Err(UnsupportedType::ArrayElement {
                name: trimmed.to_string(),
                elem: elem_name.trim().to_string(),
            }),
        };
    }
    resolve_scalar(trimmed, trimmed)
}

fn resolve_scalar(name: &str, full: &str) -> Result<SmtType, UnsupportedType> {
    let lower = name.to_ascii_lowercase();
    let key = lower.strip_prefix("system.").unwrap_or(&lower);

    let bv = |width, signed| Ok(SmtType::BitVec(BvInfo { width, signed }));
    match key {
        "i8" | "sbyte" => bv(8, true),
        "i16" | "short" | "int16" => bv(16, true),
        "i32" | "int" | "int32" => bv(32, true),
        "i64" | "long" | "int64" => bv(64, true),
        "u8" | "byte" => bv(8, false),
        "u16" | "ushort" | "uint16" => bv(16, false),
        "u32" | "uint" | "uint32" => bv(32, false),
        "u64" | "ulong" | "uint64" => bv(64, false),
        "bool" | "boolean" => Ok(SmtType::Bool),
        "string" | "str" => Ok(SmtType::String),
        k if FLOAT_NAMES.contains(&k) => Err(UnsupportedType::FloatingPoint(full.to_string())),
        k if DYNAMIC_NAMES.contains(&k) => Err(UnsupportedType::Dynamic(full.to_string())),
        k if is_function_shaped(k) => Err(UnsupportedType::Delegate(full.to_string())),
        k if k.ends_with("[]") => Err(UnsupportedType::ArrayElement {
            name: full.to_string(),
            elem: name.to_string(),
        }),
        _ => Err(UnsupportedType::Unknown(full.to_string())),
    }
}

fn is_function_shaped(name: &str) -> bool {
    name.starts_with("func<")
        || name.starts_with("action")
        || name.starts_with("predicate<")
        || name.starts_with("fn(")
        || name.starts_with("delegate")
        || name.contains("=>")
        || name.contains("->")
}
