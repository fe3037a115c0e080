#![forbid(unsafe_code)]

//! Width normalization and signed/unsigned primitive selection.
//!
//! Everything here is solver-independent: the translator asks for a plan and
//! applies it to its terms.

use crate::types::BvInfo;

/// How one operand is widened to the common width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    None,
    Sign(u32),
    Zero(u32),
}

impl Extension {
    /// Extend `info` up to `target` bits, sign- or zero-filling per its signedness.
    pub fn to_width(info: BvInfo, target: u32) -> Self {
        match target.saturating_sub(info.width) {
            0 => Extension::None,
            extra if info.signed => Extension::Sign(extra),
            extra => Extension::Zero(extra),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Normalization {
    pub width: u32,
    pub left: Extension,
    pub right: Extension,
}

pub fn plan_normalization(left: BvInfo, right: BvInfo) -> Normalization {
    let width = left.width.max(right.width);
    Normalization {
        width,
        left: Extension::to_width(left, width),
        right: Extension::to_width(right, width),
    }
}

/// Result of `+ - *` and bitwise ops: unsigned only when both operands are.
pub fn arithmetic_result(left: BvInfo, right: BvInfo) -> BvInfo {
    BvInfo {
        width: left.width.max(right.width),
        signed: left.signed || right.signed,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareMode {
    Signed,
    Unsigned,
}

impl CompareMode {
    pub fn is_signed(self) -> bool {
        self == CompareMode::Signed
    }
}

/// One operand of a division, modulo or relational comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operand {
    pub info: BvInfo,
    /// Raw bits when the operand is a numeral, at its own (pre-normalization) width.
    pub literal: Option<u64>,
}

/// Pick the signed or unsigned solver primitive.
///
/// Both signed: signed. Both unsigned: unsigned. Mixed: unsigned only if the
/// signed side is a literal that is non-negative at its width, otherwise signed.
pub fn choose_compare_mode(left: Operand, right: Operand) -> CompareMode {
    match (left.info.signed, right.info.signed) {
        (true, true) => CompareMode::Signed,
        (false, false) => CompareMode::Unsigned,
        (true, false) => mixed_mode(left),
        (false, true) => mixed_mode(right),
    }
}

fn mixed_mode(signed_side: Operand) -> CompareMode {
    match signed_side.literal {
        Some(bits) if literal_is_non_negative(bits, signed_side.info.width) => CompareMode::Unsigned,
        _ => CompareMode::Signed,
    }
}

pub fn literal_is_non_negative(bits: u64, width: u32) -> bool {
    if width == 0 || width > 64 {
        return false;
    }
    (bits >> (width - 1)) & 1 == 0
}

/// Widen an array index to the 64-bit index domain.
pub fn index_extension(info: BvInfo) -> Extension {
    Extension::to_width(info, BvInfo::INDEX.width)
}

/// Interpret `bits` (the low `width` bits of a model value) per `info`.
pub fn bits_to_decimal(bits: u64, info: BvInfo) -> String {
    let width = info.width.clamp(1, 64);
    let masked = if width == 64 { bits } else { bits & ((1u64 << width) - 1) };
    if info.signed && !literal_is_non_negative(masked, width) {
        let value = if width == 64 {
            masked as i64 as i128
        } else {
            masked as i128 - (1i128 << width)
        };
        value.to_string()
    } else {
        masked.to_string()
    }
}
