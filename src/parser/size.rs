//! Human-readable file size parsing.
//!
//! A size is a decimal significand followed by an optional unit:
//! `1`, `1b`, `5kb`, `5 KB`, `1kib`, `5.5k`, `2 GiB`.
//!
//! Unit table (case-insensitive):
//!
//! | Unit            | Factor  |
//! |-----------------|---------|
//! | *(none)*, `b`   | 1       |
//! | `k`, `kb`       | 1000    |
//! | `ki`, `kib`     | 1024    |
//! | `m`, `mb`       | 1000^2  |
//! | `mi`, `mib`     | 1024^2  |
//! | `g`, `gb`       | 1000^3  |
//! | `gi`, `gib`     | 1024^3  |
//! | `t`, `tb`       | 1000^4  |
//! | `ti`, `tib`     | 1024^4  |
//! | `p`, `pb`       | 1000^5  |
//! | `pi`, `pib`     | 1024^5  |

use crate::error::{Result, SmokeError};

/// Return the multiplier for a lowercase unit token.
fn unit_factor(unit: &str) -> Option<u128> {
    let factor: u128 = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1000,
        "ki" | "kib" => 1 << 10,
        "m" | "mb" => 1000u128.pow(2),
        "mi" | "mib" => 1 << 20,
        "g" | "gb" => 1000u128.pow(3),
        "gi" | "gib" => 1 << 30,
        "t" | "tb" => 1000u128.pow(4),
        "ti" | "tib" => 1 << 40,
        "p" | "pb" => 1000u128.pow(5),
        "pi" | "pib" => 1 << 50,
        _ => return None,
    };
    Some(factor)
}

/// Parse a size string into a byte count.
///
/// The fractional part of the significand is applied exactly and any
/// fraction of a byte left over is truncated, so `"5.5k"` is 5500 and
/// `"1.5"` is 1.
pub fn parse_size(input: &str) -> Result<u64> {
    let text = input.trim();

    match text.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => {}
        Some(_) => {
            return Err(SmokeError::invalid_format(
                input,
                "must start with a digit or decimal point",
            ))
        }
        None => return Err(SmokeError::invalid_format(input, "empty size")),
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (significand, unit) = text.split_at(split);

    let (whole, fraction) = match significand.split_once('.') {
        Some((_, rest)) if rest.contains('.') => {
            return Err(SmokeError::invalid_format(
                input,
                "more than one decimal point",
            ))
        }
        Some((whole, fraction)) => (whole, fraction),
        None => (significand, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(SmokeError::invalid_format(input, "no digits in size"));
    }

    let unit = unit.trim().to_lowercase();
    let factor = unit_factor(&unit)
        .ok_or_else(|| SmokeError::invalid_format(input, format!("unknown unit '{unit}'")))?;

    let overflow = || SmokeError::invalid_format(input, "size is too large");

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let mut bytes = whole_value.checked_mul(factor).ok_or_else(overflow)?;

    // Digits past the 20th are ignored; 10^20 * 1024^5 still fits in u128
    let fraction = &fraction[..fraction.len().min(20)];
    if !fraction.is_empty() {
        let numerator = fraction.parse::<u128>().map_err(|_| overflow())?;
        let denominator = 10u128.pow(fraction.len() as u32);
        bytes = bytes
            .checked_add(numerator * factor / denominator)
            .ok_or_else(overflow)?;
    }

    u64::try_from(bytes).map_err(|_| overflow())
}
