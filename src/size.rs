//! Human-readable size parsing
//!
//! Turns strings such as `"1KB"`, `"100KB"`, `"2MB"` or `"1.5 gb"` into a byte
//! count. Units are decimal (`1KB == 1000` bytes); the optional `i` of the
//! binary spellings (`KiB`, `MiB`, ...) is accepted but does not switch to
//! powers of 1024.

use crate::error::{CacheError, Result};

const KB: u64 = 1000;
const MB: u64 = 1000 * KB;
const GB: u64 = 1000 * MB;
const TB: u64 = 1000 * GB;
const PB: u64 = 1000 * TB;

/// Parses a human-readable byte size.
///
/// Grammar: `<number>[ ][k|m|g|t|p][i][b]`, case-insensitive, where
/// `<number>` is a non-negative decimal with an optional fractional part.
/// Fractional byte counts are truncated.
///
/// # Errors
/// Returns [`CacheError::InvalidSize`] for anything outside that grammar.
pub fn parse_size(input: &str) -> Result<u64> {
    let invalid = || CacheError::InvalidSize(input.to_string());
    let s = input.trim();

    let number_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(number_end);

    if !is_decimal(number) {
        return Err(invalid());
    }
    let amount: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = unit_multiplier(suffix.strip_prefix(' ').unwrap_or(suffix)).ok_or_else(invalid)?;

    let bytes = amount * multiplier as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as u64)
}

/// `digits` or `digits.digits`
fn is_decimal(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());

    all_digits(whole) && parts.next().map_or(true, all_digits)
}

fn unit_multiplier(suffix: &str) -> Option<u64> {
    let lower = suffix.to_ascii_lowercase();
    let mut rest = lower.as_str();

    let multiplier = match rest.chars().next() {
        Some('k') => KB,
        Some('m') => MB,
        Some('g') => GB,
        Some('t') => TB,
        Some('p') => PB,
        _ => 1,
    };
    if multiplier != 1 {
        rest = &rest[1..];
    }
    rest = rest.strip_prefix('i').unwrap_or(rest);
    rest = rest.strip_prefix('b').unwrap_or(rest);

    rest.is_empty().then_some(multiplier)
}
