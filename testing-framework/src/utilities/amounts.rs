// File: testing-framework/src/utilities/amounts.rs
//
// NEAR Amount Conversion
//
// Balances travel over the wire as decimal strings of yoctoNEAR (10^-24 NEAR).
// Conversion is done on the decimal text, never through float multiplication,
// so 50.0 NEAR is exactly 50 followed by 24 zeros.

use crate::error::{Result, TestingError};

/// Number of decimal places between NEAR and yoctoNEAR
pub const NEAR_DECIMALS: usize = 24;

/// One NEAR in yoctoNEAR
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Convert a decimal NEAR amount (e.g. `"1.5"`) to yoctoNEAR
///
/// Digits beyond the 24th decimal place are truncated.
///
/// # Errors
///
/// Returns `TestingError::InvalidAmount` for empty, signed, non-numeric or
/// overflowing input.
pub fn parse_near_amount(amount: &str) -> Result<u128> {
    let invalid = || TestingError::InvalidAmount(amount.to_string());

    let trimmed = amount.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut digits = String::with_capacity(whole.len() + NEAR_DECIMALS);
    digits.push_str(whole);
    digits.extend(fraction.chars().take(NEAR_DECIMALS));
    for _ in fraction.len()..NEAR_DECIMALS {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| invalid())
}

/// Convert a NEAR amount given as `f64` to yoctoNEAR
///
/// The float is rendered with its shortest exact decimal representation
/// before conversion, so `50.0` yields `50 * 10^24` exactly.
pub fn near_to_yocto(near: f64) -> Result<u128> {
    if !near.is_finite() || near < 0.0 {
        return Err(TestingError::InvalidAmount(near.to_string()));
    }
    parse_near_amount(&near.to_string())
}
