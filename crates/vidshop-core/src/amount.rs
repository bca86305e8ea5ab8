//! Minor-unit amount helpers.
//!
//! Amounts are always stored as `i64` minor units (1/100 of the display
//! currency). Conversion to and from the human-entered decimal form never
//! goes through floating point.

/// Number of minor units in one major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Errors produced when parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The input is not a decimal number.
    #[error("not a valid amount: {0:?}")]
    Malformed(String),

    /// More than two fractional digits were given.
    #[error("amounts support at most two decimal places: {0:?}")]
    TooPrecise(String),

    /// The value does not fit in the ledger's integer range.
    #[error("amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Render minor units as a two-decimal major-unit string (`10050` → `"100.50"`).
#[must_use]
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let per = MINOR_PER_MAJOR.unsigned_abs();
    format!("{sign}{}.{:02}", abs / per, abs % per)
}

/// Parse a decimal major-unit string into minor units (`"100.5"` → `10050`).
///
/// Accepts an optional leading `-`, an integer part, and up to two fractional
/// digits. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns an [`AmountError`] if the input is malformed, has more than two
/// fractional digits, or overflows `i64`.
pub fn parse_amount(input: &str) -> Result<i64, AmountError> {
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Malformed(input.to_string()));
    }
    if !digits_only(whole) || !digits_only(frac) {
        return Err(AmountError::Malformed(input.to_string()));
    }
    if frac.len() > 2 {
        return Err(AmountError::TooPrecise(input.to_string()));
    }

    let out_of_range = || AmountError::OutOfRange(input.to_string());

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| out_of_range())?
    };
    let frac_value: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| out_of_range())? * 10,
        _ => frac.parse().map_err(|_| out_of_range())?,
    };

    let minor = whole_value
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(out_of_range)?;

    Ok(if negative { -minor } else { minor })
}
