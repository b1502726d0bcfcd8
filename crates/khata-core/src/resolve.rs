//! Amount resolver: derives a signed magnitude and direction from one raw row
//!
//! Banks encode transaction sign three different ways: two separate columns,
//! one amount column plus an explicit DR/CR indicator, or one amount column
//! with the direction buried in the narration text. The resolver isolates
//! that variability so downstream code only ever sees a non-negative amount
//! and an explicit direction (or a review flag for a human to resolve).

use crate::models::{AmountScheme, Direction, NewFormatProfile, RawRow, ReviewFlag};
use crate::sheet::cell_amount;

/// The resolver's verdict for one row
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Non-negative magnitude; 0.0 when flagged `MissingAmount`
    pub amount: f64,
    /// `None` exactly when `flag` is set
    pub direction: Option<Direction>,
    pub flag: Option<ReviewFlag>,
}

impl Resolved {
    fn ok(amount: f64, direction: Direction) -> Self {
        Self {
            amount,
            direction: Some(direction),
            flag: None,
        }
    }

    fn flagged(amount: f64, flag: ReviewFlag) -> Self {
        Self {
            amount,
            direction: None,
            flag: Some(flag),
        }
    }
}

/// Resolve the amount and direction of `row` under the profile's scheme.
///
/// The profile is assumed validated; a column the scheme requires that is
/// somehow absent reads as an empty cell and surfaces as a review flag, not
/// a panic.
pub fn resolve_amount(row: &RawRow, profile: &NewFormatProfile) -> Resolved {
    match profile.scheme {
        AmountScheme::SeparateDebitCredit => resolve_separate(row, profile),
        AmountScheme::SingleAmountWithIndicator => resolve_indicator(row, profile),
        AmountScheme::SingleAmountWithTokens => resolve_tokens(row, profile),
    }
}

/// Two columns: debit = money out, credit = money in. Exactly one of the two
/// must be nonzero; blank or unparsable cells count as zero.
fn resolve_separate(row: &RawRow, profile: &NewFormatProfile) -> Resolved {
    let debit = profile
        .debit_col
        .and_then(|col| cell_amount(row.cell(col)))
        .unwrap_or(0.0);
    let credit = profile
        .credit_col
        .and_then(|col| cell_amount(row.cell(col)))
        .unwrap_or(0.0);

    match (debit != 0.0, credit != 0.0) {
        (true, false) => Resolved::ok(debit.abs(), Direction::Expense),
        (false, true) => Resolved::ok(credit.abs(), Direction::Income),
        // Both zero or both populated: the row's sign is anyone's guess
        _ => Resolved::flagged(debit.abs().max(credit.abs()), ReviewFlag::AmbiguousDirection),
    }
}

/// One amount column plus an indicator column holding a DR/CR style token.
/// The cell's own sign is ignored; the indicator decides.
fn resolve_indicator(row: &RawRow, profile: &NewFormatProfile) -> Resolved {
    let amount = profile
        .amount_col
        .and_then(|col| cell_amount(row.cell(col)))
        .map(f64::abs)
        .unwrap_or(0.0);

    if amount == 0.0 {
        return Resolved::flagged(0.0, ReviewFlag::MissingAmount);
    }

    let indicator = profile
        .indicator_col
        .map(|col| row.cell(col).as_text())
        .unwrap_or_default();
    let indicator = indicator.trim();

    let is_debit = matches_token(indicator, &profile.debit_tokens);
    let is_credit = matches_token(indicator, &profile.credit_tokens);

    match (is_debit, is_credit) {
        (true, false) => Resolved::ok(amount, Direction::Expense),
        (false, true) => Resolved::ok(amount, Direction::Income),
        _ => Resolved::flagged(amount, ReviewFlag::AmbiguousDirection),
    }
}

/// One amount column; direction inferred from keyword membership in the
/// narration text. Exactly one of the two token sets must match.
fn resolve_tokens(row: &RawRow, profile: &NewFormatProfile) -> Resolved {
    let amount = profile
        .amount_col
        .and_then(|col| cell_amount(row.cell(col)))
        .map(f64::abs)
        .unwrap_or(0.0);

    if amount == 0.0 {
        return Resolved::flagged(0.0, ReviewFlag::MissingAmount);
    }

    let narration = row.cell(profile.desc_col).as_text().to_lowercase();

    let hits_debit = contains_any(&narration, &profile.debit_tokens);
    let hits_credit = contains_any(&narration, &profile.credit_tokens);

    match (hits_debit, hits_credit) {
        (true, false) => Resolved::ok(amount, Direction::Expense),
        (false, true) => Resolved::ok(amount, Direction::Income),
        _ => Resolved::flagged(amount, ReviewFlag::AmbiguousDirection),
    }
}

/// Case-insensitive whole-value match against a token set
fn matches_token(value: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|t| t.trim().eq_ignore_ascii_case(value))
}

/// Case-insensitive substring membership against a token set
fn contains_any(haystack: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .filter(|t| !t.trim().is_empty())
        .any(|t| haystack.contains(&t.trim().to_lowercase()))
}
