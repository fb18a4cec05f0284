//! Deterministic amount parser used when the language service can't help.
//!
//! Only the first number in the message is considered, so "beli 2 kopi 20k"
//! yields 2. That is long-standing behavior which stored data depends on;
//! multi-number messages are a known limitation.

use chrono::NaiveDateTime;
use fynmate_core::{Category, PaymentMethod, TransactionCandidate};
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:[.,]?[0-9]+)?)(k|rb)?").expect("amount pattern is valid")
});

/// First number in `text`, with an optional `k`/`rb` suffix meaning thousands.
///
/// A comma or dot inside the number is read as a decimal separator, so
/// "12.5k" is 12500 and "25.000" is 25. The result is truncated to whole units.
pub fn parse_amount(text: &str) -> Option<u64> {
    let lowered = text.to_lowercase();
    let caps = AMOUNT_RE.captures(&lowered)?;

    let num = caps.get(1)?.as_str().replace(',', ".");
    let mut amount: f64 = num.parse().ok()?;

    if caps.get(2).is_some() {
        amount *= 1000.0;
    }

    whole_units(amount)
}

/// Truncate to whole currency units. Values that don't fit a signed 64-bit
/// column (or aren't finite, or are negative) are not amounts.
pub(crate) fn whole_units(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u64)
}

/// Minimal candidate built from a fallback amount: everything but the amount
/// takes its default, and the note is the message verbatim.
pub fn fallback_candidate(text: &str, amount: u64, now: NaiveDateTime) -> TransactionCandidate {
    TransactionCandidate {
        amount,
        category: Category::Other,
        note: text.to_string(),
        payment_method: PaymentMethod::Other,
        occurred_at: now,
    }
}
