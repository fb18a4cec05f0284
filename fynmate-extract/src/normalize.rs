//! Validation and normalization of a raw extractor reply into a candidate.
//!
//! Every extractor implementation goes through here, so the coercion rules
//! live in one place: amount must be a non-negative number, category and
//! payment method resolve through the shared catalog, the note loses spend
//! verbs and the amount token, and an unparseable date becomes "now".

use chrono::NaiveDateTime;
use fynmate_core::{Category, PaymentMethod, TimePolicy, TransactionCandidate};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::ExtractionFailure;
use crate::fallback::{parse_amount, whole_units};

/// Spend-indicating words removed from notes unless configured otherwise.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "beli", "membeli", "beliin", "makan", "ngopi", "jajan", "bayar", "membayar", "bayarin",
    "belanja", "abis", "habis", "keluar",
];

/// Currency markers that never carry meaning in a note.
const CURRENCY_TOKENS: &[&str] = &["rp", "idr"];

/// "via gopay", "via credit card", "via bank jago" ...
static VIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bvia\s+(?:credit\s+card|kartu\s+kredit|bank\s+jago|livin\s+mandiri|\S+)")
        .expect("via pattern is valid")
});

static NUMERIC_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:rp\.?|idr)?([0-9][0-9.,]*)(k|rb|ribu|jt|juta)?$").expect("numeric token pattern is valid")
});

/// A number glued to surrounding text, e.g. the "20k" in "kopi20k".
static INLINE_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9]+(?:[.,][0-9]+)*(?:k|rb|ribu|jt|juta)?").expect("inline amount pattern is valid")
});

/// Largest amount the ledger can store.
const MAX_AMOUNT: u64 = i64::MAX as u64;

static GROUPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,3}(?:[.,][0-9]{3})+$").expect("grouped pattern is valid")
});

/// Structured reply as requested from the language service. Every field is
/// optional; validation decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "payment_method")]
    pub payment: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    stop_words: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied())
    }
}

impl Normalizer {
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    /// Turn a raw reply into a candidate or say why it can't be used.
    pub fn normalize(
        &self,
        raw: &RawExtraction,
        text: &str,
        policy: &TimePolicy,
        now: NaiveDateTime,
    ) -> Result<TransactionCandidate, ExtractionFailure> {
        let amount = coerce_amount(raw.amount.as_ref())?;

        let category = raw
            .category
            .as_deref()
            .map(Category::coerce)
            .unwrap_or_default();

        let payment_method = raw
            .payment
            .as_deref()
            .map(PaymentMethod::coerce)
            .unwrap_or_default();

        let note_source = raw
            .note
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(text);
        let note = self.clean_note(note_source, amount, category);

        let occurred_at = raw
            .date
            .as_deref()
            .and_then(|d| policy.parse_local(d))
            .unwrap_or(now);

        Ok(TransactionCandidate {
            amount,
            category,
            note,
            payment_method,
            occurred_at,
        })
    }

    /// Drop spend verbs, currency markers, the amount token and any "via ..."
    /// phrase. An empty result falls back to the category label.
    pub fn clean_note(&self, note: &str, amount: u64, category: Category) -> String {
        let without_via = VIA_RE.replace_all(note, " ");
        let without_via = strip_inline_amount(&without_via, amount);
        let tokens: Vec<&str> = without_via.split_whitespace().collect();

        let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            let bare = bare_token(token);

            if bare.is_empty() {
                i += 1;
                continue;
            }
            if self.stop_words.contains(&bare) || CURRENCY_TOKENS.contains(&bare.as_str()) {
                i += 1;
                continue;
            }

            // "25 rb" spreads the amount over two tokens
            let unit = tokens.get(i + 1).map(|t| bare_token(t)).and_then(|u| unit_multiplier(&u));
            if let Some(mult) = unit {
                if token_values(&bare).iter().any(|v| v.saturating_mul(mult) == amount) {
                    i += 2;
                    continue;
                }
            }
            if token_values(&bare).contains(&amount) {
                i += 1;
                continue;
            }

            kept.push(token);
            i += 1;
        }

        let joined = kept.join(" ");
        let cleaned = joined.trim().trim_end_matches('.').trim_end();
        if cleaned.is_empty() {
            category.label().to_string()
        } else {
            cleaned.to_string()
        }
    }
}

/// Validate the reply's amount: a JSON number, or a string that reads as one.
pub fn coerce_amount(value: Option<&Value>) -> Result<u64, ExtractionFailure> {
    let amount = match value {
        None | Some(Value::Null) => return Err(ExtractionFailure::NoAmount),
        Some(Value::Number(n)) => {
            let whole = match n.as_u64() {
                Some(u) => Some(u).filter(|u| *u <= MAX_AMOUNT),
                None => n.as_f64().and_then(whole_units),
            };
            whole.ok_or_else(|| ExtractionFailure::InvalidAmount(n.to_string()))?
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ExtractionFailure::NoAmount);
            }
            amount_from_str(s).ok_or_else(|| ExtractionFailure::InvalidAmount(s.to_string()))?
        }
        Some(other) => return Err(ExtractionFailure::InvalidAmount(other.to_string())),
    };

    if amount == 0 {
        return Err(ExtractionFailure::NoAmount);
    }
    Ok(amount)
}

/// "25000", "25.000", "Rp 25,000", "25k", "25rb". Negative or wordy strings
/// are refused rather than guessed at.
fn amount_from_str(s: &str) -> Option<u64> {
    let compact: String = s
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let caps = NUMERIC_TOKEN_RE.captures(&compact)?;
    let digits = caps.get(1)?.as_str();
    let mult = caps.get(2).and_then(|m| unit_multiplier(m.as_str())).unwrap_or(1);

    if GROUPED_RE.is_match(digits) {
        let n: u64 = digits.replace(['.', ','], "").parse().ok()?;
        return n.checked_mul(mult).filter(|a| *a <= MAX_AMOUNT);
    }
    if mult == 1000 {
        return parse_amount(&compact);
    }
    let n: f64 = digits.replace(',', ".").parse().ok()?;
    whole_units(n * mult as f64)
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit {
        "k" | "rb" | "ribu" => Some(1_000),
        "jt" | "juta" => Some(1_000_000),
        _ => None,
    }
}

/// Lowercased token without surrounding punctuation.
fn bare_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Every amount a token could denote: separators read as thousands grouping
/// and as a decimal point both count.
fn token_values(bare: &str) -> Vec<u64> {
    let Some(caps) = NUMERIC_TOKEN_RE.captures(bare) else {
        return Vec::new();
    };
    let Some(digits) = caps.get(1).map(|m| m.as_str()) else {
        return Vec::new();
    };
    let mult = caps.get(2).and_then(|m| unit_multiplier(m.as_str())).unwrap_or(1);

    let mut out = Vec::with_capacity(2);
    let grouped: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(n) = grouped.parse::<u64>().ok().and_then(|n| n.checked_mul(mult)) {
        out.push(n);
    }
    if let Ok(f) = digits.replace(',', ".").trim_end_matches('.').parse::<f64>() {
        out.extend(whole_units(f * mult as f64));
    }
    out
}

/// Remove numbers inside words that denote `amount` ("kopi20k" → "kopi").
/// A suffix followed by more letters ("20kg") is left alone.
fn strip_inline_amount(note: &str, amount: u64) -> String {
    INLINE_AMOUNT_RE
        .replace_all(note, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            let end = caps.get(0).map_or(note.len(), |m| m.end());
            let glued_suffix = whole.ends_with(|c: char| c.is_alphabetic())
                && note[end..].starts_with(|c: char| c.is_alphabetic());
            if !glued_suffix && token_values(&whole.to_lowercase()).contains(&amount) {
                String::new()
            } else {
                whole.to_string()
            }
        })
        .into_owned()
}
