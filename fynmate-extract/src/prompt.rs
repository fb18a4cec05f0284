//! Instruction template sent to the language service.
//!
//! Category and payment choices are read from the shared catalog, the same
//! table the normalizer coerces against.

use fynmate_core::catalog::{self, CATEGORIES, PAYMENT_METHODS};

pub const DEFAULT_LANGUAGE: &str = "Indonesian, including slang and abbreviations";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    language: String,
    stop_words: Vec<String>,
}

impl PromptTemplate {
    pub fn new(language: impl Into<String>, stop_words: Vec<String>) -> Self {
        Self {
            language: language.into(),
            stop_words,
        }
    }

    /// System instruction; the user's message goes in its own turn.
    pub fn instruction(&self) -> String {
        let categories = catalog::labels(CATEGORIES).join(", ");
        let payments = catalog::labels(PAYMENT_METHODS).join(", ");
        let examples = self
            .stop_words
            .iter()
            .take(6)
            .map(|w| format!("\"{w}\""))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are a finance assistant that extracts structured data from expense messages.\n\
             You understand {language}.\n\
             Reply with a single JSON object with keys: category, amount, note, payment, date.\n\
             \n\
             amount: whole number in currency units (\"25k\" and \"25rb\" both mean 25000). \
             If no amount is found, set amount to null.\n\
             category: expenses only, choose exactly one of: {categories}.\n\
             note: concise description in the message's language. Remove the amount, currency and any period at the end. \
             Exclude words that indicate buying or spending, e.g. {examples}.\n\
             payment: choose one of: {payments}, based on what follows 'via'. If not found, use \"Other\".\n\
             date: \"YYYY-MM-DD HH:MM:SS\" only if the message says when the expense happened, otherwise null.",
            language = self.language,
        )
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(
            DEFAULT_LANGUAGE,
            crate::normalize::DEFAULT_STOP_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        )
    }
}
