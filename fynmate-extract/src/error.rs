//! Extraction failure taxonomy.
//!
//! None of these are fatal: every variant sends the pipeline to the fallback
//! parser, and none is shown to the end user verbatim.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// Nothing to extract from.
    #[error("message is empty")]
    EmptyMessage,

    /// Transport error or non-success status from the language service.
    #[error("language service unavailable: {0}")]
    Unavailable(String),

    /// No answer within the configured bound.
    #[error("language service timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The reply was not the JSON object we asked for.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Amount was null, missing or zero.
    #[error("no amount recognized")]
    NoAmount,

    /// Amount was negative or not a number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
