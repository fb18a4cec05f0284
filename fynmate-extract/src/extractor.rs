//! The extractor seam: anything that can turn a message into a raw structured
//! reply. The LLM adapter is the production implementation; tests plug in
//! canned ones.

use async_trait::async_trait;

use crate::error::ExtractionFailure;
use crate::normalize::RawExtraction;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, text: &str) -> Result<RawExtraction, ExtractionFailure>;
}

/// Used when no language service is configured: every message goes straight
/// to the fallback parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineExtractor;

#[async_trait]
impl Extractor for OfflineExtractor {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn extract(&self, _text: &str) -> Result<RawExtraction, ExtractionFailure> {
        Err(ExtractionFailure::Unavailable(
            "no language service configured".to_string(),
        ))
    }
}
