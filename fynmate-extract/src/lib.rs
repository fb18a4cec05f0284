//! fynmate-extract: turns free-text spending messages into transaction
//! candidates (language-service extractor, regex fallback, normalization,
//! fallback policy)

pub mod error;
pub mod extractor;
pub mod fallback;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod prompt;

pub use error::ExtractionFailure;
pub use extractor::{Extractor, OfflineExtractor};
pub use fallback::parse_amount;
pub use llm::{LlmConfig, LlmExtractor, Provider};
pub use normalize::{Normalizer, RawExtraction};
pub use pipeline::{Outcome, Pipeline, Source};
pub use prompt::PromptTemplate;
