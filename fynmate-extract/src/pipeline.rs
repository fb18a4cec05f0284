//! Two-tier extraction policy: language service first, deterministic parser
//! second, rejection last.
//!
//! `process` returns data only. Replying, persisting and logging belong to
//! the caller, which gets the failure that caused a fallback or rejection in
//! the outcome.

use chrono::{DateTime, Utc};
use fynmate_core::{TimePolicy, TransactionCandidate, TransactionRecord, UserContext};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ExtractionFailure;
use crate::extractor::Extractor;
use crate::fallback::{fallback_candidate, parse_amount};
use crate::normalize::Normalizer;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Extractor,
    Fallback,
}

/// Exactly one of these per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Accepted {
        user: UserContext,
        candidate: TransactionCandidate,
        source: Source,
        /// Why the extractor result was not used, when `source` is `Fallback`
        fallback_reason: Option<ExtractionFailure>,
    },
    Rejected {
        user: UserContext,
        reason: ExtractionFailure,
    },
}

impl Outcome {
    pub fn candidate(&self) -> Option<&TransactionCandidate> {
        match self {
            Outcome::Accepted { candidate, .. } => Some(candidate),
            Outcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected { .. })
    }

    /// Persistence record for an accepted message.
    pub fn record(&self) -> Option<TransactionRecord> {
        match self {
            Outcome::Accepted { user, candidate, .. } => {
                Some(TransactionRecord::from_candidate(candidate, user))
            }
            Outcome::Rejected { .. } => None,
        }
    }
}

pub struct Pipeline {
    extractor: Arc<dyn Extractor>,
    normalizer: Normalizer,
    policy: TimePolicy,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(extractor: Arc<dyn Extractor>, normalizer: Normalizer, policy: TimePolicy) -> Self {
        Self {
            extractor,
            normalizer,
            policy,
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    pub fn policy(&self) -> &TimePolicy {
        &self.policy
    }

    pub async fn process(&self, text: &str, user: &UserContext) -> Outcome {
        self.process_at(text, user, Utc::now()).await
    }

    /// `process` with an explicit clock.
    pub async fn process_at(&self, text: &str, user: &UserContext, at: DateTime<Utc>) -> Outcome {
        let now = self.policy.local(at);
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Outcome::Rejected {
                user: user.clone(),
                reason: ExtractionFailure::EmptyMessage,
            };
        }

        let failure = match self.attempt_extractor(trimmed).await {
            Ok(raw) => match self.normalizer.normalize(&raw, trimmed, &self.policy, now) {
                Ok(candidate) => {
                    return Outcome::Accepted {
                        user: user.clone(),
                        candidate,
                        source: Source::Extractor,
                        fallback_reason: None,
                    };
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        // the fallback note is the message exactly as sent
        match parse_amount(trimmed).filter(|a| *a > 0) {
            Some(amount) => Outcome::Accepted {
                user: user.clone(),
                candidate: fallback_candidate(text, amount, now),
                source: Source::Fallback,
                fallback_reason: Some(failure),
            },
            None => Outcome::Rejected {
                user: user.clone(),
                reason: failure,
            },
        }
    }

    async fn attempt_extractor(
        &self,
        text: &str,
    ) -> Result<crate::normalize::RawExtraction, ExtractionFailure> {
        match tokio::time::timeout(self.timeout, self.extractor.extract(text)).await {
            Ok(res) => res,
            Err(_) => Err(ExtractionFailure::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::OfflineExtractor;
    use fynmate_core::{Category, PaymentMethod};

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(OfflineExtractor), Normalizer::default(), TimePolicy::default())
    }

    fn user() -> UserContext {
        UserContext::new(1, Some("tester".to_string()))
    }

    #[tokio::test]
    async fn test_offline_falls_back() {
        let out = pipeline().process("parkir 5000", &user()).await;
        match out {
            Outcome::Accepted {
                candidate,
                source,
                fallback_reason,
                ..
            } => {
                assert_eq!(candidate.amount, 5000);
                assert_eq!(candidate.category, Category::Other);
                assert_eq!(candidate.payment_method, PaymentMethod::Other);
                assert_eq!(source, Source::Fallback);
                assert!(matches!(fallback_reason, Some(ExtractionFailure::Unavailable(_))));
            }
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let out = pipeline().process("   ", &user()).await;
        assert_eq!(
            out,
            Outcome::Rejected {
                user: user(),
                reason: ExtractionFailure::EmptyMessage
            }
        );
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let out = pipeline().process("gratis 0", &user()).await;
        assert!(out.is_rejected());
        assert_eq!(out.record(), None);
    }

    #[tokio::test]
    async fn test_oversized_number_rejected() {
        let out = pipeline().process("beli 99999999999999999999999", &user()).await;
        assert!(matches!(
            out,
            Outcome::Rejected {
                reason: ExtractionFailure::Unavailable(_),
                ..
            }
        ));
        assert_eq!(out.record(), None);
    }

    #[tokio::test]
    async fn test_fallback_note_is_untrimmed_message() {
        let out = pipeline().process("  parkir 5000 \n", &user()).await;
        assert_eq!(out.candidate().map(|c| c.note.as_str()), Some("  parkir 5000 \n"));
    }

    #[tokio::test]
    async fn test_record_carries_user() {
        let out = pipeline().process("makan 15rb", &user()).await;
        let record = out.record().unwrap();
        assert_eq!(record.user_id, 1);
        assert_eq!(record.username.as_deref(), Some("tester"));
        assert_eq!(record.amount, 15_000);
    }
}
