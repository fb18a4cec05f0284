//! Line-oriented chat adapter: one stdin line is one incoming message.

use anyhow::{Context, Result};
use fynmate_core::{TransactionRecord, UserContext, reply};
use fynmate_extract::{Outcome, Pipeline};
use fynmate_ledger::{ApiSink, RecordSink, SqliteStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::config::Config;

pub async fn run_chat(cfg: &Config, user: UserContext) -> Result<()> {
    let pipeline = cfg.pipeline()?;
    let sink = open_sink(cfg)?;

    println!(
        "FynMate chat (extractor: {}). Type /start, or an expense like 'makan siang 50k'. Ctrl-D to quit.",
        pipeline.extractor_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let out = respond(&pipeline, sink.as_ref(), &user, &line).await;
        println!("{out}\n");
    }
    Ok(())
}

fn open_sink(cfg: &Config) -> Result<Box<dyn RecordSink>> {
    if let Some(url) = &cfg.storage.api_url {
        info!(%url, "posting records to query API");
        let mut sink = ApiSink::new(url.clone(), cfg.extraction_timeout())
            .context("build API client")?;
        if let Some(var) = &cfg.storage.api_key_env {
            match std::env::var(var) {
                Ok(key) if !key.trim().is_empty() => sink = sink.with_api_key(key),
                _ => warn!(env = %var, "API key not set; posting without x-api-key"),
            }
        }
        return Ok(Box::new(sink));
    }
    let path = cfg.db_path()?;
    info!(path = %path.display(), "using local ledger");
    let store = SqliteStore::open(&path).with_context(|| format!("open {}", path.display()))?;
    Ok(Box::new(store))
}

/// Reply text for one incoming message. Accepted candidates are persisted
/// before the confirmation is returned.
pub async fn respond(
    pipeline: &Pipeline,
    sink: &dyn RecordSink,
    user: &UserContext,
    text: &str,
) -> String {
    if text.trim() == "/start" {
        return reply::greeting(user.username.as_deref().unwrap_or("bro"));
    }

    match pipeline.process(text, user).await {
        Outcome::Accepted {
            candidate,
            fallback_reason,
            ..
        } => {
            if let Some(reason) = &fallback_reason {
                info!(user_id = user.user_id, %reason, "used fallback parser");
            }
            let record = TransactionRecord::from_candidate(&candidate, user);
            match sink.insert(&record).await {
                Ok(()) => reply::confirmation(&candidate),
                Err(e) => {
                    error!(error = %e, "failed to persist transaction");
                    reply::SAVE_FAILED.to_string()
                }
            }
        }
        Outcome::Rejected { reason, .. } => {
            info!(user_id = user.user_id, %reason, "message rejected");
            reply::REJECTION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fynmate_core::TimePolicy;
    use fynmate_extract::{Normalizer, OfflineExtractor};
    use fynmate_ledger::LedgerError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Refuses every record.
    #[derive(Default)]
    struct BrokenSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl RecordSink for BrokenSink {
        async fn insert(&self, _record: &TransactionRecord) -> fynmate_ledger::error::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Lock)
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(
            Arc::new(OfflineExtractor),
            Normalizer::default(),
            TimePolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_start_greets_without_persisting() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = UserContext::new(1, Some("Ani".to_string()));
        let out = respond(&pipeline(), &store, &user, "/start").await;
        assert!(out.starts_with("Hi Ani!"));
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expense_is_confirmed_and_stored() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = UserContext::new(1, None);
        let out = respond(&pipeline(), &store, &user, "parkir 5rb").await;
        assert!(out.contains("Rp 5,000"));

        let rows = store.list(Some(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.amount, 5_000);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported_not_confirmed() {
        let sink = BrokenSink::default();
        let user = UserContext::new(1, None);
        let out = respond(&pipeline(), &sink, &user, "parkir 5rb").await;
        assert_eq!(out, reply::SAVE_FAILED);
        assert!(!out.contains("Rp 5,000"));
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_never_reaches_sink() {
        let sink = BrokenSink::default();
        let user = UserContext::new(1, None);
        let out = respond(&pipeline(), &sink, &user, "makasih ya").await;
        assert_eq!(out, reply::REJECTION);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_reply() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = UserContext::new(1, None);
        let out = respond(&pipeline(), &store, &user, "makasih ya").await;
        assert_eq!(out, reply::REJECTION);
        assert!(store.list(None).await.unwrap().is_empty());
    }
}
