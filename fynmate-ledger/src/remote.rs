//! Sink that posts records to a running query API instead of a local file.

use async_trait::async_trait;
use fynmate_core::TransactionRecord;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::store::RecordSink;

pub struct ApiSink {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ApiSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: None,
            client,
        })
    }

    /// Sent as `x-api-key` on every post.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/transactions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RecordSink for ApiSink {
    async fn insert(&self, record: &TransactionRecord) -> Result<()> {
        let mut req = self.client.post(self.endpoint()).json(record);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key.as_str());
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "API rejected transaction");
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%status, user_id = record.user_id, "posted transaction");
        Ok(())
    }
}
