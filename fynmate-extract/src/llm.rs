use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ExtractionFailure;
use crate::extractor::Extractor;
use crate::normalize::RawExtraction;
use crate::prompt::PromptTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Extractor backed by a hosted chat model asked for a JSON object.
pub struct LlmExtractor {
    config: LlmConfig,
    prompt: PromptTemplate,
    client: reqwest::Client,
}

impl LlmExtractor {
    pub fn new(config: LlmConfig, prompt: PromptTemplate) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            prompt,
            client,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ExtractionFailure> {
        match self.config.provider {
            Provider::Anthropic => self.anthropic_complete(system, turns).await,
            Provider::OpenAI => self.openai_complete(system, turns).await,
        }
    }

    async fn anthropic_complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ExtractionFailure> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            temperature: f32,
            system: &'a str,
            messages: &'a [ChatTurn],
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.config.model,
            max_tokens: 300,
            temperature: self.config.temperature,
            system,
            messages: turns,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| ExtractionFailure::Unavailable(format!("bad api key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let resp = check_status(resp).await?;
        let out: Resp = resp
            .json()
            .await
            .map_err(|e| ExtractionFailure::Malformed(format!("anthropic response: {e}")))?;

        let mut s = String::new();
        for b in out.content {
            if b.t == "text" {
                if let Some(t) = b.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s.trim().to_string())
    }

    async fn openai_complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ExtractionFailure> {
        #[derive(Serialize)]
        struct Req {
            model: String,
            messages: Vec<ChatTurn>,
            temperature: f32,
            response_format: ResponseFormat,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            t: &'static str,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let mut msgs: Vec<ChatTurn> = Vec::with_capacity(turns.len() + 1);
        msgs.push(ChatTurn {
            role: "system".to_string(),
            content: system.to_string(),
        });
        msgs.extend(turns.iter().cloned());

        let body = Req {
            model: self.config.model.clone(),
            messages: msgs,
            temperature: self.config.temperature,
            response_format: ResponseFormat { t: "json_object" },
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let resp = check_status(resp).await?;
        let out: Resp = resp
            .json()
            .await
            .map_err(|e| ExtractionFailure::Malformed(format!("openai response: {e}")))?;

        let content = out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    fn transport_failure(&self, e: reqwest::Error) -> ExtractionFailure {
        if e.is_timeout() {
            ExtractionFailure::Timeout {
                after_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            ExtractionFailure::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    fn name(&self) -> &'static str {
        match self.config.provider {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }

    async fn extract(&self, text: &str) -> Result<RawExtraction, ExtractionFailure> {
        debug!(provider = self.name(), model = %self.config.model, "requesting extraction");

        let turns = [ChatTurn {
            role: "user".to_string(),
            content: text.to_string(),
        }];

        let result = self
            .complete(&self.prompt.instruction(), &turns)
            .await
            .and_then(|content| parse_json_reply(&content));

        if let Err(e) = &result {
            warn!(provider = self.name(), error = %e, "extraction failed");
        }
        result
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ExtractionFailure> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let txt = resp.text().await.unwrap_or_default();
    Err(status_failure(status, &txt))
}

fn status_failure(status: StatusCode, body: &str) -> ExtractionFailure {
    let snippet: String = body.chars().take(200).collect();
    ExtractionFailure::Unavailable(format!("{status} {snippet}"))
}

/// Parse the model's reply, tolerating a markdown code fence around the JSON.
pub fn parse_json_reply(raw: &str) -> Result<RawExtraction, ExtractionFailure> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if cleaned.is_empty() {
        return Err(ExtractionFailure::Malformed("empty reply".to_string()));
    }

    serde_json::from_str(cleaned).map_err(|e| {
        let snippet: String = raw.chars().take(200).collect();
        ExtractionFailure::Malformed(format!("{e}. Raw: {snippet}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        let r = parse_json_reply(r#"{"amount": 20000, "category": "Food", "note": "kopi", "payment": "OVO", "date": null}"#)
            .unwrap();
        assert_eq!(r.amount, Some(json!(20000)));
        assert_eq!(r.category.as_deref(), Some("Food"));
        assert_eq!(r.payment.as_deref(), Some("OVO"));
        assert_eq!(r.date, None);
    }

    #[test]
    fn test_parse_fenced_json() {
        let r = parse_json_reply("```json\n{\"amount\": null}\n```").unwrap();
        assert_eq!(r.amount, None);
    }

    #[test]
    fn test_malformed_replies() {
        assert!(matches!(parse_json_reply(""), Err(ExtractionFailure::Malformed(_))));
        assert!(matches!(
            parse_json_reply("Sure! The amount is 20k."),
            Err(ExtractionFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_json_reply("\"just a string\""),
            Err(ExtractionFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_status_failure_truncates_body() {
        let body = "x".repeat(1000);
        match status_failure(StatusCode::TOO_MANY_REQUESTS, &body) {
            ExtractionFailure::Unavailable(msg) => {
                assert!(msg.starts_with("429"));
                assert!(msg.len() < 260);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_failure_not_a_panic() {
        let cfg = LlmConfig {
            provider: Provider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            // Port 9 (discard) on loopback: connection refused or dropped.
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "sk-test".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(2),
        };
        let ex = LlmExtractor::new(cfg, PromptTemplate::default()).unwrap();
        let res = ex.extract("kopi 20k").await;
        assert!(matches!(
            res,
            Err(ExtractionFailure::Unavailable(_)) | Err(ExtractionFailure::Timeout { .. })
        ));
    }
}
