use anyhow::{Context, Result, bail};
use fynmate_core::TimePolicy;
use fynmate_extract::{
    Extractor, LlmConfig, LlmExtractor, Normalizer, OfflineExtractor, Pipeline, PromptTemplate,
    Provider, normalize::DEFAULT_STOP_WORDS, prompt::DEFAULT_LANGUAGE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::state::{default_db_path, ensure_fynmate_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub extraction: ExtractionSection,
    pub storage: StorageSection,
    pub server: ServerSection,
    pub time: TimeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "openai", "anthropic" or "none"
    pub provider: String,
    pub model: String,
    /// Defaults to the provider's public endpoint
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Name of the env var holding the API key; the key itself never lives in this file
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    pub language: String,
    pub stop_words: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Defaults to ~/.fynmate/finance.db
    pub db_path: Option<PathBuf>,
    /// When set, `chat` posts records to this query API instead of the local database
    pub api_url: Option<String>,
    /// Env var whose value is sent as `x-api-key` to `api_url`
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSection {
    pub timezone: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.0,
            timeout_secs: 15,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for TimeSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Jakarta".to_string(),
        }
    }
}

impl Config {
    pub fn time_policy(&self) -> Result<TimePolicy> {
        TimePolicy::new(&self.time.timezone)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.max(1))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(p) => Ok(p.clone()),
            None => default_db_path(),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind {:?}", self.server.bind))
    }

    pub fn provider(&self) -> Result<Option<Provider>> {
        match self.llm.provider.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Some(Provider::OpenAI)),
            "anthropic" => Ok(Some(Provider::Anthropic)),
            "none" | "offline" | "" => Ok(None),
            other => bail!("unknown llm.provider {:?} (expected openai, anthropic or none)", other),
        }
    }

    /// Builds the configured extractor. A missing API key degrades to the
    /// offline extractor so messages still go through the fallback parser.
    pub fn extractor(&self) -> Result<Arc<dyn Extractor>> {
        let Some(provider) = self.provider()? else {
            return Ok(Arc::new(OfflineExtractor));
        };

        let api_key = std::env::var(&self.llm.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            warn!(
                env = %self.llm.api_key_env,
                "API key not set; only the fallback parser will be used"
            );
            return Ok(Arc::new(OfflineExtractor));
        }

        let base_url = self
            .llm
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());
        let config = LlmConfig {
            provider,
            model: self.llm.model.clone(),
            base_url,
            api_key,
            temperature: self.llm.temperature,
            timeout: self.extraction_timeout(),
        };
        let prompt = PromptTemplate::new(
            self.extraction.language.clone(),
            self.extraction.stop_words.clone(),
        );
        let extractor = LlmExtractor::new(config, prompt).context("build HTTP client")?;
        info!(provider = ?provider, model = %self.llm.model, "language service configured");
        Ok(Arc::new(extractor))
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        let normalizer = Normalizer::new(self.extraction.stop_words.iter().cloned());
        Ok(
            Pipeline::new(self.extractor()?, normalizer, self.time_policy()?)
                .with_timeout(self.extraction_timeout()),
        )
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_fynmate_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
