use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SourcingError};
use crate::model::{SearchFilters, SearchOptions};

// Default values for optional configuration keys
fn default_max_term_words() -> usize {
    5
}

fn default_llm_term_fallback() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_detail_url_template() -> String {
    "https://detail.1688.com/offer/{id}.html".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub marketplace: MarketplaceConfig,
    pub completion: CompletionConfig,
    pub search: SearchConfig,
    pub batch: BatchConfig,
    pub currency: CurrencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Base URL of the marketplace search API
    pub base_url: String,
    /// Path of the keyword search endpoint
    pub keyword_path: String,
    /// Path of the image search endpoint
    pub image_path: String,
    /// API key sent with every request
    pub api_key: String,
    /// Header carrying the API key
    pub api_key_header: String,
    /// Host value sent alongside the key
    pub api_host: String,
    /// Header carrying the host value
    pub api_host_header: String,
    /// Timeout for keyword search requests (seconds)
    pub request_timeout_secs: u64,
    /// Timeout for image search requests (seconds)
    pub image_timeout_secs: u64,
    /// Number of raw items requested per search, before ranking and truncation
    pub fetch_limit: usize,
    /// Template for product URLs when the payload carries none; `{id}` is replaced
    #[serde(default = "default_detail_url_template")]
    pub detail_url_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CompletionProviderKind {
    /// Local Ollama server (`/api/generate`)
    Ollama,
    /// OpenAI-compatible chat completions endpoint (DeepSeek, OpenAI)
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub provider: CompletionProviderKind,
    /// Provider endpoint URL
    pub endpoint: String,
    /// Model used for translation
    pub model: String,
    /// API key, required by the OpenAI-compatible provider
    pub api_key: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
    pub temperature: f32,
    /// Language the caller reads, used in translation prompts
    pub target_language: String,
    /// Language of the marketplace
    pub native_language: String,
    /// How long translations are reused in-process (seconds, 0 disables)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of products kept per search
    pub max_results: usize,
    /// Translate search terms into the marketplace language
    pub translate_terms: bool,
    /// Ask the completion provider when the static dictionary has no match
    #[serde(default = "default_llm_term_fallback")]
    pub llm_term_fallback: bool,
    /// Search phrases are cut down to this many words
    #[serde(default = "default_max_term_words")]
    pub max_term_words: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_moq: Option<u32>,
    pub max_moq: Option<u32>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Minimum delay between two marketplace calls (milliseconds)
    pub inter_call_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency the marketplace quotes in
    pub source_code: String,
    /// Currency of the batch report
    pub target_code: String,
    /// Units of target currency per unit of source currency
    pub rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marketplace: MarketplaceConfig {
                base_url: "https://1688-datahub.p.rapidapi.com".to_string(),
                keyword_path: "/search/items".to_string(),
                image_path: "/search/image".to_string(),
                api_key: String::new(),
                api_key_header: "x-rapidapi-key".to_string(),
                api_host: "1688-datahub.p.rapidapi.com".to_string(),
                api_host_header: "x-rapidapi-host".to_string(),
                request_timeout_secs: 30,
                image_timeout_secs: 15,
                fetch_limit: 20,
                detail_url_template: default_detail_url_template(),
            },
            completion: CompletionConfig {
                provider: CompletionProviderKind::OpenAi,
                endpoint: "https://api.deepseek.com/v1".to_string(),
                model: "deepseek-chat".to_string(),
                api_key: String::new(),
                timeout_secs: 60,
                temperature: 0.3,
                target_language: "French".to_string(),
                native_language: "Chinese".to_string(),
                cache_ttl_secs: default_cache_ttl_secs(),
            },
            search: SearchConfig {
                max_results: 10,
                translate_terms: true,
                llm_term_fallback: true,
                max_term_words: 5,
                min_price: None,
                max_price: None,
                min_moq: None,
                max_moq: None,
                min_rating: None,
            },
            batch: BatchConfig {
                inter_call_delay_ms: 1000,
            },
            currency: CurrencyConfig {
                source_code: "CNY".to_string(),
                target_code: "XOF".to_string(),
                rate: 90.0,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SourcingError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SourcingError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SourcingError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SourcingError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Take secrets from the environment when present
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MARKETPLACE_API_KEY") {
            if !key.trim().is_empty() {
                self.marketplace.api_key = key.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var("COMPLETION_API_KEY") {
            if !key.trim().is_empty() {
                self.completion.api_key = key.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.marketplace.api_key.trim().is_empty() {
            return Err(SourcingError::Config(
                "Marketplace API key is not configured (set marketplace.api_key or MARKETPLACE_API_KEY)".to_string(),
            ));
        }
        if self.marketplace.image_timeout_secs == 0 || self.marketplace.request_timeout_secs == 0 {
            return Err(SourcingError::Config("Marketplace timeouts must be greater than zero".to_string()));
        }
        if self.completion.timeout_secs == 0 {
            return Err(SourcingError::Config("Completion timeout must be greater than zero".to_string()));
        }
        if !self.currency.rate.is_finite() || self.currency.rate <= 0.0 {
            return Err(SourcingError::Config(format!(
                "Currency rate must be positive, got {}", self.currency.rate
            )));
        }
        if self.search.max_results == 0 {
            return Err(SourcingError::Config("search.max_results must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl SearchConfig {
    /// Default per-search options derived from configuration
    pub fn to_options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.max_results,
            translate_term: self.translate_terms,
            filters: SearchFilters {
                min_price: self.min_price,
                max_price: self.max_price,
                min_moq: self.min_moq,
                max_moq: self.max_moq,
                min_rating: self.min_rating,
            },
        }
    }
}

impl CompletionConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl BatchConfig {
    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }
}
