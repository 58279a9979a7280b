use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::error::{Result, SourcingError};
use super::CompletionProvider;

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourcingError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` provider
pub struct OllamaProvider {
    client: Client,
    config: CompletionConfig,
}

impl OllamaProvider {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending completion request to: {}", url);

        let request = GenerateRequest {
            model: &self.config.model,
            system,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourcingError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourcingError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let body: GenerateResponse = response.json().await
            .map_err(|e| SourcingError::Translation(format!("Failed to parse response: {}", e)))?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(SourcingError::Translation("Empty completion received".to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` provider (DeepSeek by default)
pub struct OpenAiProvider {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiProvider {
    /// A missing key is not fatal: every completion then fails with a
    /// `Translation` error and callers keep the untranslated text.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            warn!("Completion API key is not configured (set completion.api_key or COMPLETION_API_KEY); translations are disabled");
        }
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        if self.config.api_key.trim().is_empty() {
            return Err(SourcingError::Translation("No completion API key configured".to_string()));
        }

        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending chat completion request to: {}", url);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.config.temperature,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourcingError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourcingError::Translation(format!(
                "Completion API error {}: {}", status, error_text
            )));
        }

        let body: ChatResponse = response.json().await
            .map_err(|e| SourcingError::Translation(format!("Failed to parse response: {}", e)))?;

        let text = body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(SourcingError::Translation("Empty completion received".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompletionProviderKind, Config};

    #[tokio::test]
    async fn test_openai_provider_without_key_fails_softly() {
        let config = Config::default().completion;
        let provider = OpenAiProvider::new(config).unwrap();
        let err = provider.complete("Translate.", "电缆").await.unwrap_err();
        assert!(matches!(err, SourcingError::Translation(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_ollama_provider_needs_no_key() {
        let mut config = Config::default().completion;
        config.provider = CompletionProviderKind::Ollama;
        config.endpoint = "http://localhost:11434".to_string();
        assert!(OllamaProvider::new(config).is_ok());
    }

    #[test]
    fn test_chat_response_tolerates_null_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }

    #[test]
    fn test_generate_request_carries_system_instruction() {
        let request = GenerateRequest {
            model: "qwen2.5",
            system: "Translate.",
            prompt: "1. 电缆",
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "Translate.");
        assert_eq!(json["stream"], false);
    }
}
