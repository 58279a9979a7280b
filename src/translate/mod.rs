// Translation for marketplace sourcing
//
// - terms: static dictionary mapping search phrases into the marketplace language
// - titles: batched, best-effort translation of listing text back to the caller's language
// - provider: text-completion backends (Ollama, OpenAI-compatible)
// - cache: in-process reuse of successful translations

pub mod terms;
pub mod titles;
pub mod provider;
pub mod cache;

use std::sync::Arc;
use async_trait::async_trait;

pub use terms::{TermTranslator, contains_native_script};
pub use titles::TitleTranslator;
pub use cache::TranslationCache;
use crate::config::{CompletionConfig, CompletionProviderKind};
use crate::error::Result;

/// A text-completion backend: system instruction plus prompt in, plain text out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Factory for creating completion providers
pub struct CompletionProviderFactory;

impl CompletionProviderFactory {
    pub fn create_provider(config: CompletionConfig) -> Result<Arc<dyn CompletionProvider>> {
        match config.provider {
            CompletionProviderKind::Ollama => Ok(Arc::new(provider::OllamaProvider::new(config)?)),
            CompletionProviderKind::OpenAi => Ok(Arc::new(provider::OpenAiProvider::new(config)?)),
        }
    }
}
