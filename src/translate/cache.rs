use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process translation cache keyed by target language and source text
pub struct TranslationCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
    ttl: Duration,
}

impl TranslationCache {
    /// A zero `ttl` disables caching
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, text: &str, target_language: &str) -> Option<String> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = (target_language.to_string(), text.to_string());
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                debug!("Translation cache entry expired: {}", text);
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, text: &str, target_language: &str, value: &str) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            (target_language.to_string(), text.to_string()),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
