use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use regex::Regex;
use tracing::{debug, warn};

use super::{CompletionProvider, contains_native_script};
use super::cache::TranslationCache;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s*(.+)$").expect("numbered line pattern is valid"));

/// Best-effort translation through a completion provider.
///
/// Nothing here returns an error: any provider failure degrades to the
/// original text, and the degradation is only visible in the logs.
/// Successful translations are reused until the cache TTL runs out.
pub struct TitleTranslator {
    provider: Arc<dyn CompletionProvider>,
    target_language: String,
    cache: TranslationCache,
}

impl TitleTranslator {
    pub fn new(provider: Arc<dyn CompletionProvider>, target_language: &str) -> Self {
        Self {
            provider,
            target_language: target_language.to_string(),
            cache: TranslationCache::new(DEFAULT_CACHE_TTL),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TranslationCache::new(ttl);
        self
    }

    /// Translate native-script titles in one batched request.
    ///
    /// Output has the same length and order as `titles`; entries without
    /// native-script characters are returned unchanged and never sent.
    /// Cached and repeated entries are sent at most once.
    pub async fn translate_titles(&self, titles: &[String]) -> Vec<String> {
        let mut output = titles.to_vec();
        let mut pending: Vec<&str> = Vec::new();

        for (idx, title) in titles.iter().enumerate() {
            if !contains_native_script(title) {
                continue;
            }
            if let Some(cached) = self.cache.get(title, &self.target_language) {
                output[idx] = cached;
            } else if !pending.contains(&title.as_str()) {
                pending.push(title);
            }
        }

        if pending.is_empty() {
            return output;
        }

        let numbered = pending
            .iter()
            .enumerate()
            .map(|(n, text)| format!("{}. {}", n + 1, single_line(text)))
            .collect::<Vec<_>>()
            .join("\n");

        let system = format!(
            "You are a professional translator for a construction materials buyer. \
             Translate each numbered product title to {}. \
             Keep brand names, model numbers and units as they are. \
             Answer with the same numbering, one title per line, formatted as \"N. translation\", \
             and nothing else.",
            self.target_language
        );

        debug!("Translating {} of {} titles to {}", pending.len(), titles.len(), self.target_language);

        let response = match self.provider.complete(&system, &numbered).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Batch title translation failed, keeping original titles: {}", e);
                return output;
            }
        };

        let translated = parse_numbered_response(&response);
        let mut resolved: HashMap<&str, &String> = HashMap::new();
        for (n, &text) in pending.iter().enumerate() {
            if let Some(translation) = translated.get(&(n + 1)) {
                self.cache.insert(text, &self.target_language, translation);
                resolved.insert(text, translation);
            }
        }

        let missing = pending.len() - resolved.len();
        if missing > 0 {
            warn!("{} of {} titles missing from translation response, kept original", missing, pending.len());
        }

        for (idx, title) in titles.iter().enumerate() {
            if let Some(translation) = resolved.get(title.as_str()) {
                output[idx] = (*translation).clone();
            }
        }

        output
    }

    /// Translate a single string, returning it unchanged on failure
    pub async fn translate_text(&self, text: &str, target_language: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        if let Some(cached) = self.cache.get(text, target_language) {
            return cached;
        }

        let system = format!(
            "You are a professional translator. Translate the user's text to {}. \
             Return ONLY the translation, without quotes, explanations or alternatives.",
            target_language
        );

        match self.provider.complete(&system, text).await {
            Ok(response) => match clean_single_response(&response) {
                Some(cleaned) => {
                    self.cache.insert(text, target_language, &cleaned);
                    cleaned
                }
                None => {
                    warn!("Empty translation for '{}', keeping original", text);
                    text.to_string()
                }
            },
            Err(e) => {
                warn!("Translation of '{}' failed, keeping original: {}", text, e);
                text.to_string()
            }
        }
    }
}

/// Parse `N. text` lines into a 1-based index map; other lines are ignored
pub fn parse_numbered_response(response: &str) -> HashMap<usize, String> {
    let mut translated = HashMap::new();
    for line in response.lines() {
        let line = line.trim();
        if let Some(caps) = NUMBERED_LINE.captures(line) {
            let Ok(n) = caps[1].parse::<usize>() else {
                continue;
            };
            let text = caps[2].trim();
            if !text.is_empty() {
                translated.entry(n).or_insert_with(|| text.to_string());
            }
        }
    }
    translated
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_single_response(response: &str) -> Option<String> {
    let line = response.lines().map(str::trim).find(|line| !line.is_empty())?;
    let line = line.trim_matches(|c| c == '"' || c == '“' || c == '”' || c == '\'').trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}
