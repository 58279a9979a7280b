use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};

use crate::config::Config;
use crate::currency::CurrencyConverter;
use crate::error::{Result, SourcingError};
use crate::marketplace::normalize::upgrade_to_https;
use crate::marketplace::{MarketplaceApi, Normalizer};
use crate::model::{Product, SearchOptions, SearchResult, SearchSource};
use crate::ranking::{apply_filters, rank};
use crate::translate::{CompletionProvider, TermTranslator, TitleTranslator, contains_native_script};

/// Outcome of an image search.
///
/// `NotFound` means the marketplace answered with zero items, which callers
/// treat differently from a failed call.
#[derive(Debug)]
pub enum ImageSearchOutcome {
    Found(SearchResult),
    NotFound,
    Failed(SourcingError),
}

/// Single-item search: term translation, marketplace call, normalization,
/// ranking, filtering, truncation and title translation.
pub struct SearchService {
    marketplace: Arc<dyn MarketplaceApi>,
    terms: TermTranslator,
    titles: TitleTranslator,
    normalizer: Normalizer,
    fetch_limit: usize,
    max_term_words: usize,
    llm_term_fallback: bool,
    native_language: String,
}

impl SearchService {
    pub fn new(
        marketplace: Arc<dyn MarketplaceApi>,
        provider: Arc<dyn CompletionProvider>,
        config: &Config,
    ) -> Result<Self> {
        let converter = CurrencyConverter::from_config(&config.currency)?;
        Ok(Self {
            marketplace,
            terms: TermTranslator::new(),
            titles: TitleTranslator::new(provider, &config.completion.target_language)
                .with_cache_ttl(config.completion.cache_ttl()),
            normalizer: Normalizer::new(converter, &config.marketplace.detail_url_template),
            fetch_limit: config.marketplace.fetch_limit,
            max_term_words: config.search.max_term_words,
            llm_term_fallback: config.search.llm_term_fallback,
            native_language: config.completion.native_language.clone(),
        })
    }

    /// Keyword search for a human-readable query
    pub async fn search_keyword(&self, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SourcingError::InvalidInput("Search query is empty".to_string()));
        }

        let simplified = self.terms.simplify(query, self.max_term_words);
        let term = self.native_term(&simplified, options).await;
        info!("Searching for: \"{}\" (sent: \"{}\")", query, term);

        let raw = self.marketplace
            .search_by_keyword(&term, self.request_limit(options))
            .await?;
        let products = self.normalizer.normalize_all(&raw);
        let items = self.finish(products, options).await;

        Ok(SearchResult {
            query: query.to_string(),
            query_native: (term != simplified).then_some(term),
            total_found: items.len(),
            items,
            searched_at: Utc::now(),
            source: SearchSource::Keyword,
            error: None,
        })
    }

    /// Image search; zero upstream items yields `NotFound` rather than an empty result
    pub async fn search_image(&self, image_url: &str, options: &SearchOptions) -> ImageSearchOutcome {
        let image_url = upgrade_to_https(image_url);
        if image_url.is_empty() {
            return ImageSearchOutcome::Failed(SourcingError::InvalidInput("Image URL is empty".to_string()));
        }

        let raw = match self.marketplace.search_by_image(&image_url, self.request_limit(options)).await {
            Ok(raw) => raw,
            Err(e) => return ImageSearchOutcome::Failed(e),
        };

        if raw.is_empty() {
            return ImageSearchOutcome::NotFound;
        }

        let products = self.normalizer.normalize_all(&raw);
        if products.is_empty() {
            debug!("Image search returned {} records, none usable", raw.len());
            return ImageSearchOutcome::NotFound;
        }

        let items = self.finish(products, options).await;
        ImageSearchOutcome::Found(SearchResult {
            query: image_url,
            query_native: None,
            total_found: items.len(),
            items,
            searched_at: Utc::now(),
            source: SearchSource::Image,
            error: None,
        })
    }

    /// Term actually sent to the marketplace for an already simplified phrase
    async fn native_term(&self, simplified: &str, options: &SearchOptions) -> String {
        if !options.translate_term || contains_native_script(simplified) {
            return simplified.to_string();
        }

        let translated = self.terms.translate(simplified);
        if translated != simplified || !self.llm_term_fallback {
            return translated;
        }

        debug!("No dictionary entry for \"{}\", asking completion provider", simplified);
        self.titles.translate_text(simplified, &self.native_language).await
    }

    fn request_limit(&self, options: &SearchOptions) -> usize {
        self.fetch_limit.max(options.max_results)
    }

    /// Rank, filter, truncate, then translate what is left
    async fn finish(&self, products: Vec<Product>, options: &SearchOptions) -> Vec<Product> {
        let mut items = apply_filters(rank(products), &options.filters);
        items.truncate(options.max_results);
        self.translate_products(items).await
    }

    /// Titles, supplier names and locations go out in one batched request
    async fn translate_products(&self, mut items: Vec<Product>) -> Vec<Product> {
        let n = items.len();
        if n == 0 {
            return items;
        }

        let mut texts = Vec::with_capacity(n * 3);
        texts.extend(items.iter().map(|p| p.title_native.clone()));
        texts.extend(items.iter().map(|p| p.supplier.name_native.clone()));
        texts.extend(items.iter().map(|p| p.supplier.location_native.clone()));

        let translated = self.titles.translate_titles(&texts).await;
        for (i, product) in items.iter_mut().enumerate() {
            product.title = translated[i].clone();
            product.supplier.name = translated[n + i].clone();
            product.supplier.location = translated[2 * n + i].clone();
        }
        items
    }
}
