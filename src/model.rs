//! Data model shared by the search pipeline and the batch report.
//!
//! Everything here is created fresh per invocation; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price range in a single currency.
///
/// `min <= max` is not guaranteed by the marketplace; rank and filter on `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub min: f64,
    pub max: f64,
    pub currency_code: String,
}

impl Price {
    pub fn zero(currency_code: &str) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency_code: currency_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub name: String,
    pub name_native: String,
    pub location: String,
    pub location_native: String,
    pub years_on_platform: Option<u32>,
    pub rating: Option<f64>,
    pub verified: bool,
}

/// A normalized marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub title_native: String,
    pub price: Price,
    pub price_converted: Price,
    pub minimum_order_quantity: u32,
    pub units_sold: u64,
    /// Percentage in 0..=100
    pub repurchase_rate: Option<f64>,
    pub supplier: Supplier,
    pub image_url: String,
    pub product_url: String,
}

impl Product {
    /// Composite quality score used for ranking
    pub fn quality_score(&self) -> f64 {
        self.supplier.rating.unwrap_or(0.0) + self.repurchase_rate.unwrap_or(0.0) / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Keyword,
    Image,
    /// Placeholder for an item that failed or was skipped
    None,
}

/// One logical search, keyed by the human-readable material label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    /// Native-language term actually sent, when translation changed it
    pub query_native: Option<String>,
    pub items: Vec<Product>,
    pub searched_at: DateTime<Utc>,
    pub total_found: usize,
    pub source: SearchSource,
    /// Why the search failed, on batch placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    /// Zero-result entry standing in for a failed or skipped item
    pub fn placeholder(query: &str) -> Self {
        Self {
            query: query.to_string(),
            query_native: None,
            items: Vec::new(),
            searched_at: Utc::now(),
            total_found: 0,
            source: SearchSource::None,
            error: None,
        }
    }

    /// Placeholder recording the failure that produced it
    pub fn failed(query: &str, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::placeholder(query)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_requested: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items never attempted because the batch was cancelled
    pub skipped: usize,
    pub status: BatchStatus,
    pub results: Vec<SearchResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A material to source, as supplied by the project store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_image(mut self, url: &str) -> Self {
        self.images.push(url.to_string());
        self
    }

    /// Name and description, space-joined and trimmed
    pub fn label(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => {
                format!("{} {}", self.name.trim(), description).trim().to_string()
            }
            _ => self.name.trim().to_string(),
        }
    }

    pub fn first_image(&self) -> Option<&str> {
        self.images
            .iter()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
    }
}

/// Optional post-filters; prices are in the marketplace currency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_moq: Option<u32>,
    pub max_moq: Option<u32>,
    pub min_rating: Option<f64>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub max_results: usize,
    pub translate_term: bool,
    pub filters: SearchFilters,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            translate_term: true,
            filters: SearchFilters::default(),
        }
    }
}
