// Marketplace access
//
// - client: HTTP client for the marketplace search API (keyword and image search)
// - normalize: defensive mapping from raw payload items to the internal Product model

pub mod client;
pub mod normalize;

use std::sync::Arc;
use async_trait::async_trait;

pub use client::HttpMarketplaceClient;
pub use normalize::{DropReason, Normalized, Normalizer};
use crate::config::MarketplaceConfig;
use crate::error::Result;

/// One item of the upstream payload, untyped until normalized
pub type RawItem = serde_json::Value;

/// Main trait for marketplace search operations.
///
/// An empty list is a valid answer and is distinct from an `Err`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Search listings by a native-language keyword
    async fn search_by_keyword(&self, term: &str, limit: usize) -> Result<Vec<RawItem>>;

    /// Search listings similar to a reference image.
    ///
    /// Fails with `SourcingError::ImageSearchTimeout` when the call exceeds its timeout.
    async fn search_by_image(&self, image_url: &str, limit: usize) -> Result<Vec<RawItem>>;
}

/// Factory for creating marketplace clients
pub struct MarketplaceClientFactory;

impl MarketplaceClientFactory {
    pub fn create_client(config: MarketplaceConfig) -> Result<Arc<dyn MarketplaceApi>> {
        Ok(Arc::new(HttpMarketplaceClient::new(config)?))
    }
}
