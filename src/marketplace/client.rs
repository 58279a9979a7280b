use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MarketplaceConfig;
use crate::error::{Result, SourcingError};
use super::{MarketplaceApi, RawItem};

const SUCCESS_CODE: i64 = 200;

/// HTTP client for the marketplace search API
pub struct HttpMarketplaceClient {
    client: Client,
    config: MarketplaceConfig,
    image_timeout: Duration,
}

impl HttpMarketplaceClient {
    pub fn new(config: MarketplaceConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SourcingError::Config("Marketplace API key is not configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header_name(&config.api_key_header)?,
            header_value(&config.api_key, "API key")?,
        );
        if !config.api_host.trim().is_empty() {
            headers.insert(
                header_name(&config.api_host_header)?,
                header_value(&config.api_host, "API host")?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SourcingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            config,
        })
    }

    async fn get_items(&self, path: &str, query: &[(&str, String)], timeout: Option<Duration>) -> Result<Vec<RawItem>> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url).query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourcingError::Marketplace {
                code: i64::from(status.as_u16()),
                message: error_text,
            });
        }

        let body: Value = response.json().await?;
        extract_items(body)
    }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceClient {
    async fn search_by_keyword(&self, term: &str, limit: usize) -> Result<Vec<RawItem>> {
        let query = [
            ("keyword", term.to_string()),
            ("page", "1".to_string()),
            ("page_size", limit.to_string()),
        ];
        let items = self.get_items(&self.config.keyword_path, &query, None).await?;
        info!("Keyword search '{}' returned {} items", term, items.len());
        Ok(items)
    }

    async fn search_by_image(&self, image_url: &str, limit: usize) -> Result<Vec<RawItem>> {
        let query = [
            ("img_url", image_url.to_string()),
            ("page", "1".to_string()),
            ("page_size", limit.to_string()),
        ];

        let call = self.get_items(&self.config.image_path, &query, Some(self.image_timeout));
        let items = match tokio::time::timeout(self.image_timeout, call).await {
            Ok(Ok(items)) => items,
            Ok(Err(SourcingError::Http(e))) if e.is_timeout() => {
                return Err(SourcingError::ImageSearchTimeout(self.image_timeout));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(SourcingError::ImageSearchTimeout(self.image_timeout)),
        };

        info!("Image search returned {} items", items.len());
        Ok(items)
    }
}

/// Unwrap the `{code, msg, data: {items}}` envelope
pub fn extract_items(body: Value) -> Result<Vec<RawItem>> {
    let code = match body.get("code") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    let Some(code) = code else {
        return Err(SourcingError::Marketplace {
            code: -1,
            message: "Response envelope has no status code".to_string(),
        });
    };

    if code != SUCCESS_CODE {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SourcingError::Marketplace { code, message });
    }

    let items = match body.get("data") {
        Some(Value::Object(data)) => match data.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    Ok(items)
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| SourcingError::Config(format!("Invalid header name '{}': {}", name, e)))
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value.trim())
        .map_err(|e| SourcingError::Config(format!("Invalid {}: {}", what, e)))?;
    value.set_sensitive(true);
    Ok(value)
}
