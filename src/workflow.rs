use std::time::Duration;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::marketplace::MarketplaceClientFactory;
use crate::model::{BatchReport, BatchStatus, Material, SearchOptions, SearchResult};
use crate::search::{ImageSearchOutcome, SearchService};
use crate::translate::CompletionProviderFactory;

/// Progress notification: `(processed, total, label)`
pub type ProgressCallback<'a> = dyn FnMut(usize, usize, &str) + Send + 'a;

pub const COMPLETED_LABEL: &str = "Completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
}

/// Per-material search with image-first fallback to keyword search
pub struct SourcingWorkflow {
    search: SearchService,
}

impl SourcingWorkflow {
    pub fn new(search: SearchService) -> Self {
        Self { search }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let marketplace = MarketplaceClientFactory::create_client(config.marketplace.clone())?;
        let provider = CompletionProviderFactory::create_provider(config.completion.clone())?;
        Ok(Self::new(SearchService::new(marketplace, provider, config)?))
    }

    pub fn search_service(&self) -> &SearchService {
        &self.search
    }

    /// Search one material; the result is always keyed by the material label
    pub async fn search_material(&self, material: &Material, options: &SearchOptions) -> Result<SearchResult> {
        let label = material.label();

        if let Some(image_url) = material.first_image() {
            match self.search.search_image(image_url, options).await {
                ImageSearchOutcome::Found(mut result) => {
                    info!("Image search matched {} items for \"{}\"", result.items.len(), label);
                    result.query = label;
                    return Ok(result);
                }
                ImageSearchOutcome::NotFound => {
                    info!("No image results for \"{}\", falling back to keyword search", label);
                }
                ImageSearchOutcome::Failed(e) if e.is_fatal() => return Err(e),
                ImageSearchOutcome::Failed(e) => {
                    warn!("Image search failed for \"{}\": {}, falling back to keyword search", label, e);
                }
            }
        }

        self.search.search_keyword(&label, options).await
    }
}

/// Sequential, rate-limited batch runner
pub struct BatchOrchestrator {
    workflow: SourcingWorkflow,
    inter_call_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(workflow: SourcingWorkflow, inter_call_delay: Duration) -> Self {
        Self {
            workflow,
            inter_call_delay,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            SourcingWorkflow::from_config(config)?,
            config.batch.inter_call_delay(),
        ))
    }

    pub fn workflow(&self) -> &SourcingWorkflow {
        &self.workflow
    }

    /// Search every material in order, one at a time.
    ///
    /// Per-item failures become empty placeholders; only configuration errors
    /// abort the batch. On cancellation the report covers the work done so far
    /// and the remaining items are counted as skipped.
    pub async fn run_batch(
        &self,
        materials: &[Material],
        options: &SearchOptions,
        mut on_progress: Option<&mut ProgressCallback<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchReport> {
        let started_at = Utc::now();
        let total = materials.len();
        let mut results = Vec::with_capacity(total);
        let mut completed = 0;
        let mut failed = 0;

        let mut state = BatchState::NotStarted;
        debug!("Batch state: {:?}", state);
        state = BatchState::Running;
        info!("Starting batch search for {} materials", total);

        for (idx, material) in materials.iter().enumerate() {
            let label = material.label();

            if is_cancelled(cancel) {
                state = BatchState::Cancelled;
                break;
            }

            if idx > 0 && self.pause(cancel).await {
                state = BatchState::Cancelled;
                break;
            }

            match self.workflow.search_material(material, options).await {
                Ok(result) => {
                    info!("Completed {}/{}: \"{}\" - {} results", idx + 1, total, label, result.total_found);
                    completed += 1;
                    results.push(result);
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting batch at {}/{}: {}", idx + 1, total, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed {}/{}: \"{}\": {}", idx + 1, total, label, e);
                    failed += 1;
                    results.push(SearchResult::failed(&label, &e));
                }
            }

            if let Some(progress) = on_progress.as_deref_mut() {
                progress(idx + 1, total, &label);
            }
        }

        let skipped = total - results.len();
        for material in &materials[results.len()..] {
            results.push(SearchResult::placeholder(&material.label()));
        }

        let status = if state == BatchState::Cancelled {
            warn!("Batch cancelled: {} completed, {} failed, {} skipped", completed, failed, skipped);
            BatchStatus::Cancelled
        } else {
            state = BatchState::Completed;
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(total, total, COMPLETED_LABEL);
            }
            info!("Batch completed: {} succeeded, {} failed", completed, failed);
            BatchStatus::Completed
        };
        debug!("Batch state: {:?}", state);

        Ok(BatchReport {
            total_requested: total,
            completed,
            failed,
            skipped,
            status,
            results,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Wait out the inter-call delay; true when cancelled meanwhile
    async fn pause(&self, cancel: Option<&CancellationToken>) -> bool {
        if self.inter_call_delay.is_zero() {
            return is_cancelled(cancel);
        }
        match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(self.inter_call_delay) => false,
            },
            None => {
                tokio::time::sleep(self.inter_call_delay).await;
                false
            }
        }
    }
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(CancellationToken::is_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use serde_json::json;
    use crate::error::SourcingError;
    use crate::marketplace::MockMarketplaceApi;
    use crate::model::SearchSource;
    use crate::translate::MockCompletionProvider;

    fn quiet_provider() -> MockCompletionProvider {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().times(0);
        provider
    }

    fn workflow(marketplace: MockMarketplaceApi) -> SourcingWorkflow {
        let search = SearchService::new(Arc::new(marketplace), Arc::new(quiet_provider()), &Config::default()).unwrap();
        SourcingWorkflow::new(search)
    }

    fn orchestrator(marketplace: MockMarketplaceApi, delay: Duration) -> BatchOrchestrator {
        BatchOrchestrator::new(workflow(marketplace), delay)
    }

    fn items(n: usize) -> Vec<serde_json::Value> {
        (0..n)
            .map(|i| json!({"item_id": format!("p{}", i), "title": format!("item {}", i), "price": "3.2"}))
            .collect()
    }

    fn network_error() -> SourcingError {
        SourcingError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"))
    }

    fn three_materials() -> Vec<Material> {
        vec![Material::new("Ciment"), Material::new("Brique"), Material::new("Carrelage")]
    }

    #[test]
    fn test_from_config_needs_only_marketplace_key() {
        let mut config = Config::default();
        config.marketplace.api_key = "marketplace-key".to_string();
        config.completion.api_key = String::new();
        assert!(SourcingWorkflow::from_config(&config).is_ok());
        assert!(BatchOrchestrator::from_config(&config).is_ok());

        config.marketplace.api_key = String::new();
        assert!(SourcingWorkflow::from_config(&config).is_err_and(|e| e.is_fatal()));
    }

    #[tokio::test]
    async fn test_image_not_found_falls_back_with_same_query() {
        let material = Material::new("Câble").with_description("cuivre");

        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_image().times(1).returning(|_, _| Ok(Vec::new()));
        marketplace.expect_search_by_keyword().times(2).returning(|_, _| Ok(items(2)));
        let workflow = workflow(marketplace);

        let options = SearchOptions::default();
        let with_image = workflow
            .search_material(&material.clone().with_image("https://img.example/cable.jpg"), &options)
            .await
            .unwrap();
        let without_image = workflow.search_material(&material, &options).await.unwrap();

        assert_eq!(with_image.query, "Câble cuivre");
        assert_eq!(with_image.query, without_image.query);
        assert_eq!(with_image.source, SearchSource::Keyword);
        assert_eq!(with_image.items.len(), 2);
    }

    #[tokio::test]
    async fn test_image_error_falls_back_to_keyword() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace
            .expect_search_by_image()
            .returning(|_, _| Err(SourcingError::ImageSearchTimeout(Duration::from_secs(15))));
        marketplace
            .expect_search_by_keyword()
            .withf(|term, _| term == "水龙头")
            .times(1)
            .returning(|_, _| Ok(items(1)));

        let material = Material::new("Robinet").with_image("https://img.example/tap.jpg");
        let result = workflow(marketplace)
            .search_material(&material, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.query, "Robinet");
        assert_eq!(result.query_native.as_deref(), Some("水龙头"));
    }

    #[tokio::test]
    async fn test_image_match_skips_keyword_and_keeps_label() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_image().times(1).returning(|_, _| Ok(items(3)));
        marketplace.expect_search_by_keyword().times(0);

        let material = Material::new("Lavabo").with_description("céramique").with_image("https://img.example/sink.jpg");
        let result = workflow(marketplace)
            .search_material(&material, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.query, "Lavabo céramique");
        assert_eq!(result.source, SearchSource::Image);
        assert_eq!(result.items.len(), 3);
    }

    #[tokio::test]
    async fn test_image_config_error_is_not_fallen_back() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace
            .expect_search_by_image()
            .returning(|_, _| Err(SourcingError::Config("missing key".to_string())));
        marketplace.expect_search_by_keyword().times(0);

        let material = Material::new("Porte").with_image("https://img.example/door.jpg");
        let err = workflow(marketplace)
            .search_material(&material, &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_batch_counts_failures_and_keeps_order() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace
            .expect_search_by_keyword()
            .withf(|term, _| term == "砖")
            .returning(|_, _| Err(network_error()));
        marketplace
            .expect_search_by_keyword()
            .withf(|term, _| term != "砖")
            .returning(|_, _| Ok(items(2)));

        let mut calls: Vec<(usize, usize, String)> = Vec::new();
        let mut record = |done: usize, total: usize, label: &str| calls.push((done, total, label.to_string()));

        let report = orchestrator(marketplace, Duration::ZERO)
            .run_batch(&three_materials(), &SearchOptions::default(), Some(&mut record), None)
            .await
            .unwrap();

        assert_eq!(report.total_requested, 3);
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.status, BatchStatus::Completed);
        assert_eq!(report.results.len(), 3);
        assert!(report.results[1].items.is_empty());
        assert_eq!(report.results[1].total_found, 0);
        assert_eq!(report.results[1].query, "Brique");
        assert_eq!(report.results[1].error.as_deref(), Some("IO error: connection refused"));
        assert!(report.results[0].error.is_none());
        assert_eq!(report.results[2].items.len(), 2);

        assert_eq!(
            calls,
            vec![
                (1, 3, "Ciment".to_string()),
                (2, 3, "Brique".to_string()),
                (3, 3, "Carrelage".to_string()),
                (3, 3, COMPLETED_LABEL.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_survives_all_failures() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_keyword().returning(|_, _| {
            Err(SourcingError::Marketplace { code: 500, message: "down".to_string() })
        });

        let materials: Vec<Material> = (0..5).map(|i| Material::new(&format!("ciment {}", i))).collect();
        let report = orchestrator(marketplace, Duration::ZERO)
            .run_batch(&materials, &SearchOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.results.len(), materials.len());
        assert_eq!(report.completed + report.failed, materials.len());
        assert_eq!(report.failed, 5);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_config_error() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace
            .expect_search_by_keyword()
            .times(1)
            .returning(|_, _| Err(SourcingError::Config("API key rejected".to_string())));

        let err = orchestrator(marketplace, Duration::ZERO)
            .run_batch(&three_materials(), &SearchOptions::default(), None, None)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_cancellation_reports_skipped_items() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_keyword().times(1).returning(|_, _| Ok(items(1)));

        let token = CancellationToken::new();
        let trigger = token.clone();
        let mut calls = Vec::new();
        let mut progress = |done: usize, total: usize, label: &str| {
            calls.push((done, total, label.to_string()));
            if done == 1 {
                trigger.cancel();
            }
        };

        let report = orchestrator(marketplace, Duration::from_secs(60))
            .run_batch(&three_materials(), &SearchOptions::default(), Some(&mut progress), Some(&token))
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Cancelled);
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[2].query, "Carrelage");
        assert!(report.results[2].items.is_empty());
        assert!(report.results[2].error.is_none());
        assert_eq!(calls, vec![(1, 3, "Ciment".to_string())]);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_interrupts_wait() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_keyword().times(1).returning(|_, _| Ok(items(1)));

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let report = orchestrator(marketplace, Duration::from_secs(30))
            .run_batch(&three_materials(), &SearchOptions::default(), None, Some(&token))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(report.status, BatchStatus::Cancelled);
        assert_eq!(report.completed + report.failed + report.skipped, 3);
    }

    #[tokio::test]
    async fn test_pre_cancelled_batch_does_nothing() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_keyword().times(0);

        let token = CancellationToken::new();
        token.cancel();
        let report = orchestrator(marketplace, Duration::ZERO)
            .run_batch(&three_materials(), &SearchOptions::default(), None, Some(&token))
            .await
            .unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(report.results.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_call_delay_is_honored() {
        let mut marketplace = MockMarketplaceApi::new();
        marketplace.expect_search_by_keyword().times(3).returning(|_, _| Ok(items(1)));

        let started = tokio::time::Instant::now();
        let report = orchestrator(marketplace, Duration::from_millis(1000))
            .run_batch(&three_materials(), &SearchOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.completed, 3);
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert!(started.elapsed() < Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let marketplace = MockMarketplaceApi::new();
        let mut calls = Vec::new();
        let mut record = |done: usize, total: usize, label: &str| calls.push((done, total, label.to_string()));
        let report = orchestrator(marketplace, Duration::ZERO)
            .run_batch(&[], &SearchOptions::default(), Some(&mut record), None)
            .await
            .unwrap();
        assert_eq!(report.total_requested, 0);
        assert!(report.results.is_empty());
        assert_eq!(calls, vec![(0, 0, COMPLETED_LABEL.to_string())]);
    }
}
