use std::path::PathBuf;

use futures::future;
use tokio::time::sleep;

use crate::browser::{Browser, Page};
use crate::config::HarvestConfig;
use crate::query::Query;
use crate::record::Dataset;
use crate::session::HarvestSession;

/// Destination of finished datasets, one artifact per query.
pub trait DatasetSink: Send + Sync {
    /// Persists `dataset` and returns where it went.
    fn write(&self, dataset: &Dataset) -> anyhow::Result<PathBuf>;
}

/// What is left of one query once its dataset has been handed to the sink.
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub query: Query,
    pub artifact: Option<PathBuf>,
    pub feed_items: usize,
    pub records: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub queries: Vec<QueryReport>,
}

impl BatchReport {
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.queries
            .iter()
            .filter_map(|q| q.artifact.clone())
            .collect()
    }

    pub fn records(&self) -> usize {
        self.queries.iter().map(|q| q.records).sum()
    }

    pub fn failures(&self) -> usize {
        self.queries.iter().filter(|q| q.error.is_some()).count()
    }
}

/// Runs queries in fixed-size chunks of concurrent sessions.
///
/// Chunks run one after the other with a cooldown in between. Sessions of a chunk share the
/// current task, each in its own browsing context.
pub struct BatchOrchestrator<B, S> {
    browser: B,
    sink: S,
    config: HarvestConfig,
}

impl<B, S> BatchOrchestrator<B, S>
where
    B: Browser,
    S: DatasetSink,
{
    pub fn new(browser: B, sink: S, config: HarvestConfig) -> Self {
        Self {
            browser,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run(&self, queries: &[Query]) -> BatchReport {
        let chunk_size = self.config.concurrency.max(1);
        let chunks = (queries.len() + chunk_size - 1) / chunk_size;
        let mut report = BatchReport::default();

        for (n, chunk) in queries.chunks(chunk_size).enumerate() {
            if n > 0 {
                log::info!("Cooling down for {:?}", self.config.cooldown());
                sleep(self.config.cooldown()).await;
            }
            log::info!(
                "Starting chunk {}/{chunks} with {} queries",
                n + 1,
                chunk.len()
            );
            let done = future::join_all(chunk.iter().map(|query| self.run_query(query))).await;
            report.queries.extend(done);
        }

        log::info!(
            "Batch done: {} records from {} queries, {} failed",
            report.records(),
            report.queries.len(),
            report.failures()
        );
        report
    }

    async fn run_query(&self, query: &Query) -> QueryReport {
        let session = HarvestSession::new(self.config.clone());
        let dataset = match self.browser.new_page().await {
            Ok(page) => {
                let dataset = session.run(&page, query).await;
                if let Err(e) = page.close().await {
                    log::warn!("Couldn't close browsing context of {query}: {e}");
                }
                dataset
            }
            Err(e) => {
                log::error!("Couldn't open browsing context for {query}: {e}");
                let mut dataset = Dataset::new(query.clone());
                dataset.failure = Some(e.to_string());
                dataset
            }
        };

        let mut report = QueryReport {
            query: query.clone(),
            artifact: None,
            feed_items: dataset.feed_items,
            records: dataset.record_count(),
            skipped: dataset.skipped_count(),
            error: dataset.failure.clone(),
        };

        match self.sink.write(&dataset) {
            Ok(path) => {
                log::info!("Wrote {} records of {query} to {}", report.records, path.display());
                report.artifact = Some(path);
            }
            Err(e) => {
                log::error!("Couldn't write dataset of {query}: {e}");
                report.error.get_or_insert_with(|| e.to_string());
            }
        }

        report
    }
}
