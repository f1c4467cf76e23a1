use crate::browser::{bounded, wait_until, BrowserError, BrowserResult, Locator, Page};
use crate::config::HarvestConfig;
use crate::extract::parse_feed_item;
use crate::panel::DetailPanelController;
use crate::query::Query;
use crate::record::{Dataset, ItemOutcome, MergedRecord, SkipReason};
use crate::scroller::FeedScroller;

/// Harvests every listing of one query in one browsing context.
#[derive(Debug, Clone)]
pub struct HarvestSession {
    config: HarvestConfig,
}

impl HarvestSession {
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    pub fn search_url(&self, query: &Query) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(query.text.as_bytes()).collect();
        self.config.search_url.replace("{query}", &encoded)
    }

    /// Never fails: a session-level error is attached to the returned dataset together with
    /// whatever was harvested before it happened.
    pub async fn run<P>(&self, page: &P, query: &Query) -> Dataset
    where
        P: Page + ?Sized,
    {
        let mut dataset = Dataset::new(query.clone());
        if let Err(e) = self.harvest(page, &mut dataset).await {
            log::error!(
                "Session for {query} stopped after {} items: {e}",
                dataset.outcomes().len()
            );
            dataset.failure = Some(e.to_string());
        }
        log::info!(
            "Session for {query} done: {} records, {} skipped out of {} feed items",
            dataset.record_count(),
            dataset.skipped_count(),
            dataset.feed_items
        );
        dataset
    }

    async fn harvest<P>(&self, page: &P, dataset: &mut Dataset) -> BrowserResult<()>
    where
        P: Page + ?Sized,
    {
        let config = &self.config;
        let query = dataset.query.clone();

        bounded(config.load_timeout(), page.goto(&self.search_url(&query))).await?;

        let marker = config.selectors.results_marker_for(&query.text);
        wait_until(config.load_timeout(), config.poll_interval(), || async {
            Ok::<_, BrowserError>(page.count(&marker).await? > 0)
        })
        .await?;

        let scroll = FeedScroller::new(config).run(page).await?;
        log::debug!("Feed for {query} stopped scrolling: {scroll:?}");
        dataset.scroll = Some(scroll);

        let total = bounded(config.load_timeout(), page.count(&config.selectors.item)).await?;
        dataset.feed_items = total;
        log::info!("Found {total} feed items for {query}");

        let mut panel = DetailPanelController::new(config);
        for index in 0..total {
            let outcome = self.harvest_item(page, &mut panel, &query, index).await;
            match &outcome {
                Ok(record) => log::debug!("Item {index}/{total} of {query}: {}", record.name),
                Err(reason) => log::warn!("Skipping item {index}/{total} of {query}: {reason}"),
            }
            dataset.push(outcome);
        }

        Ok(())
    }

    async fn harvest_item<P>(
        &self,
        page: &P,
        panel: &mut DetailPanelController,
        query: &Query,
        index: usize,
    ) -> ItemOutcome
    where
        P: Page + ?Sized,
    {
        let row = Locator::nth(self.config.selectors.item.clone(), index);
        let brief = bounded(self.config.load_timeout(), page.outer_html(&row))
            .await
            .map(|html| parse_feed_item(&html))
            .map_err(|e| SkipReason::Extraction(e.to_string()))?;

        let extract = panel.harvest(page, index).await?;
        if !extract.closed {
            log::warn!("Keeping item {index} of {query} although its panel did not close");
        }

        Ok(MergedRecord::new(brief, extract.detail))
    }
}
