use std::time::Duration;

use crate::browser::{bounded, wait_until, BrowserError, BrowserResult, Locator, Page};
use crate::config::HarvestConfig;
use crate::extract::parse_detail;
use crate::record::{DetailRecord, SkipReason};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Opening,
    Open,
    Extracting,
    Closing,
}

/// Result of one open/extract/close cycle that got as far as extracting.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelExtract {
    pub detail: DetailRecord,
    /// False when the close could not be observed, the panel may still be showing
    pub closed: bool,
}

/// Opens the detail panel of one feed row, reads it and closes it again.
///
/// Panel visibility is tracked in `detail_open`, refreshed from the presence of the
/// detail container after every transition.
#[derive(Debug)]
pub struct DetailPanelController {
    retry: RetryPolicy,
    step_timeout: Duration,
    poll_interval: Duration,
    item: String,
    item_link: String,
    detail: String,
    detail_close: String,
    state: PanelState,
    detail_open: bool,
}

impl DetailPanelController {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            step_timeout: Duration::from_millis(config.step_timeout_ms),
            poll_interval: config.poll_interval(),
            item: config.selectors.item.clone(),
            item_link: config.selectors.item_link.clone(),
            detail: config.selectors.detail.clone(),
            detail_close: config.selectors.detail_close.clone(),
            state: PanelState::Closed,
            detail_open: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn detail_open(&self) -> bool {
        self.detail_open
    }

    fn step_timeout(&self, attempt: usize) -> Duration {
        self.step_timeout * (attempt as u32 + 1)
    }

    /// Runs the whole cycle for the feed row at `index`.
    pub async fn harvest<P>(&mut self, page: &P, index: usize) -> Result<PanelExtract, SkipReason>
    where
        P: Page + ?Sized,
    {
        if self.detail_open {
            log::warn!("Detail panel still open before item {index}, closing it first");
            if !self.close(page).await {
                // Whatever shows now is still the previous listing
                return Err(SkipReason::PanelStuck {
                    attempts: self.retry.retries(),
                });
            }
        }

        let target = Locator::nth(self.item.clone(), index);
        self.open(page, &target).await?;

        self.state = PanelState::Extracting;
        let html = bounded(
            self.step_timeout(self.retry.retries()),
            page.outer_html(&Locator::first(self.detail.clone())),
        )
        .await;
        let detail = match html {
            Ok(html) => parse_detail(&html),
            Err(e) => {
                self.close(page).await;
                return Err(SkipReason::Extraction(e.to_string()));
            }
        };

        let closed = self.close(page).await;
        Ok(PanelExtract { detail, closed })
    }

    async fn open<P>(&mut self, page: &P, target: &Locator) -> Result<(), SkipReason>
    where
        P: Page + ?Sized,
    {
        self.state = PanelState::Opening;
        let attempts = self.retry.retries();
        let this = &*self;

        let in_view = this
            .retry
            .run("scroll item into view", |attempt| {
                bounded(this.step_timeout(attempt), page.scroll_into_view(target))
            })
            .await;
        if !in_view {
            self.state = PanelState::Closed;
            return Err(SkipReason::NotInView { attempts });
        }

        let link = target.child(self.item_link.clone());
        let this = &*self;
        let opened = this
            .retry
            .run("open detail panel", |attempt| {
                let link = &link;
                async move {
                    bounded(this.step_timeout(attempt), page.click(link)).await?;
                    this.wait_for_detail(page, true, this.step_timeout(attempt))
                        .await
                }
            })
            .await;
        if !opened {
            self.state = PanelState::Closed;
            return Err(SkipReason::PanelNotOpened { attempts });
        }

        self.detail_open = true;
        self.state = PanelState::Open;
        Ok(())
    }

    /// Closes the panel, returns whether the close was observed.
    async fn close<P>(&mut self, page: &P) -> bool
    where
        P: Page + ?Sized,
    {
        self.state = PanelState::Closing;
        let close = Locator::first(self.detail.clone()).child(self.detail_close.clone());
        let this = &*self;
        let closed = this
            .retry
            .run("close detail panel", |attempt| {
                let close = &close;
                async move {
                    match bounded(this.step_timeout(attempt), page.click(close)).await {
                        // Panel already gone
                        Err(BrowserError::NotFound(_)) => (),
                        res => res?,
                    }
                    this.wait_for_detail(page, false, this.step_timeout(attempt))
                        .await
                }
            })
            .await;

        if closed {
            self.detail_open = false;
        } else {
            log::warn!(
                "Detail panel not closed after {} attempts, moving on",
                self.retry.retries()
            );
        }
        self.state = PanelState::Closed;
        closed
    }

    async fn wait_for_detail<P>(&self, page: &P, open: bool, limit: Duration) -> BrowserResult<()>
    where
        P: Page + ?Sized,
    {
        wait_until(limit, self.poll_interval, || async {
            let present = page.count(&self.detail).await? > 0;
            Ok::<_, BrowserError>(present == open)
        })
        .await
    }
}
