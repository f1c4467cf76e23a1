use std::time::Duration;

use tokio::time::sleep;

use crate::browser::{bounded, wait_until, BrowserError, BrowserResult, Page};
use crate::config::HarvestConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollState {
    Initializing,
    Scrolling { iteration: usize },
    StabilityCheck { iteration: usize, before: u64 },
}

/// How the feed stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEnd {
    /// The end-of-list text became visible
    EndMarker,
    /// Height did not change, even after the delayed re-measure
    Stable,
    /// Scroll budget spent, what loaded so far is used
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub end: ScrollEnd,
    /// Scroll iterations performed
    pub scrolls: usize,
}

/// Drives a lazily loaded feed until no more results show up.
#[derive(Debug, Clone)]
pub struct FeedScroller {
    feed: String,
    end_text: String,
    max_scrolls: usize,
    mount_timeout: Duration,
    grow_timeout: Duration,
    settle_delay: Duration,
    poll_interval: Duration,
}

impl FeedScroller {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            feed: config.selectors.feed.clone(),
            end_text: config.end_of_list_text.clone(),
            max_scrolls: config.max_scrolls,
            mount_timeout: config.load_timeout(),
            grow_timeout: config.scroll_timeout(),
            settle_delay: config.settle_delay(),
            poll_interval: config.poll_interval(),
        }
    }

    pub async fn run<P>(&self, page: &P) -> BrowserResult<ScrollOutcome>
    where
        P: Page + ?Sized,
    {
        let mut state = ScrollState::Initializing;
        loop {
            state = match state {
                ScrollState::Initializing => {
                    let children = format!("{} > *", self.feed);
                    wait_until(self.mount_timeout, self.poll_interval, || async {
                        Ok::<_, BrowserError>(page.count(&children).await? > 0)
                    })
                    .await?;
                    ScrollState::Scrolling { iteration: 0 }
                }

                ScrollState::Scrolling { iteration } if iteration >= self.max_scrolls => {
                    log::info!("Feed still growing after {iteration} scrolls, stopping there");
                    return Ok(ScrollOutcome {
                        end: ScrollEnd::Exhausted,
                        scrolls: iteration,
                    });
                }

                ScrollState::Scrolling { iteration } => {
                    let before = self.height(page).await?;
                    bounded(self.grow_timeout, page.scroll_to(&self.feed, before * 2)).await?;
                    let grown = wait_until(self.grow_timeout, self.poll_interval, || async {
                        Ok::<_, BrowserError>(page.scroll_height(&self.feed).await? > before)
                    })
                    .await;
                    match grown {
                        Ok(()) | Err(BrowserError::Timeout(_)) => (),
                        Err(e) => return Err(e),
                    }
                    ScrollState::StabilityCheck {
                        iteration: iteration + 1,
                        before,
                    }
                }

                ScrollState::StabilityCheck { iteration, before } => {
                    if bounded(self.grow_timeout, page.text_visible(&self.end_text)).await? {
                        log::debug!("End of list reached after {iteration} scrolls");
                        return Ok(ScrollOutcome {
                            end: ScrollEnd::EndMarker,
                            scrolls: iteration,
                        });
                    }
                    if self.height(page).await? == before {
                        sleep(self.settle_delay).await;
                        if self.height(page).await? == before {
                            log::debug!("Feed settled at {before}px after {iteration} scrolls");
                            return Ok(ScrollOutcome {
                                end: ScrollEnd::Stable,
                                scrolls: iteration,
                            });
                        }
                    }
                    ScrollState::Scrolling { iteration }
                }
            };
        }
    }

    async fn height<P>(&self, page: &P) -> BrowserResult<u64>
    where
        P: Page + ?Sized,
    {
        bounded(self.grow_timeout, page.scroll_height(&self.feed)).await
    }
}
