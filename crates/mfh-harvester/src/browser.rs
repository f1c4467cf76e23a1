use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("No element matches {0}")]
    NotFound(Locator),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Driver error: {0}")]
    Driver(String),
}

/// The `index`-th element matching `selector`, optionally narrowed to a descendant.
///
/// Feed rows have no stable identity, so a row is only ever addressed by its position in the
/// feed at the time it was enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub index: usize,
    pub child: Option<String>,
}

impl Locator {
    pub fn first(selector: impl Into<String>) -> Self {
        Self::nth(selector, 0)
    }

    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            child: None,
        }
    }

    pub fn child(&self, selector: impl Into<String>) -> Self {
        Self {
            child: Some(selector.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)?;
        if let Some(child) = &self.child {
            write!(f, " {child}")?;
        }
        Ok(())
    }
}

/// One isolated browsing context.
///
/// Every method is a suspension point; none of them waits on its own, conditions are
/// polled by the caller with [`wait_until`].
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> BrowserResult<usize>;

    /// Scroll height of the first element matching `selector`.
    async fn scroll_height(&self, selector: &str) -> BrowserResult<u64>;

    async fn scroll_to(&self, selector: &str, top: u64) -> BrowserResult<()>;

    /// Whether `text` is rendered somewhere in the document with a non-empty layout box.
    async fn text_visible(&self, text: &str) -> BrowserResult<bool>;

    async fn scroll_into_view(&self, target: &Locator) -> BrowserResult<()>;

    async fn click(&self, target: &Locator) -> BrowserResult<()>;

    async fn outer_html(&self, target: &Locator) -> BrowserResult<String>;

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait Browser: Send + Sync {
    type Page: Page;

    /// Opens a fresh context that shares no DOM state with the others.
    async fn new_page(&self) -> BrowserResult<Self::Page>;
}

/// Polls `cond` every `interval` until it holds, failing once `limit` has elapsed.
pub async fn wait_until<F, Fut>(
    limit: Duration,
    interval: Duration,
    mut cond: F,
) -> BrowserResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BrowserResult<bool>>,
{
    let deadline = Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, cond()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => (),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(BrowserError::Timeout(limit)),
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(limit));
        }
        sleep(interval.min(deadline - Instant::now())).await;
    }
}

/// Bounds a single page call by `limit`.
pub async fn bounded<T, Fut>(limit: Duration, fut: Fut) -> BrowserResult<T>
where
    Fut: Future<Output = BrowserResult<T>>,
{
    timeout(limit, fut)
        .await
        .unwrap_or(Err(BrowserError::Timeout(limit)))
}
