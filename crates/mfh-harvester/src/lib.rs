mod browser;
mod config;
pub mod extract;
mod orchestrator;
mod panel;
mod query;
mod record;
mod retry;
mod scroller;
mod session;

pub use browser::{bounded, wait_until, Browser, BrowserError, BrowserResult, Locator, Page};
pub use config::{HarvestConfig, Selectors};
pub use orchestrator::{BatchOrchestrator, BatchReport, DatasetSink, QueryReport};
pub use panel::{DetailPanelController, PanelExtract, PanelState};
pub use query::{parse_name_list, Named, Place, Query, QueryTemplate};
pub use record::{
    Dataset, DetailRecord, FeedItem, ItemOutcome, MergedRecord, SkipReason, NOT_AVAILABLE,
};
pub use retry::RetryPolicy;
pub use scroller::{FeedScroller, ScrollEnd, ScrollOutcome};
pub use session::HarvestSession;

pub use anyhow;
pub use async_trait::async_trait;
