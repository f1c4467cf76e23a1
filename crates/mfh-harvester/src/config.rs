use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestConfig {
    /// Attempts made by every retried page interaction
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Fixed delay in milliseconds between two attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Base timeout in milliseconds of a retried step, multiplied by `attempt + 1`
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,

    /// Upper bound on feed scroll iterations
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    /// How long to wait for the feed to grow after a scroll
    #[serde(default = "default_scroll_timeout_ms")]
    pub scroll_timeout_ms: u64,

    /// Delay before re-measuring a feed whose height did not change
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Interval between two checks of a polled condition
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout of page loads and one-shot waits (navigation, results marker, feed mount)
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Number of sessions run concurrently in one chunk
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause in milliseconds between two chunks
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Search string template, `{name}` is replaced by the query display name
    #[serde(default = "default_query_template")]
    pub query_template: String,

    /// Search page template, `{query}` is replaced by the form-encoded search string
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Literal text rendered once the feed has no more results
    #[serde(default = "default_end_of_list_text")]
    pub end_of_list_text: String,

    #[serde(default)]
    pub selectors: Selectors,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            step_timeout_ms: default_step_timeout_ms(),
            max_scrolls: default_max_scrolls(),
            scroll_timeout_ms: default_scroll_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            concurrency: default_concurrency(),
            cooldown_ms: default_cooldown_ms(),
            query_template: default_query_template(),
            search_url: default_search_url(),
            end_of_list_text: default_end_of_list_text(),
            selectors: Selectors::default(),
        }
    }
}

impl HarvestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn scroll_timeout(&self) -> Duration {
        Duration::from_millis(self.scroll_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_step_timeout_ms() -> u64 {
    2_000
}

fn default_max_scrolls() -> usize {
    50
}

fn default_scroll_timeout_ms() -> u64 {
    3_000
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_load_timeout_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    10
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_query_template() -> String {
    String::from("restaurant near {name}, New South Wales, Australia")
}

fn default_search_url() -> String {
    String::from("https://www.google.com/maps/search/{query}")
}

fn default_end_of_list_text() -> String {
    String::from("You've reached the end of the list.")
}

/// CSS selectors of the one supported results page layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    /// Scrollable results container
    #[serde(default = "default_feed")]
    pub feed: String,

    /// Marker confirming the results belong to the current search, `{query}` is substituted
    #[serde(default = "default_results_marker")]
    pub results_marker: String,

    /// One row of the feed
    #[serde(default = "default_item")]
    pub item: String,

    /// Element activated inside a row to open its detail panel
    #[serde(default = "default_item_link")]
    pub item_link: String,

    /// Detail panel container, only present while a detail is open
    #[serde(default = "default_detail")]
    pub detail: String,

    /// Close control inside the detail panel
    #[serde(default = "default_detail_close")]
    pub detail_close: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            results_marker: default_results_marker(),
            item: default_item(),
            item_link: default_item_link(),
            detail: default_detail(),
            detail_close: default_detail_close(),
        }
    }
}

impl Selectors {
    pub fn results_marker_for(&self, query: &str) -> String {
        let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
        self.results_marker.replace("{query}", &escaped)
    }
}

fn default_feed() -> String {
    String::from(r#"div[role="feed"]"#)
}

fn default_results_marker() -> String {
    String::from(r#"div[role="feed"][aria-label="Results for {query}"]"#)
}

fn default_item() -> String {
    String::from(r#"div[role="feed"] div:has(> a.hfpxzc)"#)
}

fn default_item_link() -> String {
    String::from("a.hfpxzc")
}

fn default_detail() -> String {
    String::from(r#"div[role="main"]:not([aria-label^="Results for"])"#)
}

fn default_detail_close() -> String {
    String::from(r#"button[aria-label="Close"]"#)
}
