#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mfh_harvester::{
    async_trait, Browser, BrowserError, BrowserResult, Dataset, DatasetSink, HarvestConfig,
    Locator, Page,
};
use tokio::time::Instant;

pub fn row_html(id: usize) -> String {
    format!(
        r#"<div class="Nv2PK"><a class="hfpxzc" aria-label="Place {id}"
            href="https://www.google.com/maps/place/Place+{id}/data=!4m7!3m6!1s0x6b13:0x{id:x}!8m2!3d-34.40{id}!4d150.88{id}!19sChIJplace{id}"></a>
           <div class="W4Efsd"><span role="img" aria-label="4.{id} stars {id}0 Reviews"></span></div>
           <div class="W4Efsd"><span>Cafe</span><span> · </span><span>{id} Main St</span></div></div>"#
    )
}

pub fn panel_html(name: &str, address: &str, phone: &str) -> String {
    format!(
        r#"<div role="main" aria-label="{name}"><h1>{name}</h1>
           <button data-item-id="address"><div class="Io6YTe">{address}</div></button>
           <button data-item-id="phone:tel:{phone}"><div>{phone}</div></button>
           <button aria-label="Close"></button></div>"#
    )
}

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub row: String,
    pub panel: String,
    /// Clicks needed before the panel shows up, `None` never opens
    pub opens_after: Option<usize>,
    pub in_view: bool,
}

impl FakeItem {
    pub fn listing(id: usize, name: &str, address: &str, phone: &str) -> Self {
        Self {
            row: row_html(id),
            panel: panel_html(name, address, phone),
            opens_after: Some(1),
            in_view: true,
        }
    }

    pub fn never_opens(mut self) -> Self {
        self.opens_after = None;
        self
    }

    pub fn opens_after(mut self, clicks: usize) -> Self {
        self.opens_after = Some(clicks);
        self
    }

    pub fn out_of_view(mut self) -> Self {
        self.in_view = false;
        self
    }
}

#[derive(Debug)]
struct State {
    visited: Vec<String>,
    heights: Vec<u64>,
    cursor: usize,
    pending: Option<(usize, Instant)>,
    scrolls: usize,
    clicks: Vec<usize>,
    close_clicks: usize,
    open: Option<usize>,
}

/// Scripted map page: the feed grows through `heights`, one step per scroll.
#[derive(Debug)]
pub struct FakeMap {
    config: HarvestConfig,
    items: Vec<FakeItem>,
    lag: Duration,
    end_marker_at: Option<usize>,
    mounted: bool,
    results_for: Option<String>,
    /// Close clicks needed before the panel goes away, `None` never closes
    closes_after: Option<usize>,
    fail_goto: bool,
    state: Mutex<State>,
}

impl FakeMap {
    pub fn new(items: Vec<FakeItem>) -> Self {
        let clicks = vec![0; items.len()];
        Self {
            config: HarvestConfig::default(),
            items,
            lag: Duration::ZERO,
            end_marker_at: None,
            mounted: true,
            results_for: None,
            closes_after: Some(1),
            fail_goto: false,
            state: Mutex::new(State {
                visited: vec![],
                heights: vec![1_000],
                cursor: 0,
                pending: None,
                scrolls: 0,
                clicks,
                close_clicks: 0,
                open: None,
            }),
        }
    }

    pub fn heights(self, heights: Vec<u64>) -> Self {
        self.state.lock().unwrap().heights = heights;
        self
    }

    pub fn lag(mut self, lag: Duration) -> Self {
        self.lag = lag;
        self
    }

    pub fn end_marker_at(mut self, cursor: usize) -> Self {
        self.end_marker_at = Some(cursor);
        self
    }

    pub fn unmounted(mut self) -> Self {
        self.mounted = false;
        self
    }

    pub fn results_for(mut self, text: &str) -> Self {
        self.results_for = Some(text.to_string());
        self
    }

    pub fn unclosable(mut self) -> Self {
        self.closes_after = None;
        self
    }

    pub fn closes_after(mut self, clicks: usize) -> Self {
        self.closes_after = Some(clicks);
        self
    }

    pub fn failing_goto(mut self) -> Self {
        self.fail_goto = true;
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn clicks(&self, index: usize) -> usize {
        self.state.lock().unwrap().clicks[index]
    }

    pub fn panel_open(&self) -> bool {
        self.state.lock().unwrap().open.is_some()
    }

    fn settle(&self, state: &mut State) {
        if let Some((cursor, ready_at)) = state.pending {
            if Instant::now() >= ready_at {
                state.cursor = cursor;
                state.pending = None;
            }
        }
    }
}

#[async_trait]
impl Page for FakeMap {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        if self.fail_goto {
            return Err(BrowserError::Driver("net::ERR_NAME_NOT_RESOLVED".into()));
        }
        self.state.lock().unwrap().visited.push(url.to_string());
        Ok(())
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let selectors = &self.config.selectors;
        let state = self.state.lock().unwrap();
        let count = if selector == format!("{} > *", selectors.feed) {
            if self.mounted {
                self.items.len().max(1)
            } else {
                0
            }
        } else if selector == selectors.detail {
            usize::from(state.open.is_some())
        } else if selector == selectors.item {
            self.items.len()
        } else if selector.contains("Results for") {
            let matches = match &self.results_for {
                Some(text) => selector == selectors.results_marker_for(text),
                None => true,
            };
            usize::from(matches && !state.visited.is_empty())
        } else {
            0
        };
        Ok(count)
    }

    async fn scroll_height(&self, _selector: &str) -> BrowserResult<u64> {
        let mut state = self.state.lock().unwrap();
        self.settle(&mut state);
        Ok(state.heights[state.cursor])
    }

    async fn scroll_to(&self, _selector: &str, _top: u64) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        self.settle(&mut state);
        state.scrolls += 1;
        if state.pending.is_none() && state.cursor + 1 < state.heights.len() {
            state.pending = Some((state.cursor + 1, Instant::now() + self.lag));
        }
        Ok(())
    }

    async fn text_visible(&self, text: &str) -> BrowserResult<bool> {
        let mut state = self.state.lock().unwrap();
        self.settle(&mut state);
        Ok(text == self.config.end_of_list_text
            && self.end_marker_at.map_or(false, |at| state.cursor >= at))
    }

    async fn scroll_into_view(&self, target: &Locator) -> BrowserResult<()> {
        match self.items.get(target.index) {
            Some(item) if item.in_view => Ok(()),
            _ => Err(BrowserError::NotFound(target.clone())),
        }
    }

    async fn click(&self, target: &Locator) -> BrowserResult<()> {
        let selectors = &self.config.selectors;
        let mut state = self.state.lock().unwrap();
        if target.selector == selectors.item {
            let item = self
                .items
                .get(target.index)
                .ok_or_else(|| BrowserError::NotFound(target.clone()))?;
            state.clicks[target.index] += 1;
            if item
                .opens_after
                .map_or(false, |n| state.clicks[target.index] >= n)
            {
                state.open = Some(target.index);
            }
            Ok(())
        } else if target.selector == selectors.detail {
            if state.open.is_none() {
                return Err(BrowserError::NotFound(target.clone()));
            }
            state.close_clicks += 1;
            if self.closes_after.map_or(false, |n| state.close_clicks >= n) {
                state.open = None;
            }
            Ok(())
        } else {
            Err(BrowserError::NotFound(target.clone()))
        }
    }

    async fn outer_html(&self, target: &Locator) -> BrowserResult<String> {
        let selectors = &self.config.selectors;
        let state = self.state.lock().unwrap();
        if target.selector == selectors.item {
            self.items
                .get(target.index)
                .map(|item| item.row.clone())
                .ok_or_else(|| BrowserError::NotFound(target.clone()))
        } else if target.selector == selectors.detail {
            state
                .open
                .map(|i| self.items[i].panel.clone())
                .ok_or_else(|| BrowserError::NotFound(target.clone()))
        } else {
            Err(BrowserError::NotFound(target.clone()))
        }
    }
}

/// Hands out a fresh [`FakeMap`] per context and records when contexts open and close.
pub struct FakeBrowser {
    make: Box<dyn Fn(usize) -> FakeMap + Send + Sync>,
    opened: AtomicUsize,
    pub events: Arc<Mutex<Vec<(usize, &'static str, Instant)>>>,
    fail_on: Option<usize>,
}

impl FakeBrowser {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn(usize) -> FakeMap + Send + Sync + 'static,
    {
        Self {
            make: Box::new(make),
            opened: AtomicUsize::new(0),
            events: Arc::new(Mutex::new(vec![])),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }
}

pub struct TrackedPage {
    id: usize,
    map: FakeMap,
    events: Arc<Mutex<Vec<(usize, &'static str, Instant)>>>,
}

#[async_trait]
impl Page for TrackedPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.map.goto(url).await
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        self.map.count(selector).await
    }

    async fn scroll_height(&self, selector: &str) -> BrowserResult<u64> {
        self.map.scroll_height(selector).await
    }

    async fn scroll_to(&self, selector: &str, top: u64) -> BrowserResult<()> {
        self.map.scroll_to(selector, top).await
    }

    async fn text_visible(&self, text: &str) -> BrowserResult<bool> {
        self.map.text_visible(text).await
    }

    async fn scroll_into_view(&self, target: &Locator) -> BrowserResult<()> {
        self.map.scroll_into_view(target).await
    }

    async fn click(&self, target: &Locator) -> BrowserResult<()> {
        self.map.click(target).await
    }

    async fn outer_html(&self, target: &Locator) -> BrowserResult<String> {
        self.map.outer_html(target).await
    }

    async fn close(&self) -> BrowserResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((self.id, "close", Instant::now()));
        Ok(())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Page = TrackedPage;

    async fn new_page(&self) -> BrowserResult<TrackedPage> {
        let id = self.opened.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push((id, "open", Instant::now()));
        if self.fail_on == Some(id) {
            return Err(BrowserError::Driver("session not created".into()));
        }
        Ok(TrackedPage {
            id,
            map: (self.make)(id),
            events: self.events.clone(),
        })
    }
}

/// Keeps datasets in memory instead of writing files.
#[derive(Default)]
pub struct MemorySink {
    pub datasets: Mutex<Vec<Dataset>>,
    pub fail_for: Option<usize>,
}

impl DatasetSink for MemorySink {
    fn write(&self, dataset: &Dataset) -> anyhow::Result<std::path::PathBuf> {
        if self.fail_for == Some(dataset.query.position) {
            anyhow::bail!("disk full");
        }
        self.datasets.lock().unwrap().push(dataset.clone());
        Ok(format!("memory/{:04}.csv", dataset.query.position).into())
    }
}

pub fn keiraville_items() -> Vec<FakeItem> {
    vec![
        FakeItem::listing(1, "Bombay Cafe", "1 Murphys Ave, Keiraville NSW 2500", "0242291111"),
        FakeItem::listing(2, "Keira Pizza", "2 Gipps Rd, Keiraville NSW 2500", "0242292222"),
        FakeItem::listing(3, "Thai Orchid", "3 Robsons Rd, Keiraville NSW 2500", "0242293333"),
    ]
}
