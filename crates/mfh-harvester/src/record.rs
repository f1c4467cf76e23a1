use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::Query;
use crate::scroller::ScrollOutcome;

/// Placeholder written for every field whose control is absent from the page.
pub const NOT_AVAILABLE: &str = "N/A";

pub(crate) fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Fields read from a feed row without opening its detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub place_id: String,
    pub latitude: String,
    pub longitude: String,
    pub category: String,
    pub rating: String,
    pub reviews: String,
}

impl Default for FeedItem {
    fn default() -> Self {
        Self {
            place_id: not_available(),
            latitude: not_available(),
            longitude: not_available(),
            category: not_available(),
            rating: not_available(),
            reviews: not_available(),
        }
    }
}

/// Fields only shown by the opened detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub name: String,
    pub address: String,
    pub suburb: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub website: String,
}

impl Default for DetailRecord {
    fn default() -> Self {
        Self {
            name: not_available(),
            address: not_available(),
            suburb: not_available(),
            state: not_available(),
            postcode: not_available(),
            country: not_available(),
            phone: not_available(),
            website: not_available(),
        }
    }
}

/// One listing; field order here is the column order of every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub name: String,
    pub address: String,
    pub suburb: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub website: String,
    pub place_id: String,
    pub latitude: String,
    pub longitude: String,
    pub category: String,
    pub rating: String,
    pub reviews: String,
}

impl MergedRecord {
    pub fn new(brief: FeedItem, detail: DetailRecord) -> Self {
        Self {
            name: detail.name,
            address: detail.address,
            suburb: detail.suburb,
            state: detail.state,
            postcode: detail.postcode,
            country: detail.country,
            phone: detail.phone,
            website: detail.website,
            place_id: brief.place_id,
            latitude: brief.latitude,
            longitude: brief.longitude,
            category: brief.category,
            rating: brief.rating,
            reviews: brief.reviews,
        }
    }
}

/// Why a feed item produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("item could not be scrolled into view after {attempts} attempts")]
    NotInView { attempts: usize },

    #[error("detail panel did not open after {attempts} attempts")]
    PanelNotOpened { attempts: usize },

    #[error("previous detail panel still open after {attempts} close attempts")]
    PanelStuck { attempts: usize },

    #[error("extraction failed: {0}")]
    Extraction(String),
}

pub type ItemOutcome = Result<MergedRecord, SkipReason>;

/// Everything one session produced for its query.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub query: Query,
    /// Feed rows present once scrolling stopped
    pub feed_items: usize,
    pub scroll: Option<ScrollOutcome>,
    /// Set when the session stopped early, the outcomes gathered so far are kept
    pub failure: Option<String>,
    outcomes: Vec<ItemOutcome>,
}

impl Dataset {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            feed_items: 0,
            scroll: None,
            failure: None,
            outcomes: vec![],
        }
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn records(&self) -> impl Iterator<Item = &MergedRecord> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkipReason> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }
}
