//! Field extraction from HTML snapshots of feed rows and detail panels.
//!
//! Every function here is total: a missing control yields [`NOT_AVAILABLE`] instead of an
//! error.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::record::{not_available, DetailRecord, FeedItem, NOT_AVAILABLE};

lazy_static! {
    static ref ITEM_LINK: Selector = Selector::parse("a[href]").unwrap();
    static ref RATING_IMG: Selector = Selector::parse(r#"span[role="img"][aria-label]"#).unwrap();
    static ref RATING_TEXT: Selector = Selector::parse("span.MW4etd").unwrap();
    static ref REVIEWS_TEXT: Selector = Selector::parse("span.UY7F9").unwrap();
    static ref INFO_LINE: Selector = Selector::parse("div.W4Efsd").unwrap();
    static ref HEADING: Selector = Selector::parse("h1").unwrap();
    static ref ADDRESS: Selector = Selector::parse(r#"button[data-item-id="address"]"#).unwrap();
    static ref PHONE: Selector = Selector::parse(r#"button[data-item-id^="phone:tel:"]"#).unwrap();
    static ref WEBSITE: Selector = Selector::parse(r#"a[data-item-id="authority"]"#).unwrap();
    static ref HEX_ID: Regex = Regex::new(r"!1s(0x[0-9a-fA-F]+:0x[0-9a-fA-F]+)").unwrap();
    static ref PLACE_ID: Regex = Regex::new(r"!19s([A-Za-z0-9_-]+)").unwrap();
    static ref LATITUDE: Regex = Regex::new(r"!3d(-?\d+(?:\.\d+)?)").unwrap();
    static ref LONGITUDE: Regex = Regex::new(r"!4d(-?\d+(?:\.\d+)?)").unwrap();
    static ref RATING_LABEL: Regex =
        Regex::new(r"(?i)^\s*([\d.,]+)\s+stars?(?:\s+([\d,]+)\s+reviews?)?").unwrap();
    static ref DIGITS: Regex = Regex::new(r"[\d,]+").unwrap();
    static ref LOCALITY: Regex =
        Regex::new(r"^(?P<suburb>.+?)\s+(?P<state>[A-Z]{2,3})\s+(?P<postcode>\d{4})$").unwrap();
    static ref HOST_LABEL: Regex =
        Regex::new(r"(?i)([a-z0-9-]+(?:\.[a-z0-9-]+)+)").unwrap();
}

/// Brief info of one feed row.
pub fn parse_feed_item(html: &str) -> FeedItem {
    let fragment = Html::parse_fragment(html);
    let mut item = FeedItem::default();

    if let Some(href) = fragment
        .select(&ITEM_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/maps/place/"))
    {
        if let Some(id) = capture(&PLACE_ID, href).or_else(|| capture(&HEX_ID, href)) {
            item.place_id = id;
        }
        if let Some(lat) = capture(&LATITUDE, href) {
            item.latitude = lat;
        }
        if let Some(lng) = capture(&LONGITUDE, href) {
            item.longitude = lng;
        }
    }

    let label = fragment
        .select(&RATING_IMG)
        .filter_map(|span| span.value().attr("aria-label"))
        .find_map(|label| RATING_LABEL.captures(label));
    match label {
        Some(caps) => {
            item.rating = caps[1].replace(',', ".");
            if let Some(reviews) = caps.get(2) {
                item.reviews = reviews.as_str().replace(',', "");
            }
        }
        None => {
            if let Some(rating) = fragment.select(&RATING_TEXT).next().map(text_of) {
                if !rating.is_empty() {
                    item.rating = rating.replace(',', ".");
                }
            }
        }
    }
    if item.reviews == NOT_AVAILABLE {
        if let Some(reviews) = fragment
            .select(&REVIEWS_TEXT)
            .next()
            .map(text_of)
            .and_then(|t| DIGITS.find(&t).map(|m| m.as_str().replace(',', "")))
        {
            item.reviews = reviews;
        }
    }

    item.category = fragment
        .select(&INFO_LINE)
        .filter(|line| line.select(&INFO_LINE).next().is_none())
        .filter_map(|line| {
            let text = text_of(line);
            let first = text.split('·').next().map(str::trim)?.to_string();
            let starts_numeric = first.chars().next().map_or(true, |c| c.is_ascii_digit());
            (!first.is_empty() && !starts_numeric).then_some(first)
        })
        .next()
        .unwrap_or_else(not_available);

    item
}

/// Detailed info of an opened detail panel.
pub fn parse_detail(html: &str) -> DetailRecord {
    let fragment = Html::parse_fragment(html);
    let mut record = DetailRecord::default();

    if let Some(name) = fragment
        .select(&HEADING)
        .map(text_of)
        .find(|t| !t.is_empty())
    {
        record.name = name;
    }

    if let Some(address) = fragment
        .select(&ADDRESS)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
    {
        let parts = split_address(&address);
        record.suburb = parts.suburb;
        record.state = parts.state;
        record.postcode = parts.postcode;
        record.country = parts.country;
        record.address = address;
    }

    if let Some(phone) = fragment
        .select(&PHONE)
        .next()
        .map(|button| {
            let shown = normalize_phone(&text_of(button));
            if shown.is_empty() {
                button
                    .value()
                    .attr("data-item-id")
                    .map(|id| normalize_phone(id.trim_start_matches("phone:tel:")))
                    .unwrap_or_default()
            } else {
                shown
            }
        })
        .filter(|p| !p.is_empty())
    {
        record.phone = phone;
    }

    if let Some(site) = fragment.select(&WEBSITE).next().and_then(|a| {
        a.value()
            .attr("href")
            .and_then(website_host)
            .or_else(|| a.value().attr("aria-label").and_then(label_host))
    }) {
        record.website = site;
    }

    record
}

/// Keeps digits and a leading `+`, every other run of characters becomes one space.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    let mut gap = false;
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            if gap && !out.is_empty() && !out.ends_with('+') {
                out.push(' ');
            }
            out.push(c);
            gap = false;
        } else {
            gap = true;
        }
    }
    if out == "+" {
        out.clear();
    }
    out
}

/// Host of a website link, without a leading `www.`.
pub fn website_host(href: &str) -> Option<String> {
    let url = url::Url::parse(href).ok()?;
    let host = url.host_str()?;
    Some(host.trim_start_matches("www.").to_lowercase())
}

fn label_host(label: &str) -> Option<String> {
    let value = label.split_once(':').map_or(label, |(_, v)| v);
    HOST_LABEL
        .captures(value)
        .map(|c| c[1].trim_start_matches("www.").to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParts {
    pub suburb: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

/// Splits `street, suburb STATE postcode[, country]` style addresses.
pub fn split_address(address: &str) -> AddressParts {
    let mut parts = AddressParts {
        suburb: not_available(),
        state: not_available(),
        postcode: not_available(),
        country: not_available(),
    };

    let segments: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut end = segments.len();
    if let Some(last) = segments.last() {
        let is_country = segments.len() > 1
            && !LOCALITY.is_match(last)
            && last.chars().all(|c| c.is_alphabetic() || c == ' ');
        if is_country {
            parts.country = last.to_string();
            end -= 1;
        }
    }

    if let Some(caps) = segments[..end]
        .iter()
        .rev()
        .find_map(|segment| LOCALITY.captures(segment))
    {
        parts.suburb = caps["suburb"].to_string();
        parts.state = caps["state"].to_string();
        parts.postcode = caps["postcode"].to_string();
    }

    parts
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack).map(|c| c[1].to_string())
}

/// Visible text of an element with icon glyphs dropped and whitespace collapsed.
fn text_of(elem: ElementRef) -> String {
    let joined = elem.text().collect::<Vec<_>>().join(" ");
    joined
        .chars()
        .filter(|c| !is_private_use(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_private_use(c: char) -> bool {
    matches!(c as u32, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD)
}
