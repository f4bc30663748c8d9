//! Listing page → [`Record`] extraction.
//!
//! Every field has its own [`Cascade`] of strategies, tried in priority
//! order: structured data, then DOM selectors, then navigation text, then
//! free-text patterns. Misses are absent values; only input that is not
//! markup at all fails, with [`ParseError`].

pub mod address;
pub mod attributes;
pub mod page;
pub mod prices;
pub mod strategy;

pub use page::Page;
pub use prices::PriceRows;
pub use strategy::{Cascade, JsonLdValue, SelectorText, Strategy};

use crate::error::ParseError;
use crate::models::{normalize, RawFields, Record, LISTED_PRICE_LABEL};
use tracing::debug;

/// Field cascades for a listing page
pub struct Extractor {
    title: Cascade<String>,
    address: Cascade<String>,
    area: Cascade<String>,
    rooms: Cascade<String>,
    suites: Cascade<String>,
    bathrooms: Cascade<String>,
    parking_spots: Cascade<String>,
    floor: Cascade<String>,
    pet_allowed: Cascade<String>,
    furnished: Cascade<String>,
    near_metro: Cascade<String>,
    prices: Cascade<PriceRows>,
    listed_price: Cascade<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            title: title_cascade(),
            address: address::cascade(),
            area: attributes::area(),
            rooms: attributes::rooms(),
            suites: attributes::suites(),
            bathrooms: attributes::bathrooms(),
            parking_spots: attributes::parking_spots(),
            floor: attributes::floor(),
            pet_allowed: attributes::pet_allowed(),
            furnished: attributes::furnished(),
            near_metro: attributes::near_metro(),
            prices: prices::cascade(),
            listed_price: prices::listed_price(),
        }
    }

    /// Replace the address cascade.
    pub fn with_address(mut self, cascade: Cascade<String>) -> Self {
        self.address = cascade;
        self
    }

    pub fn address_cascade(&self) -> &Cascade<String> {
        &self.address
    }

    /// Parse one listing page. Deterministic: the same HTML always yields the
    /// same record.
    pub fn extract(&self, url: &str, html: &str) -> Result<Record, ParseError> {
        let page = Page::parse(html)?;
        let raw = self.raw_fields(url, &page);
        let record = normalize(raw);

        debug!(
            url,
            has_address = record.address_street.is_some(),
            price_lines = record.prices.len(),
            diagnostics = record.diagnostics.len(),
            "Extracted listing"
        );
        Ok(record)
    }

    fn raw_fields(&self, url: &str, page: &Page) -> RawFields {
        let mut prices = self.prices.run(page).unwrap_or_default();
        if let Some(listed) = self.listed_price.run(page) {
            prices.push((LISTED_PRICE_LABEL.to_string(), listed));
        }

        RawFields {
            url: url.to_string(),
            title: self.title.run(page),
            address_street: self.address.run(page),
            area: self.area.run(page),
            rooms: self.rooms.run(page),
            suites: self.suites.run(page),
            bathrooms: self.bathrooms.run(page),
            parking_spots: self.parking_spots.run(page),
            floor: self.floor.run(page),
            pet_allowed: self.pet_allowed.run(page),
            furnished: self.furnished.run(page),
            near_metro: self.near_metro.run(page),
            prices,
        }
    }
}

fn title_cascade() -> Cascade<String> {
    Cascade::new("title")
        .then(JsonLdValue::new("json-ld", &["name"]))
        .then(SelectorText::new("listing-title", "h1[data-testid='listing-title']"))
        .then(SelectorText::new("h1", "h1"))
        .then(SelectorText::new("h2", "h2"))
        .then(SelectorText::new("document-title", "title"))
}
