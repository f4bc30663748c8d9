//! Price breakdown rows as `(label, value)` text pairs.
//!
//! Labels are mapped to canonical lines later, in
//! [`PriceLine::from_label`](crate::models::PriceLine::from_label).
//! The structured-data price has its own cascade and ends up as the
//! [`LISTED_PRICE_LABEL`](crate::models::LISTED_PRICE_LABEL) line.

use super::page::{css, element_text, Page};
use super::strategy::{scalar_text, Cascade, Strategy};
use crate::text::clean;
use regex::Regex;
use scraper::Selector;
use serde_json::Value;
use std::sync::LazyLock;

pub type PriceRows = Vec<(String, String)>;

static LIST_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    css("ul[data-testid='listing-price-table'] li, [data-testid*='price-table'] li")
});
static ROW_LABEL: LazyLock<Selector> = LazyLock::new(|| css("span, h4"));
static ROW_VALUE: LazyLock<Selector> = LazyLock::new(|| css("div > p, div > h4"));
static TABLE_ROWS: LazyLock<Selector> = LazyLock::new(|| css("table tr"));
static TABLE_CELLS: LazyLock<Selector> = LazyLock::new(|| css("th, td"));

static ROW_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*:?\s*(R\$\s*-?[\d.]+(?:,\d+)?)").expect("valid price row regex")
});

static FREE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(aluguel|condom[íi]nio|iptu|seguro inc[êe]ndio|taxa de servi[çc]o|total)",
        r"\s*:?\s*(R\$\s*[\d.]+(?:,\d{2})?)",
    ))
    .expect("valid price text regex")
});

pub fn cascade() -> Cascade<PriceRows> {
    Cascade::new("prices")
        .then(PriceList)
        .then(PriceTable)
        .then(PriceText)
}

/// Price advertised in the page's structured data, independent of the table.
pub fn listed_price() -> Cascade<String> {
    Cascade::new("listed_price").then(JsonLdOffer)
}

fn non_empty(rows: PriceRows) -> Option<PriceRows> {
    (!rows.is_empty()).then_some(rows)
}

/// The listing's `<ul>` price table: label in a `span`/`h4`, amount in the
/// last `div > p`/`div > h4` of the row.
pub struct PriceList;

impl Strategy<PriceRows> for PriceList {
    fn name(&self) -> &'static str {
        "price-list"
    }

    fn apply(&self, page: &Page) -> Option<PriceRows> {
        let mut rows = Vec::new();
        for item in page.document().select(&LIST_ROWS) {
            let label = item.select(&ROW_LABEL).find_map(|el| clean(&element_text(el)));
            let value = item.select(&ROW_VALUE).last().and_then(|el| clean(&element_text(el)));

            match (label, value) {
                (Some(label), Some(value)) if label != value => rows.push((label, value)),
                _ => {
                    let text = element_text(item);
                    if let Some(caps) = ROW_TEXT.captures(&text) {
                        if let Some(label) = clean(&caps[1]) {
                            rows.push((label, caps[2].to_string()));
                        }
                    }
                }
            }
        }
        non_empty(rows)
    }
}

/// `<table>` rows whose last cell holds an amount.
pub struct PriceTable;

impl Strategy<PriceRows> for PriceTable {
    fn name(&self) -> &'static str {
        "price-table"
    }

    fn apply(&self, page: &Page) -> Option<PriceRows> {
        let rows = page
            .document()
            .select(&TABLE_ROWS)
            .filter_map(|row| {
                let cells: Vec<String> = row
                    .select(&TABLE_CELLS)
                    .map(element_text)
                    .collect();
                let (label, value) = (cells.first()?, cells.last()?);
                if cells.len() < 2 || !value.contains("R$") {
                    return None;
                }
                Some((clean(label)?, clean(value)?))
            })
            .collect();
        non_empty(rows)
    }
}

/// "Aluguel: R$ 1.500,00" style fragments anywhere in the visible text.
pub struct PriceText;

impl Strategy<PriceRows> for PriceText {
    fn name(&self) -> &'static str {
        "price-text"
    }

    fn apply(&self, page: &Page) -> Option<PriceRows> {
        let rows = FREE_TEXT
            .captures_iter(page.visible_text())
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        non_empty(rows)
    }
}

/// `offers.price` of the first JSON-LD object carrying an offer in BRL.
pub struct JsonLdOffer;

impl Strategy<String> for JsonLdOffer {
    fn name(&self) -> &'static str {
        "json-ld-offer"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        page.json_ld().iter().find_map(|item| {
            let offer = match item.get("offers")? {
                Value::Array(offers) => offers.first()?,
                offer => offer,
            };
            let currency = offer.get("priceCurrency").and_then(Value::as_str);
            if currency.is_some_and(|c| !c.trim().eq_ignore_ascii_case("BRL")) {
                return None;
            }
            offer.get("price").and_then(scalar_text)
        })
    }
}
