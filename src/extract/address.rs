//! Address strategies, highest priority first:
//!
//! 1. [`StructuredAddress`]: `address` inside an embedded JSON-LD block
//! 2. [`AddressContainer`] and selector heuristics: dedicated DOM containers
//! 3. [`Breadcrumb`]: the most specific location segment of the trail
//! 4. [`StreetPattern`]: a Brazilian street address in the visible text

use super::page::{css, Page};
use super::strategy::{Cascade, SelectorText, Strategy};
use crate::text::{clean, collapse_whitespace, fold};
use regex::Regex;
use scraper::Selector;
use serde_json::Value;
use std::sync::LazyLock;

static CONTAINER_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| css("div[data-testid='address-container'] p"));
static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| css("div[data-testid='address-container']"));
static BREADCRUMB_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    css("[class*='breadcrumb'] a, [class*='Breadcrumb'] a, nav[aria-label*='breadcrumb'] a, nav a")
});

static STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:rua|r\.|avenida|av\.|alameda|al\.|travessa|tv\.",
        r"|pra[çc]a|estrada|rodovia|largo|viela)",
        r"\s+[\p{L}\p{N}'.\- ]{2,60}?,?\s*(?:n[º°o]\.?\s*)?\d{1,5}\b",
    ))
    .expect("valid street regex")
});

/// Breadcrumb segments that never describe a location.
const GENERIC_SEGMENTS: &[&str] = &[
    "inicio", "home", "alugar", "comprar", "aluguel", "venda", "imoveis", "imovel", "quintoandar",
    "apartamentos", "casas",
];

/// Words that mark a segment as a place name.
const LOCATION_WORDS: &[&str] = &[
    "sp", "rua", "r", "av", "avenida", "alameda", "travessa", "praca", "sao", "paulo",
];

/// Address cascade in priority order.
pub fn cascade() -> Cascade<String> {
    Cascade::new("address_street")
        .then(StructuredAddress)
        .then(AddressContainer)
        .then(
            SelectorText::new(
                "price-heading",
                "[data-testid*='price'] ~ h2, [data-testid*='price'] ~ h3",
            )
            .min_len(10),
        )
        .then(SelectorText::new("address-testid", "[data-testid*='address']").min_len(10))
        .then(
            SelectorText::new("address-class", "[class*='address'], [class*='Address']")
                .min_len(10),
        )
        .then(
            SelectorText::new("location-class", "[class*='location'], [class*='Location']")
                .min_len(10),
        )
        .then(Breadcrumb)
        .then(StreetPattern)
}

/// `address` from JSON-LD, as written for strings or joined from a
/// `PostalAddress` object.
pub struct StructuredAddress;

impl Strategy<String> for StructuredAddress {
    fn name(&self) -> &'static str {
        "json-ld"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        page.json_ld()
            .iter()
            .find_map(|item| find_key(item, "address", 4))
            .and_then(render_address)
    }
}

fn find_key<'a>(value: &'a Value, key: &str, depth: usize) -> Option<&'a Value> {
    let Value::Object(map) = value else {
        return None;
    };
    if let Some(found) = map.get(key) {
        return Some(found);
    }
    if depth == 0 {
        return None;
    }
    map.values().find_map(|child| match child {
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key, depth - 1)),
        other => find_key(other, key, depth - 1),
    })
}

fn render_address(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Object(map) => {
            let mut parts: Vec<String> = Vec::new();
            for key in ["streetAddress", "addressLocality", "addressRegion"] {
                if let Some(part) = map.get(key).and_then(Value::as_str).and_then(clean) {
                    if !parts.contains(&part) {
                        parts.push(part);
                    }
                }
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Array(items) => items.iter().find_map(render_address),
        _ => None,
    }
}

/// The listing page's dedicated address block: its paragraphs joined, or
/// its whole text.
pub struct AddressContainer;

impl Strategy<String> for AddressContainer {
    fn name(&self) -> &'static str {
        "address-container"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        for text in page.texts(&CONTAINER_PARAGRAPHS) {
            if !parts.contains(&text) {
                parts.push(text);
            }
        }
        if !parts.is_empty() {
            return Some(parts.join(", "));
        }
        page.first_text(&CONTAINER)
    }
}

/// Most specific non-generic segment of the navigation trail.
pub struct Breadcrumb;

impl Strategy<String> for Breadcrumb {
    fn name(&self) -> &'static str {
        "breadcrumb"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        let segments = page.texts(&BREADCRUMB_LINKS);
        segments.into_iter().rev().find(|segment| {
            let folded = fold(segment);
            let words: Vec<&str> = folded
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();
            !GENERIC_SEGMENTS.contains(&folded.as_str())
                && words.iter().any(|w| LOCATION_WORDS.contains(w))
        })
    }
}

/// Street-type prefix, name and number anywhere in the visible text.
pub struct StreetPattern;

impl Strategy<String> for StreetPattern {
    fn name(&self) -> &'static str {
        "street-pattern"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        STREET
            .find(page.visible_text())
            .map(|m| collapse_whitespace(m.as_str()))
    }
}
