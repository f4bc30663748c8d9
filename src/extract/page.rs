use crate::error::ParseError;
use crate::text::{clean, collapse_whitespace, fold};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::cell::OnceCell;
use std::sync::LazyLock;
use tracing::debug;

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*[!?/]?[A-Za-z]").expect("valid markup regex"));

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| css("script[type='application/ld+json']"));
static BODY: LazyLock<Selector> = LazyLock::new(|| css("body"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| css("h1[data-testid='listing-title'], h1, title"));

/// Blocks holding "2 quartos", "45 m²", "Aceita pet" style labels
static ATTRIBUTE_BLOCKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "[data-testid='house-main-info'] [class*='iconDescriptionWrapper']",
        "[data-testid='house-main-info'] li",
        "[data-testid*='amenities'] li",
        "[data-testid*='features'] li",
    ]
    .into_iter()
    .map(css)
    .collect()
});

const FRAGMENT_CHARS: usize = 60;

/// Parse a selector literal.
///
/// Only called with selectors written in this crate, so a failure is a
/// programming error.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e:?}"))
}

/// One parsed listing page plus views computed on first use
pub struct Page {
    document: Html,
    json_ld: OnceCell<Vec<Value>>,
    visible_text: OnceCell<String>,
    attribute_lines: OnceCell<Vec<String>>,
}

impl Page {
    /// Parse `html`. Fails only when the input holds no markup at all.
    pub fn parse(html: &str) -> Result<Self, ParseError> {
        if html.contains('\0') || !MARKUP.is_match(html) {
            return Err(ParseError::MalformedMarkup {
                fragment: html.trim().chars().take(FRAGMENT_CHARS).collect(),
            });
        }

        Ok(Self {
            document: Html::parse_document(html),
            json_ld: OnceCell::new(),
            visible_text: OnceCell::new(),
            attribute_lines: OnceCell::new(),
        })
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Cleaned text of every element matching `selector`, in document order.
    pub fn texts(&self, selector: &Selector) -> Vec<String> {
        self.document
            .select(selector)
            .filter_map(|el| clean(&element_text(el)))
            .collect()
    }

    /// Cleaned text of the first element matching `selector` with text.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.document
            .select(selector)
            .find_map(|el| clean(&element_text(el)))
    }

    /// Listing heading, used as a last resort for attributes.
    pub fn heading(&self) -> Option<String> {
        self.first_text(&HEADING)
    }

    /// Objects from every JSON-LD block, listing-like items first.
    ///
    /// Arrays and `@graph` containers are flattened; blocks that fail to
    /// parse are skipped.
    pub fn json_ld(&self) -> &[Value] {
        self.json_ld.get_or_init(|| {
            let mut items = Vec::new();
            for script in self.document.select(&JSON_LD) {
                let raw: String = script.text().collect();
                match serde_json::from_str::<Value>(raw.trim()) {
                    Ok(value) => flatten_json_ld(value, &mut items),
                    Err(e) => debug!(error = %e, "Skipping unparseable JSON-LD block"),
                }
            }
            items.sort_by_key(|item| !is_listing_like(item));
            items
        })
    }

    /// JSON-LD objects whose `@type` describes a place or dwelling.
    pub fn json_ld_listings(&self) -> impl Iterator<Item = &Value> {
        self.json_ld().iter().filter(|item| is_listing_like(item))
    }

    /// Text a reader would see: body text without scripts or styles.
    pub fn visible_text(&self) -> &str {
        self.visible_text.get_or_init(|| {
            let Some(body) = self.document.select(&BODY).next() else {
                return String::new();
            };
            let mut parts = Vec::new();
            for node in body.descendants() {
                let Some(text) = node.value().as_text() else {
                    continue;
                };
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| {
                        matches!(name, "script" | "style" | "noscript" | "template")
                    });
                if !hidden && !text.trim().is_empty() {
                    parts.push(text.trim().to_string());
                }
            }
            collapse_whitespace(&parts.join(" "))
        })
    }

    /// Text of each labelled attribute entry, deduplicated, in page order.
    pub fn attribute_lines(&self) -> &[String] {
        self.attribute_lines.get_or_init(|| {
            let mut lines: Vec<String> = Vec::new();
            for selector in ATTRIBUTE_BLOCKS.iter() {
                for el in self.document.select(selector) {
                    let text = el
                        .text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if let Some(line) = clean(&text) {
                        if !lines.contains(&line) {
                            lines.push(line);
                        }
                    }
                }
            }
            lines
        })
    }
}

/// Concatenated text of an element, pieces separated by spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_listing_like(item: &Value) -> bool {
    let type_name = match item.get("@type") {
        Some(Value::String(s)) => fold(s),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .map(fold)
            .collect::<Vec<_>>()
            .join(" "),
        _ => return false,
    };
    ["place", "residence", "apartment", "house", "realestate", "accommodation", "singlefamily"]
        .iter()
        .any(|keyword| type_name.contains(keyword))
}
