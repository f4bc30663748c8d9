use super::page::{css, Page};
use scraper::Selector;
use serde_json::Value;
use tracing::debug;

/// One way of finding a field on a page.
pub trait Strategy<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when this strategy cannot find the field; never panics
    /// on odd markup.
    fn apply(&self, page: &Page) -> Option<T>;
}

/// Ordered strategies for one field. The first strategy that yields a value
/// wins; values are never merged across strategies.
pub struct Cascade<T> {
    field: &'static str,
    strategies: Vec<Box<dyn Strategy<T>>>,
}

impl<T> Cascade<T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a lower-priority strategy.
    pub fn then(mut self, strategy: impl Strategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Value and name of the winning strategy.
    pub fn run_named(&self, page: &Page) -> Option<(&'static str, T)> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.apply(page) {
                debug!(field = self.field, strategy = strategy.name(), "Field extracted");
                return Some((strategy.name(), value));
            }
        }
        debug!(field = self.field, "No strategy matched");
        None
    }

    pub fn run(&self, page: &Page) -> Option<T> {
        self.run_named(page).map(|(_, value)| value)
    }
}

/// Text of the first element matching a CSS selector.
pub struct SelectorText {
    name: &'static str,
    selector: Selector,
    min_len: usize,
}

impl SelectorText {
    /// `selector` must be a valid CSS literal.
    pub(crate) fn new(name: &'static str, selector: &str) -> Self {
        Self {
            name,
            selector: css(selector),
            min_len: 1,
        }
    }

    /// Ignore matches shorter than `min_len` characters.
    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }
}

impl Strategy<String> for SelectorText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, page: &Page) -> Option<String> {
        page.texts(&self.selector)
            .into_iter()
            .find(|text| text.chars().count() >= self.min_len)
    }
}

/// A scalar from the first listing-like JSON-LD object holding one of `keys`.
pub struct JsonLdValue {
    name: &'static str,
    keys: &'static [&'static str],
}

impl JsonLdValue {
    pub fn new(name: &'static str, keys: &'static [&'static str]) -> Self {
        Self { name, keys }
    }
}

impl Strategy<String> for JsonLdValue {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, page: &Page) -> Option<String> {
        page.json_ld_listings().find_map(|item| {
            self.keys
                .iter()
                .find_map(|key| item.get(*key).and_then(scalar_text))
        })
    }
}

/// Render a JSON-LD scalar (or a `QuantitativeValue`'s `value`) as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("sim".to_string()),
        Value::Bool(false) => Some("não".to_string()),
        Value::Object(map) => map.get("value").and_then(scalar_text),
        _ => None,
    }
}
