//! Text helpers shared by the record model and the extraction engine.
//!
//! Listing pages mix accents, non-breaking spaces and Brazilian number
//! formatting (`1.500,00`), so every label comparison goes through [`fold`]
//! and every number through [`parse_decimal_br`].

use regex::Regex;
use std::sync::LazyLock;

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid number regex"));

static THOUSANDS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+$").expect("valid thousands regex"));

/// Lowercase, strip Portuguese diacritics and collapse whitespace.
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            'º' | '°' => 'o',
            other => other,
        });
    }

    out
}

/// Trim and collapse runs of whitespace (including `&nbsp;`) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and drop empty results.
pub fn clean(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(text);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// First numeric token in `text`, e.g. `"1.500,00"` in `"R$ 1.500,00/mês"`.
pub fn first_number(text: &str) -> Option<&str> {
    NUMBER_TOKEN.find(text).map(|m| m.as_str())
}

/// Parse a number using the comma-as-decimal-separator convention.
///
/// `"45,5"` → 45.5, `"1.500"` → 1500.0, `"1.500,25"` → 1500.25. A lone dot
/// that is not a thousands group (`"45.5"`) is read as a decimal point.
pub fn parse_decimal_br(token: &str) -> Option<f64> {
    let token = token.trim();
    let normalized = if token.contains(',') {
        token.replace('.', "").replace(',', ".")
    } else if THOUSANDS_ONLY.is_match(token) {
        token.replace('.', "")
    } else {
        token.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
