use crate::text::fold;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static MONEY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?)\s*(\d[\d.]*)(?:,(\d+))?").expect("valid money regex"));

static THOUSANDS_GROUPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+$").expect("valid thousands regex"));

/// Monetary amount in BRL cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Parse a BRL amount such as `"R$ 1.500,00"`, `"R$1.500"` or `"300"`.
    pub fn parse_brl(text: &str) -> Option<Self> {
        let caps = MONEY_TOKEN.captures(text)?;
        let negative = !caps[1].is_empty();
        let integral = &caps[2];

        let (whole, fraction) = match caps.get(3) {
            Some(fraction) => (integral.replace('.', ""), fraction.as_str().to_string()),
            None if THOUSANDS_GROUPS.is_match(integral) => {
                (integral.replace('.', ""), String::new())
            }
            None => match integral.rsplit_once('.') {
                Some((whole, fraction)) => (whole.replace('.', ""), fraction.to_string()),
                None => (integral.to_string(), String::new()),
            },
        };

        let whole: i64 = whole.parse().ok()?;
        let mut fraction: String = fraction.chars().take(2).collect();
        while fraction.len() < 2 {
            fraction.push('0');
        }
        let cents = whole.checked_mul(100)?.checked_add(fraction.parse::<i64>().ok()?)?;

        Some(Self(if negative { -cents } else { cents }))
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Label of the price advertised in the page's structured data. It is kept
/// as an extra line and never counted towards the total.
pub const LISTED_PRICE_LABEL: &str = "Preço (LD)";

/// Canonical name of one row of the price table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriceLine {
    Rent,
    CondoFee,
    PropertyTax,
    FireInsurance,
    ServiceFee,
    Total,
    /// Unrecognized label, kept verbatim so no amount is dropped.
    Other(String),
}

impl PriceLine {
    pub const CANONICAL: [PriceLine; 6] = [
        PriceLine::Rent,
        PriceLine::CondoFee,
        PriceLine::PropertyTax,
        PriceLine::FireInsurance,
        PriceLine::ServiceFee,
        PriceLine::Total,
    ];

    /// Map a page label onto a canonical line, tolerating accents, case,
    /// trailing colons and small wording variants.
    pub fn from_label(label: &str) -> Self {
        let folded = fold(label);
        let key = folded.trim_end_matches([':', '.', ' ']);

        if key.starts_with("total") || key == "valor total" {
            PriceLine::Total
        } else if key.contains("aluguel") {
            PriceLine::Rent
        } else if key.starts_with("condom") || key == "cond" {
            PriceLine::CondoFee
        } else if key.contains("iptu") {
            PriceLine::PropertyTax
        } else if key.contains("seguro") && key.contains("incendio") {
            PriceLine::FireInsurance
        } else if key.contains("taxa") && key.contains("servico") {
            PriceLine::ServiceFee
        } else {
            PriceLine::Other(label.trim().trim_end_matches(':').trim().to_string())
        }
    }

    /// Structured-data price line, see [`LISTED_PRICE_LABEL`].
    pub fn listed() -> Self {
        PriceLine::Other(LISTED_PRICE_LABEL.to_string())
    }

    /// Whether the line is one of the amounts that should add up to the total.
    pub fn is_component(&self) -> bool {
        match self {
            PriceLine::Total => false,
            PriceLine::Other(raw) => raw != LISTED_PRICE_LABEL,
            _ => true,
        }
    }

    /// Output column name.
    pub fn column(&self) -> &str {
        match self {
            PriceLine::Rent => "Aluguel",
            PriceLine::CondoFee => "Condomínio",
            PriceLine::PropertyTax => "IPTU",
            PriceLine::FireInsurance => "Seguro incêndio",
            PriceLine::ServiceFee => "Taxa de serviço",
            PriceLine::Total => "Total",
            PriceLine::Other(raw) => raw,
        }
    }
}

/// Label → amount mapping for one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceBreakdown {
    lines: BTreeMap<PriceLine, Money>,
}

impl PriceBreakdown {
    /// Record a line. The first amount seen for a line is kept.
    pub fn insert(&mut self, line: PriceLine, amount: Money) -> bool {
        if self.lines.contains_key(&line) {
            return false;
        }
        self.lines.insert(line, amount);
        true
    }

    pub fn get(&self, line: &PriceLine) -> Option<Money> {
        self.lines.get(line).copied()
    }

    pub fn total(&self) -> Option<Money> {
        self.get(&PriceLine::Total)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PriceLine, Money)> {
        self.lines.iter().map(|(line, amount)| (line, *amount))
    }

    /// Raw labels that did not map onto a canonical line.
    pub fn other_labels(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().filter_map(|line| match line {
            PriceLine::Other(raw) => Some(raw.as_str()),
            _ => None,
        })
    }

    /// Compare the total against the sum of its component lines.
    pub fn check_total(&self) -> TotalCheck {
        let Some(total) = self.total() else {
            return TotalCheck::Unchecked;
        };
        let mut components = self
            .lines
            .iter()
            .filter(|(line, _)| line.is_component())
            .map(|(_, amount)| *amount)
            .peekable();
        if components.peek().is_none() {
            return TotalCheck::Unchecked;
        }

        match components.try_fold(Money::default(), Money::checked_add) {
            None => TotalCheck::Overflow,
            Some(sum) if sum == total => TotalCheck::Consistent,
            Some(sum) => TotalCheck::Mismatch { sum, total },
        }
    }
}

/// Outcome of [`PriceBreakdown::check_total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCheck {
    /// No total, or nothing to add up.
    Unchecked,
    Consistent,
    Mismatch { sum: Money, total: Money },
    /// The components do not fit in an `i64` of cents.
    Overflow,
}

impl Serialize for PriceBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for (line, amount) in &self.lines {
            map.serialize_entry(line.column(), amount)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brazilian_amounts() {
        assert_eq!(Money::parse_brl("R$1.500,00"), Some(Money::from_cents(150_000)));
        assert_eq!(Money::parse_brl("R$ 300,00"), Some(Money::from_cents(30_000)));
        assert_eq!(Money::parse_brl("R$\u{a0}2.345"), Some(Money::from_cents(234_500)));
        assert_eq!(Money::parse_brl("R$ 45,5"), Some(Money::from_cents(4_550)));
        assert_eq!(Money::parse_brl("Incluso"), None);
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_cents(150_000).to_string(), "1500.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1_050).to_string(), "-10.50");
    }

    #[test]
    fn label_variants_map_to_canonical_lines() {
        assert_eq!(PriceLine::from_label("Aluguel"), PriceLine::Rent);
        assert_eq!(PriceLine::from_label("Valor do aluguel:"), PriceLine::Rent);
        assert_eq!(PriceLine::from_label("CONDOMINIO"), PriceLine::CondoFee);
        assert_eq!(PriceLine::from_label("Condomínio"), PriceLine::CondoFee);
        assert_eq!(PriceLine::from_label("IPTU"), PriceLine::PropertyTax);
        assert_eq!(PriceLine::from_label("Seguro incêndio"), PriceLine::FireInsurance);
        assert_eq!(PriceLine::from_label("Seguro contra incendio"), PriceLine::FireInsurance);
        assert_eq!(PriceLine::from_label("Taxa de serviço"), PriceLine::ServiceFee);
        assert_eq!(PriceLine::from_label("Total:"), PriceLine::Total);
        assert_eq!(
            PriceLine::from_label("Taxa de limpeza:"),
            PriceLine::Other("Taxa de limpeza".to_string())
        );
    }

    #[test]
    fn consistent_total_has_no_mismatch() {
        let mut prices = PriceBreakdown::default();
        prices.insert(PriceLine::Rent, Money::from_cents(150_000));
        prices.insert(PriceLine::CondoFee, Money::from_cents(30_000));
        prices.insert(PriceLine::Total, Money::from_cents(180_000));
        assert_eq!(prices.check_total(), TotalCheck::Consistent);
    }

    #[test]
    fn total_alone_is_not_checked() {
        let mut prices = PriceBreakdown::default();
        prices.insert(PriceLine::Total, Money::from_cents(180_000));
        assert_eq!(prices.check_total(), TotalCheck::Unchecked);
    }

    #[test]
    fn listed_price_is_not_a_component() {
        let mut prices = PriceBreakdown::default();
        prices.insert(PriceLine::Rent, Money::from_cents(150_000));
        prices.insert(PriceLine::listed(), Money::from_cents(150_000));
        prices.insert(PriceLine::Total, Money::from_cents(150_000));
        assert_eq!(prices.check_total(), TotalCheck::Consistent);
        assert_eq!(prices.other_labels().collect::<Vec<_>>(), vec![LISTED_PRICE_LABEL]);
    }

    #[test]
    fn overflowing_components_skip_the_check() {
        let mut prices = PriceBreakdown::default();
        prices.insert(PriceLine::Rent, Money::from_cents(i64::MAX - 10));
        prices.insert(PriceLine::CondoFee, Money::from_cents(100));
        prices.insert(PriceLine::Total, Money::from_cents(100));
        assert_eq!(prices.check_total(), TotalCheck::Overflow);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn inconsistent_total_is_reported() {
        let mut prices = PriceBreakdown::default();
        prices.insert(PriceLine::Rent, Money::from_cents(150_000));
        prices.insert(PriceLine::Other("Taxa extra".into()), Money::from_cents(1_000));
        prices.insert(PriceLine::Total, Money::from_cents(150_000));
        assert_eq!(
            prices.check_total(),
            TotalCheck::Mismatch {
                sum: Money::from_cents(151_000),
                total: Money::from_cents(150_000),
            }
        );
    }

    #[test]
    fn first_amount_for_a_line_wins() {
        let mut prices = PriceBreakdown::default();
        assert!(prices.insert(PriceLine::Rent, Money::from_cents(100)));
        assert!(!prices.insert(PriceLine::Rent, Money::from_cents(200)));
        assert_eq!(prices.get(&PriceLine::Rent), Some(Money::from_cents(100)));
    }
}
