pub mod normalize;
pub mod prices;

pub use normalize::{normalize, RawFields};
pub use prices::{Money, PriceBreakdown, PriceLine, TotalCheck, LISTED_PRICE_LABEL};

use crate::error::{FetchErrorKind, ParseError};
use serde::{Deserialize, Serialize};

/// How far processing got for a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Fetched and parsed; individual fields may still be absent
    Success,
    /// Fetched, but the body was not usable markup
    ParseError,
    /// Never fetched
    FetchFailed,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::ParseError => "parse_error",
            RecordStatus::FetchFailed => "fetch_failed",
        }
    }
}

/// Three-valued amenity flag: a missing marker is `Unknown`, not `No`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Amenity {
    pub fn as_option(self) -> Option<bool> {
        match self {
            Amenity::Yes => Some(true),
            Amenity::No => Some(false),
            Amenity::Unknown => None,
        }
    }

    /// Output marker; unknown collapses to an empty cell
    pub fn marker(self) -> &'static str {
        match self {
            Amenity::Yes => "sim",
            Amenity::No => "não",
            Amenity::Unknown => "",
        }
    }
}

/// A field that could not be normalized, kept for diagnostics
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub field: &'static str,
    pub message: String,
}

/// One parsed listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Record {
    pub url: String,
    pub status: RecordStatus,
    pub title: Option<String>,
    pub address_street: Option<String>,
    /// Usable area in m²
    pub area: Option<f64>,
    pub rooms: Option<u32>,
    pub suites: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking_spots: Option<u32>,
    pub floor: Option<u32>,
    pub pet_allowed: Amenity,
    pub furnished: Amenity,
    pub near_metro: Amenity,
    pub prices: PriceBreakdown,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Record {
    /// Empty record for `url` with the given status
    pub fn empty(url: impl Into<String>, status: RecordStatus) -> Self {
        Self {
            url: url.into(),
            status,
            title: None,
            address_street: None,
            area: None,
            rooms: None,
            suites: None,
            bathrooms: None,
            parking_spots: None,
            floor: None,
            pet_allowed: Amenity::Unknown,
            furnished: Amenity::Unknown,
            near_metro: Amenity::Unknown,
            prices: PriceBreakdown::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn fetch_failed(url: impl Into<String>, kind: &FetchErrorKind, attempts: u32) -> Self {
        let mut record = Self::empty(url, RecordStatus::FetchFailed);
        record.diagnostics.push(Diagnostic {
            field: "fetch",
            message: format!("{} after {} attempt(s)", kind, attempts),
        });
        record
    }

    pub fn parse_failed(url: impl Into<String>, error: &ParseError) -> Self {
        let mut record = Self::empty(url, RecordStatus::ParseError);
        record.diagnostics.push(Diagnostic {
            field: "html",
            message: error.to_string(),
        });
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_amenity_collapses_to_absent() {
        assert_eq!(Amenity::Unknown.as_option(), None);
        assert_eq!(Amenity::Unknown.marker(), "");
        assert_eq!(Amenity::No.marker(), "não");
        assert_eq!(Amenity::default(), Amenity::Unknown);
    }

    #[test]
    fn failure_records_keep_their_url_and_status() {
        let record = Record::fetch_failed("https://x/1", &FetchErrorKind::Timeout, 3);
        assert_eq!(record.url, "https://x/1");
        assert_eq!(record.status.as_str(), "fetch_failed");
        assert_eq!(record.diagnostics[0].message, "request timed out after 3 attempt(s)");
    }
}
