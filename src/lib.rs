//! Rental listing scraper core for QuintoAndar: a resilient fetch pipeline
//! and a cascade-based extraction engine.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod output;
pub mod scrapers;
pub mod text;

pub use config::{FetchConfig, ScoutConfig};
pub use error::{ConfigError, FetchErrorKind, ParseError};
pub use extract::Extractor;
pub use models::{Amenity, Record, RecordStatus};
pub use scrapers::{FetchClient, ListingResult, Orchestrator};
