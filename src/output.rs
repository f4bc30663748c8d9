//! URL lists in, CSV out.

use crate::models::{PriceLine, Record, RecordStatus};
use crate::scrapers::stats::StatsSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATA_DIR: &str = "database/data";
pub const URLS_DIR: &str = "database/urls";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Columns every CSV starts with, in order
pub const BASE_COLUMNS: [&str; 13] = [
    "url",
    "status",
    "title",
    "address_street",
    "area",
    "quartos",
    "suite",
    "banheiros",
    "vagas",
    "andar",
    "pet",
    "mobiliado",
    "metro_proximo",
];

/// `quintoandar_{neighborhood}_{YYYYmmdd_HHMMSS}.csv` under [`DATA_DIR`]
pub fn default_csv_path(neighborhood: &str, at: DateTime<Local>) -> PathBuf {
    Path::new(DATA_DIR).join(format!(
        "quintoandar_{}_{}.csv",
        neighborhood,
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// `urls_{neighborhood}_{YYYYmmdd_HHMMSS}.txt` under [`URLS_DIR`]
pub fn default_urls_path(neighborhood: &str, at: DateTime<Local>) -> PathBuf {
    Path::new(URLS_DIR).join(format!("urls_{}_{}.txt", neighborhood, at.format("%Y%m%d_%H%M%S")))
}

/// One URL per line; blank lines are skipped and duplicates dropped,
/// keeping the first occurrence.
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    let mut seen = HashSet::new();
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect();

    info!("📋 Loaded {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

pub fn save_urls(path: &Path, urls: &[String]) -> Result<()> {
    create_parent(path)?;
    let mut content = urls.join("\n");
    content.push('\n');
    fs::write(path, content)
        .with_context(|| format!("Failed to write URL list {}", path.display()))?;
    info!("💾 Saved {} URLs to {}", urls.len(), path.display());
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Header row: base columns, the canonical price lines, then any raw price
/// labels seen in this batch (sorted).
pub fn csv_header(records: &[Record]) -> Vec<String> {
    let extra: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.prices.other_labels())
        .collect();

    BASE_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(PriceLine::CANONICAL.iter().map(|line| line.column().to_string()))
        .chain(extra.into_iter().map(str::to_string))
        .collect()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(record: &Record, header: &[String]) -> Vec<String> {
    let prices: BTreeMap<&str, String> = record
        .prices
        .iter()
        .map(|(line, amount)| (line.column(), amount.to_string()))
        .collect();

    let mut row = vec![
        record.url.clone(),
        record.status.as_str().to_string(),
        record.title.clone().unwrap_or_default(),
        record.address_street.clone().unwrap_or_default(),
        opt(record.area),
        opt(record.rooms),
        opt(record.suites),
        opt(record.bathrooms),
        opt(record.parking_spots),
        opt(record.floor),
        record.pet_allowed.marker().to_string(),
        record.furnished.marker().to_string(),
        record.near_metro.marker().to_string(),
    ];
    row.extend(
        header[BASE_COLUMNS.len()..]
            .iter()
            .map(|column| prices.get(column.as_str()).cloned().unwrap_or_default()),
    );
    row
}

/// Write records as CSV (UTF-8 with BOM). Returns the number of rows.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<usize> {
    create_parent(path)?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;

    let header = csv_header(records);
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&header).context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(csv_row(record, &header))
            .with_context(|| format!("Failed to write CSV row for {}", record.url))?;
    }
    writer.flush().context("Failed to flush CSV")?;

    Ok(records.len())
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub parsed: usize,
    pub parse_failures: usize,
    pub fetch_failures: usize,
    pub with_address: usize,
    pub retries: u64,
    pub rate_limited: u64,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
}

impl RunSummary {
    pub fn new(records: &[Record], stats: &StatsSnapshot) -> Self {
        let count = |status| records.iter().filter(|r| r.status == status).count();
        Self {
            total: records.len(),
            parsed: count(RecordStatus::Success),
            parse_failures: count(RecordStatus::ParseError),
            fetch_failures: count(RecordStatus::FetchFailed),
            with_address: records.iter().filter(|r| r.address_street.is_some()).count(),
            retries: stats.retries,
            rate_limited: stats.rate_limited,
            failures_by_kind: stats.failures_by_kind.clone(),
        }
    }

    fn rate(&self, n: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / self.total as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.rate(self.parsed)
    }

    pub fn address_rate(&self) -> f64 {
        self.rate(self.with_address)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total properties: {}", self.total)?;
        writeln!(f, "Successfully parsed: {}", self.parsed)?;
        writeln!(f, "Parse failures: {}", self.parse_failures)?;
        write!(f, "Fetch failures: {}", self.fetch_failures)?;
        if !self.failures_by_kind.is_empty() {
            let kinds: Vec<String> = self
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            write!(f, " ({})", kinds.join(", "))?;
        }
        writeln!(f)?;
        writeln!(f, "Retries: {}", self.retries)?;
        writeln!(f, "Rate-limit hits: {}", self.rate_limited)?;
        writeln!(f, "With addresses: {}", self.with_address)?;
        writeln!(f, "Success rate: {:.1}%", self.success_rate())?;
        write!(f, "Address extraction rate: {:.1}%", self.address_rate())
    }
}
