use super::{
    Amenity, Diagnostic, Money, PriceBreakdown, PriceLine, Record, RecordStatus, TotalCheck,
};
use crate::text::{clean, first_number, fold, parse_decimal_br};
use tracing::{debug, warn};

/// Unparsed field values as they were found on the page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub url: String,
    pub title: Option<String>,
    pub address_street: Option<String>,
    pub area: Option<String>,
    pub rooms: Option<String>,
    pub suites: Option<String>,
    pub bathrooms: Option<String>,
    pub parking_spots: Option<String>,
    pub floor: Option<String>,
    pub pet_allowed: Option<String>,
    pub furnished: Option<String>,
    pub near_metro: Option<String>,
    /// `(label, value)` rows of the price table, in page order
    pub prices: Vec<(String, String)>,
}

/// Coerce raw page text into a typed [`Record`].
///
/// A field that fails to parse becomes absent and leaves a [`Diagnostic`];
/// the record itself is always produced.
pub fn normalize(raw: RawFields) -> Record {
    let mut record = Record::empty(raw.url, RecordStatus::Success);
    let mut diagnostics = Vec::new();

    record.title = raw.title.as_deref().and_then(clean);
    record.address_street = raw.address_street.as_deref().and_then(clean);

    record.area = coerce(&mut diagnostics, "area", raw.area, parse_area);
    record.rooms = coerce(&mut diagnostics, "rooms", raw.rooms, parse_count);
    record.suites = coerce(&mut diagnostics, "suites", raw.suites, parse_count);
    record.bathrooms = coerce(&mut diagnostics, "bathrooms", raw.bathrooms, parse_count);
    record.parking_spots =
        coerce(&mut diagnostics, "parking_spots", raw.parking_spots, parse_count);
    record.floor = coerce(&mut diagnostics, "floor", raw.floor, parse_floor);

    record.pet_allowed = flag(&mut diagnostics, "pet_allowed", raw.pet_allowed);
    record.furnished = flag(&mut diagnostics, "furnished", raw.furnished);
    record.near_metro = flag(&mut diagnostics, "near_metro", raw.near_metro);

    record.prices = prices(&mut diagnostics, raw.prices);
    match record.prices.check_total() {
        TotalCheck::Mismatch { sum, total } => {
            warn!(url = %record.url, %sum, %total, "Price lines do not add up to total");
            diagnostics.push(Diagnostic {
                field: "Total",
                message: format!("line items sum to {} but total is {}", sum, total),
            });
        }
        TotalCheck::Overflow => {
            warn!(url = %record.url, "Price lines overflow, total not checked");
            diagnostics.push(Diagnostic {
                field: "Total",
                message: "line items too large to add up, total not checked".to_string(),
            });
        }
        TotalCheck::Unchecked | TotalCheck::Consistent => {}
    }

    record.diagnostics = diagnostics;
    record
}

fn coerce<T>(
    diagnostics: &mut Vec<Diagnostic>,
    field: &'static str,
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = raw?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        debug!(field, raw = %raw, "Dropping unparseable field");
        diagnostics.push(Diagnostic {
            field,
            message: format!("could not parse {:?}", raw),
        });
    }
    parsed
}

fn flag(diagnostics: &mut Vec<Diagnostic>, field: &'static str, raw: Option<String>) -> Amenity {
    let Some(raw) = raw else {
        return Amenity::Unknown;
    };
    match fold(&raw).as_str() {
        "sim" | "s" | "yes" | "true" | "1" => Amenity::Yes,
        "nao" | "n" | "no" | "false" | "0" => Amenity::No,
        _ => {
            diagnostics.push(Diagnostic {
                field,
                message: format!("unrecognized marker {:?}", raw),
            });
            Amenity::Unknown
        }
    }
}

fn prices(diagnostics: &mut Vec<Diagnostic>, rows: Vec<(String, String)>) -> PriceBreakdown {
    let mut breakdown = PriceBreakdown::default();
    for (label, value) in rows {
        let line = PriceLine::from_label(&label);
        match Money::parse_brl(&value) {
            Some(amount) => {
                breakdown.insert(line, amount);
            }
            None => diagnostics.push(Diagnostic {
                field: "prices",
                message: format!(
                    "could not parse amount {:?} for {:?}",
                    value.trim(),
                    label.trim()
                ),
            }),
        }
    }
    breakdown
}

fn parse_area(raw: &str) -> Option<f64> {
    first_number(raw).and_then(parse_decimal_br).filter(|v| *v >= 0.0)
}

fn parse_count(raw: &str) -> Option<u32> {
    let token = first_number(raw)?;
    let value = parse_decimal_br(token)?;
    (value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64).then_some(value as u32)
}

fn parse_floor(raw: &str) -> Option<u32> {
    if fold(raw).contains("terreo") {
        return Some(0);
    }
    parse_count(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawFields {
        RawFields {
            url: "https://www.quintoandar.com.br/imovel/1".to_string(),
            ..RawFields::default()
        }
    }

    #[test]
    fn coerces_units_and_counts() {
        let record = normalize(RawFields {
            area: Some("45,5\u{a0}m²".into()),
            rooms: Some("2 quartos".into()),
            suites: Some("1".into()),
            bathrooms: Some(" 2 banheiros ".into()),
            parking_spots: Some("1 vaga".into()),
            floor: Some("3º andar".into()),
            ..raw()
        });

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.area, Some(45.5));
        assert_eq!(record.rooms, Some(2));
        assert_eq!(record.suites, Some(1));
        assert_eq!(record.bathrooms, Some(2));
        assert_eq!(record.parking_spots, Some(1));
        assert_eq!(record.floor, Some(3));
        assert!(record.diagnostics.is_empty());
    }

    #[test]
    fn ground_floor_is_zero() {
        let record = normalize(RawFields {
            floor: Some("Térreo".into()),
            ..raw()
        });
        assert_eq!(record.floor, Some(0));
    }

    #[test]
    fn bad_field_is_dropped_with_diagnostic() {
        let record = normalize(RawFields {
            rooms: Some("muitos".into()),
            bathrooms: Some("2".into()),
            ..raw()
        });

        assert_eq!(record.rooms, None);
        assert_eq!(record.bathrooms, Some(2));
        assert_eq!(record.diagnostics.len(), 1);
        assert_eq!(record.diagnostics[0].field, "rooms");
    }

    #[test]
    fn textual_markers_become_amenities() {
        let record = normalize(RawFields {
            pet_allowed: Some("sim".into()),
            furnished: Some("Não".into()),
            near_metro: None,
            ..raw()
        });

        assert_eq!(record.pet_allowed, Amenity::Yes);
        assert_eq!(record.furnished, Amenity::No);
        assert_eq!(record.near_metro, Amenity::Unknown);
    }

    #[test]
    fn trims_text_fields() {
        let record = normalize(RawFields {
            title: Some("  Apartamento \n com 2 quartos ".into()),
            address_street: Some("   ".into()),
            ..raw()
        });
        assert_eq!(record.title.as_deref(), Some("Apartamento com 2 quartos"));
        assert_eq!(record.address_street, None);
    }

    #[test]
    fn price_rows_are_mapped_and_checked() {
        let record = normalize(RawFields {
            prices: vec![
                ("Aluguel".into(), "R$1.500,00".into()),
                ("Condomínio".into(), "R$300,00".into()),
                ("Total".into(), "R$1.800,00".into()),
            ],
            ..raw()
        });

        assert_eq!(record.prices.get(&PriceLine::Rent), Some(Money::from_cents(150_000)));
        assert_eq!(record.prices.get(&PriceLine::CondoFee), Some(Money::from_cents(30_000)));
        assert_eq!(record.prices.total(), Some(Money::from_cents(180_000)));
        assert!(record.diagnostics.is_empty());
    }

    #[test]
    fn total_mismatch_is_a_diagnostic_not_an_error() {
        let record = normalize(RawFields {
            prices: vec![
                ("Aluguel".into(), "R$1.500,00".into()),
                ("Total".into(), "R$1.900,00".into()),
            ],
            ..raw()
        });

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.prices.len(), 2);
        assert_eq!(record.diagnostics.len(), 1);
        assert_eq!(record.diagnostics[0].field, "Total");
    }

    #[test]
    fn huge_price_lines_leave_a_diagnostic_instead_of_panicking() {
        let record = normalize(RawFields {
            prices: vec![
                ("Aluguel".into(), "R$ 90.000.000.000.000.000".into()),
                ("Condomínio".into(), "R$ 90.000.000.000.000.000".into()),
                ("Total".into(), "R$ 1".into()),
            ],
            ..raw()
        });

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.prices.len(), 3);
        assert_eq!(record.diagnostics.len(), 1);
        assert_eq!(record.diagnostics[0].field, "Total");
        assert!(record.diagnostics[0].message.contains("not checked"));
    }
}
