//! Numeric attributes and amenity markers.
//!
//! Both read the labelled attributes block ("2 quartos (1 suíte)", "45 m²",
//! "Aceita pet"). Labels are matched on folded text, so case and accents do
//! not matter.

use super::page::Page;
use super::strategy::{Cascade, JsonLdValue, Strategy};
use crate::text::fold;
use regex::Regex;
use std::sync::LazyLock;

static AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*m(?:²|2)").expect("valid area regex"));
static ROOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(?:quartos?|dormitorios?)\b").expect("valid rooms regex")
});
static SUITES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*suites?\b").expect("valid suites regex"));
static BATHROOMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*banheiros?\b").expect("valid bathrooms regex"));
static PARKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*vagas?\b").expect("valid parking regex"));
static FLOOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*o?\s*andar\b").expect("valid floor regex"));

/// Pulls a raw value out of one folded label line.
type Pick = fn(&str) -> Option<String>;

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|caps| caps[1].to_string())
}

fn pick_area(line: &str) -> Option<String> {
    capture(&AREA, line)
}

fn pick_rooms(line: &str) -> Option<String> {
    capture(&ROOMS, line)
}

fn pick_suites(line: &str) -> Option<String> {
    capture(&SUITES, line).or_else(|| line.contains("suite").then(|| "1".to_string()))
}

fn pick_bathrooms(line: &str) -> Option<String> {
    capture(&BATHROOMS, line)
}

fn pick_parking(line: &str) -> Option<String> {
    if line.contains("sem vaga") || line.contains("nao tem vaga") {
        return Some("0".to_string());
    }
    capture(&PARKING, line)
}

fn pick_floor(line: &str) -> Option<String> {
    if line.contains("terreo") {
        return Some("térreo".to_string());
    }
    capture(&FLOOR, line)
}

/// Where label lines come from.
#[derive(Debug, Clone, Copy)]
pub enum LineSource {
    /// The labelled attributes block
    AttributesBlock,
    /// The listing heading ("Apartamento com 2 quartos, 60 m²")
    Heading,
}

/// First label line in `source` that `pick` recognises.
pub struct LabeledValue {
    source: LineSource,
    pick: Pick,
}

impl LabeledValue {
    pub fn new(source: LineSource, pick: Pick) -> Self {
        Self { source, pick }
    }
}

impl Strategy<String> for LabeledValue {
    fn name(&self) -> &'static str {
        match self.source {
            LineSource::AttributesBlock => "attributes-block",
            LineSource::Heading => "heading",
        }
    }

    fn apply(&self, page: &Page) -> Option<String> {
        match self.source {
            LineSource::AttributesBlock => page
                .attribute_lines()
                .iter()
                .find_map(|line| (self.pick)(&fold(line))),
            LineSource::Heading => page.heading().and_then(|h| (self.pick)(&fold(&h))),
        }
    }
}

fn numeric(
    field: &'static str,
    json_ld_keys: &'static [&'static str],
    pick: Pick,
) -> Cascade<String> {
    let cascade = Cascade::new(field);
    let cascade = if json_ld_keys.is_empty() {
        cascade
    } else {
        cascade.then(JsonLdValue::new("json-ld", json_ld_keys))
    };
    cascade
        .then(LabeledValue::new(LineSource::AttributesBlock, pick))
        .then(LabeledValue::new(LineSource::Heading, pick))
}

pub fn area() -> Cascade<String> {
    numeric("area", &["floorSize"], pick_area)
}

pub fn rooms() -> Cascade<String> {
    numeric("rooms", &["numberOfBedrooms", "numberOfRooms"], pick_rooms)
}

pub fn suites() -> Cascade<String> {
    numeric("suites", &[], pick_suites)
}

pub fn bathrooms() -> Cascade<String> {
    numeric("bathrooms", &["numberOfBathroomsTotal", "numberOfFullBathrooms"], pick_bathrooms)
}

pub fn parking_spots() -> Cascade<String> {
    numeric("parking_spots", &[], pick_parking)
}

pub fn floor() -> Cascade<String> {
    numeric("floor", &["floorLevel"], pick_floor)
}

/// Fixed positive/negative label markers for one amenity. Negative markers
/// are checked first so "não aceita pet" is not read as "aceita pet".
///
/// No marker means unknown, so the strategy yields nothing.
pub struct AmenityMarkers {
    negative: &'static [&'static str],
    positive: &'static [&'static str],
}

impl Strategy<String> for AmenityMarkers {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn apply(&self, page: &Page) -> Option<String> {
        page.attribute_lines().iter().find_map(|line| {
            let folded = fold(line);
            if self.negative.iter().any(|m| folded.contains(m)) {
                Some("não".to_string())
            } else if self.positive.iter().any(|m| folded.contains(m)) {
                Some("sim".to_string())
            } else {
                None
            }
        })
    }
}

pub fn pet_allowed() -> Cascade<String> {
    Cascade::new("pet_allowed")
        .then(JsonLdValue::new("json-ld", &["petsAllowed"]))
        .then(AmenityMarkers {
            negative: &["nao aceita pet", "nao aceita animais", "proibido pet", "sem pet"],
            positive: &["aceita pet", "aceita animais", "pet friendly"],
        })
}

pub fn furnished() -> Cascade<String> {
    Cascade::new("furnished").then(AmenityMarkers {
        negative: &["sem mobilia", "nao mobiliado", "sem moveis"],
        positive: &["mobiliado", "com mobilia", "semimobiliado"],
    })
}

pub fn near_metro() -> Cascade<String> {
    Cascade::new("near_metro").then(AmenityMarkers {
        negative: &["sem metro", "longe do metro", "metro distante"],
        positive: &["metro proximo", "perto do metro", "proximo ao metro", "proximo do metro"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN_INFO: &str = r#"
        <h1>Apartamento com 3 quartos para alugar, 80 m²</h1>
        <div data-testid="house-main-info">
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>45 m²</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>2 quartos (1 suíte)</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>2 banheiros</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>1 vaga</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>5º andar</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>Não aceita pet</p></div>
            <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>Sem mobília</p></div>
        </div>"#;

    fn page(html: &str) -> Page {
        Page::parse(html).unwrap()
    }

    #[test]
    fn attributes_block_fields() {
        let p = page(MAIN_INFO);
        assert_eq!(area().run(&p).as_deref(), Some("45"));
        assert_eq!(rooms().run(&p).as_deref(), Some("2"));
        assert_eq!(suites().run(&p).as_deref(), Some("1"));
        assert_eq!(bathrooms().run(&p).as_deref(), Some("2"));
        assert_eq!(parking_spots().run(&p).as_deref(), Some("1"));
        assert_eq!(floor().run(&p).as_deref(), Some("5"));
    }

    #[test]
    fn amenities_are_three_valued() {
        let p = page(MAIN_INFO);
        assert_eq!(pet_allowed().run(&p).as_deref(), Some("não"));
        assert_eq!(furnished().run(&p).as_deref(), Some("não"));
        assert_eq!(near_metro().run(&p), None);
    }

    #[test]
    fn heading_is_the_last_resort() {
        let p = page("<h1>Apartamento com 3 quartos para alugar, 80 m² - Tatuapé</h1>");
        assert_eq!(rooms().run_named(&p), Some(("heading", "3".to_string())));
        assert_eq!(area().run(&p).as_deref(), Some("80"));
        assert_eq!(bathrooms().run(&p), None);
    }

    #[test]
    fn structured_data_wins_over_block() {
        let html = format!(
            r#"<script type="application/ld+json">
                {{"@type": "Apartment", "numberOfRooms": 4}}
            </script>
            {}"#,
            MAIN_INFO
        );
        assert_eq!(rooms().run_named(&page(&html)), Some(("json-ld", "4".to_string())));
    }

    #[test]
    fn suite_without_count_means_one() {
        let p = page(
            r#"<div data-testid="house-main-info">
                <div class="x_iconDescriptionWrapper"><p>2 quartos, sendo suíte</p></div>
            </div>"#,
        );
        assert_eq!(suites().run(&p).as_deref(), Some("1"));
    }

    #[test]
    fn ground_floor_and_positive_markers() {
        let p = page(
            r#"<div data-testid="house-main-info">
                <div class="x_iconDescriptionWrapper"><p>Térreo</p></div>
                <div class="x_iconDescriptionWrapper"><p>Aceita pet</p></div>
                <div class="x_iconDescriptionWrapper"><p>Metrô próximo</p></div>
            </div>"#,
        );
        assert_eq!(floor().run(&p).as_deref(), Some("térreo"));
        assert_eq!(pet_allowed().run(&p).as_deref(), Some("sim"));
        assert_eq!(near_metro().run(&p).as_deref(), Some("sim"));
        assert_eq!(furnished().run(&p), None);
    }
}
