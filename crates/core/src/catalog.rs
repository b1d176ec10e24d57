use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Fuel vocabulary of the catalog. Filter matching against `fuel_type`
/// is exact, never fuzzy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Gasoline,
    Ethanol,
    Flex,
    Diesel,
    Electric,
    Hybrid,
}

impl FuelType {
    pub const ALL: [FuelType; 6] = [
        Self::Gasoline,
        Self::Ethanol,
        Self::Flex,
        Self::Diesel,
        Self::Electric,
        Self::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::Ethanol => "ethanol",
            Self::Flex => "flex",
            Self::Diesel => "diesel",
            Self::Electric => "electric",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for FuelType {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gasoline" => Ok(Self::Gasoline),
            "ethanol" => Ok(Self::Ethanol),
            "flex" => Ok(Self::Flex),
            "diesel" => Ok(Self::Diesel),
            "electric" => Ok(Self::Electric),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ServiceError::Validation(format!("unknown fuel type `{other}`"))),
        }
    }
}

/// Transmission vocabulary of the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
    SemiAutomatic,
    DualClutch,
}

impl Transmission {
    pub const ALL: [Transmission; 5] =
        [Self::Manual, Self::Automatic, Self::Cvt, Self::SemiAutomatic, Self::DualClutch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::Cvt => "cvt",
            Self::SemiAutomatic => "semi_automatic",
            Self::DualClutch => "dual_clutch",
        }
    }
}

impl std::str::FromStr for Transmission {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            "cvt" => Ok(Self::Cvt),
            "semi_automatic" => Ok(Self::SemiAutomatic),
            "dual_clutch" => Ok(Self::DualClutch),
            other => Err(ServiceError::Validation(format!("unknown transmission `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrandSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarNameSummary {
    pub id: Uuid,
    pub name: String,
    pub brand: BrandSummary,
}

/// Color and car-model references share this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSummary {
    pub id: Uuid,
    pub name: String,
    pub displacement: String,
    pub power: i64,
}

/// A fully materialized catalog record: every relation the result
/// formatter needs is joined ahead of time, so presenting a page never
/// requires secondary lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarRecord {
    pub id: Uuid,
    pub car_name: CarNameSummary,
    pub car_model: NamedEntity,
    pub color: NamedEntity,
    pub engine: EngineSummary,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub year_manufacture: i32,
    pub year_model: i32,
    pub mileage: i64,
    pub doors: i64,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// One page of a search. Finite and non-restartable: the caller asks for
/// another page by issuing another search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<CarRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl SearchPage {
    pub fn new(results: Vec<CarRecord>, total: u64, page: u32, page_size: u32) -> Self {
        Self { results, total, page, page_size, total_pages: total_pages(total, page_size) }
    }

    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size)
}

/// A catalog entity annotated with how many cars reference it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityUsage {
    pub id: Uuid,
    pub name: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineUsage {
    pub id: Uuid,
    pub name: String,
    pub displacement: String,
    pub power: i64,
    pub count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearRange {
    pub min_manufacture: i32,
    pub max_manufacture: i32,
    pub min_model: i32,
    pub max_model: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: i64,
    pub max: i64,
}

/// Aggregated bounds of the catalog, served by `get_filters_options`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub year_range: YearRange,
    pub price_range: PriceRange,
    pub mileage_range: CountRange,
    pub doors_range: CountRange,
}

/// Normalizes an entity name the way the catalog stores them: collapsed
/// whitespace, title case, punctuation limited to spaces, hyphens,
/// periods, and parentheses.
pub fn normalize_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut normalized = String::with_capacity(collapsed.len());
    let mut start_of_word = true;
    for ch in collapsed.chars() {
        if !(ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '(' | ')' | '.')) {
            continue;
        }
        if ch.is_alphabetic() {
            if start_of_word {
                normalized.extend(ch.to_uppercase());
            } else {
                normalized.extend(ch.to_lowercase());
            }
        } else {
            normalized.push(ch);
        }
        start_of_word = !ch.is_alphanumeric();
    }

    collapse_spaces(normalized.trim())
}

fn collapse_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, total_pages, FuelType, SearchPage, Transmission};

    #[test]
    fn fuel_and_transmission_round_trip_their_fixed_vocabulary() {
        for fuel in FuelType::ALL {
            assert_eq!(fuel.as_str().parse::<FuelType>().expect("parse"), fuel);
        }
        for transmission in Transmission::ALL {
            assert_eq!(
                transmission.as_str().parse::<Transmission>().expect("parse"),
                transmission
            );
        }
        assert!("nuclear".parse::<FuelType>().is_err());
        assert!("telepathic".parse::<Transmission>().is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(101, 10), 11);
    }

    #[test]
    fn empty_page_has_no_results_and_zero_total() {
        let page = SearchPage::empty(3, 20);
        assert!(page.results.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn normalize_name_applies_catalog_formatting_rules() {
        assert_eq!(normalize_name("  toyota   corolla "), "Toyota Corolla");
        assert_eq!(normalize_name("mercedes-benz"), "Mercedes-Benz");
        assert_eq!(normalize_name("1.6 turbo (flex)"), "1.6 Turbo (Flex)");
        assert_eq!(normalize_name("weird!!name??"), "Weirdname");
    }
}
