use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::preferences::{PreferenceMap, PriceBand, YearPreference};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
/// The conversational surface presents at most this many cars per turn.
pub const CONVERSATION_PAGE_SIZE: u32 = 10;

const BUDGET_PRICE_CEILING: f64 = 50_000.0;
const MID_PRICE_FLOOR: f64 = 30_000.0;
const MID_PRICE_CEILING: f64 = 100_000.0;
const LUXURY_PRICE_FLOOR: f64 = 100_000.0;
const RECENT_YEAR_FLOOR: i32 = 2020;
const OLD_YEAR_CEILING: i32 = 2015;

/// Attributes that accept `{min, max}`-style wrappers in raw payloads.
const RANGE_BASES: [&str; 4] = ["price", "year_manufacture", "mileage", "doors"];

const EQUALITY_MARKERS: [&str; 4] = ["$eq", "eq", "=", "value"];
const MIN_MARKERS: [&str; 3] = ["$gte", "gte", "min"];
const MAX_MARKERS: [&str; 3] = ["$lte", "lte", "max"];

/// The canonical, flat filter shape consumed by the query executor.
///
/// Range attributes only ever appear as `_min`/`_max` pairs; absent
/// fields mean "no constraint". Both normalization paths
/// ([`FilterSet::from_raw`] and [`FilterSet::from_preferences`]) converge
/// on this shape and never emit anything outside it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_model_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_name_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_manufacture_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_manufacture_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_model_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_model_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doors_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doors_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Normalizes an untrusted payload produced by the text-generation
    /// backend (or an already-canonical one; the conversion is
    /// idempotent).
    ///
    /// Per key: synonym remap first, then operator stripping (equality
    /// markers unwrap to the scalar; range markers resolve with
    /// first-non-null precedence), then range emission for the known
    /// range-capable attributes. Nulls, empty strings, unrecognized keys,
    /// and unrecognized nested structures are dropped, never passed
    /// through - except that a single-key nested object under a known
    /// attribute unwraps to its sole value.
    pub fn from_raw(raw: &Value) -> Self {
        let mut filters = Self::default();
        let Some(object) = raw.as_object() else {
            return filters;
        };

        for (raw_key, value) in object {
            let key = canonical_key(raw_key);
            if is_null_or_empty(value) {
                continue;
            }

            let Some(nested) = value.as_object() else {
                filters.assign_scalar(key, value);
                continue;
            };

            if let Some(unwrapped) = first_present(nested, &EQUALITY_MARKERS) {
                filters.assign_scalar(key, unwrapped);
                continue;
            }

            if RANGE_BASES.contains(&key) {
                if let Some(min) = first_present(nested, &MIN_MARKERS) {
                    filters.assign_scalar(&format!("{key}_min"), min);
                }
                if let Some(max) = first_present(nested, &MAX_MARKERS) {
                    filters.assign_scalar(&format!("{key}_max"), max);
                }
                continue;
            }

            // A nested object that is not a recognized wrapper is dropped
            // wholesale unless exactly one key remains.
            if nested.len() == 1 {
                if let Some(sole) = nested.values().next() {
                    if !is_null_or_empty(sole) {
                        filters.assign_scalar(key, sole);
                    }
                }
            }
        }

        filters
    }

    /// Derives the canonical filter shape from an accumulated preference
    /// map using the fixed preference rules.
    pub fn from_preferences(preferences: &PreferenceMap) -> Self {
        let mut filters = Self {
            brand_name: preferences.brand.clone(),
            car_name: preferences.model.clone(),
            color_name: preferences.color.clone(),
            fuel_type: preferences.fuel_type.clone(),
            transmission: preferences.transmission.clone(),
            ..Self::default()
        };

        match preferences.price_band {
            Some(PriceBand::Budget) => filters.price_max = Some(BUDGET_PRICE_CEILING),
            Some(PriceBand::Mid) => {
                filters.price_min = Some(MID_PRICE_FLOOR);
                filters.price_max = Some(MID_PRICE_CEILING);
            }
            Some(PriceBand::Luxury) => filters.price_min = Some(LUXURY_PRICE_FLOOR),
            None => {}
        }

        match preferences.year {
            Some(YearPreference::Exact(year)) => filters.pin_years(year),
            Some(YearPreference::Recent) => {
                filters.year_manufacture_min = Some(RECENT_YEAR_FLOOR);
                filters.year_model_min = Some(RECENT_YEAR_FLOOR);
            }
            Some(YearPreference::Old) => {
                filters.year_manufacture_max = Some(OLD_YEAR_CEILING);
                filters.year_model_max = Some(OLD_YEAR_CEILING);
            }
            None => {}
        }

        if let Some(mileage_limit) = preferences.mileage_limit {
            filters.mileage_max = Some(mileage_limit);
        }
        if let Some(doors) = preferences.doors {
            filters.doors_min = Some(doors);
            filters.doors_max = Some(doors);
        }

        filters
    }

    fn pin_years(&mut self, year: i32) {
        self.year_manufacture_min = Some(year);
        self.year_manufacture_max = Some(year);
        self.year_model_min = Some(year);
        self.year_model_max = Some(year);
    }

    fn assign_scalar(&mut self, key: &str, value: &Value) {
        match key {
            "brand_id" => set_uuid(&mut self.brand_id, value),
            "color_id" => set_uuid(&mut self.color_id, value),
            "engine_id" => set_uuid(&mut self.engine_id, value),
            "car_model_id" => set_uuid(&mut self.car_model_id, value),
            "car_name_id" => set_uuid(&mut self.car_name_id, value),
            "brand_name" => set_string(&mut self.brand_name, value),
            "color_name" => set_string(&mut self.color_name, value),
            "engine_name" => set_string(&mut self.engine_name, value),
            "car_model_name" => set_string(&mut self.car_model_name, value),
            "car_name" => set_string(&mut self.car_name, value),
            "fuel_type" => set_string(&mut self.fuel_type, value),
            "transmission" => set_string(&mut self.transmission, value),
            "search" => set_string(&mut self.search, value),
            "price_min" => set_f64(&mut self.price_min, value),
            "price_max" => set_f64(&mut self.price_max, value),
            "year_manufacture_min" => set_i32(&mut self.year_manufacture_min, value),
            "year_manufacture_max" => set_i32(&mut self.year_manufacture_max, value),
            "year_model_min" => set_i32(&mut self.year_model_min, value),
            "year_model_max" => set_i32(&mut self.year_model_max, value),
            "mileage_min" => set_i64(&mut self.mileage_min, value),
            "mileage_max" => set_i64(&mut self.mileage_max, value),
            "doors_min" => set_i64(&mut self.doors_min, value),
            "doors_max" => set_i64(&mut self.doors_max, value),
            // A bare door count means an exact match.
            "doors" => {
                if let Some(doors) = coerce_i64(value) {
                    self.doors_min = Some(doors);
                    self.doors_max = Some(doors);
                }
            }
            // A bare year pins both year windows; categorical values
            // resolve to the same fixed windows as the preference path.
            "year" => {
                if let Some(year) = coerce_i32(value) {
                    self.pin_years(year);
                } else if let Some(category) = value.as_str() {
                    match category.trim().to_ascii_lowercase().as_str() {
                        "recent" => {
                            self.year_manufacture_min = Some(RECENT_YEAR_FLOOR);
                            self.year_model_min = Some(RECENT_YEAR_FLOOR);
                        }
                        "old" => {
                            self.year_manufacture_max = Some(OLD_YEAR_CEILING);
                            self.year_model_max = Some(OLD_YEAR_CEILING);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

/// Maps alternate and legacy attribute names onto the canonical
/// vocabulary. Unknown keys pass through and are dropped later by the
/// scalar assignment.
fn canonical_key(key: &str) -> &str {
    match key {
        "brand" | "make" | "manufacturer" => "brand_name",
        "model" | "car" => "car_name",
        "color" | "colour" => "color_name",
        "engine" => "engine_name",
        "fuel" => "fuel_type",
        "gearbox" => "transmission",
        "min_price" => "price_min",
        "max_price" => "price_max",
        "year_min" => "year_manufacture_min",
        "year_max" => "year_manufacture_max",
        "min_mileage" => "mileage_min",
        "max_mileage" => "mileage_max",
        "km" => "mileage",
        "query" | "text" => "search",
        other => other,
    }
}

fn first_present<'a>(object: &'a Map<String, Value>, markers: &[&str]) -> Option<&'a Value> {
    markers.iter().find_map(|marker| object.get(*marker).filter(|value| !value.is_null()))
}

fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn set_string(slot: &mut Option<String>, value: &Value) {
    if let Some(text) = value.as_str() {
        let text = text.trim();
        if !text.is_empty() {
            *slot = Some(text.to_string());
        }
    }
}

fn set_uuid(slot: &mut Option<Uuid>, value: &Value) {
    if let Some(id) = value.as_str().and_then(|text| Uuid::parse_str(text.trim()).ok()) {
        *slot = Some(id);
    }
}

fn set_f64(slot: &mut Option<f64>, value: &Value) {
    if let Some(number) = coerce_f64(value) {
        *slot = Some(number);
    }
}

fn set_i64(slot: &mut Option<i64>, value: &Value) {
    if let Some(number) = coerce_i64(value) {
        *slot = Some(number);
    }
}

fn set_i32(slot: &mut Option<i32>, value: &Value) {
    if let Some(number) = coerce_i32(value) {
        *slot = Some(number);
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    if let Some(number) = value.as_f64() {
        return Some(number);
    }
    value.as_str()?.trim().parse().ok()
}

fn coerce_i64(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    if let Some(number) = value.as_f64() {
        return (number.fract() == 0.0).then_some(number as i64);
    }
    value.as_str()?.trim().parse().ok()
}

fn coerce_i32(value: &Value) -> Option<i32> {
    coerce_i64(value).and_then(|number| i32::try_from(number).ok())
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1, got {0}")]
    PageOutOfRange(i64),
    #[error("page_size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    PageSizeOutOfRange(i64),
    #[error("ordering `{0}` is not in the allowed set")]
    UnknownOrdering(String),
}

impl From<PaginationError> for ServiceError {
    fn from(error: PaginationError) -> Self {
        ServiceError::Validation(error.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    Price,
    YearManufacture,
    YearModel,
    Mileage,
    Doors,
}

impl OrderField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "car.created_at",
            Self::Price => "car.price",
            Self::YearManufacture => "car.year_manufacture",
            Self::YearModel => "car.year_model",
            Self::Mileage => "car.mileage",
            Self::Doors => "car.doors",
        }
    }
}

/// A validated ordering clause. Only allow-listed fields ever reach SQL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for Ordering {
    /// Newest records first.
    fn default() -> Self {
        Self { field: OrderField::CreatedAt, descending: true }
    }
}

impl Ordering {
    pub fn parse(value: &str) -> Result<Self, PaginationError> {
        let trimmed = value.trim();
        let (descending, name) = match trimmed.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, trimmed),
        };

        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "price" => OrderField::Price,
            "year_manufacture" => OrderField::YearManufacture,
            "year_model" => OrderField::YearModel,
            "mileage" => OrderField::Mileage,
            "doors" => OrderField::Doors,
            _ => return Err(PaginationError::UnknownOrdering(value.to_string())),
        };

        Ok(Self { field, descending })
    }

    pub fn sql(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {direction}", self.field.column())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub ordering: Ordering,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE, ordering: Ordering::default() }
    }
}

impl Pagination {
    pub fn new(page: i64, page_size: i64, ordering: Option<&str>) -> Result<Self, PaginationError> {
        if page < 1 {
            return Err(PaginationError::PageOutOfRange(page));
        }
        if page_size < 1 || page_size > i64::from(MAX_PAGE_SIZE) {
            return Err(PaginationError::PageSizeOutOfRange(page_size));
        }
        let ordering = match ordering {
            Some(value) => Ordering::parse(value)?,
            None => Ordering::default(),
        };

        Ok(Self { page: page as u32, page_size: page_size as u32, ordering })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}
