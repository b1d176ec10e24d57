use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Price bands used during preference collection. Each band expands to a
/// fixed price window when the map is converted into a filter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBand {
    Budget,
    Mid,
    Luxury,
}

impl PriceBand {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" | "economy" | "cheap" | "low" => Some(Self::Budget),
            "mid" | "medium" | "middle" => Some(Self::Mid),
            "luxury" | "premium" | "high" => Some(Self::Luxury),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Mid => "mid",
            Self::Luxury => "luxury",
        }
    }
}

/// Year preference: an explicit model year, or a coarse category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YearPreference {
    Exact(i32),
    Recent,
    Old,
}

impl Serialize for YearPreference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exact(year) => serializer.serialize_i32(*year),
            Self::Recent => serializer.serialize_str("recent"),
            Self::Old => serializer.serialize_str("old"),
        }
    }
}

impl YearPreference {
    fn from_value(value: &Value) -> Option<Self> {
        if let Some(year) = lenient_i64(value) {
            return i32::try_from(year).ok().map(Self::Exact);
        }
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "recent" | "new" => Some(Self::Recent),
            "old" | "used" => Some(Self::Old),
            _ => None,
        }
    }
}

/// Sparse attribute map accumulated over a conversation. Absent fields
/// mean "the user has not said"; they are never serialized as nulls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PreferenceMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_band: Option<PriceBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<YearPreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doors: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// The facts the clarifying-question flow asks about, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingInfo {
    BrandOrModel,
    PriceBand,
    Year,
}

impl PreferenceMap {
    /// The permissive sufficiency rule: one known fact anywhere in the
    /// map is enough to attempt a search.
    pub fn has_any_value(&self) -> bool {
        self.brand.is_some()
            || self.model.is_some()
            || self.price_band.is_some()
            || self.year.is_some()
            || self.fuel_type.is_some()
            || self.transmission.is_some()
            || self.color.is_some()
            || self.doors.is_some()
            || self.mileage_limit.is_some()
            || self.usage.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_any_value()
    }

    /// Pure merge: values present in `new` win, everything else persists
    /// from `old`. This is what makes multi-turn refinement work.
    pub fn merged(old: &Self, new: &Self) -> Self {
        Self {
            brand: new.brand.clone().or_else(|| old.brand.clone()),
            model: new.model.clone().or_else(|| old.model.clone()),
            price_band: new.price_band.or(old.price_band),
            year: new.year.or(old.year),
            fuel_type: new.fuel_type.clone().or_else(|| old.fuel_type.clone()),
            transmission: new.transmission.clone().or_else(|| old.transmission.clone()),
            color: new.color.clone().or_else(|| old.color.clone()),
            doors: new.doors.or(old.doors),
            mileage_limit: new.mileage_limit.or(old.mileage_limit),
            usage: new.usage.clone().or_else(|| old.usage.clone()),
        }
    }

    /// Missing-information list in fixed priority order: brand/model,
    /// then price band, then year.
    pub fn missing_info(&self) -> Vec<MissingInfo> {
        let mut missing = Vec::new();
        if self.brand.is_none() && self.model.is_none() {
            missing.push(MissingInfo::BrandOrModel);
        }
        if self.price_band.is_none() {
            missing.push(MissingInfo::PriceBand);
        }
        if self.year.is_none() {
            missing.push(MissingInfo::Year);
        }
        missing
    }

    /// Tolerant decoding of an untrusted JSON object. Keys outside the
    /// fixed vocabulary are dropped silently, as are values of the wrong
    /// shape; the result may be empty, which is not an error.
    pub fn from_json(value: &Value) -> Self {
        let mut map = Self::default();
        let Some(object) = value.as_object() else {
            return map;
        };

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "brand" => map.brand = lenient_string(value),
                "model" => map.model = lenient_string(value),
                "price_band" => {
                    map.price_band = value.as_str().and_then(PriceBand::parse);
                }
                "year" => map.year = YearPreference::from_value(value),
                "fuel_type" => map.fuel_type = lenient_string(value),
                "transmission" => map.transmission = lenient_string(value),
                "color" => map.color = lenient_string(value),
                "doors" => map.doors = lenient_i64(value),
                "mileage_limit" => map.mileage_limit = lenient_i64(value),
                "usage" => map.usage = lenient_string(value),
                _ => {}
            }
        }

        map
    }
}

fn lenient_string(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn lenient_i64(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    if let Some(number) = value.as_f64() {
        if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
            return Some(number as i64);
        }
        return None;
    }
    value.as_str()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MissingInfo, PreferenceMap, PriceBand, YearPreference};

    #[test]
    fn merge_keeps_old_values_and_overwrites_mentioned_ones() {
        let old = PreferenceMap {
            brand: Some("Toyota".into()),
            color: Some("black".into()),
            ..PreferenceMap::default()
        };
        let new = PreferenceMap {
            color: Some("white".into()),
            year: Some(YearPreference::Exact(2021)),
            ..PreferenceMap::default()
        };

        let merged = PreferenceMap::merged(&old, &new);
        assert_eq!(merged.brand.as_deref(), Some("Toyota"));
        assert_eq!(merged.color.as_deref(), Some("white"));
        assert_eq!(merged.year, Some(YearPreference::Exact(2021)));
    }

    #[test]
    fn from_json_drops_unknown_keys_and_wrong_shapes() {
        let map = PreferenceMap::from_json(&json!({
            "brand": "Audi",
            "horsepower": 300,
            "doors": "4",
            "mileage_limit": 80000,
            "price_band": "luxury",
            "year": "oldish",
            "color": 7,
        }));

        assert_eq!(map.brand.as_deref(), Some("Audi"));
        assert_eq!(map.doors, Some(4));
        assert_eq!(map.mileage_limit, Some(80_000));
        assert_eq!(map.price_band, Some(PriceBand::Luxury));
        assert_eq!(map.year, None);
        assert_eq!(map.color, None);
    }

    #[test]
    fn from_json_of_non_object_is_empty() {
        assert!(PreferenceMap::from_json(&json!("just text")).is_empty());
        assert!(PreferenceMap::from_json(&json!(null)).is_empty());
    }

    #[test]
    fn year_accepts_integers_numeric_strings_and_categories() {
        let exact = PreferenceMap::from_json(&json!({"year": 2016}));
        assert_eq!(exact.year, Some(YearPreference::Exact(2016)));

        let stringy = PreferenceMap::from_json(&json!({"year": "2016"}));
        assert_eq!(stringy.year, Some(YearPreference::Exact(2016)));

        let recent = PreferenceMap::from_json(&json!({"year": "recent"}));
        assert_eq!(recent.year, Some(YearPreference::Recent));

        let old = PreferenceMap::from_json(&json!({"year": "old"}));
        assert_eq!(old.year, Some(YearPreference::Old));
    }

    #[test]
    fn one_fact_satisfies_sufficiency() {
        let mut map = PreferenceMap::default();
        assert!(!map.has_any_value());
        map.usage = Some("city".into());
        assert!(map.has_any_value());
    }

    #[test]
    fn missing_info_follows_the_fixed_priority() {
        let empty = PreferenceMap::default();
        assert_eq!(
            empty.missing_info(),
            vec![MissingInfo::BrandOrModel, MissingInfo::PriceBand, MissingInfo::Year]
        );

        let with_model = PreferenceMap { model: Some("Corolla".into()), ..PreferenceMap::default() };
        assert_eq!(with_model.missing_info(), vec![MissingInfo::PriceBand, MissingInfo::Year]);

        let complete = PreferenceMap {
            brand: Some("Toyota".into()),
            price_band: Some(PriceBand::Mid),
            year: Some(YearPreference::Recent),
            ..PreferenceMap::default()
        };
        assert!(complete.missing_info().is_empty());
    }
}
