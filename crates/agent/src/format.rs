//! Deterministic result presentation.
//!
//! Formatting never round-trips through the model: a result page is
//! data we already hold, and a fixed rendering is both faster and
//! immune to backend trouble.

use showroom_core::catalog::CarRecord;
use showroom_core::preferences::{PreferenceMap, YearPreference};

pub const NO_RESULTS_MESSAGE: &str =
    "I couldn't find cars matching your criteria. Shall we adjust the search?";

pub const TURN_FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while processing that. Could you try rephrasing?";

pub fn format_results(cars: &[CarRecord], preferences: &PreferenceMap) -> String {
    if cars.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut output = personalized_header(preferences, cars.len());
    output.push_str("\n\n");

    for (index, car) in cars.iter().enumerate() {
        output.push_str(&format_single_car(car, index + 1));
        output.push('\n');
    }

    output.push_str(&suggestions_footer(preferences));
    output
}

fn personalized_header(preferences: &PreferenceMap, car_count: usize) -> String {
    let mut qualifiers = String::new();
    if let Some(brand) = &preferences.brand {
        qualifiers.push(' ');
        qualifiers.push_str(brand);
    }
    if let Some(YearPreference::Exact(year)) = preferences.year {
        qualifiers.push_str(&format!(" from {year}"));
    }
    if let Some(band) = preferences.price_band {
        qualifiers.push_str(&format!(" in the {} range", band.as_str()));
    }

    format!("I found {car_count} car(s){qualifiers} matching your criteria:")
}

fn format_single_car(car: &CarRecord, position: usize) -> String {
    let mileage = if car.mileage > 0 {
        format!("{} km", group_thousands(car.mileage))
    } else {
        "not informed".to_string()
    };

    format!(
        "{position}. {} {} ({})\n   Price: {:.2}\n   Color: {}\n   Fuel: {}\n   \
         Transmission: {}\n   Mileage: {}\n   Doors: {}\n",
        car.car_name.brand.name,
        car.car_name.name,
        car.year_manufacture,
        car.price,
        car.color.name,
        car.fuel_type.as_str(),
        car.transmission.as_str(),
        mileage,
        car.doors,
    )
}

/// Names the attributes that would narrow the search further. When
/// nothing obvious is missing, invites a detail question instead.
fn suggestions_footer(preferences: &PreferenceMap) -> String {
    let mut suggestions = Vec::new();
    if preferences.price_band.is_none() {
        suggestions.push("price range");
    }
    if preferences.year.is_none() {
        suggestions.push("vehicle year");
    }
    if preferences.color.is_none() {
        suggestions.push("preferred color");
    }
    if preferences.fuel_type.is_none() {
        suggestions.push("fuel type");
    }

    if suggestions.is_empty() {
        "Would you like more details on any of these cars?".to_string()
    } else {
        format!("To refine the search, I can also filter by: {}.", suggestions.join(", "))
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use showroom_core::catalog::{
        BrandSummary, CarNameSummary, CarRecord, EngineSummary, FuelType, NamedEntity,
        Transmission,
    };
    use showroom_core::preferences::{PreferenceMap, PriceBand, YearPreference};

    use super::{format_results, group_thousands, NO_RESULTS_MESSAGE};

    fn car_fixture() -> CarRecord {
        CarRecord {
            id: Uuid::new_v4(),
            car_name: CarNameSummary {
                id: Uuid::new_v4(),
                name: "Corolla".to_string(),
                brand: BrandSummary { id: Uuid::new_v4(), name: "Toyota".to_string() },
            },
            car_model: NamedEntity { id: Uuid::new_v4(), name: "Sedan".to_string() },
            color: NamedEntity { id: Uuid::new_v4(), name: "Black".to_string() },
            engine: EngineSummary {
                id: Uuid::new_v4(),
                name: "2.0 Turbo".to_string(),
                displacement: "2.0".to_string(),
                power: 230,
            },
            fuel_type: FuelType::Flex,
            transmission: Transmission::Manual,
            year_manufacture: 2020,
            year_model: 2021,
            mileage: 30_000,
            doors: 4,
            price: 90_000.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_result_set_yields_the_fixed_no_results_message() {
        assert_eq!(format_results(&[], &PreferenceMap::default()), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn results_render_as_a_numbered_list_with_every_attribute() {
        let rendered = format_results(&[car_fixture()], &PreferenceMap::default());

        assert!(rendered.contains("I found 1 car(s)"));
        assert!(rendered.contains("1. Toyota Corolla (2020)"));
        assert!(rendered.contains("Color: Black"));
        assert!(rendered.contains("Fuel: flex"));
        assert!(rendered.contains("Transmission: manual"));
        assert!(rendered.contains("Mileage: 30,000 km"));
        assert!(rendered.contains("Doors: 4"));
    }

    #[test]
    fn header_is_personalized_and_footer_suggests_missing_attributes() {
        let preferences = PreferenceMap {
            brand: Some("Toyota".to_string()),
            year: Some(YearPreference::Exact(2020)),
            price_band: Some(PriceBand::Mid),
            ..PreferenceMap::default()
        };
        let rendered = format_results(&[car_fixture()], &preferences);

        assert!(rendered.contains("Toyota from 2020 in the mid range"));
        assert!(rendered.contains("preferred color"));
        assert!(rendered.contains("fuel type"));
        assert!(!rendered.contains("price range,"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(30_000), "30,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
