//! Deterministic catalog fixtures.
//!
//! Tests compose small datasets from the insert helpers; the CLI `seed`
//! command loads the full demo dataset. Content is fully deterministic
//! so assertions and demos are reproducible; only the generated row ids
//! differ between runs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use showroom_core::catalog::{normalize_name, FuelType, Transmission};

use crate::catalog_store::StoreError;
use crate::DbPool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub brands: usize,
    pub colors: usize,
    pub engines: usize,
    pub car_models: usize,
    pub car_names: usize,
    pub cars: usize,
}

async fn insert_named(pool: &DbPool, table: &str, name: &str) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    let statement = format!("INSERT INTO {table} (id, name, created_at) VALUES (?, ?, ?)");
    sqlx::query(&statement)
        .bind(id.to_string())
        .bind(normalize_name(name))
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn insert_brand(pool: &DbPool, name: &str) -> Result<Uuid, StoreError> {
    insert_named(pool, "brand", name).await
}

pub async fn insert_color(pool: &DbPool, name: &str) -> Result<Uuid, StoreError> {
    insert_named(pool, "color", name).await
}

pub async fn insert_car_model(pool: &DbPool, name: &str) -> Result<Uuid, StoreError> {
    insert_named(pool, "car_model", name).await
}

pub async fn insert_engine(
    pool: &DbPool,
    name: &str,
    displacement: &str,
    power: i64,
) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO engine (id, name, displacement, power, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(normalize_name(name))
    .bind(normalize_name(displacement))
    .bind(power)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn insert_car_name(
    pool: &DbPool,
    name: &str,
    brand_id: Uuid,
) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO car_name (id, name, brand_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(normalize_name(name))
        .bind(brand_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(id)
}

#[derive(Clone, Debug)]
pub struct CarSeed {
    pub car_name_id: Uuid,
    pub car_model_id: Uuid,
    pub color_id: Uuid,
    pub engine_id: Uuid,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub year_manufacture: i32,
    pub year_model: i32,
    pub mileage: i64,
    pub doors: i64,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_car(pool: &DbPool, seed: &CarSeed) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO car (\
             id, car_name_id, car_model_id, color_id, engine_id, fuel_type, transmission, \
             year_manufacture, year_model, mileage, doors, price, created_at\
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(seed.car_name_id.to_string())
    .bind(seed.car_model_id.to_string())
    .bind(seed.color_id.to_string())
    .bind(seed.engine_id.to_string())
    .bind(seed.fuel_type.as_str())
    .bind(seed.transmission.as_str())
    .bind(seed.year_manufacture)
    .bind(seed.year_model)
    .bind(seed.mileage)
    .bind(seed.doors)
    .bind(seed.price)
    .bind(seed.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(id)
}

const BRANDS: [(&str, &[&str]); 12] = [
    ("Toyota", &["Corolla", "Hilux"]),
    ("Honda", &["Civic", "Fit"]),
    ("Ford", &["Ka", "Ranger"]),
    ("Chevrolet", &["Onix", "Cruze"]),
    ("Volkswagen", &["Golf", "Polo"]),
    ("Fiat", &["Argo", "Toro"]),
    ("Renault", &["Sandero"]),
    ("Nissan", &["Kicks"]),
    ("Hyundai", &["HB20"]),
    ("BMW", &["320i"]),
    ("Audi", &["A4"]),
    ("Volvo", &["XC60"]),
];

const COLORS: [&str; 8] = ["Black", "White", "Silver", "Red", "Blue", "Gray", "Green", "Pearl"];

const ENGINES: [(&str, &str, i64); 5] = [
    ("1.0 Turbo", "1.0", 116),
    ("1.6 16v", "1.6", 120),
    ("2.0 Turbo", "2.0", 230),
    ("3.0 V6", "3.0", 340),
    ("Electric Drive", "EV", 204),
];

const CAR_MODELS: [&str; 5] = ["Sedan", "Hatchback", "SUV", "Coupe", "Wagon"];

const SEED_CAR_COUNT: usize = 60;

/// Loads the demo dataset. Attribute choice per car is a fixed function
/// of its index, so repeated seeds of a fresh database produce the same
/// catalog content.
pub async fn seed_catalog(pool: &DbPool) -> Result<SeedSummary, StoreError> {
    let mut summary = SeedSummary::default();

    let mut car_name_ids = Vec::new();
    for (brand, names) in BRANDS {
        let brand_id = insert_brand(pool, brand).await?;
        summary.brands += 1;
        for name in names {
            car_name_ids.push(insert_car_name(pool, name, brand_id).await?);
            summary.car_names += 1;
        }
    }

    let mut color_ids = Vec::new();
    for color in COLORS {
        color_ids.push(insert_color(pool, color).await?);
        summary.colors += 1;
    }

    let mut engine_ids = Vec::new();
    for (name, displacement, power) in ENGINES {
        engine_ids.push(insert_engine(pool, name, displacement, power).await?);
        summary.engines += 1;
    }

    let mut car_model_ids = Vec::new();
    for model in CAR_MODELS {
        car_model_ids.push(insert_car_model(pool, model).await?);
        summary.car_models += 1;
    }

    let base_timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .ok_or_else(|| StoreError::Decode("fixture base timestamp out of range".to_string()))?;

    for index in 0..SEED_CAR_COUNT {
        let year_manufacture = 2012 + (index as i32 % 13);
        let seed = CarSeed {
            car_name_id: car_name_ids[index % car_name_ids.len()],
            car_model_id: car_model_ids[index % car_model_ids.len()],
            color_id: color_ids[(index * 3) % color_ids.len()],
            engine_id: engine_ids[(index * 2 + 1) % engine_ids.len()],
            fuel_type: FuelType::ALL[index % FuelType::ALL.len()],
            transmission: Transmission::ALL[index % Transmission::ALL.len()],
            year_manufacture,
            year_model: year_manufacture + (index as i32 % 2),
            mileage: (index as i64 * 4_321) % 160_000,
            doors: [2, 4, 4, 5][index % 4],
            price: 28_000.0 + ((index * 7_919) % 290_000) as f64,
            created_at: base_timestamp + Duration::days(index as i64),
        };
        insert_car(pool, &seed).await?;
        summary.cars += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use crate::{connect_with_settings, migrations, seed_catalog};

    #[tokio::test]
    async fn seed_loads_the_full_demo_dataset() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let summary = seed_catalog(&pool).await.expect("seed");
        assert_eq!(summary.brands, 12);
        assert_eq!(summary.colors, 8);
        assert_eq!(summary.engines, 5);
        assert_eq!(summary.car_models, 5);
        assert_eq!(summary.car_names, 18);
        assert_eq!(summary.cars, 60);

        let car_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM car")
            .fetch_one(&pool)
            .await
            .expect("count cars");
        assert_eq!(car_count, 60);
    }
}
