use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use thiserror::Error;
use uuid::Uuid;

use showroom_core::catalog::{
    BrandSummary, CarNameSummary, CarRecord, CountRange, EngineSummary, EngineUsage, EntityUsage,
    FilterOptions, NamedEntity, PriceRange, SearchPage, YearRange,
};
use showroom_core::errors::ServiceError;
use showroom_core::filters::{FilterSet, Pagination};

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("car `{0}` not found")]
    CarNotFound(Uuid),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::CarNotFound(_) => ServiceError::NotFound("car".to_string()),
            other => ServiceError::internal(other),
        }
    }
}

/// One joined SELECT materializes every relation the result formatter
/// needs, so presenting a page never goes back to the store per record.
const SELECT_CARS: &str = "\
SELECT \
    car.id AS car_id, \
    car.fuel_type, \
    car.transmission, \
    car.year_manufacture, \
    car.year_model, \
    car.mileage, \
    car.doors, \
    car.price, \
    car.created_at, \
    cn.id AS car_name_id, \
    cn.name AS car_name, \
    b.id AS brand_id, \
    b.name AS brand_name, \
    cm.id AS car_model_id, \
    cm.name AS car_model_name, \
    col.id AS color_id, \
    col.name AS color_name, \
    e.id AS engine_id, \
    e.name AS engine_name, \
    e.displacement AS engine_displacement, \
    e.power AS engine_power \
FROM car \
JOIN car_name cn ON cn.id = car.car_name_id \
JOIN brand b ON b.id = cn.brand_id \
JOIN car_model cm ON cm.id = car.car_model_id \
JOIN color col ON col.id = car.color_id \
JOIN engine e ON e.id = car.engine_id";

const COUNT_CARS: &str = "\
SELECT COUNT(*) AS total \
FROM car \
JOIN car_name cn ON cn.id = car.car_name_id \
JOIN brand b ON b.id = cn.brand_id \
JOIN car_model cm ON cm.id = car.car_model_id \
JOIN color col ON col.id = car.color_id \
JOIN engine e ON e.id = car.engine_id";

/// Stateless query executor over the shared, read-mostly catalog pool.
/// Every method is safe for unbounded concurrent callers.
#[derive(Clone)]
pub struct CatalogStore {
    pool: DbPool,
}

impl CatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn search_cars(
        &self,
        filters: &FilterSet,
        pagination: &Pagination,
    ) -> Result<SearchPage, StoreError> {
        let mut count_builder = QueryBuilder::new(COUNT_CARS);
        push_filters(&mut count_builder, filters);
        let total: i64 =
            count_builder.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut builder = QueryBuilder::new(SELECT_CARS);
        push_filters(&mut builder, filters);
        // The ordering clause is built from the allow-listed enum, never
        // from caller input.
        builder.push(" ORDER BY ");
        builder.push(pagination.ordering.sql());
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(pagination.page_size));
        builder.push(" OFFSET ");
        builder.push_bind(pagination.offset());

        let rows = builder.build().fetch_all(&self.pool).await?;
        let results =
            rows.iter().map(decode_car_row).collect::<Result<Vec<_>, StoreError>>()?;

        Ok(SearchPage::new(results, total.max(0) as u64, pagination.page, pagination.page_size))
    }

    pub async fn car_details(&self, car_id: Uuid) -> Result<CarRecord, StoreError> {
        let mut builder = QueryBuilder::new(SELECT_CARS);
        builder.push(" WHERE car.id = ");
        builder.push_bind(car_id.to_string());

        let row = builder.build().fetch_optional(&self.pool).await?;
        match row {
            Some(row) => decode_car_row(&row),
            None => Err(StoreError::CarNotFound(car_id)),
        }
    }

    /// Brands referenced by at least one car, annotated with how many
    /// cars carry them, sorted by name. The inner joins make the
    /// `count > 0` restriction structural.
    pub async fn list_brands(&self) -> Result<Vec<EntityUsage>, StoreError> {
        let rows = sqlx::query(
            "SELECT b.id, b.name, COUNT(DISTINCT car.id) AS count \
             FROM brand b \
             JOIN car_name cn ON cn.brand_id = b.id \
             JOIN car ON car.car_name_id = cn.id \
             GROUP BY b.id, b.name \
             ORDER BY b.name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_entity_usage).collect()
    }

    pub async fn list_colors(&self) -> Result<Vec<EntityUsage>, StoreError> {
        let rows = sqlx::query(
            "SELECT col.id, col.name, COUNT(car.id) AS count \
             FROM color col \
             JOIN car ON car.color_id = col.id \
             GROUP BY col.id, col.name \
             ORDER BY col.name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_entity_usage).collect()
    }

    pub async fn list_engines(&self) -> Result<Vec<EngineUsage>, StoreError> {
        let rows = sqlx::query(
            "SELECT e.id, e.name, e.displacement, e.power, COUNT(car.id) AS count \
             FROM engine e \
             JOIN car ON car.engine_id = e.id \
             GROUP BY e.id, e.name, e.displacement, e.power \
             ORDER BY e.name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(EngineUsage {
                    id: decode_uuid(row, "id")?,
                    name: row.try_get("name")?,
                    displacement: row.try_get("displacement")?,
                    power: row.try_get("power")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    /// Aggregated bounds of what the catalog currently holds, with fixed
    /// fallbacks when the catalog is empty.
    pub async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        let fuel_types: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT fuel_type FROM car ORDER BY fuel_type")
                .fetch_all(&self.pool)
                .await?;
        let transmissions: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT transmission FROM car ORDER BY transmission")
                .fetch_all(&self.pool)
                .await?;

        let row = sqlx::query(
            "SELECT \
                 MIN(year_manufacture) AS min_year_manufacture, \
                 MAX(year_manufacture) AS max_year_manufacture, \
                 MIN(year_model) AS min_year_model, \
                 MAX(year_model) AS max_year_model, \
                 MIN(price) AS min_price, \
                 MAX(price) AS max_price, \
                 MIN(mileage) AS min_mileage, \
                 MAX(mileage) AS max_mileage, \
                 MIN(doors) AS min_doors, \
                 MAX(doors) AS max_doors \
             FROM car",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FilterOptions {
            fuel_types,
            transmissions,
            year_range: YearRange {
                min_manufacture: decode_year(&row, "min_year_manufacture", 1900)?,
                max_manufacture: decode_year(&row, "max_year_manufacture", 9999)?,
                min_model: decode_year(&row, "min_year_model", 1900)?,
                max_model: decode_year(&row, "max_year_model", 9999)?,
            },
            price_range: PriceRange {
                min: row.try_get::<Option<f64>, _>("min_price")?.unwrap_or(0.0),
                max: row.try_get::<Option<f64>, _>("max_price")?.unwrap_or(0.0),
            },
            mileage_range: CountRange {
                min: row.try_get::<Option<i64>, _>("min_mileage")?.unwrap_or(0),
                max: row.try_get::<Option<i64>, _>("max_mileage")?.unwrap_or(0),
            },
            doors_range: CountRange {
                min: row.try_get::<Option<i64>, _>("min_doors")?.unwrap_or(2),
                max: row.try_get::<Option<i64>, _>("max_doors")?.unwrap_or(8),
            },
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &FilterSet) {
    builder.push(" WHERE 1 = 1");

    if let Some(id) = filters.brand_id {
        builder.push(" AND cn.brand_id = ");
        builder.push_bind(id.to_string());
    }
    if let Some(id) = filters.color_id {
        builder.push(" AND car.color_id = ");
        builder.push_bind(id.to_string());
    }
    if let Some(id) = filters.engine_id {
        builder.push(" AND car.engine_id = ");
        builder.push_bind(id.to_string());
    }
    if let Some(id) = filters.car_model_id {
        builder.push(" AND car.car_model_id = ");
        builder.push_bind(id.to_string());
    }
    if let Some(id) = filters.car_name_id {
        builder.push(" AND car.car_name_id = ");
        builder.push_bind(id.to_string());
    }

    push_name_contains(builder, "b.name", filters.brand_name.as_deref());
    push_name_contains(builder, "col.name", filters.color_name.as_deref());
    push_name_contains(builder, "e.name", filters.engine_name.as_deref());
    push_name_contains(builder, "cm.name", filters.car_model_name.as_deref());
    push_name_contains(builder, "cn.name", filters.car_name.as_deref());

    if let Some(fuel_type) = &filters.fuel_type {
        builder.push(" AND car.fuel_type = ");
        builder.push_bind(fuel_type.clone());
    }
    if let Some(transmission) = &filters.transmission {
        builder.push(" AND car.transmission = ");
        builder.push_bind(transmission.clone());
    }

    push_bound_i64(builder, "car.year_manufacture", ">=", filters.year_manufacture_min.map(i64::from));
    push_bound_i64(builder, "car.year_manufacture", "<=", filters.year_manufacture_max.map(i64::from));
    push_bound_i64(builder, "car.year_model", ">=", filters.year_model_min.map(i64::from));
    push_bound_i64(builder, "car.year_model", "<=", filters.year_model_max.map(i64::from));
    push_bound_i64(builder, "car.mileage", ">=", filters.mileage_min);
    push_bound_i64(builder, "car.mileage", "<=", filters.mileage_max);
    push_bound_i64(builder, "car.doors", ">=", filters.doors_min);
    push_bound_i64(builder, "car.doors", "<=", filters.doors_max);

    if let Some(price_min) = filters.price_min {
        builder.push(" AND car.price >= ");
        builder.push_bind(price_min);
    }
    if let Some(price_max) = filters.price_max {
        builder.push(" AND car.price <= ");
        builder.push_bind(price_max);
    }

    if let Some(search) = &filters.search {
        builder.push(" AND (");
        for (index, column) in
            ["cn.name", "b.name", "cm.name", "col.name", "e.name"].iter().enumerate()
        {
            if index > 0 {
                builder.push(" OR ");
            }
            builder.push(format!("LOWER({column}) LIKE '%' || LOWER("));
            builder.push_bind(search.clone());
            builder.push(") || '%'");
        }
        builder.push(")");
    }
}

fn push_name_contains(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    value: Option<&str>,
) {
    if let Some(value) = value {
        builder.push(format!(" AND LOWER({column}) LIKE '%' || LOWER("));
        builder.push_bind(value.to_string());
        builder.push(") || '%'");
    }
}

fn push_bound_i64(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    operator: &str,
    value: Option<i64>,
) {
    if let Some(value) = value {
        builder.push(format!(" AND {column} {operator} "));
        builder.push_bind(value);
    }
}

fn decode_car_row(row: &SqliteRow) -> Result<CarRecord, StoreError> {
    let fuel_type: String = row.try_get("fuel_type")?;
    let transmission: String = row.try_get("transmission")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(CarRecord {
        id: decode_uuid(row, "car_id")?,
        car_name: CarNameSummary {
            id: decode_uuid(row, "car_name_id")?,
            name: row.try_get("car_name")?,
            brand: BrandSummary {
                id: decode_uuid(row, "brand_id")?,
                name: row.try_get("brand_name")?,
            },
        },
        car_model: NamedEntity {
            id: decode_uuid(row, "car_model_id")?,
            name: row.try_get("car_model_name")?,
        },
        color: NamedEntity {
            id: decode_uuid(row, "color_id")?,
            name: row.try_get("color_name")?,
        },
        engine: EngineSummary {
            id: decode_uuid(row, "engine_id")?,
            name: row.try_get("engine_name")?,
            displacement: row.try_get("engine_displacement")?,
            power: row.try_get("engine_power")?,
        },
        fuel_type: fuel_type
            .parse()
            .map_err(|_| StoreError::Decode(format!("unknown fuel_type `{fuel_type}`")))?,
        transmission: transmission
            .parse()
            .map_err(|_| StoreError::Decode(format!("unknown transmission `{transmission}`")))?,
        year_manufacture: decode_i32(row, "year_manufacture")?,
        year_model: decode_i32(row, "year_model")?,
        mileage: row.try_get("mileage")?,
        doors: row.try_get("doors")?,
        price: row.try_get("price")?,
        created_at: decode_timestamp(&created_at)?,
    })
}

fn decode_entity_usage(row: &SqliteRow) -> Result<EntityUsage, StoreError> {
    Ok(EntityUsage {
        id: decode_uuid(row, "id")?,
        name: row.try_get("name")?,
        count: row.try_get("count")?,
    })
}

fn decode_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, StoreError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|_| StoreError::Decode(format!("column `{column}` holds invalid uuid `{raw}`")))
}

fn decode_i32(row: &SqliteRow, column: &str) -> Result<i32, StoreError> {
    let raw: i64 = row.try_get(column)?;
    i32::try_from(raw)
        .map_err(|_| StoreError::Decode(format!("column `{column}` out of range: {raw}")))
}

fn decode_year(row: &SqliteRow, column: &str, fallback: i32) -> Result<i32, StoreError> {
    let raw: Option<i64> = row.try_get(column)?;
    match raw {
        Some(value) => i32::try_from(value)
            .map_err(|_| StoreError::Decode(format!("column `{column}` out of range: {value}"))),
        None => Ok(fallback),
    }
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| StoreError::Decode(format!("invalid timestamp `{raw}`")))
}
