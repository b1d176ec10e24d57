use chrono::{TimeZone, Utc};
use uuid::Uuid;

use showroom_core::catalog::{FuelType, Transmission};
use showroom_core::filters::{FilterSet, Ordering, Pagination};
use showroom_db::fixtures::{
    insert_brand, insert_car, insert_car_model, insert_car_name, insert_color, insert_engine,
    CarSeed,
};
use showroom_db::{connect_with_settings, migrations, CatalogStore, DbPool, StoreError};

struct Dataset {
    store: CatalogStore,
    pool: DbPool,
    toyota_corolla_id: Uuid,
    honda_civic_id: Uuid,
}

/// Two brands, three cars: a 2020 black Toyota Corolla, a 2016 white
/// Honda Civic, and a 2022 blue Toyota Corolla. Created-at timestamps
/// increase in that order.
async fn dataset() -> Dataset {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let toyota = insert_brand(&pool, "Toyota").await.expect("brand");
    let honda = insert_brand(&pool, "Honda").await.expect("brand");

    let black = insert_color(&pool, "Black").await.expect("color");
    let white = insert_color(&pool, "White").await.expect("color");
    let blue = insert_color(&pool, "Blue").await.expect("color");

    let engine = insert_engine(&pool, "2.0 Turbo", "2.0", 230).await.expect("engine");
    let sedan = insert_car_model(&pool, "Sedan").await.expect("model");

    let corolla = insert_car_name(&pool, "Corolla", toyota).await.expect("car name");
    let civic = insert_car_name(&pool, "Civic", honda).await.expect("car name");

    let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("timestamp");

    let toyota_corolla_id = insert_car(
        &pool,
        &CarSeed {
            car_name_id: corolla,
            car_model_id: sedan,
            color_id: black,
            engine_id: engine,
            fuel_type: FuelType::Flex,
            transmission: Transmission::Manual,
            year_manufacture: 2020,
            year_model: 2021,
            mileage: 30_000,
            doors: 4,
            price: 90_000.0,
            created_at: base,
        },
    )
    .await
    .expect("car");

    let honda_civic_id = insert_car(
        &pool,
        &CarSeed {
            car_name_id: civic,
            car_model_id: sedan,
            color_id: white,
            engine_id: engine,
            fuel_type: FuelType::Gasoline,
            transmission: Transmission::Automatic,
            year_manufacture: 2016,
            year_model: 2016,
            mileage: 60_000,
            doors: 4,
            price: 80_000.0,
            created_at: base + chrono::Duration::days(1),
        },
    )
    .await
    .expect("car");

    insert_car(
        &pool,
        &CarSeed {
            car_name_id: corolla,
            car_model_id: sedan,
            color_id: blue,
            engine_id: engine,
            fuel_type: FuelType::Hybrid,
            transmission: Transmission::Cvt,
            year_manufacture: 2022,
            year_model: 2022,
            mileage: 5_000,
            doors: 2,
            price: 140_000.0,
            created_at: base + chrono::Duration::days(2),
        },
    )
    .await
    .expect("car");

    Dataset { store: CatalogStore::new(pool.clone()), pool, toyota_corolla_id, honda_civic_id }
}

fn filters_with_brand(brand: &str) -> FilterSet {
    FilterSet { brand_name: Some(brand.to_string()), ..FilterSet::default() }
}

#[tokio::test]
async fn brand_filter_with_one_match_returns_that_single_record() {
    let data = dataset().await;

    let filters = filters_with_brand("Honda");
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");

    assert_eq!(page.total, 1);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, data.honda_civic_id);
    assert_eq!(page.results[0].car_name.brand.name, "Honda");
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn brand_filter_with_no_matches_succeeds_with_an_empty_page() {
    let data = dataset().await;

    let filters = filters_with_brand("Ferrari");
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");

    assert_eq!(page.total, 0);
    assert!(page.results.is_empty());
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn name_filters_match_case_insensitive_substrings() {
    let data = dataset().await;

    let page = data
        .store
        .search_cars(&filters_with_brand("toy"), &Pagination::default())
        .await
        .expect("search");
    assert_eq!(page.total, 2);

    let filters = FilterSet { car_name: Some("COROLLA".to_string()), ..FilterSet::default() };
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn range_bounds_are_inclusive_and_independent() {
    let data = dataset().await;

    let filters = FilterSet {
        year_manufacture_min: Some(2016),
        year_manufacture_max: Some(2016),
        ..FilterSet::default()
    };
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].id, data.honda_civic_id);

    let only_min = FilterSet { price_min: Some(90_000.0), ..FilterSet::default() };
    let page = data.store.search_cars(&only_min, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 2, "inclusive lower bound should keep the 90k car");
}

#[tokio::test]
async fn inverted_range_yields_an_empty_page_rather_than_an_error() {
    let data = dataset().await;

    let filters = FilterSet {
        price_min: Some(200_000.0),
        price_max: Some(100_000.0),
        ..FilterSet::default()
    };
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 0);
    assert!(page.results.is_empty());
}

#[tokio::test]
async fn fuel_and_transmission_match_exactly() {
    let data = dataset().await;

    let filters = FilterSet { fuel_type: Some("gasoline".to_string()), ..FilterSet::default() };
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].fuel_type, FuelType::Gasoline);

    // `gas` is not a member of the enumeration, so it matches nothing.
    let partial = FilterSet { fuel_type: Some("gas".to_string()), ..FilterSet::default() };
    let page = data.store.search_cars(&partial, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn free_text_search_spans_brand_car_model_color_and_engine_names() {
    let data = dataset().await;

    let by_car = FilterSet { search: Some("civ".to_string()), ..FilterSet::default() };
    assert_eq!(
        data.store.search_cars(&by_car, &Pagination::default()).await.expect("search").total,
        1
    );

    let by_color = FilterSet { search: Some("blue".to_string()), ..FilterSet::default() };
    assert_eq!(
        data.store.search_cars(&by_color, &Pagination::default()).await.expect("search").total,
        1
    );

    let by_engine = FilterSet { search: Some("turbo".to_string()), ..FilterSet::default() };
    assert_eq!(
        data.store.search_cars(&by_engine, &Pagination::default()).await.expect("search").total,
        3
    );
}

#[tokio::test]
async fn pagination_slices_after_counting_and_orders_by_allow_listed_fields() {
    let data = dataset().await;

    let pagination = Pagination::new(2, 2, Some("price")).expect("valid pagination");
    let page = data.store.search_cars(&FilterSet::default(), &pagination).await.expect("search");

    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].price, 140_000.0, "ascending price puts the priciest car last");

    let newest_first =
        data.store.search_cars(&FilterSet::default(), &Pagination::default()).await.expect("search");
    assert_eq!(newest_first.results[0].year_manufacture, 2022, "default ordering is newest first");

    let by_mileage =
        Pagination { ordering: Ordering::parse("mileage").expect("parse"), ..Pagination::default() };
    let page = data.store.search_cars(&FilterSet::default(), &by_mileage).await.expect("search");
    assert_eq!(page.results[0].mileage, 5_000);
}

#[tokio::test]
async fn doors_exact_match_uses_the_min_max_pair() {
    let data = dataset().await;

    let filters = FilterSet { doors_min: Some(2), doors_max: Some(2), ..FilterSet::default() };
    let page = data.store.search_cars(&filters, &Pagination::default()).await.expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].doors, 2);
}

#[tokio::test]
async fn entity_listings_carry_usage_counts_and_sort_by_name() {
    let data = dataset().await;

    // A brand nobody references must not appear.
    insert_brand(&data.pool, "Ferrari").await.expect("brand");

    let brands = data.store.list_brands().await.expect("brands");
    assert_eq!(brands.len(), 2);
    assert_eq!(brands[0].name, "Honda");
    assert_eq!(brands[0].count, 1);
    assert_eq!(brands[1].name, "Toyota");
    assert_eq!(brands[1].count, 2);

    let colors = data.store.list_colors().await.expect("colors");
    let names: Vec<&str> = colors.iter().map(|color| color.name.as_str()).collect();
    assert_eq!(names, vec!["Black", "Blue", "White"]);

    let engines = data.store.list_engines().await.expect("engines");
    assert_eq!(engines.len(), 1);
    assert_eq!(engines[0].count, 3);
    assert_eq!(engines[0].power, 230);
}

#[tokio::test]
async fn car_details_materializes_every_relation() {
    let data = dataset().await;

    let record = data.store.car_details(data.toyota_corolla_id).await.expect("details");
    assert_eq!(record.car_name.name, "Corolla");
    assert_eq!(record.car_name.brand.name, "Toyota");
    assert_eq!(record.car_model.name, "Sedan");
    assert_eq!(record.color.name, "Black");
    assert_eq!(record.engine.displacement, "2.0");
    assert_eq!(record.transmission, Transmission::Manual);
}

#[tokio::test]
async fn unknown_car_id_is_a_specific_not_found_error() {
    let data = dataset().await;

    let missing = Uuid::new_v4();
    let error = data.store.car_details(missing).await.expect_err("should not exist");
    assert!(matches!(error, StoreError::CarNotFound(id) if id == missing));
}

#[tokio::test]
async fn filter_options_aggregates_the_catalog() {
    let data = dataset().await;

    let options = data.store.filter_options().await.expect("options");
    assert_eq!(options.fuel_types, vec!["flex", "gasoline", "hybrid"]);
    assert_eq!(options.transmissions, vec!["automatic", "cvt", "manual"]);
    assert_eq!(options.year_range.min_manufacture, 2016);
    assert_eq!(options.year_range.max_manufacture, 2022);
    assert_eq!(options.year_range.max_model, 2022);
    assert_eq!(options.price_range.min, 80_000.0);
    assert_eq!(options.price_range.max, 140_000.0);
    assert_eq!(options.mileage_range.min, 5_000);
    assert_eq!(options.mileage_range.max, 60_000);
    assert_eq!(options.doors_range.min, 2);
    assert_eq!(options.doors_range.max, 4);
}

#[tokio::test]
async fn filter_options_fall_back_to_fixed_defaults_on_an_empty_catalog() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let store = CatalogStore::new(pool);

    let options = store.filter_options().await.expect("options");
    assert!(options.fuel_types.is_empty());
    assert!(options.transmissions.is_empty());
    assert_eq!(options.year_range.min_manufacture, 1900);
    assert_eq!(options.year_range.max_manufacture, 9999);
    assert_eq!(options.price_range.min, 0.0);
    assert_eq!(options.doors_range.min, 2);
    assert_eq!(options.doors_range.max, 8);
}
