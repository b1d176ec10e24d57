use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use showroom_agent::conversation::CarSearcher;
use showroom_core::catalog::SearchPage;
use showroom_core::errors::ServiceError;
use showroom_core::filters::{FilterSet, Pagination, DEFAULT_PAGE_SIZE};
use showroom_db::CatalogStore;

use crate::envelope::Action;
use crate::session::ConnectionSession;

/// Keys of a `search_cars` payload that are not filter attributes.
const NON_FILTER_KEYS: [&str; 7] =
    ["action", "request_id", "page", "page_size", "ordering", "pagination", "filters"];

/// Static action dispatch over the catalog store. Stateless: one
/// instance serves every connection concurrently.
pub struct ActionHandlers {
    store: CatalogStore,
}

impl ActionHandlers {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Dispatches one protocol action. Expected failures come back as
    /// typed [`ServiceError`]s for the caller to wrap in an error
    /// envelope; only `search_cars` touches the session (its bounded
    /// history).
    pub async fn handle_action(
        &self,
        action: Action,
        payload: &Value,
        session: &mut ConnectionSession,
    ) -> Result<Value, ServiceError> {
        debug!(
            event_name = "gateway.action.dispatch",
            action = action.name(),
            room = %session.room,
            "dispatching protocol action"
        );

        match action {
            Action::SearchCars => self.handle_search_cars(payload, session).await,
            Action::GetBrands => {
                let brands = self.store.list_brands().await.map_err(log_store_error)?;
                Ok(json!({ "brands": brands }))
            }
            Action::GetColors => {
                let colors = self.store.list_colors().await.map_err(log_store_error)?;
                Ok(json!({ "colors": colors }))
            }
            Action::GetEngines => {
                let engines = self.store.list_engines().await.map_err(log_store_error)?;
                Ok(json!({ "engines": engines }))
            }
            Action::GetCarDetails => self.handle_get_car_details(payload).await,
            Action::GetFiltersOptions => {
                let options = self.store.filter_options().await.map_err(log_store_error)?;
                serde_json::to_value(options).map_err(ServiceError::internal)
            }
        }
    }

    async fn handle_search_cars(
        &self,
        payload: &Value,
        session: &mut ConnectionSession,
    ) -> Result<Value, ServiceError> {
        let filters = FilterSet::from_raw(&filter_payload(payload));

        let pagination = match parse_pagination(payload) {
            Ok(pagination) => pagination,
            Err(error) => {
                session.record_search(filters, &Pagination::default(), 0, false);
                return Err(error.into());
            }
        };

        match self.store.search_cars(&filters, &pagination).await {
            Ok(page) => {
                session.record_search(filters, &pagination, page.total, true);
                Ok(json!({
                    "results": page.results,
                    "total": page.total,
                    "page": page.page,
                    "page_size": page.page_size,
                    "total_pages": page.total_pages,
                }))
            }
            Err(store_error) => {
                session.record_search(filters, &pagination, 0, false);
                Err(log_store_error(store_error))
            }
        }
    }

    async fn handle_get_car_details(&self, payload: &Value) -> Result<Value, ServiceError> {
        let raw_id = payload
            .get("car_id")
            .and_then(Value::as_str)
            .ok_or(ServiceError::MissingField("car_id"))?;

        let car_id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| ServiceError::Validation(format!("car_id `{raw_id}` is not a UUID")))?;

        let car = self.store.car_details(car_id).await.map_err(log_store_error)?;
        Ok(json!({ "car": car }))
    }
}

/// Catalog access for the conversation engine, backed by the same
/// store the protocol actions use.
pub struct StoreSearcher {
    store: CatalogStore,
}

impl StoreSearcher {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CarSearcher for StoreSearcher {
    async fn search(
        &self,
        filters: &FilterSet,
        pagination: &Pagination,
    ) -> Result<SearchPage, ServiceError> {
        self.store.search_cars(filters, pagination).await.map_err(log_store_error)
    }
}

/// Collects the filterable fields of a `search_cars` payload: flat
/// top-level fields first, then a nested `filters` object, which wins
/// on key collisions.
fn filter_payload(payload: &Value) -> Value {
    let mut combined = Map::new();

    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            if !NON_FILTER_KEYS.contains(&key.as_str()) {
                combined.insert(key.clone(), value.clone());
            }
        }
        if let Some(Value::Object(nested)) = object.get("filters") {
            for (key, value) in nested {
                combined.insert(key.clone(), value.clone());
            }
        }
    }

    Value::Object(combined)
}

/// Pagination fields may sit flat on the payload or inside a nested
/// `pagination` object; flat fields win.
fn parse_pagination(payload: &Value) -> Result<Pagination, showroom_core::filters::PaginationError> {
    let nested = payload.get("pagination");

    let page = pick_integer(payload, nested, "page").unwrap_or(1);
    let page_size = pick_integer(payload, nested, "page_size").unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
    let ordering = pick_string(payload, nested, "ordering");

    Pagination::new(page, page_size, ordering.as_deref())
}

fn pick_integer(payload: &Value, nested: Option<&Value>, key: &str) -> Option<i64> {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .or_else(|| nested.and_then(|object| object.get(key)).and_then(Value::as_i64))
}

fn pick_string(payload: &Value, nested: Option<&Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .or_else(|| nested.and_then(|object| object.get(key)).and_then(Value::as_str))
        .map(str::to_string)
}

fn log_store_error(store_error: showroom_db::StoreError) -> ServiceError {
    let service_error = ServiceError::from(store_error);
    if matches!(service_error, ServiceError::Internal(_)) {
        error!(
            event_name = "gateway.store.failure",
            error = %service_error,
            "catalog store call failed"
        );
    }
    service_error
}
