//! Showroom core - pure domain logic for conversational catalog search
//!
//! This crate holds everything that can be reasoned about without I/O:
//!
//! - catalog entity types and the fixed fuel/transmission vocabularies
//! - the sparse [`preferences::PreferenceMap`] accumulated across turns
//! - the filter normalizer ([`filters::FilterSet`]) that turns untrusted
//!   generated payloads or preference maps into the canonical filter shape
//! - pagination and the ordering allow-list
//! - the bounded per-connection search history
//! - the service error taxonomy and wire error codes
//! - application configuration (TOML file + environment overrides)
//!
//! Everything here is deterministic and safe to fuzz. Network access,
//! storage, and model calls live in the sibling crates.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod filters;
pub mod history;
pub mod preferences;

pub use catalog::{CarRecord, FuelType, SearchPage, Transmission};
pub use errors::ServiceError;
pub use filters::{FilterSet, Ordering, Pagination};
pub use history::{SearchHistory, SearchRecord};
pub use preferences::PreferenceMap;
