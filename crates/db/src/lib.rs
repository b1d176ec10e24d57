//! SQLite-backed catalog store for Showroom.
//!
//! The catalog is read-mostly from this subsystem: searches, listings,
//! and aggregates. Writes happen only through migrations and the seed
//! fixtures used by tests, demos, and the CLI.

pub mod catalog_store;
pub mod connection;
pub mod fixtures;
pub mod migrations;

pub use catalog_store::{CatalogStore, StoreError};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{seed_catalog, SeedSummary};
