//! # Catalog Import
//!
//! Bulk CSV-to-catalog import for a headless content store.
//!
//! Takes a product export (one row per product, header-keyed columns),
//! uploads each row's external images as stored assets, builds a catalog
//! document, and creates it in the store. One bad row never aborts a run;
//! failures are counted and a capped sample of messages is returned.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  CSV text   │──▶│ Import driver│──▶│ Content store│
//! │ file/URL/API│   │ map+resolve  │   │ docs+assets  │
//! └─────────────┘   └──────┬───────┘   └──────────────┘
//!                          │
//!          ┌───────────────┤
//!          ▼               ▼
//!     ┌──────────┐   ┌──────────┐
//!     │   CLI    │   │   HTTP   │
//!     │(catalog) │   │  (API)   │
//!     └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! catalog check                          # verify store credentials
//! catalog preview exports/products.csv   # show what would be created
//! catalog import --file exports/products.csv
//! catalog serve                          # POST /api/import-csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`csv`] | Quote-aware CSV tokenizer |
//! | [`mapper`] | Row → catalog document mapping |
//! | [`models`] | Core data types |
//! | [`report`] | Import report |
//! | [`store`] | Document store trait and backends |
//! | [`sanity`] | HTTP store client |
//! | [`images`] | Image URL → stored asset |
//! | [`throttle`] | Write rate limiting |
//! | [`import`] | Import driver and CLI commands |
//! | [`progress`] | Progress reporting on stderr |
//! | [`server`] | HTTP entry point |
//! | [`logging`] | Tracing setup |

pub mod config;
pub mod images;
pub mod import;
pub mod logging;
pub mod progress;
pub mod sanity;
pub mod server;
pub mod store;
pub mod throttle;

pub use catalog_import_core::{csv, mapper, models, report};
