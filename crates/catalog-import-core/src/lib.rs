//! # Catalog Import Core
//!
//! Shared, WASM-safe logic for catalog import: data models, the CSV
//! tokenizer, row-to-document mapping, the import report, and the
//! document store abstraction.
//!
//! This crate contains no tokio, HTTP clients, filesystem I/O, or other
//! native-only dependencies. Network-bound pieces (image resolution, the
//! remote store, throttling) live in the `catalog-import` crate.

pub mod csv;
pub mod mapper;
pub mod models;
pub mod report;
pub mod store;
