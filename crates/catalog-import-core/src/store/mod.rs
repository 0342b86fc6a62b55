//! Storage abstraction for the content store.
//!
//! The [`DocumentStore`] trait is the only surface the import pipeline sees
//! of the headless content store. It mirrors the store's client API:
//! single-document `create`, `patch`, and `delete`, plus binary asset upload.
//! There is no bulk primitive; callers write one document at a time.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::CatalogDocument;

/// Kind of binary asset being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    File,
}

impl AssetKind {
    /// Path segment used by the store's asset endpoint.
    pub fn as_path(&self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::File => "files",
        }
    }
}

/// A binary payload plus the metadata the asset store records with it.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub kind: AssetKind,
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Identifier assigned by the store to a written document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedDocument {
    pub id: String,
}

/// Identifier assigned by the store to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub id: String,
}

/// Abstract document + asset store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](DocumentStore::create) | Persist one new catalog document |
/// | [`patch`](DocumentStore::patch) | Set fields on an existing document |
/// | [`delete`](DocumentStore::delete) | Remove a document |
/// | [`upload_asset`](DocumentStore::upload_asset) | Store a binary, returning its asset id |
/// | [`ping`](DocumentStore::ping) | Cheap connectivity / credentials check |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document. Never deduplicates: creating the same
    /// document twice yields two stored documents.
    async fn create(&self, doc: &CatalogDocument) -> Result<CreatedDocument>;

    /// Set the given top-level fields on an existing document.
    async fn patch(
        &self,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedDocument>;

    /// Delete a document by id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Upload a binary asset.
    async fn upload_asset(&self, upload: AssetUpload) -> Result<StoredAsset>;

    /// Verify the store is reachable and the credentials work.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
