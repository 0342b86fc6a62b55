//! In-memory [`DocumentStore`] implementation for tests and local runs.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock` for thread safety.
//! Documents keep creation order. Asset ids are content-addressed from a
//! SHA-256 of the bytes, so uploading identical bytes twice returns the
//! same id.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::CatalogDocument;

use super::{AssetKind, AssetUpload, CreatedDocument, DocumentStore, StoredAsset};

/// A document as held by [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub doc: CatalogDocument,
}

/// An uploaded asset as held by [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub kind: AssetKind,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

/// In-memory store.
pub struct InMemoryStore {
    docs: RwLock<Vec<StoredDocument>>,
    assets: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of all documents in creation order.
    pub fn documents(&self) -> Vec<StoredDocument> {
        self.docs.read().unwrap().clone()
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<CatalogDocument> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.doc.clone())
    }

    pub fn asset(&self, id: &str) -> Option<StoredBlob> {
        self.assets.read().unwrap().get(id).cloned()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.read().unwrap().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn asset_id(kind: AssetKind, bytes: &[u8], filename: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = format!("{:x}", hasher.finalize());
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let prefix = match kind {
        AssetKind::Image => "image",
        AssetKind::File => "file",
    };
    format!("{}-{}-{}", prefix, &digest[..40], ext)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, doc: &CatalogDocument) -> Result<CreatedDocument> {
        let id = Uuid::new_v4().to_string();
        self.docs.write().unwrap().push(StoredDocument {
            id: id.clone(),
            doc: doc.clone(),
        });
        Ok(CreatedDocument { id })
    }

    async fn patch(
        &self,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreatedDocument> {
        let mut docs = self.docs.write().unwrap();
        let stored = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| anyhow!("document not found: {}", id))?;

        let mut value = serde_json::to_value(&stored.doc)?;
        if let Some(obj) = value.as_object_mut() {
            for (key, field) in fields {
                obj.insert(key, field);
            }
        }
        stored.doc = serde_json::from_value(value)?;
        Ok(CreatedDocument { id: id.to_string() })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            anyhow::bail!("document not found: {}", id);
        }
        Ok(())
    }

    async fn upload_asset(&self, upload: AssetUpload) -> Result<StoredAsset> {
        if upload.bytes.is_empty() {
            anyhow::bail!("refusing to store an empty asset");
        }
        let id = asset_id(upload.kind, &upload.bytes, &upload.filename);
        self.assets.write().unwrap().insert(
            id.clone(),
            StoredBlob {
                kind: upload.kind,
                filename: upload.filename,
                content_type: upload.content_type,
                size: upload.bytes.len(),
            },
        );
        Ok(StoredAsset { id })
    }
}
