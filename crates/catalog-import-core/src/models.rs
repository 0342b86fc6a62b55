//! Core data models used throughout catalog import.
//!
//! These types represent the rows, asset references, and catalog documents
//! that flow through the import pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Document type tag written on every imported catalog document.
pub const PRODUCT_TYPE: &str = "product";

/// One tokenized CSV data line, keyed by header name.
///
/// Iteration order is column order. When a header repeats, the key keeps
/// the position of its first occurrence and the value of its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: IndexMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, overwriting any earlier value for the same header.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(header.into(), value.into());
    }

    /// Raw value for a header, if the header exists.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }

    /// Trimmed value for a header; absent headers read as the empty string.
    pub fn value(&self, header: &str) -> &str {
        self.get(header).map(str::trim).unwrap_or("")
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Reference to a binary that has already been uploaded to the asset store.
///
/// Serialized as `{ "kind": "stored", "assetId": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "stored", rename_all = "camelCase")]
pub struct ImageRef {
    pub asset_id: String,
}

impl ImageRef {
    pub fn stored(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

/// A product record as persisted in the content store.
///
/// `name` and `slug` are always non-empty for documents produced by the
/// row mapper. Optional image fields are omitted entirely when unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub featured: bool,
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_images: Option<Vec<ImageRef>>,
    pub motif_background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motif_background: Option<ImageRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_header_keeps_first_position_last_value() {
        let row: RawRow = vec![("Name", "a"), ("Slug", "s"), ("Name", "b")]
            .into_iter()
            .collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("Name"), Some("b"));
        assert_eq!(row.headers().collect::<Vec<_>>(), vec!["Name", "Slug"]);
    }

    #[test]
    fn value_defaults_to_empty_and_trims() {
        let row: RawRow = vec![("Name", "  Mug  ")].into_iter().collect();
        assert_eq!(row.value("Name"), "Mug");
        assert_eq!(row.value("Missing"), "");
    }

    #[test]
    fn image_ref_serializes_with_kind_tag() {
        let json = serde_json::to_value(ImageRef::stored("image-abc")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "stored", "assetId": "image-abc" })
        );
    }

    #[test]
    fn document_omits_unresolved_images() {
        let doc = CatalogDocument {
            doc_type: PRODUCT_TYPE.to_string(),
            name: "Mug".into(),
            slug: "mug".into(),
            description: String::new(),
            price: 0.0,
            category: String::new(),
            featured: false,
            in_stock: true,
            image: None,
            more_images: None,
            motif_background_color: String::new(),
            motif_background: None,
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["inStock"], true);
        assert!(json.get("image").is_none());
        assert!(json.get("moreImages").is_none());
        assert!(json.get("motifBackground").is_none());
        assert_eq!(json["motifBackgroundColor"], "");
    }
}
