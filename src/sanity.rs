//! Sanity content store client.
//!
//! Implements [`DocumentStore`] over the Sanity HTTP API:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `create` / `patch` / `delete` | `POST /v{api}/data/mutate/{dataset}` |
//! | `upload_asset` | `POST /v{api}/assets/{images,files}/{dataset}?filename=` |
//! | `ping` | `GET /v{api}/data/query/{dataset}?query=*[_type == "product"][0...1]` |
//!
//! # Environment Variables
//!
//! - `SANITY_API_TOKEN`: required, a token with write access to the dataset.
//!
//! # Wire Format
//!
//! Catalog documents are encoded in the store's document shape: `_type`
//! instead of `type`, slugs as `{ "_type": "slug", "current": ... }`, and
//! images as `{ "_type": "image", "asset": { "_type": "reference", "_ref": ... } }`.
//! Items of `moreImages` carry a random `_key`, as the store requires for
//! array members.
//!
//! # Retry Strategy
//!
//! HTTP 429 is retried with exponential backoff (1s, 2s, 4s, ...) up to
//! `store.max_retries` times. Other failures are returned immediately:
//! `create` is not idempotent, so a 5xx is never replayed.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use catalog_import_core::models::{CatalogDocument, ImageRef};
use catalog_import_core::store::{AssetUpload, CreatedDocument, DocumentStore, StoredAsset};

use crate::config::StoreConfig;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "SANITY_API_TOKEN";

/// Sanity-backed document store.
pub struct SanityStore {
    client: reqwest::Client,
    /// `{host}/v{api_version}`
    base_url: String,
    dataset: String,
    token: String,
    max_retries: u32,
}

impl SanityStore {
    /// Build a store from config, reading the token from [`TOKEN_ENV`].
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .with_context(|| format!("{} environment variable not set", TOKEN_ENV))?;
        Self::new(config, token)
    }

    pub fn new(config: &StoreConfig, token: impl Into<String>) -> Result<Self> {
        let host = match (&config.api_host, &config.project_id) {
            (Some(host), _) => host.trim_end_matches('/').to_string(),
            (None, Some(project)) => format!("https://{}.api.sanity.io", project),
            (None, None) => bail!("store.project_id or store.api_host must be set"),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/v{}", host, config.api_version),
            dataset: config.dataset.clone(),
            token: token.into(),
            max_retries: config.max_retries,
        })
    }

    fn mutate_url(&self) -> String {
        format!(
            "{}/data/mutate/{}?returnIds=true",
            self.base_url, self.dataset
        )
    }

    /// Send a request built by `build`, retrying on HTTP 429.
    async fn send<F>(&self, what: &str, build: F) -> Result<Value>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let response = build()
                .bearer_auth(&self.token)
                .send()
                .await
                .with_context(|| format!("{} request failed", what))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .with_context(|| format!("{} returned invalid JSON", what));
            }

            let body_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!(what, attempt, "store rate limited the request");
                last_err = Some(anyhow!("Sanity API error {}: {}", status, body_text));
                continue;
            }

            bail!("Sanity API error {}: {}", status, body_text);
        }

        Err(last_err.unwrap_or_else(|| anyhow!("{} failed after retries", what)))
    }

    async fn mutate(&self, mutation: Value) -> Result<Value> {
        let body = json!({ "mutations": [mutation] });
        let url = self.mutate_url();
        self.send("mutate", || self.client.post(&url).json(&body))
            .await
    }
}

/// Pull the first affected document id out of a mutate response.
fn first_result_id(response: &Value) -> Result<String> {
    response
        .get("results")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .and_then(|r| r.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid mutate response: missing results[0].id"))
}

/// Encode a catalog document in the store's document shape.
pub fn encode_document(doc: &CatalogDocument) -> Value {
    let mut obj = Map::new();
    obj.insert("_type".into(), json!(doc.doc_type));
    obj.insert("name".into(), json!(doc.name));
    obj.insert(
        "slug".into(),
        json!({ "_type": "slug", "current": doc.slug }),
    );
    obj.insert("description".into(), json!(doc.description));
    obj.insert("price".into(), json!(doc.price));
    obj.insert("category".into(), json!(doc.category));
    obj.insert("featured".into(), json!(doc.featured));
    obj.insert("inStock".into(), json!(doc.in_stock));
    obj.insert(
        "motifBackgroundColor".into(),
        json!(doc.motif_background_color),
    );

    if let Some(image) = &doc.image {
        obj.insert("image".into(), encode_image(image));
    }
    if let Some(images) = &doc.more_images {
        let items: Vec<Value> = images
            .iter()
            .map(|image| {
                let mut item = encode_image(image);
                item["_key"] = json!(array_key());
                item
            })
            .collect();
        obj.insert("moreImages".into(), Value::Array(items));
    }
    if let Some(image) = &doc.motif_background {
        obj.insert("motifBackground".into(), encode_image(image));
    }

    Value::Object(obj)
}

fn encode_image(image: &ImageRef) -> Value {
    json!({
        "_type": "image",
        "asset": { "_type": "reference", "_ref": image.asset_id },
    })
}

fn array_key() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[async_trait]
impl DocumentStore for SanityStore {
    async fn create(&self, doc: &CatalogDocument) -> Result<CreatedDocument> {
        let response = self
            .mutate(json!({ "create": encode_document(doc) }))
            .await?;
        let id = first_result_id(&response)?;
        debug!(id = %id, slug = %doc.slug, "document created");
        Ok(CreatedDocument { id })
    }

    async fn patch(&self, id: &str, fields: Map<String, Value>) -> Result<CreatedDocument> {
        let response = self
            .mutate(json!({ "patch": { "id": id, "set": fields } }))
            .await?;
        Ok(CreatedDocument {
            id: first_result_id(&response).unwrap_or_else(|_| id.to_string()),
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.mutate(json!({ "delete": { "id": id } })).await?;
        Ok(())
    }

    async fn upload_asset(&self, upload: AssetUpload) -> Result<StoredAsset> {
        let url = format!(
            "{}/assets/{}/{}",
            self.base_url,
            upload.kind.as_path(),
            self.dataset
        );
        let filename = upload.filename.clone();
        let response = self
            .send("asset upload", || {
                self.client
                    .post(&url)
                    .query(&[("filename", filename.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, upload.content_type.as_str())
                    .body(upload.bytes.clone())
            })
            .await?;

        let id = response
            .get("document")
            .and_then(|d| d.get("_id"))
            .and_then(|id| id.as_str())
            .ok_or_else(|| anyhow!("Invalid asset response: missing document._id"))?;

        Ok(StoredAsset { id: id.to_string() })
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/data/query/{}", self.base_url, self.dataset);
        self.send("ping", || {
            self.client
                .get(&url)
                .query(&[("query", r#"*[_type == "product"][0...1]"#)])
        })
        .await?;
        Ok(())
    }
}
