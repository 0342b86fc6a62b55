//! Image resolution: external URL → stored asset reference.
//!
//! [`ImageResolver::resolve`] never fails. Empty URLs return `None` without
//! touching the network; fetch errors, non-success responses, empty bodies,
//! and upload failures are logged at `warn` and also return `None`, so one
//! bad URL cannot abort the row that references it.
//!
//! Each call is independent: the same URL appearing twice in a run is
//! fetched and uploaded twice.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use catalog_import_core::mapper::{ImageSources, ResolvedImages};
use catalog_import_core::models::ImageRef;
use catalog_import_core::store::{AssetKind, AssetUpload, DocumentStore};

/// Filename used when the URL has no usable last path segment.
pub const DEFAULT_FILENAME: &str = "image.png";

/// Content type used when the response does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Fetches image URLs and uploads the bytes to the asset store.
pub struct ImageResolver {
    client: reqwest::Client,
    store: Arc<dyn DocumentStore>,
}

impl ImageResolver {
    /// Create a resolver whose fetches time out after `timeout`.
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for image fetches")?;
        Ok(Self::with_client(client, store))
    }

    pub fn with_client(client: reqwest::Client, store: Arc<dyn DocumentStore>) -> Self {
        Self { client, store }
    }

    /// Resolve one URL to a stored image reference, or `None`.
    pub async fn resolve(&self, url: Option<&str>) -> Option<ImageRef> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        match self.try_resolve(url).await {
            Ok(image) => image,
            Err(e) => {
                warn!(url, error = %format!("{:#}", e), "image resolution failed");
                None
            }
        }
    }

    /// Resolve every image a row references, sequentially, in order:
    /// main image, each `More images` entry, motif background.
    pub async fn resolve_all(&self, sources: &ImageSources) -> ResolvedImages {
        let main = self.resolve(sources.main.as_deref()).await;

        let mut more = Vec::with_capacity(sources.more.len());
        for url in &sources.more {
            more.push(self.resolve(Some(url)).await);
        }

        let motif_background = self.resolve(sources.motif_background.as_deref()).await;

        ResolvedImages {
            main,
            more,
            motif_background,
        }
    }

    async fn try_resolve(&self, url: &str) -> Result<Option<ImageRef>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "image fetch returned non-success status");
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading body of {}", url))?;
        if bytes.is_empty() {
            warn!(url, "image fetch returned an empty body");
            return Ok(None);
        }

        let upload = AssetUpload {
            kind: AssetKind::Image,
            bytes: bytes.to_vec(),
            filename: filename_from_url(url),
            content_type,
        };
        let asset = self
            .store
            .upload_asset(upload)
            .await
            .with_context(|| format!("uploading {}", url))?;

        debug!(url, asset_id = %asset.id, "image uploaded");
        Ok(Some(ImageRef::stored(asset.id)))
    }
}

/// Last path segment of `url` without query or fragment, or [`DEFAULT_FILENAME`].
pub fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
