//! Import driver.
//!
//! Walks the rows of a CSV export, resolves each row's images, maps it to a
//! catalog document, and persists it with a single `create` call. Every row
//! is isolated: a failure anywhere inside a row is caught at the row
//! boundary, counted, recorded in the capped error sample, and the run
//! moves on to the next row.
//!
//! # Pipeline
//!
//! ```text
//! CSV text ──► parse_csv ──► RawRow ──► identify ──► resolve images
//!                                          │              │
//!                                        skip             ▼
//!                                                    map ──► create ──► throttle
//! ```
//!
//! # Concurrency
//!
//! With `import.concurrency = 1` (the default) rows run strictly one after
//! another in source order. Larger values keep up to N rows in flight via
//! an ordered buffered stream; outcomes are still tallied in source order,
//! so the error sample is identical to a sequential run.
//!
//! # Deadline
//!
//! When `import.deadline_secs` is set, rows that have not started once the
//! deadline passes are never started. Rows already in flight finish, and
//! the remainder is reported as not started.
//!
//! # Entry Points
//!
//! The same [`Importer`] backs both the HTTP endpoint
//! (`POST /api/import-csv`) and the `catalog import` command.

use anyhow::{anyhow, bail, Context, Result};
use futures::future::{self, FutureExt};
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use catalog_import_core::csv::parse_csv;
use catalog_import_core::mapper::{columns, ImageSources, ResolvedImages, RowMapper, Skip};
use catalog_import_core::models::RawRow;
use catalog_import_core::report::{ImportReport, ReportBuilder};
use catalog_import_core::store::{CreatedDocument, DocumentStore};

use crate::config::{Config, ImportConfig};
use crate::images::ImageResolver;
use crate::progress::{ImportProgressEvent, ImportProgressReporter, NoProgress, ProgressMode, RowStatus};
use crate::store::open_store;
use crate::throttle::{self, RateLimiter};

/// Failures that abort a whole import request.
///
/// Row-level failures never surface here; they are reported in-band in
/// the [`ImportReport`].
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("No CSV data provided")]
    NoData,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Driver tuning, usually taken from `[import]`.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub max_error_samples: usize,
    pub concurrency: usize,
    pub strict_images: bool,
    pub deadline: Option<Duration>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

impl ImportOptions {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            max_error_samples: config.max_error_samples,
            concurrency: config.concurrency.max(1),
            strict_images: config.strict_images,
            deadline: config.deadline(),
        }
    }
}

/// How one row ended.
#[derive(Debug)]
enum RowOutcome {
    Imported { name: String, id: String },
    Skipped(Skip),
    Failed { name: String, error: String },
}

/// The import driver.
pub struct Importer {
    store: Arc<dyn DocumentStore>,
    resolver: ImageResolver,
    mapper: RowMapper,
    limiter: Arc<dyn RateLimiter>,
    options: ImportOptions,
    progress: Box<dyn ImportProgressReporter>,
    source: String,
}

impl Importer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        resolver: ImageResolver,
        mapper: RowMapper,
        limiter: Arc<dyn RateLimiter>,
        options: ImportOptions,
    ) -> Self {
        Self {
            store,
            resolver,
            mapper,
            limiter,
            options,
            progress: Box::new(NoProgress),
            source: "csv".to_string(),
        }
    }

    /// Wire an importer from config around an already opened store.
    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let resolver = ImageResolver::new(
            store.clone(),
            Duration::from_secs(config.import.fetch_timeout_secs),
        )?;
        Ok(Self::new(
            store,
            resolver,
            RowMapper::new(config.import.delimiter_chars()),
            throttle::from_config(&config.import),
            ImportOptions::from_config(&config.import),
        ))
    }

    pub fn with_progress(mut self, progress: Box<dyn ImportProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Label used in progress output and logs.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run a full import over `csv_data`.
    ///
    /// Missing or blank input is [`ImportError::NoData`]; nothing is read
    /// or written in that case.
    pub async fn run(&self, csv_data: Option<&str>) -> Result<ImportReport, ImportError> {
        let text = csv_data
            .filter(|text| !text.trim().is_empty())
            .ok_or(ImportError::NoData)?;

        let rows = parse_csv(text);
        let total = rows.len();
        info!(source = %self.source, rows = total, "import started");
        self.progress.report(ImportProgressEvent::Parsed {
            source: self.source.clone(),
            total: total as u64,
        });

        let deadline = self.options.deadline.map(|d| Instant::now() + d);
        let mut report = ReportBuilder::new(self.options.max_error_samples);
        let mut finished = 0usize;

        let outcomes = stream::iter(rows.iter())
            .take_while(move |_| future::ready(deadline.map_or(true, |d| Instant::now() < d)))
            .map(|row| self.process_row(row))
            .buffered(self.options.concurrency)
            .boxed();
        futures::pin_mut!(outcomes);

        while let Some(outcome) = outcomes.next().await {
            finished += 1;
            let (name, status) = match outcome {
                RowOutcome::Imported { name, id } => {
                    debug!(row = finished, id = %id, name = %name, "row imported");
                    report.record_imported();
                    (name, RowStatus::Imported)
                }
                RowOutcome::Skipped(reason) => {
                    debug!(row = finished, %reason, "row skipped");
                    report.record_skipped();
                    (String::new(), RowStatus::Skipped)
                }
                RowOutcome::Failed { name, error } => {
                    warn!(row = finished, name = %name, error = %error, "row failed");
                    report.record_error(&name, &error);
                    (name, RowStatus::Failed)
                }
            };
            self.progress.report(ImportProgressEvent::Row {
                source: self.source.clone(),
                n: finished as u64,
                total: total as u64,
                name,
                status,
            });
        }

        if finished < total {
            warn!(
                not_started = total - finished,
                "import deadline elapsed before every row started"
            );
            report.record_not_started(total - finished);
        }

        let report = report.finish();
        info!(
            source = %self.source,
            imported = report.imported_count(),
            failed = report.error_count(),
            skipped = report.skipped_count(),
            "import finished"
        );
        Ok(report)
    }

    /// Row boundary: nothing raised while importing a row escapes it.
    async fn process_row(&self, row: &RawRow) -> RowOutcome {
        match AssertUnwindSafe(self.import_row(row)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => RowOutcome::Failed {
                name: row.value(columns::NAME).to_string(),
                error: panic_message(panic.as_ref()),
            },
        }
    }

    async fn import_row(&self, row: &RawRow) -> RowOutcome {
        let identity = match self.mapper.identify(row) {
            Ok(identity) => identity,
            Err(skip) => return RowOutcome::Skipped(skip),
        };

        match self.commit_row(row).await {
            Ok(created) => RowOutcome::Imported {
                name: identity.name,
                id: created.id,
            },
            Err(e) => RowOutcome::Failed {
                name: identity.name,
                error: format!("{:#}", e),
            },
        }
    }

    async fn commit_row(&self, row: &RawRow) -> Result<CreatedDocument> {
        let sources = self.mapper.image_sources(row);
        let images = self.resolver.resolve_all(&sources).await;
        if self.options.strict_images {
            check_images_resolved(&sources, &images)?;
        }

        let doc = self
            .mapper
            .map(row, images)
            .map_err(|skip| anyhow!("{}", skip))?;
        let created = self.store.create(&doc).await?;

        self.limiter.acquire().await;
        Ok(created)
    }
}

/// Fail when any explicitly requested image did not resolve.
fn check_images_resolved(sources: &ImageSources, images: &ResolvedImages) -> Result<()> {
    if let (Some(url), None) = (&sources.main, &images.main) {
        bail!("Main Image could not be stored: {}", url);
    }
    for (url, image) in sources.more.iter().zip(&images.more) {
        if image.is_none() {
            bail!("More images entry could not be stored: {}", url);
        }
    }
    if let (Some(url), None) = (&sources.motif_background, &images.motif_background) {
        bail!("Motif Background could not be stored: {}", url);
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CLI commands
// ═══════════════════════════════════════════════════════════════════════

/// Where `catalog import` reads its CSV from.
#[derive(Debug, Clone)]
pub enum CsvSource {
    File(PathBuf),
    Url(String),
}

impl CsvSource {
    pub fn label(&self) -> String {
        match self {
            CsvSource::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            CsvSource::Url(url) => url.clone(),
        }
    }

    pub async fn read(&self) -> Result<String> {
        match self {
            CsvSource::File(path) => read_csv_file(path),
            CsvSource::Url(url) => {
                let response = reqwest::get(url)
                    .await
                    .with_context(|| format!("Failed to fetch CSV from {}", url))?;
                let status = response.status();
                if !status.is_success() {
                    bail!("Failed to fetch CSV from {}: HTTP {}", url, status);
                }
                response
                    .text()
                    .await
                    .with_context(|| format!("Failed to read CSV body from {}", url))
            }
        }
    }
}

fn read_csv_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))
}

/// `catalog import`: check the store, run the driver, print a summary.
///
/// With `dry_run`, rows are only tokenized and checked; nothing is fetched
/// or written and no store connection is made.
pub async fn run_import_cmd(
    config: &Config,
    source: &CsvSource,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let text = source.read().await?;
    let label = source.label();

    if dry_run {
        let mapper = RowMapper::new(config.import.delimiter_chars());
        let rows = parse_csv(&text);
        let importable: Vec<&RawRow> = rows
            .iter()
            .filter(|row| mapper.identify(row).is_ok())
            .collect();
        let images: usize = importable
            .iter()
            .map(|row| mapper.image_sources(row).len())
            .sum();

        println!("import {} (dry-run)", label);
        println!("  rows found: {}", rows.len());
        println!("  importable: {}", importable.len());
        println!("  skipped: {}", rows.len() - importable.len());
        println!("  image urls: {}", images);
        return Ok(());
    }

    let store = open_store(&config.store)?;
    store
        .ping()
        .await
        .context("Store connection check failed")?;
    info!(backend = %config.store.backend, "store connection ok");

    let importer = Importer::from_config(config, store)?
        .with_progress(progress.reporter())
        .with_source(label.clone());
    let report = importer.run(Some(&text)).await.map_err(|e| match e {
        ImportError::NoData => anyhow!("{} contains no CSV data", label),
        ImportError::Internal(e) => e,
    })?;

    println!("import {}", label);
    println!("  imported: {}", report.imported_count());
    println!("  skipped: {}", report.skipped_count());
    println!("  failed: {}", report.error_count());
    if report.not_started_count() > 0 {
        println!("  not started: {}", report.not_started_count());
    }
    for message in report.error_messages() {
        println!("  {}", message);
    }
    println!("{}", report.summary());

    Ok(())
}

/// `catalog preview`: print the documents an import would create, one
/// JSON object per line. Image columns are shown as their source URLs.
pub fn run_preview(config: &Config, path: &Path) -> Result<()> {
    let text = read_csv_file(path)?;
    let mapper = RowMapper::new(config.import.delimiter_chars());

    let mut skipped = 0usize;
    for row in parse_csv(&text) {
        let sources = mapper.image_sources(&row);
        let doc = match mapper.map(&row, ResolvedImages::default()) {
            Ok(doc) => doc,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let mut value = serde_json::to_value(&doc)?;
        if let Some(obj) = value.as_object_mut() {
            if let Some(url) = &sources.main {
                obj.insert("image".into(), serde_json::json!(url));
            }
            if !sources.more.is_empty() {
                obj.insert("moreImages".into(), serde_json::json!(sources.more));
            }
            if let Some(url) = &sources.motif_background {
                obj.insert("motifBackground".into(), serde_json::json!(url));
            }
        }
        println!("{}", serde_json::to_string(&value)?);
    }

    if skipped > 0 {
        eprintln!("{} rows skipped (missing Name or Slug)", skipped);
    }
    Ok(())
}

/// `catalog check`: verify the configured store is reachable.
pub async fn run_check(config: &Config) -> Result<()> {
    let store = open_store(&config.store)?;
    store
        .ping()
        .await
        .context("Store connection check failed")?;

    println!("store {}", config.store.backend);
    if let Some(project) = &config.store.project_id {
        println!("  project: {}", project);
    }
    println!("  dataset: {}", config.store.dataset);
    println!("ok");
    Ok(())
}
