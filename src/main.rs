//! # Catalog Import CLI (`catalog`)
//!
//! The `catalog` binary imports product CSV exports into the content store,
//! previews what an import would create, checks store connectivity, and
//! starts the HTTP import endpoint.
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog import --file <path>` | Import a CSV file |
//! | `catalog import --url <url>` | Fetch a CSV over HTTP and import it |
//! | `catalog preview <path>` | Print the documents an import would create |
//! | `catalog check` | Verify the store is reachable with the configured token |
//! | `catalog serve` | Start the HTTP server (`POST /api/import-csv`) |
//!
//! ## Examples
//!
//! ```bash
//! # Count importable rows without touching the network
//! catalog import --file exports/products.csv --dry-run
//!
//! # Import with JSON progress on stderr
//! SANITY_API_TOKEN=... catalog import --file exports/products.csv --progress json
//!
//! # Start the import endpoint
//! catalog serve --config ./config/catalog.toml
//! ```

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use catalog_import::config::{self, Config};
use catalog_import::import::{self, CsvSource};
use catalog_import::logging;
use catalog_import::progress::ProgressMode;
use catalog_import::server;

/// Catalog Import CLI: bulk CSV-to-catalog import for a headless content store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/catalog.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Catalog Import: bulk CSV-to-catalog import for a headless content store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Import a CSV export into the store.
    ///
    /// Checks the store connection first, then creates one document per
    /// importable row. Rows missing `Name` or `Slug` are skipped; row
    /// failures are counted and reported without stopping the run.
    #[command(group(ArgGroup::new("input").required(true).args(["file", "url"])))]
    Import {
        /// Read the CSV from a local file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Fetch the CSV from a URL.
        #[arg(long)]
        url: Option<String>,

        /// Dry run: count importable rows and image URLs without network calls.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the documents an import would create as JSON lines.
    ///
    /// Image columns are shown as their source URLs. Nothing is fetched
    /// or written.
    Preview {
        /// CSV file to preview.
        path: PathBuf,
    },

    /// Verify the store is reachable with the configured credentials.
    Check,

    /// Start the HTTP import server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    // Commands that don't require a store
    match &cli.command {
        Commands::Preview { path } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
            import::run_preview(&cfg, path)?;
            return Ok(());
        }
        Commands::Import {
            file: Some(path),
            dry_run: true,
            ..
        } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
            let source = CsvSource::File(path.clone());
            import::run_import_cmd(&cfg, &source, true, ProgressMode::Off).await?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Import {
            file,
            url,
            dry_run,
            progress,
        } => {
            let source = match (file, url) {
                (Some(path), _) => CsvSource::File(path),
                (None, Some(url)) => CsvSource::Url(url),
                (None, None) => anyhow::bail!("either --file or --url is required"),
            };
            let mode = ProgressMode::resolve(progress);
            import::run_import_cmd(&cfg, &source, dry_run, mode).await?;
        }
        Commands::Check => {
            import::run_check(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Preview { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
