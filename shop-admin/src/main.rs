use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use shop_blob::{AssetPayload, MemoryObjectStore, ObjectStore, S3CompatibleStore};
use shop_catalog::{
    CatalogStore, JsonFileCatalogStore, MemoryCatalogStore, PipelineController, PipelineEvent,
    PipelinePhase, PipelineSettings, ProductDraft, ProductFields, ShopConfig, SubmissionOutcome,
};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageKind {
    /// In-process store, nothing leaves the machine
    Memory,
    /// S3-compatible bucket configured through `SHOP_S3_*`
    S3,
}

/// Upload product images and add the product to the catalog.
///
/// Settings are read from `SHOP__*` environment variables, for example
/// `SHOP__UPLOAD__TIMEOUT_MS=5000` or `SHOP__CATALOG__COLLECTION=Products`.
#[derive(Parser, Debug)]
#[command(name = "shop-admin", version)]
struct Cli {
    #[arg(long)]
    name: String,

    #[arg(long)]
    category: String,

    /// Whole number
    #[arg(long)]
    price: String,

    #[arg(long, default_value = "")]
    offer_price: String,

    #[arg(long, default_value = "")]
    description: String,

    /// ARGB hex color, e.g. `#FF2196F3`; repeat for several
    #[arg(long = "color", value_parser = parse_argb)]
    colors: Vec<i32>,

    /// Comma separated, e.g. `S,M,L`
    #[arg(long, default_value = "")]
    sizes: String,

    #[arg(long, default_value = "1")]
    quantity: String,

    /// Image file to attach; repeat for several, order is kept
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = StorageKind::Memory)]
    storage: StorageKind,

    /// Append records to `{dir}/{collection}.jsonl` instead of memory
    #[arg(long, env = "SHOP_CATALOG_DIR")]
    catalog_dir: Option<PathBuf>,

    /// Submit even when required fields or images are missing
    #[arg(long, action = clap::ArgAction::SetTrue)]
    skip_checks: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = ShopConfig::new();
    config.load_env("SHOP__");
    let settings = PipelineSettings::from_snapshot(&config.snapshot());

    let mut draft = read_draft(&cli).await?;
    if !cli.skip_checks {
        draft
            .fields
            .check_required(draft.assets.len())
            .context("product is incomplete")?;
    }

    let objects: Arc<dyn ObjectStore> = match cli.storage {
        StorageKind::Memory => Arc::new(MemoryObjectStore::with_base_url(
            settings.storage_base_url.clone(),
        )),
        StorageKind::S3 => Arc::new(
            S3CompatibleStore::from_env()
                .await
                .context("configuring S3 storage")?,
        ),
    };
    let catalog: Arc<dyn CatalogStore> = match &cli.catalog_dir {
        Some(dir) => Arc::new(
            JsonFileCatalogStore::new(dir)
                .await
                .with_context(|| format!("opening catalog at {}", dir.display()))?,
        ),
        None => Arc::new(MemoryCatalogStore::new()),
    };

    let mut controller = PipelineController::from_settings(objects, catalog, &settings);
    let mut events = controller.subscribe();
    let outcome = controller.submit(&mut draft).await;
    log_phases(&mut events);

    match outcome {
        SubmissionOutcome::Committed { record, ack } => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            println!(
                "[shop-admin] committed {} as document {} (position {})",
                record.id, ack.document_id, ack.position
            );
            Ok(())
        }
        SubmissionOutcome::UploadFailed {
            reason,
            failure_count,
        } => bail!("{failure_count} image upload(s) failed: {reason}"),
        SubmissionOutcome::Invalid {
            field,
            reason,
            orphaned,
        } => bail!(
            "{field} rejected: {reason}; {} uploaded image(s) left unreferenced",
            orphaned.len()
        ),
        SubmissionOutcome::CommitFailed { reason, orphaned } => bail!(
            "record not saved: {reason}; {} uploaded image(s) left unreferenced",
            orphaned.len()
        ),
    }
}

/// Log every phase change already published; returns the phases reached
fn log_phases(events: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelinePhase> {
    let mut reached = Vec::new();
    while let Ok(event) = events.try_recv() {
        let PipelineEvent::PhaseChanged { from, to, .. } = event;
        info!(%from, %to, "pipeline phase");
        reached.push(to);
    }
    reached
}

async fn read_draft(cli: &Cli) -> Result<ProductDraft> {
    let fields = ProductFields {
        name: cli.name.clone(),
        category: cli.category.clone(),
        price: cli.price.clone(),
        offer_price: cli.offer_price.clone(),
        description: cli.description.clone(),
        colors: cli.colors.clone(),
        sizes: cli.sizes.clone(),
        quantity: cli.quantity.clone(),
    };

    let mut draft = ProductDraft::new(fields);
    for path in &cli.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading image {}", path.display()))?;
        draft.assets.push(AssetPayload::new(bytes, content_type(path)));
    }
    Ok(draft)
}

fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(shop_blob::DEFAULT_IMAGE_CONTENT_TYPE)
        .to_string()
}

/// `#AARRGGBB`, `0xAARRGGBB` or `AARRGGBB`; six digits get an opaque alpha
fn parse_argb(raw: &str) -> Result<i32, String> {
    let hex = raw
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let hex = match hex.len() {
        6 => format!("FF{hex}"),
        8 => hex.to_string(),
        _ => return Err(format!("expected 6 or 8 hex digits, got {raw:?}")),
    };
    u32::from_str_radix(&hex, 16)
        .map(|argb| argb as i32)
        .map_err(|e| format!("invalid color {raw:?}: {e}"))
}
