//! Registry maintenance tool for predios-core
//!
//! Opens (and initializes) the registry database, applies catalog and
//! geography seed files, and answers quick searches from the command line.
//! The form controller itself is a library concern; desktop frontends embed
//! [`predios_core::PredioForm`] directly.
//!
//! ## Usage
//!
//! ```bash
//! # Initialize the database under the default data directory
//! predios-core
//!
//! # Use a custom data directory
//! predios-core --data-dir /srv/viabilidad
//!
//! # Seed catalogs and geography from a JSON file
//! predios-core --seed seeds/catalogs.json
//!
//! # Look up records by FMI prefix
//! predios-core --find-fmi 060
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use predios_core::store::RecordStore;
use predios_core::{seed, Config, SearchFilter, SqliteRecordStore, ViabilidadDb};

#[derive(Parser, Debug)]
#[command(name = "predios-core")]
#[command(about = "Registry maintenance for land-parcel legal-viability records")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for the registry database
    #[arg(long, env = "PREDIOS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seed file with catalogs and geography (JSON)
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Search records by external identifier prefix
    #[arg(long)]
    find_external_id: Option<String>,

    /// Search records by FMI prefix
    #[arg(long)]
    find_fmi: Option<String>,

    /// Search records by case number prefix
    #[arg(long)]
    find_case: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("predios_core=info".parse()?))
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    info!(
        data_dir = %config.data_dir.display(),
        "Starting predios-core"
    );

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(ViabilidadDb::open(&config.data_dir)?);

    // Seed catalogs and geography when asked to
    let seed_path = args.seed.or_else(|| config.seed_file.clone());
    if let Some(path) = seed_path {
        info!(path = %path.display(), "Applying seed file");
        let seed_file = seed::SeedFile::from_path(&path)?;
        let summary = seed::apply_seed(&db, &seed_file)?;
        info!(
            inserted = summary.inserted(),
            skipped = summary.skipped(),
            "Seed file applied"
        );
    }

    let stats = db.stats()?;
    info!(
        records = stats.record_count,
        terrain_studies = stats.terrain_study_count,
        measures = stats.measure_count,
        opinions = stats.opinion_count,
        locations = stats.location_count,
        "Registry ready"
    );

    // Command-line search over the pick-list query
    let filter = SearchFilter {
        external_id: args.find_external_id,
        fmi: args.find_fmi,
        case_number: args.find_case,
    };
    if !filter.is_empty() {
        let records = SqliteRecordStore::new(Arc::clone(&db));
        let rows = records.search(&filter).await?;
        info!(matches = rows.len(), "Search finished");
        for row in rows {
            info!(
                header_id = row.header_id,
                external_id = %row.external_id,
                fmi = %row.fmi,
                case_number = %row.case_number.unwrap_or_default(),
                viability = %row.viability.unwrap_or_default(),
                "Match"
            );
        }
    }

    Ok(())
}
