//! Seeding catalogs and geography from a JSON file
//!
//! Catalog ids are assigned upstream, so seeding is idempotent: rows whose
//! ids already exist are skipped and counted, never overwritten.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::db::catalog::{self, BulkCounts, CatalogKind};
use crate::db::ViabilidadDb;
use crate::error::CoreError;
use crate::model::{CatalogOption, LocationRow};

/// Parsed seed file
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub process_types: Vec<CatalogOption>,
    #[serde(default)]
    pub process_sources: Vec<CatalogOption>,
    #[serde(default)]
    pub process_stages: Vec<CatalogOption>,
    #[serde(default)]
    pub locations: Vec<LocationRow>,
}

impl SeedFile {
    /// Parse a seed file from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse seed data from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-section insert counters for one seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub process_types: BulkCounts,
    pub process_sources: BulkCounts,
    pub process_stages: BulkCounts,
    pub locations: BulkCounts,
}

impl SeedSummary {
    pub fn inserted(&self) -> u64 {
        self.process_types.inserted
            + self.process_sources.inserted
            + self.process_stages.inserted
            + self.locations.inserted
    }

    pub fn skipped(&self) -> u64 {
        self.process_types.skipped
            + self.process_sources.skipped
            + self.process_stages.skipped
            + self.locations.skipped
    }
}

/// Apply a seed file to the database
pub fn apply_seed(db: &ViabilidadDb, seed: &SeedFile) -> Result<SeedSummary, CoreError> {
    let summary = db.with_conn(|conn| {
        Ok(SeedSummary {
            process_types: catalog::insert_catalog_entries(
                conn,
                CatalogKind::ProcessType,
                &seed.process_types,
            )?,
            process_sources: catalog::insert_catalog_entries(
                conn,
                CatalogKind::ProcessSource,
                &seed.process_sources,
            )?,
            process_stages: catalog::insert_catalog_entries(
                conn,
                CatalogKind::ProcessStage,
                &seed.process_stages,
            )?,
            locations: catalog::insert_locations(conn, &seed.locations)?,
        })
    })?;

    info!(
        inserted = summary.inserted(),
        skipped = summary.skipped(),
        "Seed applied"
    );

    Ok(summary)
}
