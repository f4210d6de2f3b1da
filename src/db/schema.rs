//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::CoreError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    // Check current schema version
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, CoreError> {
    // Create schema_version table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| CoreError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), CoreError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| CoreError::Database(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| CoreError::Database(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// Create all tables
fn create_tables(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(CATALOG_SCHEMA)
        .map_err(|e| CoreError::Database(format!("Failed to create catalog tables: {}", e)))?;

    conn.execute_batch(RECORD_SCHEMA)
        .map_err(|e| CoreError::Database(format!("Failed to create record tables: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| CoreError::Database(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Migrate schema from older version
fn migrate_schema(conn: &Connection, _from_version: i32) -> Result<(), CoreError> {
    // Add migration steps here as schema evolves
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Catalog and geography schema. Catalog ids come from upstream systems,
/// so the tables never generate their own.
const CATALOG_SCHEMA: &str = r#"
-- Process catalogs (ids assigned by the upstream registry)
CREATE TABLE IF NOT EXISTS process_types (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS process_sources (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS process_stages (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

-- Denormalized geography: one row per locality, carrying its full
-- region / sub-region / locality chain
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY NOT NULL,
    region_code INTEGER NOT NULL,
    region_name TEXT NOT NULL,
    sub_region_code INTEGER NOT NULL,
    sub_region_name TEXT NOT NULL,
    locality_code INTEGER NOT NULL,
    locality_name TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT '' CHECK (length(kind) <= 10)
);
"#;

/// Transactional record schema. These four tables are written together in
/// one transaction per commit; ids are generated here, sequentially.
const RECORD_SCHEMA: &str = r#"
-- Header: identification, originating process, routing, legal opinion
CREATE TABLE IF NOT EXISTS process_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL CHECK (length(external_id) <= 30),
    fmi TEXT NOT NULL CHECK (length(fmi) <= 100),
    case_number TEXT,
    process_source_id INTEGER NOT NULL REFERENCES process_sources(id),
    process_type_id INTEGER NOT NULL REFERENCES process_types(id),
    process_stage_id INTEGER NOT NULL REFERENCES process_stages(id),
    routing_code TEXT,
    office TEXT,
    has_prior_opinion INTEGER NOT NULL DEFAULT 0,
    final_analysis TEXT,
    report_date TEXT,
    viability TEXT,
    report_kind TEXT,
    non_viability_cause TEXT,
    pending_inputs TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Terrain study: location, areas, titling, encumbrances
CREATE TABLE IF NOT EXISTS terrain_studies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_record_id INTEGER NOT NULL REFERENCES process_records(id) ON DELETE CASCADE,
    location_id INTEGER NOT NULL REFERENCES locations(id),
    registry_circle TEXT,
    registered_area REAL NOT NULL CHECK (registered_area >= 0),
    calculated_area REAL NOT NULL CHECK (calculated_area >= 0),
    titleholder_kind TEXT,
    owner_names TEXT,
    owner_id_number TEXT,
    original_title TEXT,
    last_transfer_analysis TEXT,
    mortgage INTEGER NOT NULL DEFAULT 0,
    mortgage_note TEXT,
    easements INTEGER NOT NULL DEFAULT 0,
    easements_note TEXT,
    precautionary_measures INTEGER NOT NULL DEFAULT 0,
    precautionary_note TEXT,
    displacement_registry INTEGER NOT NULL DEFAULT 0,
    displacement_note TEXT,
    collective_claim TEXT,
    land_restitution INTEGER NOT NULL DEFAULT 0,
    land_restitution_note TEXT,
    other_entity_offer INTEGER NOT NULL DEFAULT 0,
    other_entity_offer_note TEXT,
    clarification_process INTEGER NOT NULL DEFAULT 0,
    clarification_note TEXT
);

-- Procedural measures found during the terrain study
CREATE TABLE IF NOT EXISTS procedural_measures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    terrain_study_id INTEGER NOT NULL REFERENCES terrain_studies(id) ON DELETE CASCADE,
    purpose TEXT NOT NULL CHECK (length(purpose) <= 1000),
    code TEXT NOT NULL CHECK (length(code) <= 10),
    note TEXT CHECK (note IS NULL OR length(note) <= 4000),
    tag TEXT
);

-- Prior legal opinions attached to the header
CREATE TABLE IF NOT EXISTS prior_opinions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_record_id INTEGER NOT NULL REFERENCES process_records(id) ON DELETE CASCADE,
    report_date TEXT,
    narrative TEXT
);
"#;

/// Index definitions for fast queries
const INDEXES_SCHEMA: &str = r#"
-- Geography indexes for the cascade queries
CREATE INDEX IF NOT EXISTS idx_locations_region ON locations(region_code);
CREATE INDEX IF NOT EXISTS idx_locations_sub_region ON locations(region_code, sub_region_code);

-- Search indexes
CREATE INDEX IF NOT EXISTS idx_records_external_id ON process_records(external_id);
CREATE INDEX IF NOT EXISTS idx_records_fmi ON process_records(fmi);
CREATE INDEX IF NOT EXISTS idx_records_case_number ON process_records(case_number);

-- Child lookups
CREATE INDEX IF NOT EXISTS idx_studies_record ON terrain_studies(process_record_id);
CREATE INDEX IF NOT EXISTS idx_measures_study ON procedural_measures(terrain_study_id);
CREATE INDEX IF NOT EXISTS idx_opinions_record ON prior_opinions(process_record_id);
"#;
