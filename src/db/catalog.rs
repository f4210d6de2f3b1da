//! Catalog and geography queries
//!
//! Read side of the lookup collaborator: the three process catalogs and the
//! distinct-per-level queries that feed the cascading location dropdowns.
//! Seeding goes through `INSERT OR IGNORE`, so re-applying a seed file skips
//! rows whose ids are already present.

use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{CatalogOption, LocalityOption, LocationOption, LocationRow};

fn location_from_row(row: &Row) -> Result<LocationRow, rusqlite::Error> {
    Ok(LocationRow {
        id: row.get("id")?,
        region_code: row.get("region_code")?,
        region_name: row.get("region_name")?,
        sub_region_code: row.get("sub_region_code")?,
        sub_region_name: row.get("sub_region_name")?,
        locality_code: row.get("locality_code")?,
        locality_name: row.get("locality_name")?,
        kind: row.get("kind")?,
    })
}

/// The three process catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    ProcessType,
    ProcessSource,
    ProcessStage,
}

impl CatalogKind {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::ProcessType => "process_types",
            CatalogKind::ProcessSource => "process_sources",
            CatalogKind::ProcessStage => "process_stages",
        }
    }
}

/// Insert counters for one seed section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkCounts {
    pub inserted: u64,
    pub skipped: u64,
}

/// List one catalog, ordered by name
pub fn list_catalog(conn: &Connection, kind: CatalogKind) -> Result<Vec<CatalogOption>, CoreError> {
    let sql = format!("SELECT id, name FROM {} ORDER BY name", kind.table());
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(CatalogOption {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))
}

/// Seed one catalog, skipping entries whose id already exists
pub fn insert_catalog_entries(
    conn: &Connection,
    kind: CatalogKind,
    entries: &[CatalogOption],
) -> Result<BulkCounts, CoreError> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (id, name) VALUES (?, ?)",
        kind.table()
    );
    let mut counts = BulkCounts::default();
    for entry in entries {
        let changed = conn
            .execute(&sql, params![entry.id, entry.name])
            .map_err(|e| CoreError::Database(format!("Catalog insert failed: {}", e)))?;
        if changed == 0 {
            counts.skipped += 1;
        } else {
            counts.inserted += 1;
        }
    }
    debug!(
        table = kind.table(),
        inserted = counts.inserted,
        skipped = counts.skipped,
        "Seeded catalog"
    );
    Ok(counts)
}

/// Distinct regions, ordered by name
pub fn list_regions(conn: &Connection) -> Result<Vec<LocationOption>, CoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT region_code, region_name FROM locations \
             GROUP BY region_code, region_name ORDER BY region_name",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(LocationOption {
                code: row.get("region_code")?,
                name: row.get("region_name")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))
}

/// Distinct sub-regions of one region, ordered by name
pub fn list_sub_regions(
    conn: &Connection,
    region_code: i64,
) -> Result<Vec<LocationOption>, CoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT sub_region_code, sub_region_name FROM locations \
             WHERE region_code = ? \
             GROUP BY sub_region_code, sub_region_name ORDER BY sub_region_name",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map(params![region_code], |row| {
            Ok(LocationOption {
                code: row.get("sub_region_code")?,
                name: row.get("sub_region_name")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))
}

/// Localities of one sub-region with their backing row ids, ordered by name
pub fn list_localities(
    conn: &Connection,
    region_code: i64,
    sub_region_code: i64,
) -> Result<Vec<LocalityOption>, CoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT MIN(id) AS id, locality_code, locality_name FROM locations \
             WHERE region_code = ? AND sub_region_code = ? \
             GROUP BY locality_code, locality_name ORDER BY locality_name",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let rows = stmt
        .query_map(params![region_code, sub_region_code], |row| {
            Ok(LocalityOption {
                code: row.get("locality_code")?,
                name: row.get("locality_name")?,
                location_id: row.get("id")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))
}

/// One location row by id
pub fn get_location(conn: &Connection, id: i64) -> Result<Option<LocationRow>, CoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, region_code, region_name, sub_region_code, sub_region_name, \
             locality_code, locality_name, kind FROM locations WHERE id = ?",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    if let Some(row) = rows
        .next()
        .map_err(|e| CoreError::Database(format!("Row fetch failed: {}", e)))?
    {
        let location = location_from_row(row)
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?;
        Ok(Some(location))
    } else {
        Ok(None)
    }
}

/// Seed location rows, skipping ids already present
pub fn insert_locations(conn: &Connection, rows: &[LocationRow]) -> Result<BulkCounts, CoreError> {
    let mut counts = BulkCounts::default();
    for row in rows {
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO locations ( \
                 id, region_code, region_name, sub_region_code, sub_region_name, \
                 locality_code, locality_name, kind \
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    row.id,
                    row.region_code,
                    row.region_name,
                    row.sub_region_code,
                    row.sub_region_name,
                    row.locality_code,
                    row.locality_name,
                    row.kind,
                ],
            )
            .map_err(|e| CoreError::Database(format!("Location insert failed: {}", e)))?;
        if changed == 0 {
            counts.skipped += 1;
        } else {
            counts.inserted += 1;
        }
    }
    debug!(
        inserted = counts.inserted,
        skipped = counts.skipped,
        "Seeded locations"
    );
    Ok(counts)
}
