//! SQLite database module for the legal-viability registry
//!
//! Local relational storage for everything the form touches:
//!
//! - `process_types`, `process_sources`, `process_stages` - session catalogs
//! - `locations` - denormalized region / sub-region / locality geography
//! - `process_records` - record headers with the legal-opinion block
//! - `terrain_studies` - location, areas, titling and encumbrances
//! - `procedural_measures` - measures attached to a terrain study
//! - `prior_opinions` - optional prior opinion per header
//!
//! The last four are written together, one transaction per commit, so a
//! failure anywhere leaves no partial aggregate behind.

pub mod catalog;
pub mod record;
pub mod schema;
pub mod stores;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::CoreError;

/// SQLite database for records, catalogs and geography
pub struct ViabilidadDb {
    conn: Mutex<Connection>,
}

impl ViabilidadDb {
    /// Open or create the registry database
    pub fn open(data_dir: &Path) -> Result<Self, CoreError> {
        let db_path = data_dir.join("viabilidad.db");
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| CoreError::Database(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent reads; child tables reference their parents
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| CoreError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        // Initialize schema
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Database(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| CoreError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("Lock poisoned: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(())
    }

    /// Run a read-only operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, CoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, CoreError> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, CoreError> {
                let n: i64 = conn
                    .query_row(sql, [], |row| row.get(0))
                    .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;
                Ok(n as u64)
            };

            Ok(DbStats {
                record_count: count("SELECT COUNT(*) FROM process_records")?,
                terrain_study_count: count("SELECT COUNT(*) FROM terrain_studies")?,
                measure_count: count("SELECT COUNT(*) FROM procedural_measures")?,
                opinion_count: count("SELECT COUNT(*) FROM prior_opinions")?,
                location_count: count("SELECT COUNT(*) FROM locations")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub record_count: u64,
    pub terrain_study_count: u64,
    pub measure_count: u64,
    pub opinion_count: u64,
    pub location_count: u64,
}

// Re-exports
pub use catalog::CatalogKind;
pub use stores::{SqliteLookupStore, SqliteRecordStore};
