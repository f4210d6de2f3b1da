//! Sqlite-backed implementations of the storage collaborators
//!
//! Thin adapters from the async trait contracts onto the synchronous
//! connection wrapper. Read failures surface as lookup errors and write
//! failures as persistence errors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::{catalog, record, CatalogKind, ViabilidadDb};
use crate::error::CoreError;
use crate::model::{CatalogOption, LocalityOption, LocationOption, LocationRow};
use crate::store::{
    GeneratedIds, LookupStore, PredioAggregate, PredioSummary, RecordStore, SearchFilter,
    StoredPredio,
};

/// Catalog and location lookups against the registry database
#[derive(Clone)]
pub struct SqliteLookupStore {
    db: Arc<ViabilidadDb>,
}

impl SqliteLookupStore {
    pub fn new(db: Arc<ViabilidadDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LookupStore for SqliteLookupStore {
    async fn process_types(&self) -> Result<Vec<CatalogOption>, CoreError> {
        self.db
            .with_conn(|conn| catalog::list_catalog(conn, CatalogKind::ProcessType))
            .map_err(CoreError::into_lookup)
    }

    async fn process_sources(&self) -> Result<Vec<CatalogOption>, CoreError> {
        self.db
            .with_conn(|conn| catalog::list_catalog(conn, CatalogKind::ProcessSource))
            .map_err(CoreError::into_lookup)
    }

    async fn process_stages(&self) -> Result<Vec<CatalogOption>, CoreError> {
        self.db
            .with_conn(|conn| catalog::list_catalog(conn, CatalogKind::ProcessStage))
            .map_err(CoreError::into_lookup)
    }

    async fn regions(&self) -> Result<Vec<LocationOption>, CoreError> {
        self.db
            .with_conn(catalog::list_regions)
            .map_err(CoreError::into_lookup)
    }

    async fn sub_regions(&self, region_code: i64) -> Result<Vec<LocationOption>, CoreError> {
        self.db
            .with_conn(|conn| catalog::list_sub_regions(conn, region_code))
            .map_err(CoreError::into_lookup)
    }

    async fn localities(
        &self,
        region_code: i64,
        sub_region_code: i64,
    ) -> Result<Vec<LocalityOption>, CoreError> {
        self.db
            .with_conn(|conn| catalog::list_localities(conn, region_code, sub_region_code))
            .map_err(CoreError::into_lookup)
    }

    async fn location(&self, id: i64) -> Result<Option<LocationRow>, CoreError> {
        self.db
            .with_conn(|conn| catalog::get_location(conn, id))
            .map_err(CoreError::into_lookup)
    }
}

/// Transactional record persistence against the registry database
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Arc<ViabilidadDb>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<ViabilidadDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, aggregate: &PredioAggregate) -> Result<GeneratedIds, CoreError> {
        self.db
            .with_conn_mut(|conn| record::create_aggregate(conn, aggregate))
            .map_err(CoreError::into_persistence)
    }

    async fn load(&self, header_id: i64) -> Result<Option<StoredPredio>, CoreError> {
        self.db
            .with_conn(|conn| record::load_aggregate(conn, header_id))
            .map_err(CoreError::into_lookup)
    }

    async fn search(&self, filter: &SearchFilter) -> Result<Vec<PredioSummary>, CoreError> {
        self.db
            .with_conn(|conn| record::search_records(conn, filter))
            .map_err(CoreError::into_lookup)
    }
}
