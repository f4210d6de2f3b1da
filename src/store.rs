//! Storage collaborator contracts for the form controller
//!
//! The controller never talks to a database directly. It holds two injected
//! collaborators: a [`LookupStore`] for catalogs and the location chain, and
//! a [`RecordStore`] for transactional writes and the pick-list search.
//! Production wires the sqlite-backed implementations from [`crate::db`];
//! tests swap in whatever they need.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{
    CatalogOption, LocalityOption, LocationOption, LocationRow, Predio, PriorOpinion,
    ProceduralMeasure,
};

/// Fixed page size of the record search
pub const SEARCH_PAGE_SIZE: u32 = 5;

/// Prefix filters for the record search. At least one must be present;
/// filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub external_id: Option<String>,
    pub fmi: Option<String>,
    pub case_number: Option<String>,
}

impl SearchFilter {
    /// Whether every filter is absent or blank
    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map(str::trim).unwrap_or("").is_empty()
        }
        blank(&self.external_id) && blank(&self.fmi) && blank(&self.case_number)
    }
}

/// One row of the search pick list, newest records first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredioSummary {
    pub header_id: i64,
    pub external_id: String,
    pub fmi: String,
    pub case_number: Option<String>,
    pub viability: Option<String>,
}

/// Everything the persister writes in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct PredioAggregate {
    pub predio: Predio,
    /// Resolved location row backing the selected locality
    pub location_id: i64,
    pub measures: Vec<ProceduralMeasure>,
}

impl PredioAggregate {
    /// The prior-opinion child, present when the record flags one
    pub fn opinion(&self) -> Option<PriorOpinion> {
        self.predio.prior_opinion()
    }
}

/// Server-generated identifiers from one committed aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIds {
    pub header_id: i64,
    pub terrain_study_id: i64,
    /// One id per measure, in insertion order
    pub measure_ids: Vec<i64>,
    pub opinion_id: Option<i64>,
}

/// A persisted aggregate loaded back for editing
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPredio {
    pub header_id: i64,
    pub location_id: i64,
    pub predio: Predio,
    pub measures: Vec<ProceduralMeasure>,
}

/// Read-only catalog and location lookups
#[async_trait]
pub trait LookupStore: Send + Sync {
    async fn process_types(&self) -> Result<Vec<CatalogOption>, CoreError>;

    async fn process_sources(&self) -> Result<Vec<CatalogOption>, CoreError>;

    async fn process_stages(&self) -> Result<Vec<CatalogOption>, CoreError>;

    /// Distinct regions, ordered by name
    async fn regions(&self) -> Result<Vec<LocationOption>, CoreError>;

    /// Distinct sub-regions of one region, ordered by name
    async fn sub_regions(&self, region_code: i64) -> Result<Vec<LocationOption>, CoreError>;

    /// Localities of one sub-region, ordered by name
    async fn localities(
        &self,
        region_code: i64,
        sub_region_code: i64,
    ) -> Result<Vec<LocalityOption>, CoreError>;

    /// One location row by id, for rebuilding the cascade on edit
    async fn location(&self, id: i64) -> Result<Option<LocationRow>, CoreError>;
}

/// Transactional persistence and search for record aggregates
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write header, terrain study, measures and the optional opinion in one
    /// transaction. Nothing is left behind on failure.
    async fn create(&self, aggregate: &PredioAggregate) -> Result<GeneratedIds, CoreError>;

    /// Load one aggregate by header id
    async fn load(&self, header_id: i64) -> Result<Option<StoredPredio>, CoreError>;

    /// Prefix search over identifier, FMI and case number. Rejects an empty
    /// filter; returns at most [`SEARCH_PAGE_SIZE`] rows, newest first.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<PredioSummary>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_count_as_empty() {
        assert!(SearchFilter::default().is_empty());
        assert!(SearchFilter {
            external_id: Some("   ".to_string()),
            fmi: Some(String::new()),
            case_number: None,
        }
        .is_empty());
        assert!(!SearchFilter {
            fmi: Some("060".to_string()),
            ..SearchFilter::default()
        }
        .is_empty());
    }
}
