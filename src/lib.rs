//! predios-core - Form state engine for land-parcel legal-viability records
//!
//! Data-entry backend for Predio records: one record per parcel under
//! review, validated field by field, located through a cascading
//! region / sub-region / locality selection, and committed as a four-table
//! aggregate in one transaction.
//!
//! ## Architecture
//!
//! - **[`form::PredioForm`]**: the state controller. Owns the record under
//!   edit, applies [`model::FieldPatch`] mutations, re-validates, gates the
//!   commit, and emits [`events::FormEvent`]s for the UI layer.
//! - **[`validation`]**: pure rules keyed by [`model::Field`], findings
//!   collected in a [`validation::ErrorMap`]. Never throws; callers read
//!   the map.
//! - **[`cascade`]**: the three-level location chain with epoch-guarded
//!   fetch tickets, so a stale dropdown reload can never clobber a newer
//!   selection.
//! - **[`store`]**: async collaborator traits. [`db`] provides the
//!   sqlite-backed implementations.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/predios-core/
//! ├── viabilidad.db          # Records, catalogs and geography
//! └── config.toml            # Configuration
//! ```

pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod form;
pub mod model;
pub mod seed;
pub mod store;
pub mod validation;

// Re-exports
pub use cascade::{CascadeLevel, CascadeSelection, CascadeState, FetchTicket, SelectOutcome};
pub use config::Config;
pub use db::{SqliteLookupStore, SqliteRecordStore, ViabilidadDb};
pub use error::CoreError;
pub use events::{EventBus, EventListener, FormEvent, LoggingEventListener};
pub use form::{FormMode, PredioForm};
pub use model::{
    CatalogOption, Catalogs, Field, FieldPatch, LocalityOption, LocationOption, LocationRow,
    Predio, PriorOpinion, ProceduralMeasure,
};
pub use seed::{apply_seed, SeedFile, SeedSummary};
pub use store::{
    GeneratedIds, LookupStore, PredioAggregate, PredioSummary, RecordStore, SearchFilter,
    StoredPredio, SEARCH_PAGE_SIZE,
};
pub use validation::{ErrorMap, ValidationCode, Validator};
