//! Record state controller
//!
//! Owns the record under edit, its pending measures, the cascading location
//! selection and the error map, and orchestrates the two storage
//! collaborators around them. The UI layer never mutates the record
//! directly: every change arrives as a [`FieldPatch`], every consequence
//! (re-validation, list reloads, events) happens here.
//!
//! Mode machine: `Idle` until a record is started or loaded, `New` for a
//! fresh record, `Edit` for a loaded one. Entering a mode captures a
//! backup; `cancel` restores it. Every bulk replacement of the record
//! (start, cancel, load) ends with a full validation pass. A successful
//! commit clears the form and re-enters `New`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cascade::{CascadeLevel, CascadeState, SelectOutcome};
use crate::error::CoreError;
use crate::events::{EventBus, FormEvent};
use crate::model::{
    Catalogs, Field, FieldPatch, LocalityOption, LocationOption, Predio, ProceduralMeasure,
};
use crate::store::{
    GeneratedIds, LookupStore, PredioAggregate, PredioSummary, RecordStore, SearchFilter,
};
use crate::validation::{self, ErrorMap, Validator};

/// Where the form is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormMode {
    /// No record under edit, fields disabled
    #[default]
    Idle,
    /// Editing a fresh record
    New,
    /// Editing a loaded record
    Edit,
}

/// Snapshot taken on mode entry, restored by `cancel`
struct FormBackup {
    mode: FormMode,
    predio: Predio,
    measures: Vec<ProceduralMeasure>,
    cascade: CascadeState,
    edit_header_id: Option<i64>,
}

/// The form state engine
pub struct PredioForm {
    lookups: Arc<dyn LookupStore>,
    records: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
    validator: Validator,

    mode: FormMode,
    predio: Predio,
    measures: Vec<ProceduralMeasure>,
    cascade: CascadeState,
    errors: ErrorMap,
    catalogs: Catalogs,
    backup: Option<FormBackup>,
    edit_header_id: Option<i64>,
    busy: bool,
}

impl PredioForm {
    pub fn new(
        lookups: Arc<dyn LookupStore>,
        records: Arc<dyn RecordStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            lookups,
            records,
            events,
            validator: Validator::new(),
            mode: FormMode::Idle,
            predio: Predio::default(),
            measures: Vec::new(),
            cascade: CascadeState::new(),
            errors: ErrorMap::new(),
            catalogs: Catalogs::default(),
            backup: None,
            edit_header_id: None,
            busy: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn predio(&self) -> &Predio {
        &self.predio
    }

    pub fn measures(&self) -> &[ProceduralMeasure] {
        &self.measures
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn cascade(&self) -> &CascadeState {
        &self.cascade
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Header id of the record loaded for editing, if any
    pub fn edit_header_id(&self) -> Option<i64> {
        self.edit_header_id
    }

    fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::New | FormMode::Edit)
    }

    // =========================================================================
    // Session setup
    // =========================================================================

    /// Load the three process catalogs and the region list. Called once per
    /// session, before the first record is started.
    pub async fn load_catalogs(&mut self) -> Result<(), CoreError> {
        let process_types = self.lookups.process_types().await?;
        let process_sources = self.lookups.process_sources().await?;
        let process_stages = self.lookups.process_stages().await?;
        let regions = self.lookups.regions().await?;

        self.events.emit(FormEvent::CatalogsLoaded {
            process_types: process_types.len(),
            process_sources: process_sources.len(),
            process_stages: process_stages.len(),
            regions: regions.len(),
        });

        self.catalogs = Catalogs {
            process_types,
            process_sources,
            process_stages,
        };
        self.cascade.set_regions(regions);
        self.events.emit(FormEvent::CascadeChanged {
            level: CascadeLevel::Region,
        });
        Ok(())
    }

    // =========================================================================
    // Mode transitions
    // =========================================================================

    /// Start a fresh record, backing up whatever was on the form. The
    /// blank record is validated right away, so its findings are on the
    /// map before the first keystroke.
    pub fn start_new(&mut self) {
        self.backup = Some(self.capture());
        self.predio = Predio::default();
        self.measures.clear();
        self.cascade.clear_selection();
        self.edit_header_id = None;
        self.mode = FormMode::New;
        debug!("Form entered new mode");
        self.events.emit(FormEvent::ModeChanged {
            mode: FormMode::New,
        });
        self.validate_all();
    }

    /// Load a stored record for editing and rebuild the cascade from its
    /// location row
    pub async fn load_for_edit(&mut self, header_id: i64) -> Result<(), CoreError> {
        if self.busy {
            return Err(CoreError::Busy);
        }
        let stored = self
            .records
            .load(header_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("record {}", header_id)))?;
        let location = self
            .lookups
            .location(stored.location_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("location {}", stored.location_id)))?;

        self.backup = Some(self.capture());
        self.mode = FormMode::Edit;
        self.predio = stored.predio;
        self.measures = stored.measures;
        self.edit_header_id = Some(stored.header_id);
        self.errors.clear();
        debug!(header_id, "Form entered edit mode");
        self.events.emit(FormEvent::ModeChanged {
            mode: FormMode::Edit,
        });

        // Walk the chain top-down so each dependent list is fetched fresh
        self.select_region(Some(LocationOption {
            code: location.region_code,
            name: location.region_name.clone(),
        }))
        .await?;
        self.select_sub_region(Some(LocationOption {
            code: location.sub_region_code,
            name: location.sub_region_name.clone(),
        }))
        .await?;
        self.select_locality(Some(LocalityOption {
            code: location.locality_code,
            name: location.locality_name,
            location_id: location.id,
        }));

        self.validate_all();
        Ok(())
    }

    /// Restore the backup captured on the last mode entry, discarding every
    /// in-progress edit. Storage is never touched; the restored record goes
    /// through a full validation pass.
    pub fn cancel(&mut self) {
        let Some(backup) = self.backup.take() else {
            return;
        };
        self.mode = backup.mode;
        self.predio = backup.predio;
        self.measures = backup.measures;
        self.cascade = backup.cascade;
        // a fetch started before the restore must not land on it
        self.cascade.invalidate_pending();
        self.edit_header_id = backup.edit_header_id;
        debug!(mode = ?self.mode, "Form edits cancelled");
        self.events.emit(FormEvent::ModeChanged { mode: self.mode });
        self.validate_all();
    }

    fn capture(&self) -> FormBackup {
        FormBackup {
            mode: self.mode,
            predio: self.predio.clone(),
            measures: self.measures.clone(),
            cascade: self.cascade.clone(),
            edit_header_id: self.edit_header_id,
        }
    }

    // =========================================================================
    // Mutation and validation
    // =========================================================================

    /// Apply one field patch. Returns the changed field, or `None` when the
    /// form is idle and the patch was ignored. Fields with rules are
    /// re-validated immediately; the rest wait for the next full pass.
    pub fn apply(&mut self, patch: FieldPatch) -> Option<Field> {
        if !self.is_editing() {
            return None;
        }
        let field = self.predio.apply(patch);
        self.events.emit(FormEvent::FieldChanged { field });
        if let Some(codes) =
            self.validator
                .validate_field(field, &self.predio, self.cascade.selection())
        {
            self.errors.set(field, codes);
            self.events.emit(FormEvent::ErrorsChanged { field: Some(field) });
        }
        Some(field)
    }

    /// Run every rule and replace the whole error map
    pub fn validate_all(&mut self) {
        self.errors = self
            .validator
            .validate_all(&self.predio, self.cascade.selection());
        self.events.emit(FormEvent::ErrorsChanged { field: None });
    }

    fn revalidate_location(&mut self) {
        if let Some(codes) =
            self.validator
                .validate_field(Field::Location, &self.predio, self.cascade.selection())
        {
            if self.errors.of(Field::Location) != codes.as_slice() {
                self.errors.set(Field::Location, codes);
                self.events.emit(FormEvent::ErrorsChanged {
                    field: Some(Field::Location),
                });
            }
        }
    }

    // =========================================================================
    // Cascade selection
    // =========================================================================

    /// Select a region. Dependent selections and lists are cleared before
    /// the sub-region fetch starts; a stale fetch result is discarded.
    pub async fn select_region(&mut self, region: Option<LocationOption>) -> Result<(), CoreError> {
        if !self.is_editing() {
            return Ok(());
        }
        match self.cascade.select_region(region) {
            SelectOutcome::Unchanged => Ok(()),
            SelectOutcome::Cleared => {
                self.revalidate_location();
                self.events.emit(FormEvent::CascadeChanged {
                    level: CascadeLevel::Region,
                });
                Ok(())
            }
            SelectOutcome::Fetch(ticket) => {
                self.revalidate_location();
                self.events.emit(FormEvent::CascadeChanged {
                    level: CascadeLevel::Region,
                });
                match self.lookups.sub_regions(ticket.region_code).await {
                    Ok(rows) => {
                        if self.cascade.apply_sub_regions(&ticket, rows) {
                            self.events.emit(FormEvent::CascadeChanged {
                                level: CascadeLevel::SubRegion,
                            });
                        } else {
                            debug!(region = ticket.region_code, "Discarded stale sub-region fetch");
                        }
                        self.revalidate_location();
                        Ok(())
                    }
                    Err(e) => {
                        warn!(region = ticket.region_code, error = %e, "Sub-region fetch failed");
                        Err(e)
                    }
                }
            }
        }
    }

    /// Select a sub-region under the current region
    pub async fn select_sub_region(
        &mut self,
        sub_region: Option<LocationOption>,
    ) -> Result<(), CoreError> {
        if !self.is_editing() {
            return Ok(());
        }
        match self.cascade.select_sub_region(sub_region) {
            SelectOutcome::Unchanged => Ok(()),
            SelectOutcome::Cleared => {
                self.revalidate_location();
                self.events.emit(FormEvent::CascadeChanged {
                    level: CascadeLevel::SubRegion,
                });
                Ok(())
            }
            SelectOutcome::Fetch(ticket) => {
                self.revalidate_location();
                self.events.emit(FormEvent::CascadeChanged {
                    level: CascadeLevel::SubRegion,
                });
                let sub_region_code = ticket.sub_region_code.unwrap_or_default();
                match self
                    .lookups
                    .localities(ticket.region_code, sub_region_code)
                    .await
                {
                    Ok(rows) => {
                        if self.cascade.apply_localities(&ticket, rows) {
                            self.events.emit(FormEvent::CascadeChanged {
                                level: CascadeLevel::Locality,
                            });
                        } else {
                            debug!(
                                region = ticket.region_code,
                                sub_region = sub_region_code,
                                "Discarded stale locality fetch"
                            );
                        }
                        self.revalidate_location();
                        Ok(())
                    }
                    Err(e) => {
                        warn!(
                            region = ticket.region_code,
                            sub_region = sub_region_code,
                            error = %e,
                            "Locality fetch failed"
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    /// Select a locality from the loaded list
    pub fn select_locality(&mut self, locality: Option<LocalityOption>) {
        if !self.is_editing() {
            return;
        }
        if self.cascade.select_locality(locality) {
            self.revalidate_location();
            self.events.emit(FormEvent::CascadeChanged {
                level: CascadeLevel::Locality,
            });
        }
    }

    // =========================================================================
    // Measures
    // =========================================================================

    /// Add a measure to the pending aggregate. Rejected measures never join
    /// the record's error map; the findings come back in the error message.
    pub fn add_measure(&mut self, measure: ProceduralMeasure) -> Result<(), CoreError> {
        if !self.is_editing() {
            return Err(CoreError::NoActiveRecord);
        }
        let findings = validation::check_measure(&measure);
        if !findings.is_empty() {
            let detail = findings
                .iter()
                .map(|(field, code)| format!("{}: {}", field.key(), code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CoreError::InvalidInput(detail));
        }
        self.measures.push(measure);
        self.events.emit(FormEvent::MeasuresChanged {
            count: self.measures.len(),
        });
        Ok(())
    }

    /// Remove a pending measure by position
    pub fn remove_measure(&mut self, index: usize) -> Option<ProceduralMeasure> {
        if !self.is_editing() || index >= self.measures.len() {
            return None;
        }
        let removed = self.measures.remove(index);
        self.events.emit(FormEvent::MeasuresChanged {
            count: self.measures.len(),
        });
        Some(removed)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Cheap gate for the commit action: the minimum-required fields are
    /// filled and the location chain is resolved. Recomputed on demand,
    /// independent of the error map.
    pub fn can_commit(&self) -> bool {
        if self.busy || !self.is_editing() {
            return false;
        }
        let area_ok = |area: Option<f64>| matches!(area, Some(v) if v >= 0.0);
        let selected = |id: Option<i64>| matches!(id, Some(v) if v > 0);
        let p = &self.predio;
        !p.external_id.trim().is_empty()
            && !p.fmi.trim().is_empty()
            && selected(p.process_source_id)
            && selected(p.process_type_id)
            && selected(p.process_stage_id)
            && area_ok(p.registered_area)
            && area_ok(p.calculated_area)
            && self.cascade.location_id().is_some()
    }

    /// Validate everything, then write the aggregate in one transaction.
    /// On success the form clears and re-enters `New`; on failure it stays
    /// where it was, with errors surfaced.
    pub async fn commit(&mut self) -> Result<GeneratedIds, CoreError> {
        if self.busy {
            return Err(CoreError::Busy);
        }
        if !self.is_editing() {
            return Err(CoreError::NoActiveRecord);
        }

        self.validate_all();
        if self.errors.has_errors() {
            debug!(fields = self.errors.len(), "Commit blocked by validation");
            return Err(CoreError::ValidationFailed);
        }
        let location_id = self.cascade.location_id().ok_or_else(|| {
            CoreError::Internal("location validated as complete but id is missing".to_string())
        })?;

        let aggregate = PredioAggregate {
            predio: self.predio.clone(),
            location_id,
            measures: self.measures.clone(),
        };

        self.busy = true;
        self.events.emit(FormEvent::BusyChanged { busy: true });

        let result = self.records.create(&aggregate).await;

        self.busy = false;
        self.events.emit(FormEvent::BusyChanged { busy: false });

        match result {
            Ok(ids) => {
                info!(
                    header_id = ids.header_id,
                    terrain_study_id = ids.terrain_study_id,
                    measures = ids.measure_ids.len(),
                    "Record committed"
                );
                self.events.emit(FormEvent::Committed {
                    header_id: ids.header_id,
                    terrain_study_id: ids.terrain_study_id,
                    measures: ids.measure_ids.len(),
                    opinion: ids.opinion_id.is_some(),
                });
                self.start_new();
                Ok(ids)
            }
            Err(e) => {
                warn!(error = %e, "Commit failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Prefix search for the pick list. At least one filter must be present.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<PredioSummary>, CoreError> {
        self.records.search(filter).await
    }
}
