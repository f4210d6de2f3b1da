//! Domain model for land-parcel legal-viability records
//!
//! A `Predio` is the aggregate under edit: identification of the parcel,
//! catalog references for the originating process, terrain facts, titling
//! history, encumbrance flags with their annotations, and the legal-opinion
//! block. Procedural measures and the optional prior opinion are children
//! persisted together with the record in one transaction.
//!
//! Mutation goes through [`FieldPatch`]: one variant per editable field, so
//! every change names the field it touched and the form controller can
//! re-validate and notify precisely.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Field bounds (mirrored by CHECK constraints in the schema)
// ============================================================================

/// Maximum length of the external parcel identifier
pub const EXTERNAL_ID_MAX: usize = 30;
/// Maximum length of the property registration number (FMI)
pub const FMI_MAX: usize = 100;
/// Maximum length of a procedural measure purpose
pub const MEASURE_PURPOSE_MAX: usize = 1000;
/// Maximum length of a procedural measure code
pub const MEASURE_CODE_MAX: usize = 10;
/// Maximum length of a procedural measure annotation
pub const MEASURE_NOTE_MAX: usize = 4000;

// ============================================================================
// Catalog and location rows
// ============================================================================

/// One selectable catalog entry (process type, source or stage)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub id: i64,
    pub name: String,
}

/// Snapshot of the three process catalogs, loaded once per session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    pub process_types: Vec<CatalogOption>,
    pub process_sources: Vec<CatalogOption>,
    pub process_stages: Vec<CatalogOption>,
}

/// One selectable entry at the region or sub-region level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOption {
    pub code: i64,
    pub name: String,
}

/// One selectable locality, carrying the id of its backing location row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityOption {
    pub code: i64,
    pub name: String,
    pub location_id: i64,
}

/// Fully resolved location row from the denormalized geography table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub id: i64,
    pub region_code: i64,
    pub region_name: String,
    pub sub_region_code: i64,
    pub sub_region_name: String,
    pub locality_code: i64,
    pub locality_name: String,
    /// Settlement kind, e.g. urban or rural
    #[serde(default)]
    pub kind: String,
}

// ============================================================================
// The Predio aggregate root
// ============================================================================

/// Land-parcel legal-viability record under edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predio {
    // Identification
    pub external_id: String,
    pub fmi: String,
    pub case_number: Option<String>,

    // Originating process (catalog references)
    pub process_source_id: Option<i64>,
    pub process_type_id: Option<i64>,
    pub process_stage_id: Option<i64>,

    // Document routing
    pub routing_code: Option<String>,
    pub office: Option<String>,

    // Terrain
    pub registry_circle: Option<String>,
    pub registered_area: Option<f64>,
    pub calculated_area: Option<f64>,

    // Titling
    pub titleholder_kind: Option<String>,
    pub owner_names: Option<String>,
    pub owner_id_number: Option<String>,
    pub original_title: Option<String>,
    pub last_transfer_analysis: Option<String>,

    // Encumbrances, each flag paired with a free-text annotation
    pub mortgage: bool,
    pub mortgage_note: Option<String>,
    pub easements: bool,
    pub easements_note: Option<String>,
    pub precautionary_measures: bool,
    pub precautionary_note: Option<String>,

    // Registries and competing processes
    pub displacement_registry: bool,
    pub displacement_note: Option<String>,
    pub collective_claim: Option<String>,
    pub land_restitution: bool,
    pub land_restitution_note: Option<String>,
    pub other_entity_offer: bool,
    pub other_entity_offer_note: Option<String>,
    pub clarification_process: bool,
    pub clarification_note: Option<String>,

    // Legal opinion
    pub has_prior_opinion: bool,
    pub prior_opinion_date: Option<NaiveDate>,
    pub prior_opinion_text: Option<String>,
    pub final_analysis: Option<String>,
    pub report_date: Option<NaiveDate>,
    pub viability: Option<String>,
    pub report_kind: Option<String>,
    pub non_viability_cause: Option<String>,
    pub pending_inputs: Option<String>,
}

/// Procedural measure attached to the terrain study
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceduralMeasure {
    pub purpose: String,
    pub code: String,
    pub note: Option<String>,
    pub tag: Option<String>,
}

/// Prior legal opinion, derived from the record when its flag is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorOpinion {
    pub report_date: Option<NaiveDate>,
    pub narrative: Option<String>,
}

// ============================================================================
// Field identifiers
// ============================================================================

/// Stable identifier for every editable field, plus the location selection
/// and measure fields. Error maps are keyed by these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ExternalId,
    Fmi,
    CaseNumber,
    ProcessSource,
    ProcessType,
    ProcessStage,
    RoutingCode,
    Office,
    RegistryCircle,
    RegisteredArea,
    CalculatedArea,
    TitleholderKind,
    OwnerNames,
    OwnerIdNumber,
    OriginalTitle,
    LastTransferAnalysis,
    Mortgage,
    MortgageNote,
    Easements,
    EasementsNote,
    PrecautionaryMeasures,
    PrecautionaryNote,
    DisplacementRegistry,
    DisplacementNote,
    CollectiveClaim,
    LandRestitution,
    LandRestitutionNote,
    OtherEntityOffer,
    OtherEntityOfferNote,
    ClarificationProcess,
    ClarificationNote,
    HasPriorOpinion,
    PriorOpinionDate,
    PriorOpinionText,
    FinalAnalysis,
    ReportDate,
    Viability,
    ReportKind,
    NonViabilityCause,
    PendingInputs,
    /// The three-level location selection as a whole
    Location,
    /// Purpose of a measure being added
    MeasurePurpose,
    /// Code of a measure being added
    MeasureCode,
    /// Annotation of a measure being added
    MeasureNote,
}

impl Field {
    /// Namespaced key for logs and error listings
    pub fn key(&self) -> &'static str {
        match self {
            Field::ExternalId => "predio.external_id",
            Field::Fmi => "predio.fmi",
            Field::CaseNumber => "predio.case_number",
            Field::ProcessSource => "predio.process_source",
            Field::ProcessType => "predio.process_type",
            Field::ProcessStage => "predio.process_stage",
            Field::RoutingCode => "predio.routing_code",
            Field::Office => "predio.office",
            Field::RegistryCircle => "predio.registry_circle",
            Field::RegisteredArea => "predio.registered_area",
            Field::CalculatedArea => "predio.calculated_area",
            Field::TitleholderKind => "predio.titleholder_kind",
            Field::OwnerNames => "predio.owner_names",
            Field::OwnerIdNumber => "predio.owner_id_number",
            Field::OriginalTitle => "predio.original_title",
            Field::LastTransferAnalysis => "predio.last_transfer_analysis",
            Field::Mortgage => "predio.mortgage",
            Field::MortgageNote => "predio.mortgage_note",
            Field::Easements => "predio.easements",
            Field::EasementsNote => "predio.easements_note",
            Field::PrecautionaryMeasures => "predio.precautionary_measures",
            Field::PrecautionaryNote => "predio.precautionary_note",
            Field::DisplacementRegistry => "predio.displacement_registry",
            Field::DisplacementNote => "predio.displacement_note",
            Field::CollectiveClaim => "predio.collective_claim",
            Field::LandRestitution => "predio.land_restitution",
            Field::LandRestitutionNote => "predio.land_restitution_note",
            Field::OtherEntityOffer => "predio.other_entity_offer",
            Field::OtherEntityOfferNote => "predio.other_entity_offer_note",
            Field::ClarificationProcess => "predio.clarification_process",
            Field::ClarificationNote => "predio.clarification_note",
            Field::HasPriorOpinion => "predio.has_prior_opinion",
            Field::PriorOpinionDate => "predio.prior_opinion_date",
            Field::PriorOpinionText => "predio.prior_opinion_text",
            Field::FinalAnalysis => "predio.final_analysis",
            Field::ReportDate => "predio.report_date",
            Field::Viability => "predio.viability",
            Field::ReportKind => "predio.report_kind",
            Field::NonViabilityCause => "predio.non_viability_cause",
            Field::PendingInputs => "predio.pending_inputs",
            Field::Location => "location.selection",
            Field::MeasurePurpose => "measure.purpose",
            Field::MeasureCode => "measure.code",
            Field::MeasureNote => "measure.note",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Typed mutation interface
// ============================================================================

/// One mutation of the record under edit. Applying a patch reports the
/// [`Field`] it changed so callers can re-validate and emit change events.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    ExternalId(String),
    Fmi(String),
    CaseNumber(Option<String>),
    ProcessSource(Option<i64>),
    ProcessType(Option<i64>),
    ProcessStage(Option<i64>),
    RoutingCode(Option<String>),
    Office(Option<String>),
    RegistryCircle(Option<String>),
    RegisteredArea(Option<f64>),
    CalculatedArea(Option<f64>),
    TitleholderKind(Option<String>),
    OwnerNames(Option<String>),
    OwnerIdNumber(Option<String>),
    OriginalTitle(Option<String>),
    LastTransferAnalysis(Option<String>),
    Mortgage(bool),
    MortgageNote(Option<String>),
    Easements(bool),
    EasementsNote(Option<String>),
    PrecautionaryMeasures(bool),
    PrecautionaryNote(Option<String>),
    DisplacementRegistry(bool),
    DisplacementNote(Option<String>),
    CollectiveClaim(Option<String>),
    LandRestitution(bool),
    LandRestitutionNote(Option<String>),
    OtherEntityOffer(bool),
    OtherEntityOfferNote(Option<String>),
    ClarificationProcess(bool),
    ClarificationNote(Option<String>),
    HasPriorOpinion(bool),
    PriorOpinionDate(Option<NaiveDate>),
    PriorOpinionText(Option<String>),
    FinalAnalysis(Option<String>),
    ReportDate(Option<NaiveDate>),
    Viability(Option<String>),
    ReportKind(Option<String>),
    NonViabilityCause(Option<String>),
    PendingInputs(Option<String>),
}

impl Predio {
    /// Apply a patch and return the field it changed
    pub fn apply(&mut self, patch: FieldPatch) -> Field {
        match patch {
            FieldPatch::ExternalId(v) => {
                self.external_id = v;
                Field::ExternalId
            }
            FieldPatch::Fmi(v) => {
                self.fmi = v;
                Field::Fmi
            }
            FieldPatch::CaseNumber(v) => {
                self.case_number = v;
                Field::CaseNumber
            }
            FieldPatch::ProcessSource(v) => {
                self.process_source_id = v;
                Field::ProcessSource
            }
            FieldPatch::ProcessType(v) => {
                self.process_type_id = v;
                Field::ProcessType
            }
            FieldPatch::ProcessStage(v) => {
                self.process_stage_id = v;
                Field::ProcessStage
            }
            FieldPatch::RoutingCode(v) => {
                self.routing_code = v;
                Field::RoutingCode
            }
            FieldPatch::Office(v) => {
                self.office = v;
                Field::Office
            }
            FieldPatch::RegistryCircle(v) => {
                self.registry_circle = v;
                Field::RegistryCircle
            }
            FieldPatch::RegisteredArea(v) => {
                self.registered_area = v;
                Field::RegisteredArea
            }
            FieldPatch::CalculatedArea(v) => {
                self.calculated_area = v;
                Field::CalculatedArea
            }
            FieldPatch::TitleholderKind(v) => {
                self.titleholder_kind = v;
                Field::TitleholderKind
            }
            FieldPatch::OwnerNames(v) => {
                self.owner_names = v;
                Field::OwnerNames
            }
            FieldPatch::OwnerIdNumber(v) => {
                self.owner_id_number = v;
                Field::OwnerIdNumber
            }
            FieldPatch::OriginalTitle(v) => {
                self.original_title = v;
                Field::OriginalTitle
            }
            FieldPatch::LastTransferAnalysis(v) => {
                self.last_transfer_analysis = v;
                Field::LastTransferAnalysis
            }
            FieldPatch::Mortgage(v) => {
                self.mortgage = v;
                Field::Mortgage
            }
            FieldPatch::MortgageNote(v) => {
                self.mortgage_note = v;
                Field::MortgageNote
            }
            FieldPatch::Easements(v) => {
                self.easements = v;
                Field::Easements
            }
            FieldPatch::EasementsNote(v) => {
                self.easements_note = v;
                Field::EasementsNote
            }
            FieldPatch::PrecautionaryMeasures(v) => {
                self.precautionary_measures = v;
                Field::PrecautionaryMeasures
            }
            FieldPatch::PrecautionaryNote(v) => {
                self.precautionary_note = v;
                Field::PrecautionaryNote
            }
            FieldPatch::DisplacementRegistry(v) => {
                self.displacement_registry = v;
                Field::DisplacementRegistry
            }
            FieldPatch::DisplacementNote(v) => {
                self.displacement_note = v;
                Field::DisplacementNote
            }
            FieldPatch::CollectiveClaim(v) => {
                self.collective_claim = v;
                Field::CollectiveClaim
            }
            FieldPatch::LandRestitution(v) => {
                self.land_restitution = v;
                Field::LandRestitution
            }
            FieldPatch::LandRestitutionNote(v) => {
                self.land_restitution_note = v;
                Field::LandRestitutionNote
            }
            FieldPatch::OtherEntityOffer(v) => {
                self.other_entity_offer = v;
                Field::OtherEntityOffer
            }
            FieldPatch::OtherEntityOfferNote(v) => {
                self.other_entity_offer_note = v;
                Field::OtherEntityOfferNote
            }
            FieldPatch::ClarificationProcess(v) => {
                self.clarification_process = v;
                Field::ClarificationProcess
            }
            FieldPatch::ClarificationNote(v) => {
                self.clarification_note = v;
                Field::ClarificationNote
            }
            FieldPatch::HasPriorOpinion(v) => {
                self.has_prior_opinion = v;
                Field::HasPriorOpinion
            }
            FieldPatch::PriorOpinionDate(v) => {
                self.prior_opinion_date = v;
                Field::PriorOpinionDate
            }
            FieldPatch::PriorOpinionText(v) => {
                self.prior_opinion_text = v;
                Field::PriorOpinionText
            }
            FieldPatch::FinalAnalysis(v) => {
                self.final_analysis = v;
                Field::FinalAnalysis
            }
            FieldPatch::ReportDate(v) => {
                self.report_date = v;
                Field::ReportDate
            }
            FieldPatch::Viability(v) => {
                self.viability = v;
                Field::Viability
            }
            FieldPatch::ReportKind(v) => {
                self.report_kind = v;
                Field::ReportKind
            }
            FieldPatch::NonViabilityCause(v) => {
                self.non_viability_cause = v;
                Field::NonViabilityCause
            }
            FieldPatch::PendingInputs(v) => {
                self.pending_inputs = v;
                Field::PendingInputs
            }
        }
    }

    /// Build the prior-opinion child when the record flags one
    pub fn prior_opinion(&self) -> Option<PriorOpinion> {
        if self.has_prior_opinion {
            Some(PriorOpinion {
                report_date: self.prior_opinion_date,
                narrative: self.prior_opinion_text.clone(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reports_the_changed_field() {
        let mut predio = Predio::default();
        let field = predio.apply(FieldPatch::Fmi("060-12345".to_string()));
        assert_eq!(field, Field::Fmi);
        assert_eq!(predio.fmi, "060-12345");

        let field = predio.apply(FieldPatch::RegisteredArea(Some(12.5)));
        assert_eq!(field, Field::RegisteredArea);
        assert_eq!(predio.registered_area, Some(12.5));
    }

    #[test]
    fn prior_opinion_follows_the_flag() {
        let mut predio = Predio::default();
        predio.prior_opinion_text = Some("favorable".to_string());
        assert!(predio.prior_opinion().is_none());

        predio.has_prior_opinion = true;
        let opinion = predio.prior_opinion().unwrap();
        assert_eq!(opinion.narrative.as_deref(), Some("favorable"));
        assert!(opinion.report_date.is_none());
    }

    #[test]
    fn field_keys_are_namespaced() {
        assert_eq!(Field::ExternalId.key(), "predio.external_id");
        assert_eq!(Field::Location.key(), "location.selection");
        assert_eq!(Field::MeasureCode.key(), "measure.code");
    }
}
