//! Field validation for the record under edit
//!
//! Validation never fails a call: rules produce [`ValidationCode`] findings
//! that land in an [`ErrorMap`], and callers read the map to gate the commit
//! action. Re-running a rule replaces that field's findings wholesale, so
//! validating twice in a row always yields the same map.
//!
//! The [`Validator`] holds an explicit table from [`Field`] to rule function.
//! Fields without an entry carry no rules and are skipped on mutation; the
//! full pass simply runs every entry in the table.

use std::collections::BTreeMap;
use std::fmt;

use crate::cascade::CascadeSelection;
use crate::model::{
    Field, Predio, ProceduralMeasure, EXTERNAL_ID_MAX, FMI_MAX, MEASURE_CODE_MAX,
    MEASURE_NOTE_MAX, MEASURE_PURPOSE_MAX,
};

// ============================================================================
// Finding codes
// ============================================================================

/// Stable code for one validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationCode {
    /// Required value is absent or blank
    Required,
    /// Value exceeds the field's maximum length
    TooLong,
    /// Value does not match the field's expected shape
    InvalidFormat,
    /// Numeric value is below zero
    Negative,
    /// Catalog dropdown has no selection
    NotSelected,
    /// The three-level location chain is not fully resolved
    IncompleteLocation,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationCode::Required => "value is required",
            ValidationCode::TooLong => "value exceeds the maximum length",
            ValidationCode::InvalidFormat => "value has an invalid format",
            ValidationCode::Negative => "value must not be negative",
            ValidationCode::NotSelected => "no option selected",
            ValidationCode::IncompleteLocation => "location selection is incomplete",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Error map
// ============================================================================

/// Findings per field, keyed by [`Field`]. Setting a field's findings
/// replaces whatever was there; an empty finding list removes the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    entries: BTreeMap<Field, Vec<ValidationCode>>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the findings for one field wholesale
    pub fn set(&mut self, field: Field, codes: Vec<ValidationCode>) {
        let mut distinct: Vec<ValidationCode> = Vec::with_capacity(codes.len());
        for code in codes {
            if !distinct.contains(&code) {
                distinct.push(code);
            }
        }
        if distinct.is_empty() {
            self.entries.remove(&field);
        } else {
            self.entries.insert(field, distinct);
        }
    }

    /// Findings for one field, empty when the field is clean
    pub fn of(&self, field: Field) -> &[ValidationCode] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether one specific finding is present on a field
    pub fn has(&self, field: Field, code: ValidationCode) -> bool {
        self.of(field).contains(&code)
    }

    /// Whether any field currently has findings
    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of fields with findings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields that currently have findings
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[ValidationCode])> {
        self.entries.iter().map(|(f, codes)| (*f, codes.as_slice()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Rule primitives
// ============================================================================

/// Required text with a maximum length. The two findings are independent:
/// an over-long run of whitespace earns both.
pub fn check_required_text(value: &str, max: usize) -> Vec<ValidationCode> {
    let mut codes = Vec::new();
    if value.trim().is_empty() {
        codes.push(ValidationCode::Required);
    }
    if value.chars().count() > max {
        codes.push(ValidationCode::TooLong);
    }
    codes
}

/// Optional text that, when present, must be digits optionally grouped by
/// single `.` or `-` separators
pub fn check_numeric_pattern(value: Option<&str>) -> Vec<ValidationCode> {
    match value {
        Some(text) if !text.trim().is_empty() => {
            if matches_numeric_pattern(text.trim()) {
                Vec::new()
            } else {
                vec![ValidationCode::InvalidFormat]
            }
        }
        _ => Vec::new(),
    }
}

/// Required decimal that must not be negative
pub fn check_required_non_negative(value: Option<f64>) -> Vec<ValidationCode> {
    match value {
        None => vec![ValidationCode::Required],
        Some(v) if v < 0.0 => vec![ValidationCode::Negative],
        Some(_) => Vec::new(),
    }
}

/// Catalog dropdown that must carry a selection
pub fn check_catalog_selected(id: Option<i64>) -> Vec<ValidationCode> {
    match id {
        Some(v) if v > 0 => Vec::new(),
        _ => vec![ValidationCode::NotSelected],
    }
}

/// The location chain must be resolved down to a locality
pub fn check_location(selection: &CascadeSelection) -> Vec<ValidationCode> {
    if selection.is_complete() {
        Vec::new()
    } else {
        vec![ValidationCode::IncompleteLocation]
    }
}

/// Findings for a measure about to join the aggregate
pub fn check_measure(measure: &ProceduralMeasure) -> Vec<(Field, ValidationCode)> {
    let mut findings = Vec::new();
    for code in check_required_text(&measure.purpose, MEASURE_PURPOSE_MAX) {
        findings.push((Field::MeasurePurpose, code));
    }
    for code in check_required_text(&measure.code, MEASURE_CODE_MAX) {
        findings.push((Field::MeasureCode, code));
    }
    if let Some(note) = &measure.note {
        if note.chars().count() > MEASURE_NOTE_MAX {
            findings.push((Field::MeasureNote, ValidationCode::TooLong));
        }
    }
    findings
}

fn matches_numeric_pattern(text: &str) -> bool {
    let mut after_separator = true;
    let mut saw_digit = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            after_separator = false;
            saw_digit = true;
        } else if c == '.' || c == '-' {
            // separators must sit between digits, never doubled
            if after_separator {
                return false;
            }
            after_separator = true;
        } else {
            return false;
        }
    }
    saw_digit && !after_separator
}

// ============================================================================
// Input predicates for the UI layer
// ============================================================================

/// Whether a chunk of keyboard input is acceptable for digit-only fields
pub fn is_digits_only(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_digit())
}

/// Whether a chunk of keyboard input is acceptable for alphanumeric fields
pub fn is_alphanumeric_input(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
}

// ============================================================================
// Validator
// ============================================================================

type RuleFn = fn(&Predio, &CascadeSelection) -> Vec<ValidationCode>;

fn rule_external_id(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_required_text(&predio.external_id, EXTERNAL_ID_MAX)
}

fn rule_fmi(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_required_text(&predio.fmi, FMI_MAX)
}

fn rule_case_number(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_numeric_pattern(predio.case_number.as_deref())
}

fn rule_process_source(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_catalog_selected(predio.process_source_id)
}

fn rule_process_type(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_catalog_selected(predio.process_type_id)
}

fn rule_process_stage(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_catalog_selected(predio.process_stage_id)
}

fn rule_registered_area(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_required_non_negative(predio.registered_area)
}

fn rule_calculated_area(predio: &Predio, _: &CascadeSelection) -> Vec<ValidationCode> {
    check_required_non_negative(predio.calculated_area)
}

fn rule_location(_: &Predio, selection: &CascadeSelection) -> Vec<ValidationCode> {
    check_location(selection)
}

/// Explicit table from field to rule. Built once, consulted on every
/// mutation and on the full pass before commit.
pub struct Validator {
    rules: BTreeMap<Field, RuleFn>,
}

impl Validator {
    pub fn new() -> Self {
        let mut rules: BTreeMap<Field, RuleFn> = BTreeMap::new();
        rules.insert(Field::ExternalId, rule_external_id);
        rules.insert(Field::Fmi, rule_fmi);
        rules.insert(Field::CaseNumber, rule_case_number);
        rules.insert(Field::ProcessSource, rule_process_source);
        rules.insert(Field::ProcessType, rule_process_type);
        rules.insert(Field::ProcessStage, rule_process_stage);
        rules.insert(Field::RegisteredArea, rule_registered_area);
        rules.insert(Field::CalculatedArea, rule_calculated_area);
        rules.insert(Field::Location, rule_location);
        Self { rules }
    }

    /// Whether the field has a rule attached
    pub fn is_tracked(&self, field: Field) -> bool {
        self.rules.contains_key(&field)
    }

    /// Run the rule for one field. `None` means the field carries no rules
    /// and the error map should stay untouched.
    pub fn validate_field(
        &self,
        field: Field,
        predio: &Predio,
        selection: &CascadeSelection,
    ) -> Option<Vec<ValidationCode>> {
        self.rules.get(&field).map(|rule| rule(predio, selection))
    }

    /// Run every rule and build a fresh map
    pub fn validate_all(&self, predio: &Predio, selection: &CascadeSelection) -> ErrorMap {
        let mut map = ErrorMap::new();
        for (field, rule) in &self.rules {
            map.set(*field, rule(predio, selection));
        }
        map
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocalityOption, LocationOption};

    fn complete_selection() -> CascadeSelection {
        CascadeSelection {
            region: Some(LocationOption {
                code: 5,
                name: "Antioquia".to_string(),
            }),
            sub_region: Some(LocationOption {
                code: 1,
                name: "Medellin".to_string(),
            }),
            locality: Some(LocalityOption {
                code: 9,
                name: "San Cristobal".to_string(),
                location_id: 42,
            }),
        }
    }

    #[test]
    fn required_text_flags_blank_and_whitespace() {
        assert_eq!(check_required_text("", 30), vec![ValidationCode::Required]);
        assert_eq!(
            check_required_text("   ", 30),
            vec![ValidationCode::Required]
        );
        assert!(check_required_text("ABC123", 30).is_empty());
    }

    #[test]
    fn required_text_flags_overflow_at_the_boundary() {
        let at_limit = "x".repeat(30);
        let over_limit = "x".repeat(31);
        assert!(check_required_text(&at_limit, 30).is_empty());
        assert_eq!(
            check_required_text(&over_limit, 30),
            vec![ValidationCode::TooLong]
        );
    }

    #[test]
    fn required_text_findings_are_independent() {
        let blank_and_long = " ".repeat(31);
        assert_eq!(
            check_required_text(&blank_and_long, 30),
            vec![ValidationCode::Required, ValidationCode::TooLong]
        );
    }

    #[test]
    fn numeric_pattern_accepts_grouped_digits() {
        for ok in ["123", "1-2", "060-12345", "1.2-3", "2019.00123"] {
            assert!(
                check_numeric_pattern(Some(ok)).is_empty(),
                "expected {ok:?} to pass"
            );
        }
    }

    #[test]
    fn numeric_pattern_rejects_malformed_values() {
        for bad in ["12a", "1--2", "-12", "12-", "1..2", "."] {
            assert_eq!(
                check_numeric_pattern(Some(bad)),
                vec![ValidationCode::InvalidFormat],
                "expected {bad:?} to fail"
            );
        }
    }

    #[test]
    fn numeric_pattern_skips_absent_and_blank() {
        assert!(check_numeric_pattern(None).is_empty());
        assert!(check_numeric_pattern(Some("")).is_empty());
        assert!(check_numeric_pattern(Some("  ")).is_empty());
    }

    #[test]
    fn areas_must_be_present_and_non_negative() {
        assert_eq!(
            check_required_non_negative(None),
            vec![ValidationCode::Required]
        );
        assert_eq!(
            check_required_non_negative(Some(-0.01)),
            vec![ValidationCode::Negative]
        );
        assert!(check_required_non_negative(Some(0.0)).is_empty());
        assert!(check_required_non_negative(Some(1250.75)).is_empty());
    }

    #[test]
    fn catalog_selection_rejects_missing_and_sentinel() {
        assert_eq!(
            check_catalog_selected(None),
            vec![ValidationCode::NotSelected]
        );
        assert_eq!(
            check_catalog_selected(Some(0)),
            vec![ValidationCode::NotSelected]
        );
        assert!(check_catalog_selected(Some(3)).is_empty());
    }

    #[test]
    fn location_rule_requires_the_full_chain() {
        let mut selection = complete_selection();
        assert!(check_location(&selection).is_empty());

        selection.locality = None;
        assert_eq!(
            check_location(&selection),
            vec![ValidationCode::IncompleteLocation]
        );

        assert_eq!(
            check_location(&CascadeSelection::default()),
            vec![ValidationCode::IncompleteLocation]
        );
    }

    #[test]
    fn measure_checks_cover_both_required_fields() {
        let empty = ProceduralMeasure::default();
        let findings = check_measure(&empty);
        assert!(findings.contains(&(Field::MeasurePurpose, ValidationCode::Required)));
        assert!(findings.contains(&(Field::MeasureCode, ValidationCode::Required)));

        let oversized = ProceduralMeasure {
            purpose: "embargo".to_string(),
            code: "x".repeat(11),
            note: Some("y".repeat(4001)),
            tag: None,
        };
        let findings = check_measure(&oversized);
        assert!(findings.contains(&(Field::MeasureCode, ValidationCode::TooLong)));
        assert!(findings.contains(&(Field::MeasureNote, ValidationCode::TooLong)));
    }

    #[test]
    fn error_map_replaces_findings_wholesale() {
        let mut map = ErrorMap::new();
        map.set(
            Field::ExternalId,
            vec![ValidationCode::Required, ValidationCode::Required],
        );
        assert_eq!(map.of(Field::ExternalId), &[ValidationCode::Required]);

        map.set(Field::ExternalId, vec![ValidationCode::TooLong]);
        assert_eq!(map.of(Field::ExternalId), &[ValidationCode::TooLong]);

        map.set(Field::ExternalId, Vec::new());
        assert!(!map.has_errors());
        assert!(map.of(Field::ExternalId).is_empty());
    }

    #[test]
    fn validate_all_is_idempotent() {
        let validator = Validator::new();
        let predio = Predio {
            external_id: "ABC123".to_string(),
            calculated_area: Some(-4.0),
            ..Predio::default()
        };
        let selection = CascadeSelection::default();

        let first = validator.validate_all(&predio, &selection);
        let second = validator.validate_all(&predio, &selection);
        assert_eq!(first, second);
        assert!(first.has(Field::CalculatedArea, ValidationCode::Negative));
        assert!(first.has(Field::Fmi, ValidationCode::Required));
        assert!(first.has(Field::Location, ValidationCode::IncompleteLocation));
        assert!(first.of(Field::ExternalId).is_empty());
    }

    #[test]
    fn untracked_fields_have_no_rule() {
        let validator = Validator::new();
        let predio = Predio::default();
        let selection = complete_selection();
        assert!(validator
            .validate_field(Field::RoutingCode, &predio, &selection)
            .is_none());
        assert!(validator
            .validate_field(Field::MortgageNote, &predio, &selection)
            .is_none());
        assert!(validator.is_tracked(Field::Fmi));
        assert!(!validator.is_tracked(Field::Office));
    }

    #[test]
    fn a_clean_record_yields_an_empty_map() {
        let validator = Validator::new();
        let predio = Predio {
            external_id: "100".to_string(),
            fmi: "060-12345".to_string(),
            case_number: Some("2019-00123".to_string()),
            process_source_id: Some(1),
            process_type_id: Some(2),
            process_stage_id: Some(3),
            registered_area: Some(150.0),
            calculated_area: Some(148.3),
            ..Predio::default()
        };
        let map = validator.validate_all(&predio, &complete_selection());
        assert!(map.is_empty(), "unexpected findings: {:?}", map);
    }

    #[test]
    fn input_predicates_mirror_the_masks() {
        assert!(is_digits_only("0123"));
        assert!(is_digits_only(""));
        assert!(!is_digits_only("12a"));
        assert!(!is_digits_only("1.2"));

        assert!(is_alphanumeric_input("Lote 12 B"));
        assert!(!is_alphanumeric_input("lote-12"));
        assert!(!is_alphanumeric_input("12%"));
    }
}
