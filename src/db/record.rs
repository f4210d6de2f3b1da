//! Record aggregate persistence and search
//!
//! A commit writes four tables in a fixed order inside one transaction:
//! header first, then the terrain study referencing it, then each measure
//! referencing the study, then the optional prior opinion referencing the
//! header. Ids come from the tables themselves, so a failure at any step
//! rolls the whole aggregate back and burns nothing visible.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Predio, ProceduralMeasure};
use crate::store::{
    GeneratedIds, PredioAggregate, PredioSummary, SearchFilter, StoredPredio, SEARCH_PAGE_SIZE,
};

/// Dates live in TEXT columns as plain ISO days
const DATE_FORMAT: &str = "%Y-%m-%d";

fn date_to_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn text_to_date(value: Option<String>) -> Result<Option<NaiveDate>, rusqlite::Error> {
    match value {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
    }
}

// ============================================================================
// Create
// ============================================================================

/// Write one aggregate in a single transaction and return the generated ids
pub fn create_aggregate(
    conn: &mut Connection,
    aggregate: &PredioAggregate,
) -> Result<GeneratedIds, CoreError> {
    let predio = &aggregate.predio;
    let tx = conn
        .transaction()
        .map_err(|e| CoreError::Database(format!("Transaction failed: {}", e)))?;

    // 1. Header
    tx.execute(
        r#"
        INSERT INTO process_records (
            external_id, fmi, case_number,
            process_source_id, process_type_id, process_stage_id,
            routing_code, office, has_prior_opinion,
            final_analysis, report_date, viability, report_kind,
            non_viability_cause, pending_inputs
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            predio.external_id,
            predio.fmi,
            predio.case_number,
            predio.process_source_id,
            predio.process_type_id,
            predio.process_stage_id,
            predio.routing_code,
            predio.office,
            predio.has_prior_opinion as i64,
            predio.final_analysis,
            date_to_text(predio.report_date),
            predio.viability,
            predio.report_kind,
            predio.non_viability_cause,
            predio.pending_inputs,
        ],
    )
    .map_err(|e| CoreError::Database(format!("Header insert failed: {}", e)))?;
    let header_id = tx.last_insert_rowid();

    // 2. Terrain study
    tx.execute(
        r#"
        INSERT INTO terrain_studies (
            process_record_id, location_id, registry_circle,
            registered_area, calculated_area,
            titleholder_kind, owner_names, owner_id_number,
            original_title, last_transfer_analysis,
            mortgage, mortgage_note,
            easements, easements_note,
            precautionary_measures, precautionary_note,
            displacement_registry, displacement_note, collective_claim,
            land_restitution, land_restitution_note,
            other_entity_offer, other_entity_offer_note,
            clarification_process, clarification_note
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            header_id,
            aggregate.location_id,
            predio.registry_circle,
            predio.registered_area,
            predio.calculated_area,
            predio.titleholder_kind,
            predio.owner_names,
            predio.owner_id_number,
            predio.original_title,
            predio.last_transfer_analysis,
            predio.mortgage as i64,
            predio.mortgage_note,
            predio.easements as i64,
            predio.easements_note,
            predio.precautionary_measures as i64,
            predio.precautionary_note,
            predio.displacement_registry as i64,
            predio.displacement_note,
            predio.collective_claim,
            predio.land_restitution as i64,
            predio.land_restitution_note,
            predio.other_entity_offer as i64,
            predio.other_entity_offer_note,
            predio.clarification_process as i64,
            predio.clarification_note,
        ],
    )
    .map_err(|e| CoreError::Database(format!("Terrain study insert failed: {}", e)))?;
    let terrain_study_id = tx.last_insert_rowid();

    // 3. Measures, in the order they were added
    let mut measure_ids = Vec::with_capacity(aggregate.measures.len());
    for measure in &aggregate.measures {
        tx.execute(
            "INSERT INTO procedural_measures (terrain_study_id, purpose, code, note, tag) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                terrain_study_id,
                measure.purpose,
                measure.code,
                measure.note,
                measure.tag,
            ],
        )
        .map_err(|e| CoreError::Database(format!("Measure insert failed: {}", e)))?;
        measure_ids.push(tx.last_insert_rowid());
    }

    // 4. Prior opinion, only when the record flags one
    let opinion_id = match aggregate.opinion() {
        Some(opinion) => {
            tx.execute(
                "INSERT INTO prior_opinions (process_record_id, report_date, narrative) \
                 VALUES (?, ?, ?)",
                params![
                    header_id,
                    date_to_text(opinion.report_date),
                    opinion.narrative,
                ],
            )
            .map_err(|e| CoreError::Database(format!("Opinion insert failed: {}", e)))?;
            Some(tx.last_insert_rowid())
        }
        None => None,
    };

    tx.commit()
        .map_err(|e| CoreError::Database(format!("Commit failed: {}", e)))?;

    debug!(
        header_id,
        terrain_study_id,
        measures = measure_ids.len(),
        opinion = opinion_id.is_some(),
        "Aggregate committed"
    );

    Ok(GeneratedIds {
        header_id,
        terrain_study_id,
        measure_ids,
        opinion_id,
    })
}

// ============================================================================
// Load
// ============================================================================

fn header_into_predio(row: &Row) -> Result<Predio, rusqlite::Error> {
    Ok(Predio {
        external_id: row.get("external_id")?,
        fmi: row.get("fmi")?,
        case_number: row.get("case_number")?,
        process_source_id: row.get("process_source_id")?,
        process_type_id: row.get("process_type_id")?,
        process_stage_id: row.get("process_stage_id")?,
        routing_code: row.get("routing_code")?,
        office: row.get("office")?,
        has_prior_opinion: row.get::<_, i64>("has_prior_opinion")? != 0,
        final_analysis: row.get("final_analysis")?,
        report_date: text_to_date(row.get("report_date")?)?,
        viability: row.get("viability")?,
        report_kind: row.get("report_kind")?,
        non_viability_cause: row.get("non_viability_cause")?,
        pending_inputs: row.get("pending_inputs")?,
        ..Predio::default()
    })
}

/// Terrain-study scalars that live outside the record itself
struct StudyIds {
    id: i64,
    location_id: i64,
}

fn apply_study_row(row: &Row, predio: &mut Predio) -> Result<StudyIds, rusqlite::Error> {
    predio.registry_circle = row.get("registry_circle")?;
    predio.registered_area = row.get("registered_area")?;
    predio.calculated_area = row.get("calculated_area")?;
    predio.titleholder_kind = row.get("titleholder_kind")?;
    predio.owner_names = row.get("owner_names")?;
    predio.owner_id_number = row.get("owner_id_number")?;
    predio.original_title = row.get("original_title")?;
    predio.last_transfer_analysis = row.get("last_transfer_analysis")?;
    predio.mortgage = row.get::<_, i64>("mortgage")? != 0;
    predio.mortgage_note = row.get("mortgage_note")?;
    predio.easements = row.get::<_, i64>("easements")? != 0;
    predio.easements_note = row.get("easements_note")?;
    predio.precautionary_measures = row.get::<_, i64>("precautionary_measures")? != 0;
    predio.precautionary_note = row.get("precautionary_note")?;
    predio.displacement_registry = row.get::<_, i64>("displacement_registry")? != 0;
    predio.displacement_note = row.get("displacement_note")?;
    predio.collective_claim = row.get("collective_claim")?;
    predio.land_restitution = row.get::<_, i64>("land_restitution")? != 0;
    predio.land_restitution_note = row.get("land_restitution_note")?;
    predio.other_entity_offer = row.get::<_, i64>("other_entity_offer")? != 0;
    predio.other_entity_offer_note = row.get("other_entity_offer_note")?;
    predio.clarification_process = row.get::<_, i64>("clarification_process")? != 0;
    predio.clarification_note = row.get("clarification_note")?;
    Ok(StudyIds {
        id: row.get("id")?,
        location_id: row.get("location_id")?,
    })
}

/// Load one aggregate by header id
pub fn load_aggregate(
    conn: &Connection,
    header_id: i64,
) -> Result<Option<StoredPredio>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM process_records WHERE id = ?")
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;
    let mut rows = stmt
        .query(params![header_id])
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    let mut predio = match rows
        .next()
        .map_err(|e| CoreError::Database(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => header_into_predio(row)
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?,
        None => return Ok(None),
    };
    drop(rows);
    drop(stmt);

    // A header is always committed with its study; a lone header means the
    // database was written by something else
    let mut stmt = conn
        .prepare(
            "SELECT * FROM terrain_studies WHERE process_record_id = ? ORDER BY id LIMIT 1",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;
    let mut rows = stmt
        .query(params![header_id])
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    let study = match rows
        .next()
        .map_err(|e| CoreError::Database(format!("Row fetch failed: {}", e)))?
    {
        Some(row) => apply_study_row(row, &mut predio)
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?,
        None => {
            return Err(CoreError::Internal(format!(
                "Terrain study missing for record {}",
                header_id
            )))
        }
    };
    drop(rows);
    drop(stmt);

    let mut stmt = conn
        .prepare(
            "SELECT purpose, code, note, tag FROM procedural_measures \
             WHERE terrain_study_id = ? ORDER BY id",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;
    let measures = stmt
        .query_map(params![study.id], |row| {
            Ok(ProceduralMeasure {
                purpose: row.get("purpose")?,
                code: row.get("code")?,
                note: row.get("note")?,
                tag: row.get("tag")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?;
    drop(stmt);

    // Restore the prior-opinion fields from the child row
    let mut stmt = conn
        .prepare(
            "SELECT report_date, narrative FROM prior_opinions \
             WHERE process_record_id = ? ORDER BY id LIMIT 1",
        )
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;
    let mut rows = stmt
        .query(params![header_id])
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;
    if let Some(row) = rows
        .next()
        .map_err(|e| CoreError::Database(format!("Row fetch failed: {}", e)))?
    {
        let report_date: Option<String> = row
            .get("report_date")
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?;
        predio.prior_opinion_date = text_to_date(report_date)
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?;
        predio.prior_opinion_text = row
            .get("narrative")
            .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))?;
    }

    Ok(Some(StoredPredio {
        header_id,
        location_id: study.location_id,
        predio,
        measures,
    }))
}

// ============================================================================
// Search
// ============================================================================

/// Prefix search over identifier, FMI and case number. Filters combine with
/// AND; an all-blank filter is rejected before touching the database.
pub fn search_records(
    conn: &Connection,
    filter: &SearchFilter,
) -> Result<Vec<PredioSummary>, CoreError> {
    if filter.is_empty() {
        return Err(CoreError::InvalidInput(
            "at least one search filter is required".to_string(),
        ));
    }

    let mut sql =
        String::from("SELECT id, external_id, fmi, case_number, viability FROM process_records");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];
    let mut conditions = vec![];

    if let Some(prefix) = filter.external_id.as_deref().map(str::trim) {
        if !prefix.is_empty() {
            conditions.push("external_id LIKE ?".to_string());
            params.push(Box::new(format!("{}%", prefix)));
        }
    }

    if let Some(prefix) = filter.fmi.as_deref().map(str::trim) {
        if !prefix.is_empty() {
            conditions.push("fmi LIKE ?".to_string());
            params.push(Box::new(format!("{}%", prefix)));
        }
    }

    if let Some(prefix) = filter.case_number.as_deref().map(str::trim) {
        if !prefix.is_empty() {
            conditions.push("case_number LIKE ?".to_string());
            params.push(Box::new(format!("{}%", prefix)));
        }
    }

    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
    sql.push_str(" ORDER BY id DESC LIMIT ?");
    params.push(Box::new(SEARCH_PAGE_SIZE as i64));

    debug!("Executing query: {}", sql);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| CoreError::Database(format!("Prepare failed: {}", e)))?;

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(PredioSummary {
                header_id: row.get("id")?,
                external_id: row.get("external_id")?,
                fmi: row.get("fmi")?,
                case_number: row.get("case_number")?,
                viability: row.get("viability")?,
            })
        })
        .map_err(|e| CoreError::Database(format!("Query failed: {}", e)))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoreError::Database(format!("Row parse failed: {}", e)))
}
