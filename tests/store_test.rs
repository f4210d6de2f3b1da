//! Registry database integration tests
//!
//! Covers the sqlite layer directly:
//! - Schema initialization and reopening
//! - Catalog and cascade queries
//! - One-transaction aggregate commits with linked, sequential ids
//! - Rollback on child-row failure
//! - Prefix search over the header table

use predios_core::db::{catalog, record, CatalogKind, ViabilidadDb};
use predios_core::model::{Predio, ProceduralMeasure};
use predios_core::seed::{apply_seed, SeedFile};
use predios_core::store::{PredioAggregate, SearchFilter};
use predios_core::CoreError;
use tempfile::TempDir;

const SEED: &str = r#"{
    "process_types": [
        { "id": 1, "name": "Clarificacion" },
        { "id": 2, "name": "Adjudicacion" }
    ],
    "process_sources": [
        { "id": 1, "name": "Solicitud" },
        { "id": 2, "name": "Oficio" }
    ],
    "process_stages": [
        { "id": 1, "name": "Estudio previo" },
        { "id": 2, "name": "Concepto" }
    ],
    "locations": [
        { "id": 1, "region_code": 5, "region_name": "Antioquia",
          "sub_region_code": 1, "sub_region_name": "Medellin",
          "locality_code": 9, "locality_name": "San Cristobal", "kind": "RURAL" },
        { "id": 2, "region_code": 5, "region_name": "Antioquia",
          "sub_region_code": 1, "sub_region_name": "Medellin",
          "locality_code": 14, "locality_name": "Altavista", "kind": "RURAL" },
        { "id": 3, "region_code": 5, "region_name": "Antioquia",
          "sub_region_code": 2, "sub_region_name": "Bello",
          "locality_code": 1, "locality_name": "Vereda Hato Viejo", "kind": "RURAL" },
        { "id": 4, "region_code": 8, "region_name": "Atlantico",
          "sub_region_code": 1, "sub_region_name": "Barranquilla",
          "locality_code": 3, "locality_name": "Juan Mina", "kind": "URBANO" }
    ]
}"#;

fn seeded_db() -> ViabilidadDb {
    let db = ViabilidadDb::open_in_memory().expect("open in-memory db");
    let seed = SeedFile::from_json(SEED).expect("parse seed");
    apply_seed(&db, &seed).expect("apply seed");
    db
}

fn valid_predio() -> Predio {
    Predio {
        external_id: "ABC123".to_string(),
        fmi: "060-12345".to_string(),
        case_number: Some("2019-00123".to_string()),
        process_source_id: Some(1),
        process_type_id: Some(1),
        process_stage_id: Some(2),
        routing_code: Some("ORF-2019-17".to_string()),
        office: Some("Direccion Territorial".to_string()),
        registry_circle: Some("060".to_string()),
        registered_area: Some(150.5),
        calculated_area: Some(148.25),
        owner_names: Some("Maria Lopez".to_string()),
        mortgage: true,
        mortgage_note: Some("Banco Agrario, anotacion 7".to_string()),
        viability: Some("VIABLE".to_string()),
        ..Predio::default()
    }
}

fn measure(purpose: &str, code: &str) -> ProceduralMeasure {
    ProceduralMeasure {
        purpose: purpose.to_string(),
        code: code.to_string(),
        note: None,
        tag: None,
    }
}

// =============================================================================
// Schema
// =============================================================================

#[test]
fn test_schema_persists_across_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let db = ViabilidadDb::open(dir.path()).expect("first open");
        let stats = db.stats().unwrap();
        assert_eq!(stats.record_count, 0);
    }

    // Second open sees the existing schema version and leaves it alone
    let db = ViabilidadDb::open(dir.path()).expect("reopen");
    let stats = db.stats().unwrap();
    assert_eq!(stats.record_count, 0);
    assert_eq!(stats.location_count, 0);
}

// =============================================================================
// Catalog and cascade queries
// =============================================================================

#[test]
fn test_catalogs_come_back_ordered_by_name() {
    let db = seeded_db();
    let types = db
        .with_conn(|conn| catalog::list_catalog(conn, CatalogKind::ProcessType))
        .unwrap();
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Adjudicacion", "Clarificacion"]);
}

#[test]
fn test_cascade_queries_scope_to_their_parent() {
    let db = seeded_db();

    let regions = db.with_conn(catalog::list_regions).unwrap();
    let region_names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(region_names, vec!["Antioquia", "Atlantico"]);

    let subs = db
        .with_conn(|conn| catalog::list_sub_regions(conn, 5))
        .unwrap();
    let sub_names: Vec<&str> = subs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(sub_names, vec!["Bello", "Medellin"]);

    let localities = db
        .with_conn(|conn| catalog::list_localities(conn, 5, 1))
        .unwrap();
    assert_eq!(localities.len(), 2);
    // ordered by name, each carrying its backing row id
    assert_eq!(localities[0].name, "Altavista");
    assert_eq!(localities[0].location_id, 2);
    assert_eq!(localities[1].name, "San Cristobal");
    assert_eq!(localities[1].location_id, 1);

    // the other region's sub-regions never leak in
    let atlantico_subs = db
        .with_conn(|conn| catalog::list_sub_regions(conn, 8))
        .unwrap();
    assert_eq!(atlantico_subs.len(), 1);
    assert_eq!(atlantico_subs[0].name, "Barranquilla");
}

#[test]
fn test_get_location_resolves_the_full_chain() {
    let db = seeded_db();
    let row = db
        .with_conn(|conn| catalog::get_location(conn, 3))
        .unwrap()
        .expect("location 3 exists");
    assert_eq!(row.region_name, "Antioquia");
    assert_eq!(row.sub_region_name, "Bello");
    assert_eq!(row.locality_name, "Vereda Hato Viejo");
    assert_eq!(row.kind, "RURAL");

    let missing = db
        .with_conn(|conn| catalog::get_location(conn, 999))
        .unwrap();
    assert!(missing.is_none());
}

// =============================================================================
// Transactional commit
// =============================================================================

#[test]
fn test_commit_writes_four_tables_with_linked_ids() {
    let db = seeded_db();
    let mut predio = valid_predio();
    predio.has_prior_opinion = true;
    predio.prior_opinion_text = Some("Concepto favorable de 2018".to_string());

    let aggregate = PredioAggregate {
        predio,
        location_id: 1,
        measures: vec![
            measure("Embargo por proceso ejecutivo", "EMB-01"),
            measure("Inscripcion de demanda", "DEM-02"),
        ],
    };

    let ids = db
        .with_conn_mut(|conn| record::create_aggregate(conn, &aggregate))
        .expect("commit succeeds");

    assert!(ids.header_id > 0);
    assert!(ids.terrain_study_id > 0);
    assert_eq!(ids.measure_ids.len(), 2);
    assert!(ids.opinion_id.is_some());

    // every child points back at the id generated just above it
    let (study_record_id, study_location_id): (i64, i64) = db
        .with_conn(|conn| {
            conn.query_row(
                "SELECT process_record_id, location_id FROM terrain_studies WHERE id = ?",
                [ids.terrain_study_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| CoreError::Database(e.to_string()))
        })
        .unwrap();
    assert_eq!(study_record_id, ids.header_id);
    assert_eq!(study_location_id, 1);

    for measure_id in &ids.measure_ids {
        let parent: i64 = db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT terrain_study_id FROM procedural_measures WHERE id = ?",
                    [*measure_id],
                    |row| row.get(0),
                )
                .map_err(|e| CoreError::Database(e.to_string()))
            })
            .unwrap();
        assert_eq!(parent, ids.terrain_study_id);
    }

    let opinion_parent: i64 = db
        .with_conn(|conn| {
            conn.query_row(
                "SELECT process_record_id FROM prior_opinions WHERE id = ?",
                [ids.opinion_id.unwrap()],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Database(e.to_string()))
        })
        .unwrap();
    assert_eq!(opinion_parent, ids.header_id);

    let stats = db.stats().unwrap();
    assert_eq!(stats.record_count, 1);
    assert_eq!(stats.terrain_study_count, 1);
    assert_eq!(stats.measure_count, 2);
    assert_eq!(stats.opinion_count, 1);
}

#[test]
fn test_ids_grow_across_commits() {
    let db = seeded_db();
    let aggregate = PredioAggregate {
        predio: valid_predio(),
        location_id: 1,
        measures: vec![],
    };

    let first = db
        .with_conn_mut(|conn| record::create_aggregate(conn, &aggregate))
        .unwrap();
    let second = db
        .with_conn_mut(|conn| record::create_aggregate(conn, &aggregate))
        .unwrap();

    assert!(second.header_id > first.header_id);
    assert!(second.terrain_study_id > first.terrain_study_id);
    // no opinion requested, none written
    assert!(first.opinion_id.is_none());
    assert_eq!(db.stats().unwrap().opinion_count, 0);
}

#[test]
fn test_failed_child_rolls_back_the_whole_aggregate() {
    let db = seeded_db();
    // code exceeds its 10-character column constraint, so the third insert
    // fails after header and study already went in
    let aggregate = PredioAggregate {
        predio: valid_predio(),
        location_id: 1,
        measures: vec![measure("Embargo", "TOO-LONG-CODE")],
    };

    let result = db.with_conn_mut(|conn| record::create_aggregate(conn, &aggregate));
    assert!(matches!(result, Err(CoreError::Database(_))));

    let stats = db.stats().unwrap();
    assert_eq!(stats.record_count, 0);
    assert_eq!(stats.terrain_study_count, 0);
    assert_eq!(stats.measure_count, 0);
    assert_eq!(stats.opinion_count, 0);
}

#[test]
fn test_unknown_catalog_reference_is_rejected() {
    let db = seeded_db();
    let mut predio = valid_predio();
    predio.process_source_id = Some(999);

    let aggregate = PredioAggregate {
        predio,
        location_id: 1,
        measures: vec![],
    };

    let result = db.with_conn_mut(|conn| record::create_aggregate(conn, &aggregate));
    assert!(result.is_err());
    assert_eq!(db.stats().unwrap().record_count, 0);
}

// =============================================================================
// Load
// =============================================================================

#[test]
fn test_load_round_trips_the_aggregate() {
    let db = seeded_db();
    let mut predio = valid_predio();
    predio.has_prior_opinion = true;
    predio.prior_opinion_date = Some(chrono::NaiveDate::from_ymd_opt(2018, 6, 14).unwrap());
    predio.prior_opinion_text = Some("Concepto favorable".to_string());
    predio.report_date = Some(chrono::NaiveDate::from_ymd_opt(2019, 11, 2).unwrap());

    let aggregate = PredioAggregate {
        predio: predio.clone(),
        location_id: 2,
        measures: vec![measure("Embargo", "EMB-01")],
    };

    let ids = db
        .with_conn_mut(|conn| record::create_aggregate(conn, &aggregate))
        .unwrap();

    let stored = db
        .with_conn(|conn| record::load_aggregate(conn, ids.header_id))
        .unwrap()
        .expect("record exists");

    assert_eq!(stored.header_id, ids.header_id);
    assert_eq!(stored.location_id, 2);
    assert_eq!(stored.predio, predio);
    assert_eq!(stored.measures, aggregate.measures);
}

#[test]
fn test_load_missing_record_is_none() {
    let db = seeded_db();
    let stored = db
        .with_conn(|conn| record::load_aggregate(conn, 41))
        .unwrap();
    assert!(stored.is_none());
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_search_needs_at_least_one_filter() {
    let db = seeded_db();
    let result = db.with_conn(|conn| record::search_records(conn, &SearchFilter::default()));
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));

    let blank = SearchFilter {
        external_id: Some("   ".to_string()),
        fmi: Some(String::new()),
        case_number: None,
    };
    let result = db.with_conn(|conn| record::search_records(conn, &blank));
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}

#[test]
fn test_search_is_prefix_only_newest_first_and_capped() {
    let db = seeded_db();
    for i in 1..=7 {
        let mut predio = valid_predio();
        predio.external_id = format!("P{:03}", i);
        predio.fmi = format!("060-{:05}", i);
        let aggregate = PredioAggregate {
            predio,
            location_id: 1,
            measures: vec![],
        };
        db.with_conn_mut(|conn| record::create_aggregate(conn, &aggregate))
            .unwrap();
    }
    // one record under a different registry circle prefix
    let mut other = valid_predio();
    other.external_id = "Q900".to_string();
    other.fmi = "160-00001".to_string();
    db.with_conn_mut(|conn| {
        record::create_aggregate(
            conn,
            &PredioAggregate {
                predio: other,
                location_id: 1,
                measures: vec![],
            },
        )
    })
    .unwrap();

    let filter = SearchFilter {
        fmi: Some("060".to_string()),
        ..SearchFilter::default()
    };
    let rows = db
        .with_conn(|conn| record::search_records(conn, &filter))
        .unwrap();

    // capped at the page size, newest ids first, prefix matches only
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].fmi, "060-00007");
    assert_eq!(rows[4].fmi, "060-00003");
    assert!(rows.iter().all(|r| r.fmi.starts_with("060")));
    assert!(rows.windows(2).all(|w| w[0].header_id > w[1].header_id));
}

#[test]
fn test_search_filters_combine_with_and() {
    let db = seeded_db();
    for (external_id, fmi) in [("P001", "060-00001"), ("P002", "060-00002"), ("Q003", "060-00003")]
    {
        let mut predio = valid_predio();
        predio.external_id = external_id.to_string();
        predio.fmi = fmi.to_string();
        db.with_conn_mut(|conn| {
            record::create_aggregate(
                conn,
                &PredioAggregate {
                    predio,
                    location_id: 1,
                    measures: vec![],
                },
            )
        })
        .unwrap();
    }

    let filter = SearchFilter {
        external_id: Some("P".to_string()),
        fmi: Some("060".to_string()),
        case_number: None,
    };
    let rows = db
        .with_conn(|conn| record::search_records(conn, &filter))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.external_id.starts_with('P')));

    let none = SearchFilter {
        external_id: Some("Z".to_string()),
        ..SearchFilter::default()
    };
    let rows = db
        .with_conn(|conn| record::search_records(conn, &none))
        .unwrap();
    assert!(rows.is_empty());
}
