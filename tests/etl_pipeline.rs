//! End-to-end runs against a DuckDB file holding the operational tables

mod common;

use duckdb::Connection;
use flight_mart::{
    BusinessQuestion, EtlExecutor, LoadMode, MartStore, PipelineError, QuestionParams,
    SourceConfig, StoreError, answer_all,
};
use tempfile::TempDir;

use common::config_for;

#[tokio::test]
async fn test_full_run_builds_star_schema() {
    let dir = TempDir::new().unwrap();
    let (config, store_path) = config_for(dir.path());

    let report = EtlExecutor::new(config)
        .unwrap()
        .with_init(true)
        .run()
        .await
        .unwrap();

    assert!(store_path.exists());
    assert!(report.load.counts_match());
    assert_eq!(report.load.stored("dim_tiempo"), Some(4));
    assert_eq!(report.load.stored("dim_avion"), Some(3));
    assert_eq!(report.load.stored("dim_ciudad"), Some(3));
    assert_eq!(report.load.stored("dim_usuario"), Some(3));
    assert_eq!(report.load.stored("hecho_vuelos"), Some(9));

    let years: Vec<(i32, i64)> = report
        .load
        .year_distribution
        .as_ref()
        .unwrap()
        .iter()
        .map(|y| (y.year, y.flights))
        .collect();
    assert_eq!(years, vec![(2019, 4), (2020, 3)]);

    let stats = report.transform;
    assert_eq!(stats.missing_departures, 1);
    assert_eq!(stats.unparseable_departures, 0);
    assert_eq!(stats.planes_without_airline, 1);
    assert_eq!(stats.users_without_city, 1);
    assert_eq!(stats.flights_without_itinerary, 1);
    assert_eq!(stats.flights_without_time, 2);
    assert_eq!(stats.flights_without_origin_city, 1);
    assert_eq!(stats.flights_without_destination_city, 2);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_dimension_contents() {
    let dir = TempDir::new().unwrap();
    let (config, store_path) = config_for(dir.path());
    EtlExecutor::new(config)
        .unwrap()
        .with_init(true)
        .run()
        .await
        .unwrap();

    let store = MartStore::open_read_only(&store_path).unwrap();

    let time = store
        .query("SELECT id_tiempo, fecha, anio, mes, semestre FROM dim_tiempo ORDER BY id_tiempo")
        .unwrap();
    let keys: Vec<i64> = time.iter().map(|r| r["id_tiempo"].as_i64().unwrap()).collect();
    assert_eq!(keys, vec![1, 2, 3, 4]);
    assert_eq!(time[0]["fecha"], "2019-03-10 00:00:00");
    assert_eq!(time[1]["semestre"], 2);
    assert_eq!(time[3]["mes"], 5);

    let users = store
        .query("SELECT id_usuario, nombre_completo, ciudad_residencia_nombre FROM dim_usuario ORDER BY id_usuario")
        .unwrap();
    assert_eq!(users[0]["nombre_completo"], "Ana Gómez");
    assert_eq!(users[0]["ciudad_residencia_nombre"], "Bogotá");
    assert_eq!(users[1]["nombre_completo"], "Luca");
    assert!(users[2]["nombre_completo"].is_null());
    assert!(users[2]["ciudad_residencia_nombre"].is_null());

    let planes = store
        .query("SELECT nombre_aerolinea, nombre_modelo FROM dim_avion WHERE id_avion = 3")
        .unwrap();
    assert!(planes[0]["nombre_aerolinea"].is_null());
    assert_eq!(planes[0]["nombre_modelo"], "A320");

    // The flight with an unknown itinerary keeps its plane, user and cost
    let orphan = store
        .query("SELECT * FROM hecho_vuelos WHERE costo = 50")
        .unwrap();
    assert_eq!(orphan.len(), 1);
    assert!(orphan[0]["id_tiempo"].is_null());
    assert!(orphan[0]["id_ciudad_origen"].is_null());
    assert_eq!(orphan[0]["id_avion"], 1);
    assert_eq!(orphan[0]["vuelo_cnt"], 1);
}

#[tokio::test]
async fn test_business_questions() {
    let dir = TempDir::new().unwrap();
    let (config, store_path) = config_for(dir.path());
    EtlExecutor::new(config)
        .unwrap()
        .with_init(true)
        .run()
        .await
        .unwrap();

    let store = MartStore::open_read_only(&store_path).unwrap();
    let params = QuestionParams::default();

    let q1 = BusinessQuestion::TopAirlineToCity.run(&store, &params).unwrap();
    assert_eq!(q1.len(), 2);
    assert_eq!(q1[0]["anio"], 2019);
    assert_eq!(q1[0]["nombre_aerolinea"], "Alitalia");
    assert_eq!(q1[0]["vuelos"], 2);
    assert_eq!(q1[1]["anio"], 2020);
    assert_eq!(q1[1]["vuelos"], 1);

    let q2 = BusinessQuestion::HalfYearRevenue.run(&store, &params).unwrap();
    let revenue: Vec<(i64, Option<&str>, i64)> = q2
        .iter()
        .map(|r| {
            (
                r["anio"].as_i64().unwrap(),
                r["nombre_aerolinea"].as_str(),
                r["recaudo"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        revenue,
        vec![
            (2019, Some("Alitalia"), 1750),
            (2019, Some("Avianca"), 700),
            (2020, Some("Alitalia"), 1200),
            (2020, Some("Avianca"), 500),
            (2020, None, 300),
        ]
    );

    let q3 = BusinessQuestion::TopModel.run(&store, &params).unwrap();
    assert_eq!(q3.len(), 2);
    assert!(q3.iter().all(|r| r["nombre_modelo"] == "A320" && r["vuelos"] == 2));

    let q4 = BusinessQuestion::TopResidenceCity.run(&store, &params).unwrap();
    assert_eq!(q4[0]["ciudad"], "Bogotá");
    assert_eq!(q4[0]["viajes"], 3);
    assert_eq!(q4[1]["viajes"], 2);

    let answers = answer_all(&store, &params);
    assert_eq!(answers.len(), 4);
    assert!(answers.iter().all(|a| a.error.is_none()));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    for mode in [LoadMode::Transactional, LoadMode::Sequential] {
        let dir = TempDir::new().unwrap();
        let (config, _) = config_for(dir.path());
        let config = config.with_load_mode(mode);

        let first = EtlExecutor::new(config.clone())
            .unwrap()
            .with_init(true)
            .run()
            .await
            .unwrap();
        let second = EtlExecutor::new(config).unwrap().run().await.unwrap();

        assert_eq!(first.fingerprint, second.fingerprint, "{mode}");
        assert_eq!(first.load.tables, second.load.tables, "{mode}");
        assert_eq!(
            first.load.year_distribution, second.load.year_distribution,
            "{mode}"
        );
    }
}

#[tokio::test]
async fn test_run_without_schema_fails() {
    let dir = TempDir::new().unwrap();
    let (config, _) = config_for(dir.path());

    let result = EtlExecutor::new(config).unwrap().run().await;
    assert!(matches!(
        result,
        Err(PipelineError::Store(StoreError::NotInitialized))
    ));
}

#[tokio::test]
async fn test_missing_source_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let (config, store_path) = config_for(dir.path());

    let source_path = dir.path().join("broken.duckdb");
    {
        let conn = Connection::open(&source_path).unwrap();
        conn.execute_batch(common::OPERATIONAL_DDL).unwrap();
        conn.execute_batch("ALTER TABLE vuelos DROP COLUMN costo").unwrap();
    }

    let config = config.with_source(SourceConfig::duckdb(&source_path));
    let result = EtlExecutor::new(config).unwrap().with_init(true).run().await;

    match result {
        Err(PipelineError::Source(flight_mart::SourceError::MissingColumn { table, column })) => {
            assert_eq!(table, "vuelos");
            assert_eq!(column, "costo");
        }
        other => panic!("expected missing column, got {:?}", other.map(|r| r.run_id)),
    }
    // Schema was created by the init stage, but nothing was loaded
    let store = MartStore::open_read_only(&store_path).unwrap();
    assert!(store.row_counts().unwrap().iter().all(|(_, rows)| *rows == 0));
}

#[tokio::test]
async fn test_text_departures_are_parsed_or_counted() {
    let dir = TempDir::new().unwrap();
    let (config, store_path) = config_for(dir.path());

    let source_path = dir.path().join("text_dates.duckdb");
    {
        let conn = Connection::open(&source_path).unwrap();
        conn.execute_batch(
            &common::OPERATIONAL_DDL.replace("fecha_salida TIMESTAMP", "fecha_salida VARCHAR"),
        )
        .unwrap();
        conn.execute_batch(
            r#"
INSERT INTO ciudades VALUES (1, 'Bogotá'), (2, 'Roma');
INSERT INTO aeropuertos VALUES (10, 'El Dorado', 1), (20, 'Fiumicino', 2);
INSERT INTO itinerarios VALUES
    (1, 10, 20, '2019-12-31 23:59:59', NULL),
    (2, 20, 10, '2019-12-31', NULL),
    (3, 20, 10, 'not a date', NULL);
INSERT INTO vuelos VALUES (1, 1, NULL, NULL, 10), (2, 2, NULL, NULL, 20), (3, 3, NULL, NULL, 30);
"#,
        )
        .unwrap();
    }

    let config = config.with_source(SourceConfig::duckdb(&source_path));
    let report = EtlExecutor::new(config)
        .unwrap()
        .with_init(true)
        .run()
        .await
        .unwrap();

    assert_eq!(report.transform.unparseable_departures, 1);
    assert_eq!(report.load.stored("dim_tiempo"), Some(1));
    assert_eq!(report.load.stored("hecho_vuelos"), Some(3));

    let store = MartStore::open_read_only(&store_path).unwrap();
    let keyed = store
        .query("SELECT COUNT(*) AS n FROM hecho_vuelos WHERE id_tiempo = 1")
        .unwrap();
    assert_eq!(keyed[0]["n"], 2);
    let semester = store.query("SELECT semestre FROM dim_tiempo").unwrap();
    assert_eq!(semester[0]["semestre"], 2);
}
