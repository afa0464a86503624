//! Shared fixtures: a small operational database in a DuckDB file

use std::path::{Path, PathBuf};

use duckdb::Connection;
use flight_mart::{MartConfig, SourceConfig};

pub const OPERATIONAL_DDL: &str = r#"
CREATE TABLE aerolineas (id_aerolinea INTEGER, nombre VARCHAR);
CREATE TABLE ciudades (id_ciudad INTEGER, nombre VARCHAR);
CREATE TABLE aeropuertos (id_aeropuerto INTEGER, nombre VARCHAR, id_ciudad INTEGER);
CREATE TABLE modelos (id_modelo INTEGER, nombre VARCHAR);
CREATE TABLE aviones (id_avion INTEGER, nombre VARCHAR, id_aerolinea INTEGER, id_modelo INTEGER);
CREATE TABLE itinerarios (
    id_itinerario INTEGER,
    id_aeropuerto_origen INTEGER,
    id_aeropuerto_destino INTEGER,
    fecha_salida TIMESTAMP,
    fecha_llegada TIMESTAMP
);
CREATE TABLE usuarios (
    cedula BIGINT,
    nombre VARCHAR,
    apellido VARCHAR,
    email VARCHAR,
    id_ciudad INTEGER
);
CREATE TABLE vuelos (
    id_vuelo INTEGER,
    id_itinerario INTEGER,
    id_avion INTEGER,
    id_usuario BIGINT,
    costo DECIMAL(10, 2)
);
"#;

/// Rows chosen so every lookup failure mode appears once:
/// plane 3 has an unknown airline, user 1003 an unknown city,
/// itinerary 105 no departure and a city-less destination airport,
/// flight 9 an unknown itinerary.
pub const OPERATIONAL_ROWS: &str = r#"
INSERT INTO aerolineas VALUES (1, 'Avianca'), (2, 'Alitalia');
INSERT INTO ciudades VALUES (1, 'Bogotá'), (2, 'Roma'), (3, 'Madrid');
INSERT INTO aeropuertos VALUES
    (10, 'El Dorado', 1), (20, 'Fiumicino', 2), (30, 'Barajas', 3), (40, 'Sin ciudad', NULL);
INSERT INTO modelos VALUES (1, 'A320'), (2, 'B787');
INSERT INTO aviones VALUES (1, 'HK-4000', 1, 1), (2, 'I-EIXM', 2, 2), (3, 'EC-XYZ', 99, 1);
INSERT INTO itinerarios VALUES
    (100, 10, 20, TIMESTAMP '2019-03-10 08:00:00', TIMESTAMP '2019-03-10 20:00:00'),
    (101, 10, 20, TIMESTAMP '2019-03-10 19:00:00', NULL),
    (102, 20, 10, TIMESTAMP '2019-08-01 10:00:00', NULL),
    (103, 10, 30, TIMESTAMP '2020-02-14 07:30:00', NULL),
    (104, 30, 20, TIMESTAMP '2020-05-01 12:00:00', NULL),
    (105, 10, 40, NULL, NULL);
INSERT INTO usuarios VALUES
    (1001, 'Ana', 'Gómez', 'ana@example.com', 1),
    (1002, 'Luca', NULL, 'luca@example.com', 2),
    (1003, NULL, NULL, NULL, 9);
INSERT INTO vuelos VALUES
    (1, 100, 2, 1001, 900.00),
    (2, 101, 2, 1002, 850.00),
    (3, 101, 1, 1001, 700.00),
    (4, 102, 1, 1001, 650.00),
    (5, 103, 1, 1001, 500.00),
    (6, 104, 2, 1001, 1200.00),
    (7, 103, 3, 1002, 300.00),
    (8, 105, 1, 1001, 100.00),
    (9, 999, 1, 1001, 50.00);
"#;

/// Write the operational fixture to a DuckDB file
pub fn seed_source(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(OPERATIONAL_DDL).unwrap();
    conn.execute_batch(OPERATIONAL_ROWS).unwrap();
}

/// Config reading the fixture file and writing a store next to it
pub fn config_for(dir: &Path) -> (MartConfig, PathBuf) {
    let source_path = dir.join("oltp.duckdb");
    seed_source(&source_path);
    let store_path = dir.join("mart").join("iata_star.duckdb");

    let config = MartConfig::new()
        .with_source(SourceConfig::duckdb(&source_path))
        .with_store_path(&store_path)
        .with_threads(1);
    (config, store_path)
}
