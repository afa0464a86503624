//! DDL for the star schema

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Target tables in load order (dimensions first)
pub const TARGET_TABLES: [&str; 5] = [
    "dim_tiempo",
    "dim_avion",
    "dim_ciudad",
    "dim_usuario",
    "hecho_vuelos",
];

/// Target tables in delete order (fact first)
pub const DELETE_ORDER: [&str; 5] = [
    "hecho_vuelos",
    "dim_tiempo",
    "dim_avion",
    "dim_ciudad",
    "dim_usuario",
];

/// Schema for the analytical store
pub struct MartSchema;

impl MartSchema {
    /// Drop-and-create DDL for all star-schema tables (DuckDB syntax)
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key VARCHAR PRIMARY KEY,
    value VARCHAR NOT NULL
);

DROP TABLE IF EXISTS hecho_vuelos;
DROP TABLE IF EXISTS dim_tiempo;
DROP TABLE IF EXISTS dim_avion;
DROP TABLE IF EXISTS dim_ciudad;
DROP TABLE IF EXISTS dim_usuario;

-- Dimensions
CREATE TABLE dim_tiempo (
    id_tiempo INTEGER PRIMARY KEY,
    fecha     TIMESTAMP,
    anio      SMALLINT,
    mes       TINYINT,
    semestre  TINYINT
);

CREATE TABLE dim_avion (
    id_avion         INTEGER PRIMARY KEY,
    nombre_avion     VARCHAR,
    nombre_aerolinea VARCHAR,
    nombre_modelo    VARCHAR
);

CREATE TABLE dim_ciudad (
    id_ciudad     INTEGER PRIMARY KEY,
    nombre_ciudad VARCHAR
);

CREATE TABLE dim_usuario (
    id_usuario               BIGINT PRIMARY KEY,
    nombre_completo          VARCHAR,
    email                    VARCHAR,
    ciudad_residencia_nombre VARCHAR
);

-- Fact
CREATE TABLE hecho_vuelos (
    id_tiempo         INTEGER,
    id_avion          INTEGER,
    id_usuario        BIGINT,
    id_ciudad_origen  INTEGER,
    id_ciudad_destino INTEGER,
    costo             BIGINT,
    vuelo_cnt         TINYINT
);

-- Indexes for the fixed query set
CREATE INDEX IF NOT EXISTS idx_fact_t  ON hecho_vuelos(id_tiempo);
CREATE INDEX IF NOT EXISTS idx_fact_a  ON hecho_vuelos(id_avion);
CREATE INDEX IF NOT EXISTS idx_fact_u  ON hecho_vuelos(id_usuario);
CREATE INDEX IF NOT EXISTS idx_fact_co ON hecho_vuelos(id_ciudad_origen);
CREATE INDEX IF NOT EXISTS idx_fact_cd ON hecho_vuelos(id_ciudad_destino);
"#
    }

    /// Upsert of the schema version
    pub fn upsert_schema_version() -> &'static str {
        "INSERT INTO schema_info (key, value) VALUES ('version', ?1)
         ON CONFLICT (key) DO UPDATE SET value = ?1"
    }

    /// SELECT statement for the schema version
    pub fn select_schema_version() -> &'static str {
        "SELECT value FROM schema_info WHERE key = 'version'"
    }

    /// Count of star-schema tables present
    pub fn count_target_tables() -> &'static str {
        "SELECT COUNT(*) FROM information_schema.tables
         WHERE table_name IN ('dim_tiempo', 'dim_avion', 'dim_ciudad', 'dim_usuario', 'hecho_vuelos')"
    }

    /// INSERT statement for `dim_tiempo`
    pub fn insert_time() -> &'static str {
        "INSERT INTO dim_tiempo (id_tiempo, fecha, anio, mes, semestre) VALUES (?, ?, ?, ?, ?)"
    }

    /// INSERT statement for `dim_avion`
    pub fn insert_plane() -> &'static str {
        "INSERT INTO dim_avion (id_avion, nombre_avion, nombre_aerolinea, nombre_modelo)
         VALUES (?, ?, ?, ?)"
    }

    /// INSERT statement for `dim_ciudad`
    pub fn insert_city() -> &'static str {
        "INSERT INTO dim_ciudad (id_ciudad, nombre_ciudad) VALUES (?, ?)"
    }

    /// INSERT statement for `dim_usuario`
    pub fn insert_user() -> &'static str {
        "INSERT INTO dim_usuario (id_usuario, nombre_completo, email, ciudad_residencia_nombre)
         VALUES (?, ?, ?, ?)"
    }

    /// INSERT statement for `hecho_vuelos`
    pub fn insert_fact() -> &'static str {
        "INSERT INTO hecho_vuelos
         (id_tiempo, id_avion, id_usuario, id_ciudad_origen, id_ciudad_destino, costo, vuelo_cnt)
         VALUES (?, ?, ?, ?, ?, ?, ?)"
    }

    /// Flights per year, joining the fact table to the time dimension
    pub fn select_year_distribution() -> &'static str {
        "SELECT CAST(t.anio AS INTEGER) AS anio, COUNT(*) AS vuelos
         FROM hecho_vuelos f
         JOIN dim_tiempo t ON f.id_tiempo = t.id_tiempo
         GROUP BY 1
         ORDER BY 1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert!(SCHEMA_VERSION >= 1);
    }

    #[test]
    fn test_schema_contains_tables_and_indexes() {
        let ddl = MartSchema::create_tables();
        for table in TARGET_TABLES {
            assert!(ddl.contains(&format!("CREATE TABLE {table} (")), "{table}");
        }
        for index in ["idx_fact_t", "idx_fact_a", "idx_fact_u", "idx_fact_co", "idx_fact_cd"] {
            assert!(ddl.contains(index), "{index}");
        }
    }

    #[test]
    fn test_delete_order_starts_with_fact() {
        assert_eq!(DELETE_ORDER[0], "hecho_vuelos");
        let mut sorted_delete = DELETE_ORDER.to_vec();
        let mut sorted_load = TARGET_TABLES.to_vec();
        sorted_delete.sort();
        sorted_load.sort();
        assert_eq!(sorted_delete, sorted_load);
    }
}
