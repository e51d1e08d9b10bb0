//! Table layout and the `_meta` key/value table.
//!
//! Three tables mirror the ASR files and share `unique_system_id` as their
//! key. Secondary indexes are dropped before a bulk load and rebuilt after
//! it, since `DuckDB` will not upsert rows whose indexed columns change.

use duckdb::Connection;

use crate::TowerError;

/// `_meta` key set once an import has completed.
pub const META_IMPORTED_AT: &str = "imported_at";

pub(crate) fn create_schema(conn: &Connection) -> Result<(), TowerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS registration (
            unique_system_id BIGINT PRIMARY KEY,
            file_number TEXT,
            registration_number TEXT,
            application_purpose TEXT,
            status_code TEXT,
            date_entered TEXT,
            date_received TEXT,
            date_issued TEXT,
            date_constructed TEXT,
            date_dismantled TEXT,
            date_action TEXT,
            structure_street TEXT,
            structure_city TEXT,
            structure_state TEXT,
            county_code TEXT,
            zip_code TEXT,
            height_structure DOUBLE,
            ground_elevation DOUBLE,
            overall_height_ground DOUBLE,
            overall_height_amsl DOUBLE,
            structure_type TEXT,
            date_faa_determination TEXT,
            faa_study_number TEXT,
            faa_circular_number TEXT,
            specification_option INTEGER,
            painting_and_lighting TEXT
        );

        CREATE TABLE IF NOT EXISTS coordinates (
            unique_system_id BIGINT PRIMARY KEY,
            coordinate_type TEXT,
            latitude_degrees DOUBLE,
            latitude_minutes DOUBLE,
            latitude_seconds DOUBLE,
            latitude_direction TEXT,
            latitude_total_seconds DOUBLE,
            longitude_degrees DOUBLE,
            longitude_minutes DOUBLE,
            longitude_seconds DOUBLE,
            longitude_direction TEXT,
            longitude_total_seconds DOUBLE,
            decimal_latitude DOUBLE,
            decimal_longitude DOUBLE
        );

        CREATE TABLE IF NOT EXISTS entity (
            unique_system_id BIGINT NOT NULL,
            contact_type TEXT NOT NULL,
            entity_type TEXT,
            entity_name TEXT,
            first_name TEXT,
            middle_initial TEXT,
            last_name TEXT,
            phone TEXT,
            street_address TEXT,
            city TEXT,
            state TEXT,
            zip_code TEXT,
            PRIMARY KEY (unique_system_id, contact_type)
        );

        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    Ok(())
}

pub(crate) fn create_indexes(conn: &Connection) -> Result<(), TowerError> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_coordinates_lat_lon
            ON coordinates (decimal_latitude, decimal_longitude);
         CREATE INDEX IF NOT EXISTS idx_registration_structure_type
            ON registration (structure_type);
         CREATE INDEX IF NOT EXISTS idx_registration_height
            ON registration (overall_height_ground);",
    )?;
    Ok(())
}

pub(crate) fn drop_indexes(conn: &Connection) -> Result<(), TowerError> {
    conn.execute_batch(
        "DROP INDEX IF EXISTS idx_coordinates_lat_lon;
         DROP INDEX IF EXISTS idx_registration_structure_type;
         DROP INDEX IF EXISTS idx_registration_height;",
    )?;
    Ok(())
}

/// Gets a value from the `_meta` table.
///
/// # Errors
///
/// Returns [`TowerError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, TowerError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    match stmt.query_row([key], |row| row.get(0)) {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(TowerError::DuckDb(e)),
    }
}

/// Sets a value in the `_meta` table.
///
/// # Errors
///
/// Returns [`TowerError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), TowerError> {
    conn.execute(
        "INSERT OR REPLACE INTO _meta (key, value) VALUES (?, ?)",
        duckdb::params![key, value],
    )?;
    Ok(())
}
