//! Bulk import of ASR record files.
//!
//! Each file is streamed line by line, parsed into typed rows and upserted
//! in chunks of [`IMPORT_COMMIT_EVERY`], one transaction per chunk. Bad
//! lines are counted and skipped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use duckdb::{Connection, Statement, ToSql};
use link_corridor_search_models::progress::ProgressCallback;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::TowerError;
use crate::fcc::{
    Coordinates, Entity, RecordError, RecordKind, Registration, read_latin1_line, split_fields,
};

/// Rows per upsert statement and per committed transaction.
pub const IMPORT_COMMIT_EVERY: usize = 1_000;

/// Lines between progress log messages.
const LOG_EVERY: u64 = 10_000;

/// The readers for one import. Any of the three may be absent.
#[derive(Default)]
pub struct RecordSource {
    readers: BTreeMap<RecordKind, Box<dyn BufRead + Send>>,
}

impl RecordSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `RA.dat`, `CO.dat` and `EN.dat` from an extracted ASR
    /// archive. Missing files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError::MissingData`] if none of the three exist, or
    /// an I/O error if one exists but cannot be opened.
    pub fn from_dir(dir: &Path) -> Result<Self, TowerError> {
        let mut source = Self::new();
        for kind in RecordKind::iter() {
            let path = dir.join(kind.file_name());
            if path.is_file() {
                log::info!("Found {kind} records at {}", path.display());
                source = source.with_reader(kind, BufReader::new(File::open(&path)?));
            } else {
                log::warn!("{kind} record file not found: {}", path.display());
            }
        }

        if source.readers.is_empty() {
            return Err(TowerError::MissingData {
                dir: dir.display().to_string(),
            });
        }
        Ok(source)
    }

    /// Adds or replaces the reader for one record kind.
    #[must_use]
    pub fn with_reader(mut self, kind: RecordKind, reader: impl BufRead + Send + 'static) -> Self {
        self.readers.insert(kind, Box::new(reader));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

/// Per-file outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    /// Non-blank lines read.
    pub lines: u64,
    /// Rows written (after in-chunk de-duplication).
    pub written: u64,
    /// Lines that failed to parse.
    pub skipped: u64,
}

/// Outcome of [`crate::TowerStore::import_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub registrations: KindStats,
    pub coordinates: KindStats,
    pub entities: KindStats,
}

impl ImportStats {
    #[must_use]
    pub const fn total_written(&self) -> u64 {
        self.registrations.written + self.coordinates.written + self.entities.written
    }

    #[must_use]
    pub const fn total_skipped(&self) -> u64 {
        self.registrations.skipped + self.coordinates.skipped + self.entities.skipped
    }
}

/// A parsed record that maps onto one table row.
pub(crate) trait TowerRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Conflict key; rows sharing a key within one chunk keep the last.
    fn key(&self) -> (i64, &str);

    fn bind(&self, binder: &mut Binder<'_, '_>) -> duckdb::Result<()>;
}

/// Binds positional parameters left to right.
pub(crate) struct Binder<'s, 'c> {
    stmt: &'s mut Statement<'c>,
    next: usize,
}

impl Binder<'_, '_> {
    fn push<T: ToSql>(&mut self, value: T) -> duckdb::Result<&mut Self> {
        self.stmt.raw_bind_parameter(self.next, value)?;
        self.next += 1;
        Ok(self)
    }
}

impl TowerRow for Registration {
    const TABLE: &'static str = "registration";
    const COLUMNS: &'static [&'static str] = &[
        "unique_system_id",
        "file_number",
        "registration_number",
        "application_purpose",
        "status_code",
        "date_entered",
        "date_received",
        "date_issued",
        "date_constructed",
        "date_dismantled",
        "date_action",
        "structure_street",
        "structure_city",
        "structure_state",
        "county_code",
        "zip_code",
        "height_structure",
        "ground_elevation",
        "overall_height_ground",
        "overall_height_amsl",
        "structure_type",
        "date_faa_determination",
        "faa_study_number",
        "faa_circular_number",
        "specification_option",
        "painting_and_lighting",
    ];

    fn key(&self) -> (i64, &str) {
        (self.unique_system_id, "")
    }

    fn bind(&self, b: &mut Binder<'_, '_>) -> duckdb::Result<()> {
        b.push(self.unique_system_id)?
            .push(self.file_number.as_deref())?
            .push(self.registration_number.as_deref())?
            .push(self.application_purpose.as_deref())?
            .push(self.status_code.as_deref())?
            .push(self.date_entered.as_deref())?
            .push(self.date_received.as_deref())?
            .push(self.date_issued.as_deref())?
            .push(self.date_constructed.as_deref())?
            .push(self.date_dismantled.as_deref())?
            .push(self.date_action.as_deref())?
            .push(self.structure_street.as_deref())?
            .push(self.structure_city.as_deref())?
            .push(self.structure_state.as_deref())?
            .push(self.county_code.as_deref())?
            .push(self.zip_code.as_deref())?
            .push(self.height_structure)?
            .push(self.ground_elevation)?
            .push(self.overall_height_ground)?
            .push(self.overall_height_amsl)?
            .push(self.structure_type.as_deref())?
            .push(self.date_faa_determination.as_deref())?
            .push(self.faa_study_number.as_deref())?
            .push(self.faa_circular_number.as_deref())?
            .push(self.specification_option)?
            .push(self.painting_and_lighting.as_deref())?;
        Ok(())
    }
}

impl TowerRow for Coordinates {
    const TABLE: &'static str = "coordinates";
    const COLUMNS: &'static [&'static str] = &[
        "unique_system_id",
        "coordinate_type",
        "latitude_degrees",
        "latitude_minutes",
        "latitude_seconds",
        "latitude_direction",
        "latitude_total_seconds",
        "longitude_degrees",
        "longitude_minutes",
        "longitude_seconds",
        "longitude_direction",
        "longitude_total_seconds",
        "decimal_latitude",
        "decimal_longitude",
    ];

    fn key(&self) -> (i64, &str) {
        (self.unique_system_id, "")
    }

    fn bind(&self, b: &mut Binder<'_, '_>) -> duckdb::Result<()> {
        b.push(self.unique_system_id)?
            .push(self.coordinate_type.as_deref())?
            .push(self.latitude_degrees)?
            .push(self.latitude_minutes)?
            .push(self.latitude_seconds)?
            .push(self.latitude_direction.as_deref())?
            .push(self.latitude_total_seconds)?
            .push(self.longitude_degrees)?
            .push(self.longitude_minutes)?
            .push(self.longitude_seconds)?
            .push(self.longitude_direction.as_deref())?
            .push(self.longitude_total_seconds)?
            .push(self.decimal_latitude)?
            .push(self.decimal_longitude)?;
        Ok(())
    }
}

impl TowerRow for Entity {
    const TABLE: &'static str = "entity";
    const COLUMNS: &'static [&'static str] = &[
        "unique_system_id",
        "contact_type",
        "entity_type",
        "entity_name",
        "first_name",
        "middle_initial",
        "last_name",
        "phone",
        "street_address",
        "city",
        "state",
        "zip_code",
    ];

    fn key(&self) -> (i64, &str) {
        (self.unique_system_id, &self.contact_type)
    }

    fn bind(&self, b: &mut Binder<'_, '_>) -> duckdb::Result<()> {
        b.push(self.unique_system_id)?
            .push(self.contact_type.as_str())?
            .push(self.entity_type.as_deref())?
            .push(self.entity_name.as_deref())?
            .push(self.first_name.as_deref())?
            .push(self.middle_initial.as_deref())?
            .push(self.last_name.as_deref())?
            .push(self.phone.as_deref())?
            .push(self.street_address.as_deref())?
            .push(self.city.as_deref())?
            .push(self.state.as_deref())?
            .push(self.zip_code.as_deref())?;
        Ok(())
    }
}

/// Streams every reader in `source` into the tables.
pub(crate) fn import_all(
    conn: &mut Connection,
    source: RecordSource,
    progress: &dyn ProgressCallback,
) -> Result<ImportStats, TowerError> {
    let mut stats = ImportStats::default();

    for (kind, mut reader) in source.readers {
        progress.set_message(format!("Importing {kind} records"));
        let kind_stats = match kind {
            RecordKind::Registration => {
                import_kind(conn, kind, reader.as_mut(), Registration::parse, progress)?
            }
            RecordKind::Coordinates => {
                import_kind(conn, kind, reader.as_mut(), Coordinates::parse, progress)?
            }
            RecordKind::Entity => import_kind(conn, kind, reader.as_mut(), Entity::parse, progress)?,
        };

        log::info!(
            "Imported {kind}: {} lines, {} rows written, {} skipped",
            kind_stats.lines,
            kind_stats.written,
            kind_stats.skipped,
        );

        match kind {
            RecordKind::Registration => stats.registrations = kind_stats,
            RecordKind::Coordinates => stats.coordinates = kind_stats,
            RecordKind::Entity => stats.entities = kind_stats,
        }
    }

    Ok(stats)
}

fn import_kind<R: TowerRow>(
    conn: &mut Connection,
    kind: RecordKind,
    reader: &mut dyn BufRead,
    parse: fn(&[&str]) -> Result<R, RecordError>,
    progress: &dyn ProgressCallback,
) -> Result<KindStats, TowerError> {
    let mut stats = KindStats::default();
    let mut batch: Vec<R> = Vec::with_capacity(IMPORT_COMMIT_EVERY);
    let mut bytes = Vec::new();
    let mut line = String::new();
    let mut line_number = 0u64;

    while read_latin1_line(reader, &mut bytes, &mut line)? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        match parse(&split_fields(&line)) {
            Ok(row) => batch.push(row),
            Err(e) => {
                stats.skipped += 1;
                log::warn!("Skipping {kind} line {line_number}: {e}");
            }
        }

        if batch.len() >= IMPORT_COMMIT_EVERY {
            stats.written += upsert_committed(conn, &batch)?;
            progress.inc(batch.len() as u64);
            batch.clear();
        }

        if stats.lines % LOG_EVERY == 0 {
            log::info!("Processed {} {kind} records", stats.lines);
        }
    }

    if !batch.is_empty() {
        stats.written += upsert_committed(conn, &batch)?;
        progress.inc(batch.len() as u64);
    }

    Ok(stats)
}

fn upsert_committed<R: TowerRow>(conn: &mut Connection, rows: &[R]) -> Result<u64, TowerError> {
    let tx = conn.transaction()?;
    let written = upsert(&tx, rows)?;
    tx.commit()?;
    Ok(written)
}

/// Writes `rows` with a single multi-row `INSERT OR REPLACE`.
///
/// Returns the number of rows written.
pub(crate) fn upsert<R: TowerRow>(conn: &Connection, rows: &[R]) -> Result<u64, TowerError> {
    if rows.is_empty() {
        return Ok(0);
    }

    // One statement cannot touch the same key twice.
    let mut last_seen: BTreeMap<(i64, &str), usize> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_seen.insert(row.key(), i);
    }
    let deduped: Vec<&R> = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| last_seen.get(&row.key()) == Some(i))
        .map(|(_, row)| row)
        .collect();

    if deduped.len() < rows.len() {
        log::debug!(
            "Deduplicated {} batch: {} -> {} rows",
            R::TABLE,
            rows.len(),
            deduped.len(),
        );
    }

    let placeholders = format!("({})", vec!["?"; R::COLUMNS.len()].join(", "));
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES {}",
        R::TABLE,
        R::COLUMNS.join(", "),
        vec![placeholders.as_str(); deduped.len()].join(", "),
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut binder = Binder {
        stmt: &mut stmt,
        next: 1,
    };
    for row in &deduped {
        row.bind(&mut binder)?;
    }

    let written = stmt.raw_execute()?;
    Ok(u64::try_from(written).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcc::tests::{CO_LINE, EN_LINE, RA_LINE};

    #[test]
    fn from_dir_without_files_is_missing_data() {
        let dir = std::env::temp_dir().join("link_corridor_towers_empty_dir_test");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            RecordSource::from_dir(&dir),
            Err(TowerError::MissingData { .. })
        ));
    }

    #[test]
    fn upsert_keeps_last_row_per_key() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::schema::create_schema(&conn).unwrap();

        let first = Entity::parse(&split_fields(EN_LINE)).unwrap();
        let mut second = first.clone();
        second.entity_name = Some("Renamed Towers".to_string());

        let written = upsert_committed(&mut conn, &[first, second]).unwrap();
        assert_eq!(written, 1);

        let name: String = conn
            .query_row("SELECT entity_name FROM entity", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Renamed Towers");
    }

    #[test]
    fn import_counts_skipped_lines() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::schema::create_schema(&conn).unwrap();

        let ra = format!("{RA_LINE}\nRA|garbage\n\n");
        let source = RecordSource::new()
            .with_reader(RecordKind::Registration, std::io::Cursor::new(ra.into_bytes()))
            .with_reader(RecordKind::Coordinates, std::io::Cursor::new(CO_LINE.as_bytes().to_vec()));

        let stats = import_all(
            &mut conn,
            source,
            link_corridor_search_models::progress::null_progress().as_ref(),
        )
        .unwrap();

        assert_eq!(stats.registrations.lines, 2);
        assert_eq!(stats.registrations.written, 1);
        assert_eq!(stats.registrations.skipped, 1);
        assert_eq!(stats.coordinates.written, 1);
        assert_eq!(stats.entities, KindStats::default());
        assert_eq!(stats.total_written(), 2);
    }
}
