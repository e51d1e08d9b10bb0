#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local index of FCC antenna structure registrations.
//!
//! [`TowerStore`] keeps the ASR `RA`/`CO`/`EN` records in a `DuckDB` file
//! (by default `data/towers/tower_index.duckdb`). Positions are converted
//! from DMS to decimal at import time so a corridor query is a plain
//! indexed range scan over the polygon's bounding box followed by an exact
//! point-in-polygon test.
//!
//! A store that has never completed an import answers queries with
//! [`TowerError::NotReady`] rather than an empty result.

pub mod fcc;
pub mod import;
pub mod paths;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use duckdb::Connection;
use duckdb::types::Value;
use link_corridor_geometry::membership::filter_candidates;
use link_corridor_geometry_models::{GeoPoint, Polygon};
use link_corridor_search_models::progress::ProgressCallback;
use link_corridor_search_models::{SearchItem, SearchSource};
use serde::Serialize;

pub use import::{ImportStats, KindStats, RecordSource};

/// Degrees added to each side of the polygon's bounding box before the
/// range scan (about 1 km of latitude).
pub const QUERY_BOX_PADDING_DEG: f64 = 0.01;

/// Errors from the tower store.
#[derive(Debug, thiserror::Error)]
pub enum TowerError {
    /// No import has ever completed against this store.
    #[error("Tower database at {location} has no imported data")]
    NotReady {
        /// The database file, or `:memory:`.
        location: String,
    },

    /// None of `RA.dat`, `CO.dat` or `EN.dat` were found.
    #[error("No FCC record files found in {dir}")]
    MissingData {
        /// The directory that was searched.
        dir: String,
    },

    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Optional attribute filters applied alongside the spatial query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TowerFilters {
    /// Minimum overall height above ground, meters.
    pub min_height_m: Option<f64>,
    /// Maximum overall height above ground, meters.
    pub max_height_m: Option<f64>,
    /// Structure type codes such as `TOWER`, `MTOWER` or `POLE`. Empty
    /// means any.
    pub structure_types: Vec<String>,
}

impl TowerFilters {
    #[must_use]
    pub const fn with_min_height_m(mut self, meters: f64) -> Self {
        self.min_height_m = Some(meters);
        self
    }

    #[must_use]
    pub const fn with_max_height_m(mut self, meters: f64) -> Self {
        self.max_height_m = Some(meters);
        self
    }

    #[must_use]
    pub fn with_structure_type(mut self, structure_type: &str) -> Self {
        self.structure_types.push(structure_type.to_uppercase());
        self
    }
}

/// A registered structure inside a search corridor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerRecord {
    pub unique_system_id: i64,
    pub registration_number: Option<String>,
    pub file_number: Option<String>,
    pub status_code: Option<String>,
    pub structure_type: Option<String>,
    pub height_structure_m: Option<f64>,
    pub overall_height_ground_m: Option<f64>,
    pub overall_height_amsl_m: Option<f64>,
    pub ground_elevation_m: Option<f64>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub point: GeoPoint,
    /// Owner entity name, or the owner's personal name.
    pub owner: Option<String>,
}

impl TowerRecord {
    /// Normalizes into a [`SearchItem`] keyed by registration number.
    #[must_use]
    pub fn to_search_item(&self) -> SearchItem {
        let source_id = self
            .registration_number
            .clone()
            .unwrap_or_else(|| self.unique_system_id.to_string());

        let place = match (&self.city, &self.state) {
            (Some(city), Some(state)) => format!(" in {city}, {state}"),
            (None, Some(state)) => format!(" in {state}"),
            _ => String::new(),
        };
        let title = format!(
            "{} {source_id}{place}",
            self.structure_type.as_deref().unwrap_or("Structure"),
        );

        SearchItem::new(SearchSource::Tower, source_id, title)
            .with_point(self.point)
            .with_attribute("uniqueSystemId", self.unique_system_id)
            .with_attribute("fileNumber", self.file_number.clone())
            .with_attribute("statusCode", self.status_code.clone())
            .with_attribute("structureType", self.structure_type.clone())
            .with_attribute("heightStructureM", self.height_structure_m)
            .with_attribute("overallHeightGroundM", self.overall_height_ground_m)
            .with_attribute("overallHeightAmslM", self.overall_height_amsl_m)
            .with_attribute("groundElevationM", self.ground_elevation_m)
            .with_attribute("street", self.street.clone())
            .with_attribute("owner", self.owner.clone())
    }
}

/// Summary of a store's contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerStats {
    pub registration_count: u64,
    pub coordinates_count: u64,
    pub entity_count: u64,
    /// Registrations per structure type; missing types are `UNKNOWN`.
    pub structure_type_counts: BTreeMap<String, u64>,
    pub min_height_m: Option<f64>,
    pub max_height_m: Option<f64>,
    pub avg_height_m: Option<f64>,
    pub imported_at: Option<String>,
    pub db_size_bytes: Option<u64>,
}

/// `DuckDB`-backed store of ASR records.
pub struct TowerStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl TowerStore {
    /// Opens (or creates) the store at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the parent directory, connection or
    /// schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, TowerError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::create_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens the store at [`paths::tower_db_path`].
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the store cannot be opened.
    pub fn open_default() -> Result<Self, TowerError> {
        Self::open(&paths::tower_db_path())
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, TowerError> {
        let conn = Connection::open_in_memory()?;
        schema::create_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// A second handle on the same database, for readers running while
    /// another handle imports.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the connection cannot be cloned.
    pub fn try_clone(&self) -> Result<Self, TowerError> {
        Ok(Self {
            conn: self.conn.try_clone()?,
            path: self.path.clone(),
        })
    }

    /// Where this store lives, for messages.
    #[must_use]
    pub fn location(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string())
    }

    /// Whether an import has completed.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the metadata lookup fails.
    pub fn is_ready(&self) -> Result<bool, TowerError> {
        Ok(schema::get_meta(&self.conn, schema::META_IMPORTED_AT)?.is_some())
    }

    /// Imports every record file in `source`, committing every
    /// [`import::IMPORT_COMMIT_EVERY`] rows, then rebuilds the indexes and
    /// marks the store ready. Re-importing unchanged files leaves the
    /// tables unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] on I/O or database failure. Unparseable lines
    /// are skipped and counted, not raised.
    pub fn import_batch(
        &mut self,
        source: RecordSource,
        progress: &dyn ProgressCallback,
    ) -> Result<ImportStats, TowerError> {
        log::info!("Importing FCC tower records into {}", self.location());

        schema::drop_indexes(&self.conn)?;
        let stats = import::import_all(&mut self.conn, source, progress)?;

        progress.set_message("Building indexes".to_string());
        schema::create_indexes(&self.conn)?;
        self.conn.execute_batch("ANALYZE;")?;

        schema::set_meta(
            &self.conn,
            schema::META_IMPORTED_AT,
            &chrono::Utc::now().to_rfc3339(),
        )?;

        progress.finish(format!(
            "Imported {} tower rows ({} skipped)",
            stats.total_written(),
            stats.total_skipped()
        ));

        Ok(stats)
    }

    /// Imports from `dir` unless an import has already completed.
    ///
    /// Returns the import statistics when an import ran.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if the files are missing or the import
    /// fails.
    pub fn ensure_imported(
        &mut self,
        dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<Option<ImportStats>, TowerError> {
        if self.is_ready()? {
            return Ok(None);
        }
        log::info!("Tower database is empty, importing from {}", dir.display());
        let source = RecordSource::from_dir(dir)?;
        self.import_batch(source, progress).map(Some)
    }

    /// Towers inside `polygon` that pass `filters`, in no particular
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError::NotReady`] before the first import, or a
    /// database error.
    pub fn query(
        &self,
        polygon: &Polygon,
        filters: &TowerFilters,
    ) -> Result<Vec<TowerRecord>, TowerError> {
        if !self.is_ready()? {
            return Err(TowerError::NotReady {
                location: self.location(),
            });
        }

        let bbox = polygon.bounding_box().expand_degrees(QUERY_BOX_PADDING_DEG);

        let mut sql = String::from(
            "SELECT r.unique_system_id, r.registration_number, r.file_number, r.status_code,
                    r.structure_type, r.height_structure, r.overall_height_ground,
                    r.overall_height_amsl, r.ground_elevation, r.structure_street,
                    r.structure_city, r.structure_state,
                    c.decimal_latitude, c.decimal_longitude,
                    e.entity_name, e.first_name, e.last_name
             FROM registration r
             JOIN coordinates c ON r.unique_system_id = c.unique_system_id
             LEFT JOIN entity e
                ON r.unique_system_id = e.unique_system_id AND e.contact_type = 'O'
             WHERE c.decimal_latitude BETWEEN ? AND ?
               AND c.decimal_longitude BETWEEN ? AND ?",
        );
        let mut params: Vec<Value> = vec![
            Value::Double(bbox.min_lat),
            Value::Double(bbox.max_lat),
            Value::Double(bbox.min_lon),
            Value::Double(bbox.max_lon),
        ];

        if let Some(min) = filters.min_height_m {
            sql.push_str(" AND r.overall_height_ground >= ?");
            params.push(Value::Double(min));
        }
        if let Some(max) = filters.max_height_m {
            sql.push_str(" AND r.overall_height_ground <= ?");
            params.push(Value::Double(max));
        }
        if !filters.structure_types.is_empty() {
            let placeholders = vec!["?"; filters.structure_types.len()].join(", ");
            sql.push_str(&format!(" AND r.structure_type IN ({placeholders})"));
            params.extend(filters.structure_types.iter().cloned().map(Value::Text));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params_from_iter(params))?;

        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let (Some(lat), Some(lon)) = (
                row.get::<_, Option<f64>>(12)?,
                row.get::<_, Option<f64>>(13)?,
            ) else {
                continue;
            };

            let owner = row.get::<_, Option<String>>(14)?.or_else(|| {
                let first = row.get::<_, Option<String>>(15).ok().flatten();
                let last = row.get::<_, Option<String>>(16).ok().flatten();
                match (first, last) {
                    (Some(f), Some(l)) => Some(format!("{f} {l}")),
                    (f, l) => f.or(l),
                }
            });

            candidates.push(TowerRecord {
                unique_system_id: row.get(0)?,
                registration_number: row.get(1)?,
                file_number: row.get(2)?,
                status_code: row.get(3)?,
                structure_type: row.get(4)?,
                height_structure_m: row.get(5)?,
                overall_height_ground_m: row.get(6)?,
                overall_height_amsl_m: row.get(7)?,
                ground_elevation_m: row.get(8)?,
                street: row.get(9)?,
                city: row.get(10)?,
                state: row.get(11)?,
                point: GeoPoint::new(lat, lon),
                owner,
            });
        }

        let in_box = candidates.len();
        let towers = filter_candidates(candidates, polygon, |t| t.point);
        log::info!(
            "Found {} towers within polygon ({in_box} in padded bounding box)",
            towers.len()
        );

        Ok(towers)
    }

    /// Counts, structure-type histogram and height range.
    ///
    /// # Errors
    ///
    /// Returns [`TowerError`] if a query fails.
    #[allow(clippy::cast_sign_loss)]
    pub fn stats(&self) -> Result<TowerStats, TowerError> {
        let count = |table: &str| -> Result<u64, TowerError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        };

        let mut structure_type_counts = BTreeMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT COALESCE(structure_type, 'UNKNOWN'), COUNT(*)
                 FROM registration GROUP BY 1",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let structure_type: String = row.get(0)?;
                let n: i64 = row.get(1)?;
                structure_type_counts.insert(structure_type, n.max(0) as u64);
            }
        }

        let (min_height_m, max_height_m, avg_height_m) = self.conn.query_row(
            "SELECT MIN(overall_height_ground), MAX(overall_height_ground),
                    AVG(overall_height_ground)
             FROM registration WHERE overall_height_ground IS NOT NULL",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )?;

        Ok(TowerStats {
            registration_count: count("registration")?,
            coordinates_count: count("coordinates")?,
            entity_count: count("entity")?,
            structure_type_counts,
            min_height_m,
            max_height_m,
            avg_height_m,
            imported_at: schema::get_meta(&self.conn, schema::META_IMPORTED_AT)?,
            db_size_bytes: self
                .path
                .as_ref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map(|m| m.len()),
        })
    }
}
