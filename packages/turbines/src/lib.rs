#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory index of wind turbine locations.
//!
//! Turbines are bulk-loaded into an R-tree keyed by `[lon, lat]` so a
//! corridor query is an envelope lookup with the polygon's bounding box
//! followed by the exact point-in-polygon test. Nothing is persisted; the
//! source dataset is re-read on every load.

pub mod diagnostics;
mod uswtdb;

use std::path::Path;

use link_corridor_geometry::geodesy;
use link_corridor_geometry::membership;
use link_corridor_geometry_models::{BoundingBox, GeoPoint, Polygon};
use link_corridor_search_models::{SearchItem, SearchSource};
use rstar::{AABB, RTree, RTreeObject};
use serde::Serialize;

pub use diagnostics::{TurbineDiagnostics, TurbineDistance};

/// Errors from loading a turbine dataset.
#[derive(Debug, thiserror::Error)]
pub enum TurbineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Turbine GeoJSON must be a FeatureCollection")]
    UnexpectedGeoJson,

    #[error("Unsupported turbine dataset format: {path}")]
    UnsupportedFormat { path: String },
}

/// A single turbine. Dimensions are meters, capacity kilowatts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turbine {
    /// USWTDB `case_id`.
    pub case_id: Option<i64>,
    pub point: GeoPoint,
    pub state: Option<String>,
    pub county: Option<String>,
    pub project: Option<String>,
    pub year: Option<i32>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capacity_kw: Option<f64>,
    pub hub_height_m: Option<f64>,
    pub rotor_diameter_m: Option<f64>,
    pub rotor_swept_area_sq_m: Option<f64>,
    /// Blade tip height at its highest point.
    pub total_height_m: Option<f64>,
}

impl Turbine {
    /// Identifier used for deduplication: the case id, or the position
    /// when the record has none.
    #[must_use]
    pub fn source_id(&self) -> String {
        self.case_id.map_or_else(
            || format!("{:.6},{:.6}", self.point.latitude, self.point.longitude),
            |id| id.to_string(),
        )
    }

    /// Normalizes into a [`SearchItem`].
    #[must_use]
    pub fn to_search_item(&self) -> SearchItem {
        let model = match (&self.manufacturer, &self.model) {
            (Some(manu), Some(model)) => format!("{manu} {model} turbine"),
            (Some(manu), None) => format!("{manu} turbine"),
            (None, Some(model)) => format!("{model} turbine"),
            (None, None) => "Turbine".to_string(),
        };
        let title = self
            .project
            .as_ref()
            .map_or_else(|| model.clone(), |project| format!("{model} ({project})"));

        SearchItem::new(SearchSource::Turbine, self.source_id(), title)
            .with_point(self.point)
            .with_attribute("caseId", self.case_id)
            .with_attribute("state", self.state.clone())
            .with_attribute("county", self.county.clone())
            .with_attribute("project", self.project.clone())
            .with_attribute("year", self.year)
            .with_attribute("capacityKw", self.capacity_kw)
            .with_attribute("hubHeightM", self.hub_height_m)
            .with_attribute("rotorDiameterM", self.rotor_diameter_m)
            .with_attribute("totalHeightM", self.total_height_m)
    }
}

struct TurbineEntry(Turbine);

impl RTreeObject for TurbineEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.0.point.longitude, self.0.point.latitude])
    }
}

fn envelope_of(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat])
}

/// Turbines indexed by position.
pub struct TurbineStore {
    tree: RTree<TurbineEntry>,
}

impl TurbineStore {
    /// Bulk-loads `turbines` into a new index.
    #[must_use]
    pub fn new(turbines: Vec<Turbine>) -> Self {
        let entries = turbines.into_iter().map(TurbineEntry).collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Builds a store from a USWTDB GeoJSON `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// Returns [`TurbineError`] if the text is not a feature collection
    /// or a feature's properties cannot be read.
    pub fn from_geojson_str(text: &str) -> Result<Self, TurbineError> {
        Ok(Self::new(uswtdb::parse_geojson(text)?))
    }

    /// Builds a store from a USWTDB CSV export.
    ///
    /// # Errors
    ///
    /// Returns [`TurbineError`] if the CSV cannot be read.
    pub fn from_csv_reader(reader: impl std::io::Read) -> Result<Self, TurbineError> {
        Ok(Self::new(uswtdb::parse_csv(reader)?))
    }

    /// Reads a GeoJSON file.
    ///
    /// # Errors
    ///
    /// Returns [`TurbineError`] if the file cannot be read or parsed.
    pub fn load_geojson(path: &Path) -> Result<Self, TurbineError> {
        let text = std::fs::read_to_string(path)?;
        let store = Self::from_geojson_str(&text)?;
        log::info!("Loaded {} turbines from {}", store.len(), path.display());
        Ok(store)
    }

    /// Reads a dataset file, choosing the format from its extension
    /// (`.geojson`/`.json` or `.csv`).
    ///
    /// # Errors
    ///
    /// Returns [`TurbineError::UnsupportedFormat`] for other extensions,
    /// or any read/parse error.
    pub fn load(path: &Path) -> Result<Self, TurbineError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("geojson" | "json") => Self::load_geojson(path),
            Some("csv") => {
                let store = Self::from_csv_reader(std::fs::File::open(path)?)?;
                log::info!("Loaded {} turbines from {}", store.len(), path.display());
                Ok(store)
            }
            _ => Err(TurbineError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Turbines whose position falls inside `bbox`, edges included.
    pub fn in_box<'a>(&'a self, bbox: &BoundingBox) -> impl Iterator<Item = &'a Turbine> + 'a {
        self.tree
            .locate_in_envelope_intersecting(&envelope_of(bbox))
            .map(|entry| &entry.0)
    }

    /// Turbines inside `polygon`, in no particular order.
    #[must_use]
    pub fn query(&self, polygon: &Polygon) -> Vec<&Turbine> {
        let turbines: Vec<&Turbine> = self
            .in_box(polygon.bounding_box())
            .filter(|t| membership::contains(&t.point, polygon))
            .collect();
        log::debug!("Found {} turbines within polygon", turbines.len());
        turbines
    }

    /// Every turbine in `state` (two-letter code, case-insensitive).
    #[must_use]
    pub fn query_state(&self, state: &str) -> Vec<&Turbine> {
        self.tree
            .iter()
            .map(|entry| &entry.0)
            .filter(|t| {
                t.state
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(state))
            })
            .collect()
    }
}

/// Where `point` projects onto the line through `path_start` and
/// `path_end`, as a fraction of the path (0 at start, 1 at end), together
/// with the projected foot. `None` for a zero-length path.
///
/// The projection is done in degree space, which is close enough over a
/// corridor's width.
#[must_use]
pub fn project_onto_path(
    point: GeoPoint,
    path_start: GeoPoint,
    path_end: GeoPoint,
) -> Option<(f64, GeoPoint)> {
    let dlat = path_end.latitude - path_start.latitude;
    let dlon = path_end.longitude - path_start.longitude;
    let length_sq = dlat.mul_add(dlat, dlon * dlon);

    if length_sq == 0.0 {
        return None;
    }

    let t = (point.latitude - path_start.latitude)
        .mul_add(dlat, (point.longitude - path_start.longitude) * dlon)
        / length_sq;
    let foot = GeoPoint::new(
        t.mul_add(dlat, path_start.latitude),
        t.mul_add(dlon, path_start.longitude),
    );

    Some((t, foot))
}

/// Perpendicular distance in meters from `point` to the infinite line
/// through `path_start` and `path_end`.
///
/// The foot of the perpendicular comes from [`project_onto_path`]; the
/// distance to it is haversine. A zero-length path gives the distance to
/// `path_start`.
#[must_use]
pub fn distance_from_centerline(point: GeoPoint, path_start: GeoPoint, path_end: GeoPoint) -> f64 {
    project_onto_path(point, path_start, path_end).map_or_else(
        || geodesy::distance_m(point, path_start),
        |(_, foot)| geodesy::distance_m(point, foot),
    )
}
