#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Value types shared by the corridor geometry kernel and every search
//! backend.
//!
//! Everything here is an immutable `Copy` value. Construction helpers do
//! the cheap normalization (bearing wrap-around, cached bounding box); the
//! trigonometry lives in `link_corridor_geometry`.

use serde::{Deserialize, Serialize};

/// Approximate length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point without range checking.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a point, returning `None` when either coordinate is
    /// non-finite or outside `[-90, 90]` / `[-180, 180]`.
    #[must_use]
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let point = Self::new(latitude, longitude);
        point.is_valid().then_some(point)
    }

    /// Whether both coordinates are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A compass bearing in degrees, always normalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bearing(f64);

impl Bearing {
    /// Due north.
    pub const NORTH: Self = Self(0.0);

    /// Wraps any finite angle into `[0, 360)`.
    #[must_use]
    pub fn new(degrees: f64) -> Self {
        let wrapped = degrees.rem_euclid(360.0);
        // rem_euclid can round tiny negative inputs up to exactly 360.0
        if wrapped >= 360.0 {
            Self(0.0)
        } else {
            Self(wrapped)
        }
    }

    /// The bearing in degrees.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        self.0
    }

    /// The bearing in radians.
    #[must_use]
    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Rotates the bearing by `delta` degrees (clockwise when positive).
    #[must_use]
    pub fn rotate(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }

    /// The opposite direction.
    #[must_use]
    pub fn reverse(self) -> Self {
        self.rotate(180.0)
    }

    /// Perpendicular to the left of travel.
    #[must_use]
    pub fn left(self) -> Self {
        self.rotate(-90.0)
    }

    /// Perpendicular to the right of travel.
    #[must_use]
    pub fn right(self) -> Self {
        self.rotate(90.0)
    }
}

/// Axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lon: first.longitude,
            max_lon: first.longitude,
        };
        for point in iter {
            bbox.min_lat = bbox.min_lat.min(point.latitude);
            bbox.max_lat = bbox.max_lat.max(point.latitude);
            bbox.min_lon = bbox.min_lon.min(point.longitude);
            bbox.max_lon = bbox.max_lon.max(point.longitude);
        }
        Some(bbox)
    }

    /// Inclusive containment test on both axes.
    #[must_use]
    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }

    /// Grows every edge outward by `degrees`.
    #[must_use]
    pub fn expand_degrees(&self, degrees: f64) -> Self {
        Self {
            min_lat: self.min_lat - degrees,
            max_lat: self.max_lat + degrees,
            min_lon: self.min_lon - degrees,
            max_lon: self.max_lon + degrees,
        }
    }

    /// Grows every edge outward by roughly `meters`, scaling the longitude
    /// padding by the cosine of the box's central latitude.
    #[must_use]
    pub fn expand_meters(&self, meters: f64) -> Self {
        let lat_pad = meters / METERS_PER_DEGREE_LAT;
        let cos_lat = self.center().latitude.to_radians().cos().abs().max(1e-6);
        let lon_pad = meters / (METERS_PER_DEGREE_LAT * cos_lat);
        Self {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lon: self.min_lon - lon_pad,
            max_lon: self.max_lon + lon_pad,
        }
    }

    /// The midpoint of the box.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Four-cornered search corridor.
///
/// Corners are ordered start-left, end-left, end-right, start-right so the
/// ring can be walked in order and closed back to the first vertex. The
/// bounding box is computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolygonCorners")]
pub struct Polygon {
    corners: [GeoPoint; 4],
    bounds: BoundingBox,
}

#[derive(Deserialize)]
struct PolygonCorners {
    corners: [GeoPoint; 4],
}

impl From<PolygonCorners> for Polygon {
    fn from(value: PolygonCorners) -> Self {
        Self::new(value.corners)
    }
}

impl Polygon {
    /// Builds a polygon from corners in start-left, end-left, end-right,
    /// start-right order.
    #[must_use]
    pub fn new(corners: [GeoPoint; 4]) -> Self {
        let [a, b, c, d] = corners;
        let bounds = BoundingBox {
            min_lat: a.latitude.min(b.latitude).min(c.latitude).min(d.latitude),
            max_lat: a.latitude.max(b.latitude).max(c.latitude).max(d.latitude),
            min_lon: a.longitude.min(b.longitude).min(c.longitude).min(d.longitude),
            max_lon: a.longitude.max(b.longitude).max(c.longitude).max(d.longitude),
        };
        Self { corners, bounds }
    }

    /// All four corners in ring order.
    #[must_use]
    pub const fn corners(&self) -> &[GeoPoint; 4] {
        &self.corners
    }

    /// The cached bounding box.
    #[must_use]
    pub const fn bounding_box(&self) -> &BoundingBox {
        &self.bounds
    }

    #[must_use]
    pub const fn start_left(&self) -> GeoPoint {
        self.corners[0]
    }

    #[must_use]
    pub const fn end_left(&self) -> GeoPoint {
        self.corners[1]
    }

    #[must_use]
    pub const fn end_right(&self) -> GeoPoint {
        self.corners[2]
    }

    #[must_use]
    pub const fn start_right(&self) -> GeoPoint {
        self.corners[3]
    }

    /// The corners followed by the first corner again.
    #[must_use]
    pub fn closed_ring(&self) -> Vec<GeoPoint> {
        let mut ring = self.corners.to_vec();
        ring.push(self.corners[0]);
        ring
    }
}

/// Inputs for a corridor: two link endpoints, the distance from the
/// centerline to each long edge, and how far to run past each endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorridorSpec {
    /// Near end of the link.
    pub start: GeoPoint,
    /// Far end of the link.
    pub end: GeoPoint,
    /// Centerline-to-edge distance in meters. Total width is twice this.
    pub half_width_m: f64,
    /// Distance in meters the corridor extends past each endpoint.
    pub extension_m: f64,
}

impl CorridorSpec {
    #[must_use]
    pub const fn new(start: GeoPoint, end: GeoPoint, half_width_m: f64, extension_m: f64) -> Self {
        Self {
            start,
            end,
            half_width_m,
            extension_m,
        }
    }

    /// Same endpoints and extension with a different half-width.
    #[must_use]
    pub const fn with_half_width_m(mut self, half_width_m: f64) -> Self {
        self.half_width_m = half_width_m;
        self
    }

    /// Same endpoints and half-width with a different extension.
    #[must_use]
    pub const fn with_extension_m(mut self, extension_m: f64) -> Self {
        self.extension_m = extension_m;
        self
    }

    /// Whether both endpoints are the same point.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}
