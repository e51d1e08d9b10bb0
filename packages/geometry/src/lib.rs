#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry kernel for radio-link corridor searches.
//!
//! - [`geodesy`]: spherical bearing, destination point and haversine
//!   distance on a sphere of radius [`geodesy::EARTH_RADIUS_M`].
//! - [`corridor`]: builds the four-cornered search polygon around a link.
//! - [`membership`]: bounding-box pre-filter plus ray-casting
//!   point-in-polygon.
//! - [`coordinates`]: degrees-minutes-seconds parsing and conversion.
//! - [`diagnostics`]: measured-versus-requested width checks.
//!
//! Everything here is pure and thread-safe.

pub mod coordinates;
pub mod corridor;
pub mod diagnostics;
pub mod geodesy;
pub mod membership;
pub mod units;

pub use link_corridor_geometry_models::{Bearing, BoundingBox, CorridorSpec, GeoPoint, Polygon};

/// Errors raised while building corridor geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Start and end are the same point, so there is no bearing to build
    /// a corridor along.
    #[error("Degenerate corridor: start and end are both {point}")]
    Degenerate {
        /// The shared endpoint.
        point: GeoPoint,
    },

    /// The half-width or extension is negative, zero where it must be
    /// positive, or not finite.
    #[error("Invalid {field}: {value}")]
    InvalidDistance {
        /// Which parameter was rejected.
        field: &'static str,
        /// The rejected value in meters.
        value: f64,
    },

    /// An endpoint lies outside the valid latitude/longitude ranges.
    #[error("Invalid endpoint {point}")]
    InvalidPoint {
        /// The rejected endpoint.
        point: GeoPoint,
    },
}
