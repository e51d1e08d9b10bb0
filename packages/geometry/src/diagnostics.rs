//! Sanity checks on a built corridor.
//!
//! Measures the finished polygon with the haversine formula and compares
//! it against what was asked for. Handy when a search returns nothing and
//! the question is whether the corridor itself is wrong.

use link_corridor_geometry_models::{BoundingBox, CorridorSpec, Polygon};
use serde::Serialize;

use crate::GeometryError;
use crate::corridor::build;
use crate::geodesy::{cross_track_distance_m, distance_m};

/// Allowed difference between requested and measured width, in meters.
pub const WIDTH_TOLERANCE_M: f64 = 3.0;

/// Measurements of a corridor against its [`CorridorSpec`].
#[derive(Debug, Clone, Serialize)]
pub struct CorridorDiagnostics {
    pub spec: CorridorSpec,
    pub polygon: Polygon,
    pub bounds: BoundingBox,
    /// Great-circle distance between the two endpoints.
    pub path_length_m: f64,
    /// Requested total width (twice the half-width).
    pub expected_width_m: f64,
    pub width_at_start_m: f64,
    pub width_at_end_m: f64,
    /// Full length (path plus both extensions) times total width.
    pub approximate_area_sq_m: f64,
    /// Signed distance of each corner from the centerline great circle,
    /// in polygon corner order. Left corners are negative.
    pub corner_offsets_m: [f64; 4],
    /// Largest difference between a corner's offset and the half-width.
    pub max_offset_error_m: f64,
    pub width_matches_input: bool,
    pub consistent_width: bool,
    pub offsets_match_half_width: bool,
}

/// Builds the corridor for `spec` and measures it.
///
/// # Errors
///
/// Returns [`GeometryError`] if the corridor cannot be built.
pub fn diagnose_corridor(spec: &CorridorSpec) -> Result<CorridorDiagnostics, GeometryError> {
    let polygon = build(spec)?;
    Ok(measure(spec, polygon))
}

/// Measures an already-built polygon.
#[must_use]
pub fn measure(spec: &CorridorSpec, polygon: Polygon) -> CorridorDiagnostics {
    let path_length_m = distance_m(spec.start, spec.end);
    let expected_width_m = spec.half_width_m * 2.0;
    let width_at_start_m = distance_m(polygon.start_left(), polygon.start_right());
    let width_at_end_m = distance_m(polygon.end_left(), polygon.end_right());
    let full_length_m = 2.0f64.mul_add(spec.extension_m, path_length_m);

    let corners = *polygon.corners();
    let corner_offsets_m =
        corners.map(|corner| cross_track_distance_m(corner, spec.start, spec.end));
    let max_offset_error_m = corner_offsets_m
        .iter()
        .map(|offset| (offset.abs() - spec.half_width_m).abs())
        .fold(0.0, f64::max);

    let diagnostics = CorridorDiagnostics {
        spec: *spec,
        polygon,
        bounds: *polygon.bounding_box(),
        path_length_m,
        expected_width_m,
        width_at_start_m,
        width_at_end_m,
        approximate_area_sq_m: full_length_m * expected_width_m,
        corner_offsets_m,
        max_offset_error_m,
        width_matches_input: (width_at_start_m - expected_width_m).abs() < WIDTH_TOLERANCE_M,
        consistent_width: (width_at_start_m - width_at_end_m).abs() < WIDTH_TOLERANCE_M,
        offsets_match_half_width: max_offset_error_m < WIDTH_TOLERANCE_M,
    };

    if !diagnostics.width_matches_input || !diagnostics.consistent_width {
        log::warn!(
            "Corridor width off: expected {:.1} m, measured {:.1} m at start and {:.1} m at end",
            expected_width_m,
            width_at_start_m,
            width_at_end_m,
        );
    }
    if !diagnostics.offsets_match_half_width {
        log::warn!(
            "Corridor corners drift up to {max_offset_error_m:.1} m from the requested \
             half-width off the great-circle path"
        );
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_corridor_geometry_models::GeoPoint;

    #[test]
    fn short_link_passes_width_checks() {
        let spec = CorridorSpec::new(
            GeoPoint::new(40.44, -79.99),
            GeoPoint::new(40.52, -79.80),
            304.8,
            304.8,
        );
        let report = diagnose_corridor(&spec).unwrap();
        assert!(report.width_matches_input);
        assert!(report.consistent_width);
        assert!(report.path_length_m > 17_000.0 && report.path_length_m < 19_000.0);
        assert!(report.approximate_area_sq_m > report.path_length_m * 609.0);

        assert!(report.offsets_match_half_width, "{}", report.max_offset_error_m);
        let [start_left, end_left, end_right, start_right] = report.corner_offsets_m;
        assert!(start_left < 0.0 && end_left < 0.0);
        assert!(start_right > 0.0 && end_right > 0.0);
        assert!((start_left + 304.8).abs() < 0.01, "{start_left}");
    }

    #[test]
    fn long_extended_link_drifts_off_the_great_circle() {
        // Both ends use the start bearing, which differs from the path's
        // bearing at the far end by several degrees over 600 km at 40N.
        let spec = CorridorSpec::new(
            GeoPoint::new(40.0, -80.0),
            GeoPoint::new(40.0, -73.0),
            500.0,
            1_000.0,
        );
        let report = diagnose_corridor(&spec).unwrap();

        assert!(report.width_matches_input);
        assert!(!report.offsets_match_half_width);
        assert!(report.max_offset_error_m > 10.0, "{}", report.max_offset_error_m);
        // The start corners sit on the perpendicular at the start.
        assert!((report.corner_offsets_m[0] + 500.0).abs() < 0.01);
        assert!((report.corner_offsets_m[3] - 500.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_spec_is_an_error() {
        let point = GeoPoint::new(1.0, 1.0);
        assert!(diagnose_corridor(&CorridorSpec::new(point, point, 10.0, 0.0)).is_err());
    }
}
