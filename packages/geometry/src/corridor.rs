//! Corridor construction.
//!
//! A corridor is the rectangle swept `half_width_m` either side of the
//! great circle between two link endpoints, with both ends pushed out by
//! `extension_m`. All four offsets use the bearings taken at the start
//! point, so both short edges are parallel.

use link_corridor_geometry_models::{Bearing, CorridorSpec, GeoPoint, Polygon};

use crate::GeometryError;
use crate::geodesy::{bearing, destination};

/// Segment count used by [`search_ring`] when callers have no preference.
pub const DEFAULT_RING_SEGMENTS: usize = 36;

/// Builds the corridor polygon for `spec`.
///
/// Corners come back as start-left, end-left, end-right, start-right.
///
/// # Errors
///
/// * [`GeometryError::Degenerate`] if start and end coincide.
/// * [`GeometryError::InvalidDistance`] if the half-width is not a
///   positive finite number or the extension is negative or not finite.
/// * [`GeometryError::InvalidPoint`] if either endpoint is out of range.
pub fn build(spec: &CorridorSpec) -> Result<Polygon, GeometryError> {
    if !spec.half_width_m.is_finite() || spec.half_width_m <= 0.0 {
        return Err(GeometryError::InvalidDistance {
            field: "half-width",
            value: spec.half_width_m,
        });
    }
    if !spec.extension_m.is_finite() || spec.extension_m < 0.0 {
        return Err(GeometryError::InvalidDistance {
            field: "extension",
            value: spec.extension_m,
        });
    }
    for point in [spec.start, spec.end] {
        if !point.is_valid() {
            return Err(GeometryError::InvalidPoint { point });
        }
    }
    if spec.is_degenerate() {
        return Err(GeometryError::Degenerate { point: spec.start });
    }

    let polygon = build_unchecked(spec);

    log::debug!(
        "Built corridor {} -> {} (±{:.1} m, extended {:.1} m): {:?}",
        spec.start,
        spec.end,
        spec.half_width_m,
        spec.extension_m,
        polygon.bounding_box(),
    );

    Ok(polygon)
}

/// Runs the corner construction without validating `spec`.
///
/// Coincident endpoints produce a polygon whose long edges have zero
/// length along the bearing (due north by convention).
#[must_use]
pub fn build_unchecked(spec: &CorridorSpec) -> Polygon {
    let forward = bearing(spec.start, spec.end);
    let reverse = forward.reverse();
    let left = forward.left();
    let right = forward.right();

    let extended_start = destination(spec.start, reverse, spec.extension_m);
    let extended_end = destination(spec.end, forward, spec.extension_m);

    Polygon::new([
        destination(extended_start, left, spec.half_width_m),
        destination(extended_end, left, spec.half_width_m),
        destination(extended_end, right, spec.half_width_m),
        destination(extended_start, right, spec.half_width_m),
    ])
}

/// Closed ring of `segments` points at `radius_m` around `center`,
/// starting due north and walking clockwise. The first point is repeated
/// at the end.
#[must_use]
pub fn search_ring(center: GeoPoint, radius_m: f64, segments: usize) -> Vec<GeoPoint> {
    let segments = segments.max(3);
    #[allow(clippy::cast_precision_loss)]
    let step = 360.0 / segments as f64;

    let mut ring: Vec<GeoPoint> = (0..segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let heading = Bearing::new(step * i as f64);
            destination(center, heading, radius_m)
        })
        .collect();
    ring.push(ring[0]);
    ring
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geodesy::{EARTH_RADIUS_M, distance_m, midpoint};
    use crate::membership::contains;
    use proptest::prelude::*;

    /// Random links between 60°S and 60°N with half-widths from about 3 m
    /// to 50 km.
    ///
    /// Lengths stay below `0.7 * sqrt(R * w)` and extensions below a fifth
    /// of that, which keeps the great circle's bow away from the straight
    /// lat/lon edges to well under half the half-width. Lengths also stay
    /// above `4 * w^2 / R` so the sag of the short edges cannot swallow
    /// the middle of a wide, short corridor.
    pub(crate) fn arb_spec() -> impl Strategy<Value = CorridorSpec> {
        (
            -60.0f64..60.0,
            -170.0f64..170.0,
            0.0f64..360.0,
            0.5f64..4.7,
            0.0f64..1.0,
            0.0f64..1.0,
        )
            .prop_map(|(lat, lon, heading, width_exp, length_frac, ext_frac)| {
                let half_width_m = 10f64.powf(width_exp);
                let max_len = (0.7 * (EARTH_RADIUS_M * half_width_m).sqrt()).min(200_000.0);
                let min_len = 50.0 + 4.0 * half_width_m * half_width_m / EARTH_RADIUS_M;
                let length = min_len + length_frac * (max_len - min_len);
                let start = GeoPoint::new(lat, lon);
                let end = destination(start, Bearing::new(heading), length);
                CorridorSpec::new(start, end, half_width_m, ext_frac * 0.2 * max_len)
            })
    }

    fn angle_between(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn pittsburgh_link() -> CorridorSpec {
        CorridorSpec::new(
            GeoPoint::new(40.0, -80.0),
            GeoPoint::new(40.0, -79.0),
            500.0,
            0.0,
        )
    }

    #[test]
    fn width_at_both_ends_is_twice_half_width() {
        let spec = pittsburgh_link().with_extension_m(304.8);
        let polygon = build(&spec).unwrap();

        let start_width = distance_m(polygon.start_left(), polygon.start_right());
        let end_width = distance_m(polygon.end_left(), polygon.end_right());

        assert!((start_width - 1_000.0).abs() / 1_000.0 < 0.005, "{start_width}");
        assert!((end_width - 1_000.0).abs() / 1_000.0 < 0.005, "{end_width}");
    }

    #[test]
    fn latitude_span_covers_half_width_either_side() {
        let polygon = build(&pittsburgh_link()).unwrap();
        let bbox = polygon.bounding_box();

        assert!(bbox.min_lat <= 40.0 - 0.0044, "{}", bbox.min_lat);
        assert!(bbox.min_lat >= 40.0 - 0.0050, "{}", bbox.min_lat);
        assert!(bbox.max_lat >= 40.0 + 0.0044, "{}", bbox.max_lat);
        // The great circle bows poleward between the endpoints, but the
        // corners sit at the ends.
        assert!(bbox.max_lat <= 40.0 + 0.0050, "{}", bbox.max_lat);
        assert!(bbox.min_lon <= -80.0 + 1e-9);
        assert!(bbox.max_lon >= -79.0 - 1e-9);
    }

    #[test]
    fn centerline_midpoint_is_inside() {
        let spec = CorridorSpec::new(
            GeoPoint::new(40.44, -79.99),
            GeoPoint::new(40.52, -79.80),
            150.0,
            300.0,
        );
        let polygon = build(&spec).unwrap();
        let mid = midpoint(spec.start, spec.end);
        assert!(contains(&mid, &polygon));
        assert!(contains(&spec.start, &polygon));
        assert!(contains(&spec.end, &polygon));
    }

    #[test]
    fn point_beyond_half_width_plus_extension_is_outside() {
        let spec = pittsburgh_link().with_extension_m(200.0);
        let polygon = build(&spec).unwrap();
        let forward = bearing(spec.start, spec.end);
        let reach = spec.half_width_m + spec.extension_m + 50.0;

        for heading in [forward.left(), forward.right(), forward.reverse()] {
            let outside = destination(spec.start, heading, reach);
            assert!(!contains(&outside, &polygon), "{outside} should be outside");
        }
        let beyond_end = destination(spec.end, forward, reach);
        assert!(!contains(&beyond_end, &polygon));
    }

    #[test]
    fn corners_are_ordered_left_then_right() {
        let polygon = build(&pittsburgh_link()).unwrap();
        // Travelling east, left is north.
        assert!(polygon.start_left().latitude > polygon.start_right().latitude);
        assert!(polygon.end_left().latitude > polygon.end_right().latitude);
        assert!(polygon.start_left().longitude < polygon.end_left().longitude);
    }

    #[test]
    fn coincident_endpoints_are_degenerate() {
        let point = GeoPoint::new(40.0, -80.0);
        let spec = CorridorSpec::new(point, point, 100.0, 0.0);
        assert!(matches!(build(&spec), Err(GeometryError::Degenerate { .. })));

        // The raw construction collapses to two coincident pairs.
        let raw = build_unchecked(&spec);
        assert!((raw.start_left().latitude - raw.end_left().latitude).abs() < 1e-12);
        assert!((raw.start_right().longitude - raw.end_right().longitude).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_half_width() {
        let spec = pittsburgh_link().with_half_width_m(0.0);
        assert!(matches!(
            build(&spec),
            Err(GeometryError::InvalidDistance {
                field: "half-width",
                ..
            })
        ));
        let spec = pittsburgh_link().with_extension_m(f64::NAN);
        assert!(build(&spec).is_err());
    }

    #[test]
    fn search_ring_is_closed_and_round() {
        let center = GeoPoint::new(40.0, -80.0);
        let ring = search_ring(center, 250.0, DEFAULT_RING_SEGMENTS);
        assert_eq!(ring.len(), DEFAULT_RING_SEGMENTS + 1);
        assert_eq!(ring.first(), ring.last());
        for point in &ring {
            assert!((distance_m(center, *point) - 250.0).abs() < 1e-6);
        }
    }

    proptest! {
        #[test]
        fn random_corridor_is_twice_half_width_wide(spec in arb_spec()) {
            let polygon = build(&spec).unwrap();
            let expected = 2.0 * spec.half_width_m;

            for (left, right) in [
                (polygon.start_left(), polygon.start_right()),
                (polygon.end_left(), polygon.end_right()),
            ] {
                let width = distance_m(left, right);
                prop_assert!((width - expected).abs() / expected < 0.005, "{width} vs {expected}");
            }
        }

        #[test]
        fn reverse_bearing_is_half_a_turn_away(spec in arb_spec()) {
            let forward = bearing(spec.start, spec.end);
            prop_assert!((angle_between(forward.reverse().degrees(), forward.degrees()) - 180.0).abs() < 1e-9);

            // Measured back from the end, the great circle has turned by
            // the meridian convergence, which never exceeds the longitude
            // span for these lengths.
            let back = bearing(spec.end, spec.start);
            let span = (spec.end.longitude - spec.start.longitude).abs();
            prop_assert!(
                angle_between(back.degrees(), forward.reverse().degrees()) <= span * 1.05 + 1e-6,
                "back {} forward {} span {span}",
                back.degrees(),
                forward.degrees()
            );
        }

        #[test]
        fn random_corridor_contains_its_centerline(spec in arb_spec()) {
            let polygon = build(&spec).unwrap();
            let mid = midpoint(spec.start, spec.end);
            prop_assert!(contains(&mid, &polygon), "midpoint {mid} outside {polygon:?}");

            // With little or no extension the endpoints sit on the short
            // edges, which bow slightly in lat/lon.
            if spec.extension_m >= 0.05 * spec.half_width_m + 1.0 {
                prop_assert!(contains(&spec.start, &polygon));
                prop_assert!(contains(&spec.end, &polygon));
            }
        }

        #[test]
        fn random_corridor_excludes_points_past_its_edges(spec in arb_spec()) {
            let polygon = build(&spec).unwrap();
            let forward = bearing(spec.start, spec.end);
            let reach = spec.half_width_m + spec.extension_m + (0.25 * spec.half_width_m).max(10.0);

            for heading in [forward.left(), forward.right(), forward.reverse()] {
                let outside = destination(spec.start, heading, reach);
                prop_assert!(!contains(&outside, &polygon), "{outside} should be outside");
            }
            let beyond_end = destination(spec.end, forward, reach);
            prop_assert!(!contains(&beyond_end, &polygon), "{beyond_end} should be outside");
        }
    }
}
