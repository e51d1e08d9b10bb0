//! Point-in-polygon membership.
//!
//! Membership is decided in two phases: a cheap bounding-box test, then
//! the even-odd ray-casting test on survivors. Longitude is the X axis and
//! latitude the Y axis. Points exactly on an edge may land either way.

use link_corridor_geometry_models::{BoundingBox, GeoPoint, Polygon};

/// The polygon's cached bounding box.
#[must_use]
pub const fn bounding_box(polygon: &Polygon) -> BoundingBox {
    *polygon.bounding_box()
}

/// Ray-casting membership test against the corridor polygon.
#[must_use]
pub fn contains(point: &GeoPoint, polygon: &Polygon) -> bool {
    ring_contains(point, polygon.corners())
}

/// Even-odd ray-casting test against an arbitrary ring of vertices.
///
/// The ring may or may not repeat its first vertex at the end; a repeated
/// closing vertex contributes a zero-length edge that never toggles.
#[must_use]
pub fn ring_contains(point: &GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Box test followed by [`contains`].
#[must_use]
pub fn prefiltered_contains(point: &GeoPoint, polygon: &Polygon) -> bool {
    polygon.bounding_box().contains_point(point) && contains(point, polygon)
}

/// Keeps the items whose position falls inside `polygon`, running the box
/// test before the exact test.
pub fn filter_candidates<T>(
    items: impl IntoIterator<Item = T>,
    polygon: &Polygon,
    position: impl Fn(&T) -> GeoPoint,
) -> Vec<T> {
    let bbox = polygon.bounding_box();
    let mut in_box = 0usize;

    let matched: Vec<T> = items
        .into_iter()
        .filter(|item| {
            let point = position(item);
            if !bbox.contains_point(&point) {
                return false;
            }
            in_box += 1;
            contains(&point, polygon)
        })
        .collect();

    log::trace!(
        "Membership filter: {in_box} candidates in box, {} inside polygon",
        matched.len()
    );

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corridor::build;
    use crate::corridor::tests::arb_spec;
    use crate::geodesy::{bearing, destination, distance_m};
    use geo::{Contains, Intersects};
    use link_corridor_geometry_models::CorridorSpec;
    use proptest::prelude::*;

    fn diamond() -> Polygon {
        Polygon::new([
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(2.0, 1.0),
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(0.0, 1.0),
        ])
    }

    fn slanted() -> Polygon {
        Polygon::new([
            GeoPoint::new(40.004, -80.0),
            GeoPoint::new(40.204, -79.0),
            GeoPoint::new(40.196, -79.0),
            GeoPoint::new(39.996, -80.0),
        ])
    }

    #[test]
    fn center_is_inside_and_box_corner_is_outside() {
        let polygon = diamond();
        assert!(contains(&GeoPoint::new(1.0, 1.0), &polygon));
        // Inside the bounding box but outside the diamond.
        assert!(!contains(&GeoPoint::new(0.1, 0.1), &polygon));
        assert!(bounding_box(&polygon).contains_point(&GeoPoint::new(0.1, 0.1)));
    }

    #[test]
    fn latitude_is_the_vertical_axis() {
        // A tall thin box: 0..10 in latitude, 0..1 in longitude.
        let tall = Polygon::new([
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(10.0, 0.0),
            GeoPoint::new(10.0, 1.0),
            GeoPoint::new(0.0, 1.0),
        ]);
        assert!(contains(&GeoPoint::new(5.0, 0.5), &tall));
        assert!(!contains(&GeoPoint::new(0.5, 5.0), &tall));
    }

    #[test]
    fn closed_ring_gives_same_answer() {
        let polygon = diamond();
        let ring = polygon.closed_ring();
        for point in [GeoPoint::new(1.0, 1.0), GeoPoint::new(0.1, 0.1)] {
            assert_eq!(ring_contains(&point, &ring), contains(&point, &polygon));
        }
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        let ring = [GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!ring_contains(&GeoPoint::new(0.5, 0.5), &ring));
    }

    #[test]
    fn filter_candidates_keeps_only_interior_points() {
        let points = vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(0.1, 0.1),
            GeoPoint::new(5.0, 5.0),
            GeoPoint::new(1.5, 1.0),
        ];
        let inside = filter_candidates(points, &diamond(), |p| *p);
        assert_eq!(inside, vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(1.5, 1.0)]);
    }

    /// A corridor plus points scattered around it: along-track from half
    /// a length before the start to half a length past the end, and up to
    /// twice the half-width either side.
    fn arb_corridor_with_points() -> impl Strategy<Value = (CorridorSpec, Vec<GeoPoint>)> {
        (
            arb_spec(),
            prop::collection::vec((-0.5f64..1.5, -2.0f64..2.0), 1..40),
        )
            .prop_map(|(spec, offsets)| {
                let forward = bearing(spec.start, spec.end);
                let length = distance_m(spec.start, spec.end);
                let points = offsets
                    .into_iter()
                    .map(|(along, across)| {
                        let on_line = if along >= 0.0 {
                            destination(spec.start, forward, along * length)
                        } else {
                            destination(spec.start, forward.reverse(), -along * length)
                        };
                        let side = if across >= 0.0 { forward.right() } else { forward.left() };
                        destination(on_line, side, across.abs() * spec.half_width_m)
                    })
                    .collect();
                (spec, points)
            })
    }

    fn arb_corner() -> impl Strategy<Value = GeoPoint> {
        (-1.0f64..1.0, -1.0f64..1.0).prop_map(|(lat, lon)| GeoPoint::new(40.0 + lat, -80.0 + lon))
    }

    proptest! {
        #[test]
        fn box_prefilter_agrees_on_random_corridors((spec, points) in arb_corridor_with_points()) {
            let polygon = build(&spec).unwrap();
            let bbox = bounding_box(&polygon);
            for point in &points {
                if contains(point, &polygon) {
                    prop_assert!(bbox.contains_point(point), "{point} inside but outside {bbox:?}");
                }
                prop_assert_eq!(prefiltered_contains(point, &polygon), contains(point, &polygon));
            }
            prop_assert_eq!(
                filter_candidates(points.clone(), &polygon, |p| *p),
                points.into_iter().filter(|p| contains(p, &polygon)).collect::<Vec<_>>()
            );
        }

        #[test]
        fn box_prefilter_agrees_on_arbitrary_quadrilaterals(
            a in arb_corner(),
            b in arb_corner(),
            c in arb_corner(),
            d in arb_corner(),
            point in arb_corner(),
        ) {
            // Self-intersecting rings included: even-odd crossings still
            // cancel out for any point outside the box.
            let polygon = Polygon::new([a, b, c, d]);
            if contains(&point, &polygon) {
                prop_assert!(polygon.bounding_box().contains_point(&point));
            }
            prop_assert_eq!(prefiltered_contains(&point, &polygon), contains(&point, &polygon));
        }

        #[test]
        fn box_prefilter_never_rejects_a_member(
            lat in 39.9f64..40.3,
            lon in -80.1f64..-78.9,
        ) {
            let polygon = slanted();
            let point = GeoPoint::new(lat, lon);
            if contains(&point, &polygon) {
                prop_assert!(polygon.bounding_box().contains_point(&point));
            }
            prop_assert_eq!(prefiltered_contains(&point, &polygon), contains(&point, &polygon));
        }

        #[test]
        fn agrees_with_geo_contains_off_the_boundary(
            lat in 39.9f64..40.3,
            lon in -80.1f64..-78.9,
        ) {
            let polygon = slanted();
            let exterior: Vec<(f64, f64)> = polygon
                .closed_ring()
                .iter()
                .map(|p| (p.longitude, p.latitude))
                .collect();
            let reference = geo::Polygon::new(geo::LineString::from(exterior), vec![]);
            let point = geo::Point::new(lon, lat);
            prop_assume!(!reference.exterior().intersects(&point));

            prop_assert_eq!(
                contains(&GeoPoint::new(lat, lon), &polygon),
                reference.contains(&point)
            );
        }
    }
}
