//! Cross-checks the polygon test against plain centerline distance.
//!
//! A turbine within `half_width_m` of the centerline, and whose projection
//! falls on the extended path, should always be inside the corridor. Any
//! that the polygon test rejects are reported as missing.

use link_corridor_geometry::{GeometryError, corridor, geodesy, membership};
use link_corridor_geometry_models::CorridorSpec;
use serde::Serialize;

use crate::{Turbine, TurbineStore, project_onto_path};

/// Meters added around the corridor bounding box when gathering
/// candidates, so near misses show up in the report.
pub const DIAGNOSTIC_BOX_PADDING_M: f64 = 5_000.0;

/// How many of the nearest turbines a report lists by default.
pub const DEFAULT_CLOSEST: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurbineDistance {
    pub turbine: Turbine,
    /// Perpendicular distance to the centerline, meters.
    pub distance_m: f64,
    /// Signed position along the path from the start, meters. Negative
    /// before the start; past the path length after the end.
    pub along_track_m: f64,
    pub in_polygon: bool,
    pub expected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurbineDiagnostics {
    pub spec: CorridorSpec,
    pub path_length_m: f64,
    pub total_in_box: usize,
    pub found_in_polygon: usize,
    pub expected_in_polygon: usize,
    /// Nearest turbines to the centerline, closest first.
    pub closest: Vec<TurbineDistance>,
    /// Within the corridor by distance but rejected by the polygon test.
    pub expected_but_missing: Vec<TurbineDistance>,
}

impl TurbineDiagnostics {
    /// `true` when the polygon test agreed with centerline distance for
    /// every candidate.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.expected_but_missing.is_empty()
    }
}

impl TurbineStore {
    /// Measures every turbine near the corridor described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the corridor cannot be built.
    pub fn diagnose(
        &self,
        spec: &CorridorSpec,
        closest: usize,
    ) -> Result<TurbineDiagnostics, GeometryError> {
        let polygon = corridor::build(spec)?;
        let bbox = polygon
            .bounding_box()
            .expand_meters(DIAGNOSTIC_BOX_PADDING_M);
        let path_length_m = geodesy::distance_m(spec.start, spec.end);

        let mut measured: Vec<TurbineDistance> = self
            .in_box(&bbox)
            .map(|turbine| {
                let (fraction, foot) = project_onto_path(turbine.point, spec.start, spec.end)
                    .unwrap_or((0.0, spec.start));
                let distance_m = geodesy::distance_m(turbine.point, foot);
                let along_track_m = fraction * path_length_m;
                let expected = distance_m <= spec.half_width_m
                    && along_track_m >= -spec.extension_m
                    && along_track_m <= path_length_m + spec.extension_m;

                TurbineDistance {
                    turbine: turbine.clone(),
                    distance_m,
                    along_track_m,
                    in_polygon: membership::contains(&turbine.point, &polygon),
                    expected,
                }
            })
            .collect();

        measured.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

        let total_in_box = measured.len();
        let found_in_polygon = measured.iter().filter(|m| m.in_polygon).count();
        let expected_in_polygon = measured.iter().filter(|m| m.expected).count();
        let expected_but_missing: Vec<TurbineDistance> = measured
            .iter()
            .filter(|m| m.expected && !m.in_polygon)
            .cloned()
            .collect();

        if !expected_but_missing.is_empty() {
            log::warn!(
                "{} turbines within {:.0} m of the centerline fell outside the corridor polygon",
                expected_but_missing.len(),
                spec.half_width_m
            );
        }
        log::info!(
            "Turbine diagnostics: {total_in_box} in padded box, {found_in_polygon} in polygon, \
             {expected_in_polygon} expected"
        );

        measured.truncate(closest);

        Ok(TurbineDiagnostics {
            spec: *spec,
            path_length_m,
            total_in_box,
            found_in_polygon,
            expected_in_polygon,
            closest: measured,
            expected_but_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uswtdb::tests::SAMPLE_GEOJSON;
    use link_corridor_geometry_models::GeoPoint;

    fn spec() -> CorridorSpec {
        CorridorSpec::new(
            GeoPoint::new(40.0, -80.0),
            GeoPoint::new(40.0, -79.0),
            500.0,
            0.0,
        )
    }

    #[test]
    fn report_agrees_with_polygon_for_sample() {
        let store = TurbineStore::from_geojson_str(SAMPLE_GEOJSON).unwrap();
        let report = store.diagnose(&spec(), DEFAULT_CLOSEST).unwrap();

        assert_eq!(report.total_in_box, 2);
        assert_eq!(report.found_in_polygon, 1);
        assert_eq!(report.expected_in_polygon, 1);
        assert!(report.is_consistent());
        assert_eq!(report.closest[0].turbine.case_id, Some(3001));
        assert!(report.closest[0].distance_m < report.closest[1].distance_m);
    }

    #[test]
    fn closest_list_is_truncated() {
        let store = TurbineStore::from_geojson_str(SAMPLE_GEOJSON).unwrap();
        let report = store.diagnose(&spec(), 1).unwrap();
        assert_eq!(report.closest.len(), 1);
        assert_eq!(report.total_in_box, 2);
    }

    #[test]
    fn turbine_past_the_end_is_not_expected() {
        let store = TurbineStore::new(vec![Turbine {
            case_id: Some(1),
            point: GeoPoint::new(40.0, -78.99),
            state: None,
            county: None,
            project: None,
            year: None,
            manufacturer: None,
            model: None,
            capacity_kw: None,
            hub_height_m: None,
            rotor_diameter_m: None,
            rotor_swept_area_sq_m: None,
            total_height_m: None,
        }]);
        let report = store.diagnose(&spec(), DEFAULT_CLOSEST).unwrap();
        assert_eq!(report.total_in_box, 1);
        assert_eq!(report.expected_in_polygon, 0);
        assert_eq!(report.found_in_polygon, 0);
    }

    #[test]
    fn degenerate_corridor_is_an_error() {
        let store = TurbineStore::new(Vec::new());
        let point = GeoPoint::new(40.0, -80.0);
        let result = store.diagnose(&CorridorSpec::new(point, point, 500.0, 0.0), 10);
        assert!(matches!(result, Err(GeometryError::Degenerate { .. })));
    }
}
