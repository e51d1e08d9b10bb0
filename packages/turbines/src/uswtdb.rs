//! Readers for US Wind Turbine Database exports.
//!
//! The GeoJSON export carries positions in the feature geometry; the CSV
//! export carries them in the `xlong`/`ylat` columns. Both share the same
//! attribute names (`case_id`, `t_state`, `p_name`, ...). Older releases
//! used `-9999` for unknown numeric values, and some use `NA`; both read as
//! missing.

use std::io::Read;

use geojson::GeoJson;
use link_corridor_geometry_models::GeoPoint;
use serde::{Deserialize, Deserializer};

use crate::{Turbine, TurbineError};

/// Numeric values at or below this are the database's "unknown" marker.
const MISSING_SENTINEL: f64 = -9_000.0;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(v)) => Some(v),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(value.filter(|v| v.is_finite() && *v > MISSING_SENTINEL))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Text(s)) => Some(s.trim().to_string()),
        Some(NumberOrText::Number(v)) => Some(v.to_string()),
        None => None,
    };
    Ok(value.filter(|s| !s.is_empty() && s != "NA"))
}

/// One USWTDB row, before its position has been resolved.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UswtdbRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    case_id: Option<f64>,
    #[serde(default, rename = "t_state", deserialize_with = "lenient_text")]
    state: Option<String>,
    #[serde(default, rename = "t_county", deserialize_with = "lenient_text")]
    county: Option<String>,
    #[serde(default, rename = "p_name", deserialize_with = "lenient_text")]
    project: Option<String>,
    #[serde(default, rename = "p_year", deserialize_with = "lenient_f64")]
    year: Option<f64>,
    #[serde(default, rename = "t_manu", deserialize_with = "lenient_text")]
    manufacturer: Option<String>,
    #[serde(default, rename = "t_model", deserialize_with = "lenient_text")]
    model: Option<String>,
    #[serde(default, rename = "t_cap", deserialize_with = "lenient_f64")]
    capacity_kw: Option<f64>,
    #[serde(default, rename = "t_hh", deserialize_with = "lenient_f64")]
    hub_height_m: Option<f64>,
    #[serde(default, rename = "t_rd", deserialize_with = "lenient_f64")]
    rotor_diameter_m: Option<f64>,
    #[serde(default, rename = "t_rsa", deserialize_with = "lenient_f64")]
    rotor_swept_area_sq_m: Option<f64>,
    #[serde(default, rename = "t_ttlh", deserialize_with = "lenient_f64")]
    total_height_m: Option<f64>,
    #[serde(default, rename = "xlong", deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
    #[serde(default, rename = "ylat", deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
}

impl UswtdbRecord {
    #[allow(clippy::cast_possible_truncation)]
    fn into_turbine(self, point: GeoPoint) -> Turbine {
        Turbine {
            case_id: self.case_id.map(|v| v as i64),
            point,
            state: self.state,
            county: self.county,
            project: self.project,
            year: self.year.map(|v| v as i32),
            manufacturer: self.manufacturer,
            model: self.model,
            capacity_kw: self.capacity_kw,
            hub_height_m: self.hub_height_m,
            rotor_diameter_m: self.rotor_diameter_m,
            rotor_swept_area_sq_m: self.rotor_swept_area_sq_m,
            total_height_m: self.total_height_m,
        }
    }

    fn column_point(&self) -> Option<GeoPoint> {
        GeoPoint::checked(self.latitude?, self.longitude?)
    }
}

/// Parses a USWTDB `FeatureCollection`. Features without a usable point
/// are skipped.
pub(crate) fn parse_geojson(text: &str) -> Result<Vec<Turbine>, TurbineError> {
    let geojson: GeoJson = text.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(TurbineError::UnexpectedGeoJson);
    };

    let mut turbines = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let record: UswtdbRecord = match feature.properties {
            Some(props) => serde_json::from_value(serde_json::Value::Object(props))?,
            None => UswtdbRecord::default(),
        };

        let geometry_point = feature.geometry.and_then(|g| match g.value {
            geojson::Value::Point(coords) if coords.len() >= 2 => {
                GeoPoint::checked(coords[1], coords[0])
            }
            _ => None,
        });

        match geometry_point.or_else(|| record.column_point()) {
            Some(point) => turbines.push(record.into_turbine(point)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} turbine features without a valid point");
    }

    Ok(turbines)
}

/// Parses a USWTDB CSV export with a header row.
pub(crate) fn parse_csv(reader: impl Read) -> Result<Vec<Turbine>, TurbineError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut turbines = Vec::new();
    let mut skipped = 0usize;

    for row in rdr.deserialize::<UswtdbRecord>() {
        let record = row?;
        match record.column_point() {
            Some(point) => turbines.push(record.into_turbine(point)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} turbine rows without a valid xlong/ylat");
    }

    Ok(turbines)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-79.5, 40.001] },
                "properties": {
                    "case_id": 3001, "t_state": "PA", "t_county": "Somerset County",
                    "p_name": "Ridge Line", "p_year": 2012, "t_manu": "GE Wind",
                    "t_model": "GE1.5-77", "t_cap": 1500, "t_hh": 80, "t_rd": 77,
                    "t_rsa": 4656.6, "t_ttlh": 118.5
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-79.5, 40.02] },
                "properties": {
                    "case_id": 3002, "t_state": "PA", "p_name": "Ridge Line",
                    "p_year": 2012, "t_hh": -9999, "t_ttlh": "NA"
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-78.9, 41.5] },
                "properties": { "case_id": 3003, "t_state": "NY", "p_name": "Far Away" }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "case_id": 3004 }
            }
        ]
    }"#;

    #[test]
    fn geojson_reads_points_from_geometry() {
        let turbines = parse_geojson(SAMPLE_GEOJSON).unwrap();
        assert_eq!(turbines.len(), 3);

        let first = &turbines[0];
        assert_eq!(first.case_id, Some(3001));
        assert!((first.point.latitude - 40.001).abs() < 1e-12);
        assert!((first.point.longitude + 79.5).abs() < 1e-12);
        assert_eq!(first.project.as_deref(), Some("Ridge Line"));
        assert_eq!(first.year, Some(2012));
        assert_eq!(first.total_height_m, Some(118.5));
    }

    #[test]
    fn sentinel_and_na_values_read_as_missing() {
        let turbines = parse_geojson(SAMPLE_GEOJSON).unwrap();
        let second = &turbines[1];
        assert_eq!(second.hub_height_m, None);
        assert_eq!(second.total_height_m, None);
    }

    #[test]
    fn geojson_that_is_not_a_collection_is_rejected() {
        let result = parse_geojson(r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#);
        assert!(matches!(result, Err(TurbineError::UnexpectedGeoJson)));
    }

    #[test]
    fn csv_reads_xlong_ylat_and_ignores_extra_columns() {
        let csv = "case_id,faa_ors,t_state,p_name,p_year,t_manu,t_model,t_cap,t_hh,t_rd,t_ttlh,xlong,ylat\n\
                   3001,42-012345,PA,Ridge Line,2012,GE Wind,GE1.5-77,1500,80,77,118.5,-79.5,40.001\n\
                   3005,,PA,Ridge Line,,,,,,,,,\n";
        let turbines = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(turbines.len(), 1);
        assert_eq!(turbines[0].case_id, Some(3001));
        assert_eq!(turbines[0].capacity_kw, Some(1500.0));
        assert_eq!(turbines[0].manufacturer.as_deref(), Some("GE Wind"));
    }
}
