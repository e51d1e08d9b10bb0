//! Query construction for the products endpoint.

use chrono::NaiveDate;
use link_corridor_geometry_models::{CorridorSpec, Polygon};

use crate::service::LidarService;

/// One corridor's LIDAR search: where, when, and how wide the corridor
/// was built (needed to suggest a wider one).
#[derive(Debug, Clone, PartialEq)]
pub struct LidarQuery {
    pub polygon: Polygon,
    pub half_width_m: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LidarQuery {
    #[must_use]
    pub const fn new(polygon: Polygon, half_width_m: f64, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            polygon,
            half_width_m,
            start,
            end,
        }
    }

    /// Query for a polygon already built from `spec`.
    #[must_use]
    pub const fn for_corridor(
        spec: &CorridorSpec,
        polygon: Polygon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self::new(polygon, spec.half_width_m, start, end)
    }
}

/// The polygon as `"lon lat,lon lat,..."`, corners in order.
#[must_use]
pub fn polygon_param(polygon: &Polygon) -> String {
    polygon
        .corners()
        .iter()
        .map(|p| format!("{} {}", p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .join(",")
}

/// A single page request: the full query string and its offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub params: Vec<(&'static str, String)>,
    pub offset: usize,
    pub page_size: usize,
}

impl PageRequest {
    #[must_use]
    pub fn new(service: &LidarService, query: &LidarQuery, offset: usize) -> Self {
        let params = vec![
            ("polygon", polygon_param(&query.polygon)),
            ("datasets", service.datasets.clone()),
            ("prodFormats", service.prod_formats.clone()),
            ("outputFormat", "JSON".to_string()),
            ("dateType", service.date_type.clone()),
            ("start", query.start.format("%Y-%m-%d").to_string()),
            ("end", query.end.format("%Y-%m-%d").to_string()),
            ("maxResults", service.page_size.to_string()),
            ("offset", offset.to_string()),
        ];

        Self {
            params,
            offset,
            page_size: service.page_size,
        }
    }

    /// Looks up a parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::default_service;
    use link_corridor_geometry_models::GeoPoint;

    fn polygon() -> Polygon {
        Polygon::new([
            GeoPoint::new(40.5, -80.0),
            GeoPoint::new(40.5, -79.0),
            GeoPoint::new(40.0, -79.0),
            GeoPoint::new(40.0, -80.0),
        ])
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn polygon_is_lon_lat_pairs() {
        assert_eq!(
            polygon_param(&polygon()),
            "-80 40.5,-79 40.5,-79 40,-80 40"
        );
    }

    #[test]
    fn page_request_carries_every_parameter() {
        let service = default_service().unwrap();
        let query = LidarQuery::new(polygon(), 300.0, date("2015-01-01"), date("2024-12-31"));
        let request = PageRequest::new(&service, &query, 50);

        assert_eq!(request.param("datasets"), Some("Lidar Point Cloud (LPC)"));
        assert_eq!(request.param("prodFormats"), Some("LAZ"));
        assert_eq!(request.param("outputFormat"), Some("JSON"));
        assert_eq!(request.param("dateType"), Some("dateCreated"));
        assert_eq!(request.param("start"), Some("2015-01-01"));
        assert_eq!(request.param("end"), Some("2024-12-31"));
        assert_eq!(request.param("maxResults"), Some("25"));
        assert_eq!(request.param("offset"), Some("50"));
        assert_eq!(request.offset, 50);
    }
}
