//! Spherical-Earth geodesy.
//!
//! All functions take and return decimal degrees and meters; radians are
//! used only internally. Poles and the antimeridian get no special
//! treatment.

use link_corridor_geometry_models::{Bearing, GeoPoint};

/// Mean Earth radius used by every calculation in this crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Initial great-circle bearing from `from` towards `to`.
///
/// Returns due north when the points coincide.
#[must_use]
pub fn bearing(from: GeoPoint, to: GeoPoint) -> Bearing {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos().mul_add(lat2.sin(), -(lat1.sin() * lat2.cos() * dlon.cos()));

    Bearing::new(y.atan2(x).to_degrees())
}

/// The point reached by travelling `distance_m` along a great circle
/// starting at `from` on the initial `bearing`.
#[must_use]
pub fn destination(from: GeoPoint, bearing: Bearing, distance_m: f64) -> GeoPoint {
    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let theta = bearing.radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let lat2 = lat1
        .sin()
        .mul_add(delta.cos(), lat1.cos() * delta.sin() * theta.cos())
        .asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos())
            .atan2(lat1.sin().mul_add(-lat2.sin(), delta.cos()));

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Great-circle (haversine) distance in meters.
#[must_use]
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (lat1.cos() * lat2.cos()).mul_add((dlon / 2.0).sin().powi(2), (dlat / 2.0).sin().powi(2));
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}

/// Great-circle midpoint of two points.
#[must_use]
pub fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let bx = lat2.cos() * dlon.cos();
    let by = lat2.cos() * dlon.sin();

    let lat = (lat1.sin() + lat2.sin()).atan2((lat1.cos() + bx).hypot(by));
    let lon = lon1 + by.atan2(lat1.cos() + bx);

    GeoPoint::new(lat.to_degrees(), lon.to_degrees())
}

/// Signed distance in meters from `point` to the great circle through
/// `path_start` and `path_end`. Negative values lie left of the path.
#[must_use]
pub fn cross_track_distance_m(point: GeoPoint, path_start: GeoPoint, path_end: GeoPoint) -> f64 {
    let angular_13 = distance_m(path_start, point) / EARTH_RADIUS_M;
    let theta_13 = bearing(path_start, point).radians();
    let theta_12 = bearing(path_start, path_end).radians();

    (angular_13.sin() * (theta_13 - theta_12).sin()).asin() * EARTH_RADIUS_M
}
