//! Length unit conversions.

/// Meters in one international foot.
pub const METERS_PER_FOOT: f64 = 0.3048;

#[must_use]
pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

#[must_use]
pub fn meters_to_feet(meters: f64) -> f64 {
    meters / METERS_PER_FOOT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_feet_is_three_hundred_meters_and_change() {
        assert!((feet_to_meters(1_000.0) - 304.8).abs() < 1e-9);
        assert!((meters_to_feet(304.8) - 1_000.0).abs() < 1e-9);
    }
}
