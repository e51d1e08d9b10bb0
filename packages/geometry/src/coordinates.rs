//! Degrees-minutes-seconds coordinate handling.
//!
//! Accepts the FCC dash form (`40-26-46.0 N`), the symbol form
//! (`40°26'46"N`), whitespace-separated triples (`40 26 46 N`) and plain
//! signed decimals (`-79.982`). Southern and western hemispheres are
//! negative.

use std::str::FromStr;
use std::sync::LazyLock;

use link_corridor_geometry_models::GeoPoint;
use regex::Regex;
use strum_macros::{AsRefStr, Display, EnumString};

/// Degrees, minutes and seconds separated by dashes, degree/minute/second
/// symbols or whitespace, followed by a hemisphere letter.
static DMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\d+(?:\.\d+)?)\s*[-°º\s]\s*(\d+(?:\.\d+)?)\s*[-'′\s]\s*(\d+(?:\.\d+)?)\s*(?:"|″|'')?\s*([NSEWnsew])$"#,
    )
    .expect("valid regex")
});

/// Errors raised while parsing coordinate strings.
#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    /// The text matched none of the accepted forms.
    #[error("Invalid coordinate '{input}'")]
    Unparseable {
        /// The rejected text.
        input: String,
    },

    /// Minutes or seconds were 60 or more.
    #[error("Invalid DMS component in '{input}': {component} = {value}")]
    ComponentOutOfRange {
        /// The rejected text.
        input: String,
        /// `"minutes"` or `"seconds"`.
        component: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The decimal value falls outside the axis range.
    #[error("{axis} {value} is out of range")]
    OutOfRange {
        /// `"latitude"` or `"longitude"`.
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A latitude string carried an E/W hemisphere, or vice versa.
    #[error("Hemisphere {hemisphere} is not valid for {axis}")]
    WrongHemisphere {
        /// `"latitude"` or `"longitude"`.
        axis: &'static str,
        /// The offending hemisphere.
        hemisphere: Hemisphere,
    },
}

/// Compass hemisphere letter attached to a DMS value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum Hemisphere {
    N,
    S,
    E,
    W,
}

impl Hemisphere {
    /// `-1.0` for south and west, `1.0` otherwise.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::S | Self::W => -1.0,
            Self::N | Self::E => 1.0,
        }
    }

    /// Whether this hemisphere qualifies a latitude.
    #[must_use]
    pub const fn is_latitude(self) -> bool {
        matches!(self, Self::N | Self::S)
    }
}

/// A coordinate split into degrees, minutes, seconds and hemisphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl Dms {
    /// Signed decimal degrees.
    #[must_use]
    pub fn to_decimal(&self) -> f64 {
        dms_to_decimal(self.degrees, self.minutes, self.seconds, self.hemisphere)
    }

    /// Splits a signed decimal value into DMS for the given axis.
    #[must_use]
    pub fn from_decimal(value: f64, is_latitude: bool) -> Self {
        let hemisphere = match (is_latitude, value < 0.0) {
            (true, false) => Hemisphere::N,
            (true, true) => Hemisphere::S,
            (false, false) => Hemisphere::E,
            (false, true) => Hemisphere::W,
        };
        let abs = value.abs();
        let degrees = abs.trunc();
        let minutes_full = (abs - degrees) * 60.0;
        let minutes = minutes_full.trunc();
        let seconds = (minutes_full - minutes) * 60.0;

        Self {
            degrees,
            minutes,
            seconds,
            hemisphere,
        }
    }
}

impl std::fmt::Display for Dms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{:02}-{:04.1} {}",
            self.degrees, self.minutes, self.seconds, self.hemisphere
        )
    }
}

impl FromStr for Dms {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unparseable = || CoordinateError::Unparseable {
            input: s.to_string(),
        };

        let caps = DMS_RE.captures(trimmed).ok_or_else(unparseable)?;
        let number = |i: usize| -> Result<f64, CoordinateError> {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .ok_or_else(unparseable)
        };

        let degrees = number(1)?;
        let minutes = number(2)?;
        let seconds = number(3)?;
        let hemisphere = caps
            .get(4)
            .and_then(|m| Hemisphere::from_str(m.as_str()).ok())
            .ok_or_else(unparseable)?;

        for (component, value) in [("minutes", minutes), ("seconds", seconds)] {
            if value >= 60.0 {
                return Err(CoordinateError::ComponentOutOfRange {
                    input: s.to_string(),
                    component,
                    value,
                });
            }
        }

        Ok(Self {
            degrees,
            minutes,
            seconds,
            hemisphere,
        })
    }
}

/// Combines DMS components into signed decimal degrees.
#[must_use]
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, hemisphere: Hemisphere) -> f64 {
    hemisphere.sign() * (degrees + minutes / 60.0 + seconds / 3600.0)
}

/// Parses a DMS string or a plain decimal into signed decimal degrees.
///
/// # Errors
///
/// Returns [`CoordinateError`] if the text is neither a decimal number nor
/// a recognizable DMS value.
pub fn parse_coordinate(input: &str) -> Result<f64, CoordinateError> {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Ok(value);
    }
    let dms: Dms = trimmed.parse()?;
    let value = dms.to_decimal();
    log::trace!("Converted DMS '{trimmed}' to {value}");
    Ok(value)
}

/// Parses a latitude/longitude pair, each in decimal or DMS form, and
/// checks hemisphere letters and ranges.
///
/// # Errors
///
/// Returns [`CoordinateError`] if either value fails to parse, carries a
/// hemisphere for the other axis, or is out of range.
pub fn parse_point(latitude: &str, longitude: &str) -> Result<GeoPoint, CoordinateError> {
    let lat = parse_axis(latitude, "latitude", 90.0)?;
    let lon = parse_axis(longitude, "longitude", 180.0)?;
    Ok(GeoPoint::new(lat, lon))
}

fn parse_axis(input: &str, axis: &'static str, limit: f64) -> Result<f64, CoordinateError> {
    let trimmed = input.trim();
    let value = if let Ok(value) = trimmed.parse::<f64>() {
        value
    } else {
        let dms: Dms = trimmed.parse()?;
        if dms.hemisphere.is_latitude() != (axis == "latitude") {
            return Err(CoordinateError::WrongHemisphere {
                axis,
                hemisphere: dms.hemisphere,
            });
        }
        dms.to_decimal()
    };

    if !value.is_finite() || value.abs() > limit {
        return Err(CoordinateError::OutOfRange { axis, value });
    }
    Ok(value)
}
