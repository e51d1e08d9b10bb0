//! Parsers for the FCC Antenna Structure Registration bulk files.
//!
//! The weekly ASR dump ships one pipe-delimited file per record type:
//! `RA.dat` (registrations), `CO.dat` (coordinates) and `EN.dat`
//! (entities). Field positions below are zero-based indexes into a split
//! line. Files are Latin-1, not UTF-8.

use std::io::BufRead;
use std::str::FromStr;

use link_corridor_geometry::coordinates::{Hemisphere, dms_to_decimal};
use strum_macros::{AsRefStr, Display, EnumIter};

/// The three record files that make up an ASR import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, AsRefStr, EnumIter)]
pub enum RecordKind {
    #[strum(serialize = "RA")]
    Registration,
    #[strum(serialize = "CO")]
    Coordinates,
    #[strum(serialize = "EN")]
    Entity,
}

impl RecordKind {
    /// File name inside an extracted ASR archive.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Registration => "RA.dat",
            Self::Coordinates => "CO.dat",
            Self::Entity => "EN.dat",
        }
    }

    /// Minimum number of fields a line must split into.
    #[must_use]
    pub const fn min_fields(self) -> usize {
        match self {
            Self::Registration => 30,
            Self::Coordinates => 17,
            Self::Entity => 20,
        }
    }
}

/// Why a single line was rejected.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{kind} record has {found} fields, expected at least {required}")]
    TooFewFields {
        kind: RecordKind,
        found: usize,
        required: usize,
    },

    #[error("Expected {expected} record, found '{found}'")]
    WrongType { expected: RecordKind, found: String },

    #[error("Invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Missing unique system id")]
    MissingId,
}

/// One `RA` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub unique_system_id: i64,
    pub file_number: Option<String>,
    pub registration_number: Option<String>,
    pub application_purpose: Option<String>,
    pub status_code: Option<String>,
    pub date_entered: Option<String>,
    pub date_received: Option<String>,
    pub date_issued: Option<String>,
    pub date_constructed: Option<String>,
    pub date_dismantled: Option<String>,
    pub date_action: Option<String>,
    pub structure_street: Option<String>,
    pub structure_city: Option<String>,
    pub structure_state: Option<String>,
    pub county_code: Option<String>,
    pub zip_code: Option<String>,
    /// Heights and elevations are meters, as filed.
    pub height_structure: Option<f64>,
    pub ground_elevation: Option<f64>,
    pub overall_height_ground: Option<f64>,
    pub overall_height_amsl: Option<f64>,
    pub structure_type: Option<String>,
    pub date_faa_determination: Option<String>,
    pub faa_study_number: Option<String>,
    pub faa_circular_number: Option<String>,
    pub specification_option: Option<i32>,
    pub painting_and_lighting: Option<String>,
}

/// One `CO` line. The decimal position is derived here, once, from the
/// DMS fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub unique_system_id: i64,
    pub coordinate_type: Option<String>,
    pub latitude_degrees: Option<f64>,
    pub latitude_minutes: Option<f64>,
    pub latitude_seconds: Option<f64>,
    pub latitude_direction: Option<String>,
    pub latitude_total_seconds: Option<f64>,
    pub longitude_degrees: Option<f64>,
    pub longitude_minutes: Option<f64>,
    pub longitude_seconds: Option<f64>,
    pub longitude_direction: Option<String>,
    pub longitude_total_seconds: Option<f64>,
    pub decimal_latitude: Option<f64>,
    pub decimal_longitude: Option<f64>,
}

/// One `EN` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub unique_system_id: i64,
    /// `O` for owner, `R` for representative, and so on.
    pub contact_type: String,
    pub entity_type: Option<String>,
    pub entity_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

fn text(fields: &[&str], i: usize) -> Option<String> {
    fields
        .get(i)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn number<T: FromStr>(
    fields: &[&str],
    i: usize,
    field: &'static str,
) -> Result<Option<T>, RecordError> {
    match fields.get(i).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| RecordError::InvalidNumber {
                field,
                value: raw.to_owned(),
            }),
    }
}

fn check_header(fields: &[&str], kind: RecordKind) -> Result<i64, RecordError> {
    if fields.len() < kind.min_fields() {
        return Err(RecordError::TooFewFields {
            kind,
            found: fields.len(),
            required: kind.min_fields(),
        });
    }
    let record_type = fields.first().map_or("", |s| s.trim());
    if record_type != kind.as_ref() {
        return Err(RecordError::WrongType {
            expected: kind,
            found: record_type.to_owned(),
        });
    }
    number::<i64>(fields, 4, "unique system id")?.ok_or(RecordError::MissingId)
}

impl Registration {
    /// Parses the fields of one `RA` line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the line is short, of another type, or
    /// carries an unparseable number.
    pub fn parse(fields: &[&str]) -> Result<Self, RecordError> {
        let unique_system_id = check_header(fields, RecordKind::Registration)?;
        Ok(Self {
            unique_system_id,
            file_number: text(fields, 2),
            registration_number: text(fields, 3),
            application_purpose: text(fields, 5),
            status_code: text(fields, 8),
            date_entered: text(fields, 9),
            date_received: text(fields, 10),
            date_issued: text(fields, 11),
            date_constructed: text(fields, 12),
            date_dismantled: text(fields, 13),
            date_action: text(fields, 14),
            structure_street: text(fields, 23),
            structure_city: text(fields, 24),
            structure_state: text(fields, 25),
            county_code: text(fields, 26),
            zip_code: text(fields, 27),
            height_structure: number(fields, 28, "height of structure")?,
            ground_elevation: number(fields, 29, "ground elevation")?,
            overall_height_ground: number(fields, 30, "overall height above ground")?,
            overall_height_amsl: number(fields, 31, "overall height AMSL")?,
            structure_type: text(fields, 32),
            date_faa_determination: text(fields, 33),
            faa_study_number: text(fields, 34),
            faa_circular_number: text(fields, 35),
            specification_option: number(fields, 36, "specification option")?,
            painting_and_lighting: text(fields, 37),
        })
    }
}

impl Coordinates {
    /// Parses the fields of one `CO` line and converts its DMS position.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the line is short, of another type, or
    /// carries an unparseable number.
    pub fn parse(fields: &[&str]) -> Result<Self, RecordError> {
        let unique_system_id = check_header(fields, RecordKind::Coordinates)?;

        let latitude_degrees = number(fields, 6, "latitude degrees")?;
        let latitude_minutes = number(fields, 7, "latitude minutes")?;
        let latitude_seconds = number(fields, 8, "latitude seconds")?;
        let latitude_direction = text(fields, 9);
        let longitude_degrees = number(fields, 11, "longitude degrees")?;
        let longitude_minutes = number(fields, 12, "longitude minutes")?;
        let longitude_seconds = number(fields, 13, "longitude seconds")?;
        let longitude_direction = text(fields, 14);

        Ok(Self {
            unique_system_id,
            coordinate_type: text(fields, 5),
            decimal_latitude: to_decimal(
                latitude_degrees,
                latitude_minutes,
                latitude_seconds,
                latitude_direction.as_deref(),
            ),
            decimal_longitude: to_decimal(
                longitude_degrees,
                longitude_minutes,
                longitude_seconds,
                longitude_direction.as_deref(),
            ),
            latitude_degrees,
            latitude_minutes,
            latitude_seconds,
            latitude_direction,
            latitude_total_seconds: number(fields, 10, "latitude total seconds")?,
            longitude_degrees,
            longitude_minutes,
            longitude_seconds,
            longitude_direction,
            longitude_total_seconds: number(fields, 15, "longitude total seconds")?,
        })
    }
}

/// Missing minutes or seconds count as zero; a missing degree or
/// hemisphere leaves the position unknown.
fn to_decimal(
    degrees: Option<f64>,
    minutes: Option<f64>,
    seconds: Option<f64>,
    direction: Option<&str>,
) -> Option<f64> {
    let degrees = degrees?;
    let hemisphere = Hemisphere::from_str(direction?).ok()?;
    Some(dms_to_decimal(
        degrees,
        minutes.unwrap_or(0.0),
        seconds.unwrap_or(0.0),
        hemisphere,
    ))
}

impl Entity {
    /// Parses the fields of one `EN` line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the line is short or of another type.
    pub fn parse(fields: &[&str]) -> Result<Self, RecordError> {
        let unique_system_id = check_header(fields, RecordKind::Entity)?;
        Ok(Self {
            unique_system_id,
            contact_type: text(fields, 5).unwrap_or_default(),
            entity_type: text(fields, 6),
            entity_name: text(fields, 9),
            first_name: text(fields, 10),
            middle_initial: text(fields, 11),
            last_name: text(fields, 12),
            phone: text(fields, 14),
            street_address: text(fields, 17),
            city: text(fields, 20),
            state: text(fields, 21),
            zip_code: text(fields, 22),
        })
    }
}

/// Reads one line and decodes it as Latin-1. Returns `Ok(false)` at EOF.
///
/// Every Latin-1 byte maps to the Unicode scalar with the same value, so
/// decoding never fails.
///
/// # Errors
///
/// Returns any I/O error from the reader.
pub fn read_latin1_line(
    reader: &mut dyn BufRead,
    bytes: &mut Vec<u8>,
    line: &mut String,
) -> std::io::Result<bool> {
    bytes.clear();
    line.clear();
    if reader.read_until(b'\n', bytes)? == 0 {
        return Ok(false);
    }
    line.extend(bytes.iter().map(|&b| char::from(b)));
    let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed_len);
    Ok(true)
}

/// Splits a record line on `|`.
#[must_use]
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split('|').collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const RA_LINE: &str = "RA|NE|A0012345|1000001|123456|NE||||01/02/2003|01/01/2003|01/05/2003|06/01/2003|||01/05/2003||||||||100 TOWER RD|PITTSBURGH|PA|003|15201|60.9|300.2|64.0|364.2|TOWER|12/01/2002|2002-AEA-1234-OE||||";
    pub const CO_LINE: &str = "CO|NE|A0012345|1000001|123456|T|40|26|46.0|N|145606.0|79|58|56.0|W|287936.0|";
    pub const EN_LINE: &str =
        "EN|NE|A0012345|1000001|123456|O|L|0001234567||Example Towers LLC|||||4125550100|||1 MAIN ST|||PITTSBURGH|PA|15201|";

    #[test]
    fn parses_registration_line() {
        let ra = Registration::parse(&split_fields(RA_LINE)).unwrap();
        assert_eq!(ra.unique_system_id, 123_456);
        assert_eq!(ra.registration_number.as_deref(), Some("1000001"));
        assert_eq!(ra.structure_city.as_deref(), Some("PITTSBURGH"));
        assert_eq!(ra.overall_height_ground, Some(64.0));
        assert_eq!(ra.structure_type.as_deref(), Some("TOWER"));
        assert_eq!(ra.specification_option, None);
    }

    #[test]
    fn parses_coordinates_and_converts_dms() {
        let co = Coordinates::parse(&split_fields(CO_LINE)).unwrap();
        let lat = co.decimal_latitude.unwrap();
        let lon = co.decimal_longitude.unwrap();
        assert!((lat - 40.446_111_1).abs() < 1e-6, "{lat}");
        assert!((lon + 79.982_222_2).abs() < 1e-6, "{lon}");
        assert_eq!(co.coordinate_type.as_deref(), Some("T"));
    }

    #[test]
    fn parses_entity_line() {
        let en = Entity::parse(&split_fields(EN_LINE)).unwrap();
        assert_eq!(en.contact_type, "O");
        assert_eq!(en.entity_name.as_deref(), Some("Example Towers LLC"));
        assert_eq!(en.state.as_deref(), Some("PA"));
    }

    #[test]
    fn rejects_short_and_mistyped_lines() {
        assert!(matches!(
            Coordinates::parse(&split_fields("CO|NE|x")),
            Err(RecordError::TooFewFields { .. })
        ));
        assert!(matches!(
            Registration::parse(&split_fields(CO_LINE.replace("CO|", "XX|").as_str())),
            Err(RecordError::TooFewFields { .. } | RecordError::WrongType { .. })
        ));
        assert!(matches!(
            Coordinates::parse(&split_fields(&RA_LINE.replacen("RA", "CO", 1))),
            Err(RecordError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn missing_hemisphere_leaves_position_unknown() {
        let line = CO_LINE.replace("|N|", "||");
        let co = Coordinates::parse(&split_fields(&line)).unwrap();
        assert!(co.decimal_latitude.is_none());
        assert!(co.decimal_longitude.is_some());
    }

    #[test]
    fn decodes_latin1_bytes() {
        let raw: &[u8] = b"EN|Caf\xe9\r\nnext\n";
        let mut reader = std::io::BufReader::new(raw);
        let mut bytes = Vec::new();
        let mut line = String::new();
        assert!(read_latin1_line(&mut reader, &mut bytes, &mut line).unwrap());
        assert_eq!(line, "EN|Café");
        assert!(read_latin1_line(&mut reader, &mut bytes, &mut line).unwrap());
        assert_eq!(line, "next");
        assert!(!read_latin1_line(&mut reader, &mut bytes, &mut line).unwrap());
    }
}
