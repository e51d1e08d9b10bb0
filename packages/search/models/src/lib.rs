#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types shared by the tower, turbine and LIDAR backends.
//!
//! Every backend reduces its native records to a [`SearchItem`]: an
//! identifier unique within its [`SearchSource`], a title, optional point
//! and bounding geometry, and a bag of source-specific attributes.

pub mod progress;

use std::collections::BTreeMap;

use link_corridor_geometry_models::{BoundingBox, GeoPoint};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which backend produced a [`SearchItem`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchSource {
    /// FCC antenna structure registrations.
    Tower,
    /// Wind turbines from the US Wind Turbine Database.
    Turbine,
    /// LIDAR point-cloud tiles from The National Map.
    Lidar,
}

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// Identifier unique within `source` (registration number, turbine
    /// case id, TNM `sourceId`).
    pub source_id: String,
    /// Human-readable label.
    pub title: String,
    /// Footprint for area features such as LIDAR tiles.
    pub bounds: Option<BoundingBox>,
    /// Location for point features such as towers and turbines.
    pub point: Option<GeoPoint>,
    pub source: SearchSource,
    /// Source-specific fields, keyed by their native names.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl SearchItem {
    #[must_use]
    pub fn new(source: SearchSource, source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            bounds: None,
            point: None,
            source,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn with_point(mut self, point: GeoPoint) -> Self {
        self.point = Some(point);
        self
    }

    #[must_use]
    pub const fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Adds an attribute, skipping `null` values.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.attributes.insert(key.to_owned(), value);
        }
        self
    }

    /// String attribute lookup.
    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }

    /// Numeric attribute lookup.
    #[must_use]
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(serde_json::Value::as_f64)
    }

    /// A representative location: the point if present, else the center
    /// of the bounds.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        self.point.or_else(|| self.bounds.map(|b| b.center()))
    }
}
