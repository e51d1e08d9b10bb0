#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Corridor search across every backend.
//!
//! [`CorridorSearch`] builds the corridor polygon once and hands it to the
//! tower store, the turbine store and the LIDAR client, merging what they
//! find into one list of [`SearchItem`]s. Each backend's error type folds
//! into [`SearchError`], whose variants separate the cases a user needs to
//! act on differently.

pub mod aggregate;
pub mod config;
pub mod corridor_search;

use link_corridor_geometry::GeometryError;
use link_corridor_geometry::units::meters_to_feet;
use link_corridor_geometry_models::CorridorSpec;
use link_corridor_lidar::{LidarError, RemoteServiceError};
use link_corridor_towers::TowerError;
use link_corridor_turbines::TurbineError;

pub use config::{ConfigError, SearchConfig};
pub use corridor_search::{CorridorSearch, LidarOutcome, SearchReport, SearchRequest};
pub use link_corridor_search_models::{SearchItem, SearchSource};

/// Everything that can stop a corridor search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The corridor could not be built: coincident endpoints, an invalid
    /// width, or an out-of-range point.
    #[error("Invalid corridor: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// The tower store has never been imported into.
    #[error("Tower database at {location} has not been imported")]
    StoreNotReady { location: String },

    /// The LIDAR service could not be reached or answered with an HTTP
    /// failure.
    #[error("LIDAR request failed: {source}")]
    TransportFailure { source: LidarError },

    /// The LIDAR service answered with something that is not a products
    /// response.
    #[error("LIDAR response could not be read: {source}")]
    MalformedResponse { source: LidarError },

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    #[error("Search cancelled")]
    Cancelled,

    #[error("LIDAR configuration error: {source}")]
    LidarConfig { source: LidarError },

    #[error("Tower database error: {0}")]
    Tower(TowerError),

    #[error("Turbine dataset error: {0}")]
    Turbine(#[from] TurbineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<TowerError> for SearchError {
    fn from(value: TowerError) -> Self {
        match value {
            TowerError::NotReady { location } => Self::StoreNotReady { location },
            other => Self::Tower(other),
        }
    }
}

impl From<LidarError> for SearchError {
    fn from(value: LidarError) -> Self {
        match value {
            LidarError::RemoteService(e) => Self::RemoteService(e),
            e @ (LidarError::Transport(_) | LidarError::HttpStatus { .. }) => {
                Self::TransportFailure { source: e }
            }
            e @ (LidarError::MalformedResponse(_) | LidarError::UnrecognizedResponse { .. }) => {
                Self::MalformedResponse { source: e }
            }
            e @ (LidarError::Config(_) | LidarError::UnknownService { .. }) => {
                Self::LidarConfig { source: e }
            }
        }
    }
}

impl SearchError {
    /// The wider half-width to retry with, when the failure was the LIDAR
    /// service's small-polygon defect.
    #[must_use]
    pub const fn suggested_half_width_m(&self) -> Option<f64> {
        match self {
            Self::RemoteService(RemoteServiceError::KnownSmallPolygonBug {
                suggested_half_width_m,
                ..
            }) => Some(*suggested_half_width_m),
            _ => None,
        }
    }

    /// `spec` rebuilt at the suggested half-width, when a retry applies.
    #[must_use]
    pub fn retry_spec(&self, spec: &CorridorSpec) -> Option<CorridorSpec> {
        self.suggested_half_width_m()
            .map(|w| spec.with_half_width_m(w))
    }

    #[must_use]
    pub const fn is_store_not_ready(&self) -> bool {
        matches!(self, Self::StoreNotReady { .. })
    }

    /// Text for the person running the search. Service failures are
    /// worded so they cannot be mistaken for an empty result.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidGeometry(GeometryError::Degenerate { .. }) => {
                "The two sites are at the same location. Choose two different endpoints."
                    .to_string()
            }
            Self::InvalidGeometry(e) => format!("The corridor settings are invalid: {e}."),
            Self::StoreNotReady { .. } => {
                "The tower database has not been initialized. Import the FCC antenna structure \
                 files to enable tower search."
                    .to_string()
            }
            Self::TransportFailure { source } => format!(
                "Could not reach the LIDAR service ({source}). No results were retrieved; \
                 this does not mean no data exists."
            ),
            Self::MalformedResponse { .. } => {
                "The LIDAR service returned an unexpected response and may be having problems. \
                 No results were retrieved; try again later."
                    .to_string()
            }
            Self::RemoteService(RemoteServiceError::KnownSmallPolygonBug {
                suggested_half_width_m,
                ..
            }) => format!(
                "The LIDAR service cannot search a corridor this narrow. Retry with a half-width \
                 of {:.0} m ({:.0} ft)?",
                suggested_half_width_m,
                meters_to_feet(*suggested_half_width_m)
            ),
            Self::RemoteService(RemoteServiceError::Other { message }) => {
                format!("The LIDAR service reported an error: {message}")
            }
            Self::Cancelled => "Search cancelled.".to_string(),
            Self::LidarConfig { source } => format!("LIDAR search is misconfigured: {source}"),
            Self::Tower(e) => format!("The tower database could not be read: {e}"),
            Self::Turbine(e) => format!("The turbine dataset could not be loaded: {e}"),
            Self::Config(e) => format!("The configuration could not be loaded: {e}"),
        }
    }
}
