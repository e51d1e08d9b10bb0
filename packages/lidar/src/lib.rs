#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LIDAR point-cloud product search against The National Map.
//!
//! A search sends the corridor polygon and a date range to the TNM
//! products endpoint and pages through the results:
//!
//! - [`service`]: embedded endpoint configuration.
//! - [`request`]: query parameters for each page.
//! - [`response`]: classification of the several payload layouts the
//!   service returns, and normalization into [`response::TnmProduct`]s.
//! - [`search`]: the page loop, deduplicating by `sourceId`, pausing
//!   between requests and honoring a [`search::CancelFlag`].
//! - [`projects`]: grouping tiles by collection project.

pub mod client;
pub mod projects;
pub mod request;
pub mod response;
pub mod search;
pub mod service;

pub use client::{HttpFetcher, PageFetcher};
pub use request::LidarQuery;
pub use response::{NormalizedPage, PageStatus, ResponseShape, TnmProduct};
pub use search::{CancelFlag, Completion, LidarSearch, LidarSearchClient};
pub use service::LidarService;

/// Text in the service's error message when its polygon handling fails on
/// a very narrow polygon.
pub const SMALL_POLYGON_BUG_MARKER: &str = "'str' object has no attribute 'get'";

/// Smallest half-width, in meters, suggested after the small-polygon
/// failure.
pub const MIN_RETRY_HALF_WIDTH_M: f64 = 1000.0;

/// The half-width to retry with after the small-polygon failure: double
/// the current one, and never less than [`MIN_RETRY_HALF_WIDTH_M`].
#[must_use]
pub fn suggested_half_width_m(current_half_width_m: f64) -> f64 {
    (2.0 * current_half_width_m).max(MIN_RETRY_HALF_WIDTH_M)
}

/// An error object returned by the products service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteServiceError {
    /// The service fails on polygons narrower than it can handle. Searching
    /// again with a corridor built at `suggested_half_width_m` avoids it.
    #[error(
        "LIDAR service could not process a polygon this narrow; retry with a half-width of {suggested_half_width_m:.0} m ({message})"
    )]
    KnownSmallPolygonBug {
        suggested_half_width_m: f64,
        message: String,
    },

    #[error("LIDAR service error: {message}")]
    Other { message: String },
}

impl RemoteServiceError {
    /// Classifies a service error message for a search run at
    /// `half_width_m`.
    #[must_use]
    pub fn from_message(message: String, half_width_m: f64) -> Self {
        if message.contains(SMALL_POLYGON_BUG_MARKER) {
            log::warn!("LIDAR service hit its small-polygon defect at half-width {half_width_m:.0} m");
            Self::KnownSmallPolygonBug {
                suggested_half_width_m: suggested_half_width_m(half_width_m),
                message,
            }
        } else {
            Self::Other { message }
        }
    }
}

/// Errors from a LIDAR search.
#[derive(Debug, thiserror::Error)]
pub enum LidarError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from LIDAR service: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body was not JSON.
    #[error("Malformed LIDAR response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// The body was JSON in a layout none of the known shapes match.
    #[error("Unrecognized LIDAR response: {summary}")]
    UnrecognizedResponse { summary: String },

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    #[error("Invalid LIDAR service configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unknown LIDAR service: {id}")]
    UnknownService { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_doubles_with_floor() {
        assert!((suggested_half_width_m(100.0) - 1000.0).abs() < f64::EPSILON);
        assert!((suggested_half_width_m(800.0) - 1600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn marker_text_maps_to_known_bug() {
        let err = RemoteServiceError::from_message(
            "Internal error: 'str' object has no attribute 'get'".to_string(),
            300.0,
        );
        assert!(matches!(
            err,
            RemoteServiceError::KnownSmallPolygonBug { suggested_half_width_m, .. }
                if (suggested_half_width_m - 1000.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn unrelated_text_is_other() {
        let err = RemoteServiceError::from_message("Gateway timeout".to_string(), 300.0);
        assert_eq!(
            err,
            RemoteServiceError::Other {
                message: "Gateway timeout".to_string()
            }
        );
    }
}
