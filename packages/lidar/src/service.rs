//! Compile-time registry of LIDAR product services.
//!
//! Each service is defined in a TOML file under `services/` and embedded
//! at compile time.

use std::time::Duration;

use serde::Deserialize;

use crate::LidarError;

/// A product search endpoint and the fixed query it is searched with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LidarService {
    /// Unique identifier (e.g., `"tnm"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Products endpoint URL.
    pub base_url: String,
    /// Value of the `datasets` query parameter.
    pub datasets: String,
    /// Value of the `prodFormats` query parameter.
    pub prod_formats: String,
    /// Which date the `start`/`end` range applies to.
    pub date_type: String,
    /// `maxResults` per page.
    pub page_size: usize,
    /// Pause between consecutive page requests.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_page_delay_ms() -> u64 {
    500
}

const fn default_timeout_secs() -> u64 {
    30
}

impl LidarService {
    #[must_use]
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Same service against a different endpoint, e.g. a mirror or a
    /// local test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    #[must_use]
    pub const fn with_page_delay_ms(mut self, ms: u64) -> Self {
        self.page_delay_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("tnm", include_str!("../services/tnm.toml"))];

/// Id of the service used when none is configured.
pub const DEFAULT_SERVICE_ID: &str = "tnm";

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 1;

/// Returns every configured service, enabled or not.
///
/// # Errors
///
/// Returns [`LidarError::Config`] if an embedded TOML file is malformed.
pub fn all_services() -> Result<Vec<LidarService>, LidarError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| {
                log::error!("Failed to parse LIDAR service '{name}': {e}");
                LidarError::Config(e)
            })
        })
        .collect()
}

/// Looks up an enabled service by id.
///
/// # Errors
///
/// Returns [`LidarError::UnknownService`] if no enabled service has that
/// id, or [`LidarError::Config`] if the registry cannot be parsed.
pub fn service(id: &str) -> Result<LidarService, LidarError> {
    all_services()?
        .into_iter()
        .find(|s| s.enabled && s.id == id)
        .ok_or_else(|| LidarError::UnknownService { id: id.to_string() })
}

/// The default service ([`DEFAULT_SERVICE_ID`]).
///
/// # Errors
///
/// See [`service`].
pub fn default_service() -> Result<LidarService, LidarError> {
    service(DEFAULT_SERVICE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services().unwrap();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services().unwrap();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn default_service_targets_laz_point_clouds() {
        let tnm = default_service().unwrap();
        assert_eq!(tnm.datasets, "Lidar Point Cloud (LPC)");
        assert_eq!(tnm.prod_formats, "LAZ");
        assert_eq!(tnm.page_size, 25);
        assert_eq!(tnm.page_delay(), Duration::from_millis(500));
        assert_eq!(tnm.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unknown_service_is_an_error() {
        assert!(matches!(
            service("nope"),
            Err(LidarError::UnknownService { .. })
        ));
    }
}
