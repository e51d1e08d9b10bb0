//! Search configuration.
//!
//! Values come from an optional `link-corridor.toml` and are then
//! overridden by environment variables. Every field has a default, so an
//! empty or missing file is valid.

use std::path::{Path, PathBuf};

use link_corridor_lidar::{LidarError, LidarService, service};
use link_corridor_towers::paths;
use serde::Deserialize;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "link-corridor.toml";

/// Overrides [`SearchConfig::tower_db`].
pub const ENV_TOWER_DB: &str = "LINK_CORRIDOR_TOWER_DB";
/// Overrides [`SearchConfig::turbine_dataset`].
pub const ENV_TURBINES: &str = "LINK_CORRIDOR_TURBINES";
/// Overrides [`SearchConfig::lidar_base_url`].
pub const ENV_TNM_URL: &str = "LINK_CORRIDOR_TNM_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Tower `DuckDB` file.
    pub tower_db: PathBuf,
    /// Directory holding `RA.dat`, `CO.dat` and `EN.dat` for imports.
    pub fcc_records_dir: PathBuf,
    /// USWTDB GeoJSON or CSV file.
    pub turbine_dataset: PathBuf,
    /// Centerline-to-edge distance used when none is given, feet.
    pub default_half_width_ft: f64,
    /// Extension past each endpoint used when none is given, feet.
    pub default_extension_ft: f64,
    /// LIDAR service id from the embedded registry.
    pub lidar_service: String,
    /// Replaces the service's endpoint when set.
    pub lidar_base_url: Option<String>,
    /// Replaces the service's `maxResults` per page when set.
    pub lidar_page_size: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tower_db: paths::tower_db_path(),
            fcc_records_dir: paths::fcc_records_dir(),
            turbine_dataset: paths::data_dir().join("turbines").join("uswtdb.geojson"),
            default_half_width_ft: 1000.0,
            default_extension_ft: 0.0,
            lidar_service: link_corridor_lidar::service::DEFAULT_SERVICE_ID.to_string(),
            lidar_base_url: None,
            lidar_page_size: None,
        }
    }
}

impl SearchConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Reads `path`, or [`CONFIG_FILE_NAME`] in the working directory when
    /// `path` is `None`, then applies environment overrides. A missing
    /// default file is not an error; a missing explicit file is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = path.map_or_else(
            || (PathBuf::from(CONFIG_FILE_NAME), false),
            |p| (p.to_path_buf(), true),
        );

        let config = if required || path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            log::debug!("Loaded configuration from {}", path.display());
            Self::from_toml_str(&text)?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies the `LINK_CORRIDOR_*` overrides found by `lookup`. Empty
    /// values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_TOWER_DB) {
            self.tower_db = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_TURBINES) {
            self.turbine_dataset = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_TNM_URL) {
            self.lidar_base_url = Some(v);
        }
        self
    }

    /// The configured LIDAR service with any endpoint or page size
    /// override applied.
    ///
    /// # Errors
    ///
    /// Returns [`LidarError`] if the service id is unknown.
    pub fn lidar_service(&self) -> Result<LidarService, LidarError> {
        let mut svc = service::service(&self.lidar_service)?;
        if let Some(url) = &self.lidar_base_url {
            svc = svc.with_base_url(url);
        }
        if let Some(size) = self.lidar_page_size {
            svc = svc.with_page_size(size);
        }
        Ok(svc)
    }
}
