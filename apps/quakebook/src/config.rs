//! # Configuration
//!
//! Optional TOML file with per-renderer defaults. Command line flags are
//! applied on top of the loaded values.
//!
//! ```toml
//! [resolve]
//! include_all_magnitudes = true
//! pick_window_after_secs = 3600
//!
//! [bulletin]
//! extra = true
//! min_arrival_weight = 0.5
//!
//! [cube]
//! network_code = "GE"
//! event_version = "A"
//!
//! [mt]
//! fallback_agency_id = "GFZ"
//! ```

use quakebook_core::primitives::{
    DEFAULT_MT_AGENCY, MIN_ARRIVAL_WEIGHT, MIN_DEPTH_PHASE_COUNT, MIN_STATION_MAGNITUDE_WEIGHT,
};
use quakebook_core::{BulletinMode, BulletinOptions, CubeOptions, QuakeError, ResolveOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "quakebook.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolve: ResolveOptions,
    pub bulletin: BulletinConfig,
    pub cube: CubeOptions,
    pub mt: MtConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletinConfig {
    pub enhanced: bool,
    pub extra: bool,
    pub polarities: bool,
    pub dist_in_km: bool,
    pub use_event_agency_id: bool,
    pub min_depth_phase_count: u32,
    pub min_arrival_weight: f64,
    pub min_station_magnitude_weight: f64,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            enhanced: false,
            extra: false,
            polarities: false,
            dist_in_km: false,
            use_event_agency_id: false,
            min_depth_phase_count: MIN_DEPTH_PHASE_COUNT,
            min_arrival_weight: MIN_ARRIVAL_WEIGHT,
            min_station_magnitude_weight: MIN_STATION_MAGNITUDE_WEIGHT,
        }
    }
}

impl From<&BulletinConfig> for BulletinOptions {
    fn from(config: &BulletinConfig) -> Self {
        Self {
            mode: if config.extra {
                BulletinMode::Extra
            } else {
                BulletinMode::Standard
            },
            enhanced: config.enhanced,
            polarities: config.polarities,
            dist_in_km: config.dist_in_km,
            use_event_agency_id: config.use_event_agency_id,
            min_depth_phase_count: config.min_depth_phase_count,
            min_arrival_weight: config.min_arrival_weight,
            min_station_magnitude_weight: config.min_station_magnitude_weight,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtConfig {
    pub fallback_agency_id: String,
}

impl Default for MtConfig {
    fn default() -> Self {
        Self {
            fallback_agency_id: DEFAULT_MT_AGENCY.to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, QuakeError> {
        toml::from_str(text)
            .map_err(|e| QuakeError::InvalidFormat(format!("Invalid config: {}", e)))
    }

    /// Load `path`, or `quakebook.toml` if present.
    ///
    /// An explicitly given path must exist. Without one a missing default
    /// file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, QuakeError> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(QuakeError::IoError(format!(
                    "Config file '{}' not found",
                    path.display()
                )));
            }
            tracing::debug!("No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            QuakeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_toml("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.cube.network_code, "GE");
        assert_eq!(config.cube.event_version, 'A');
        assert_eq!(config.mt.fallback_agency_id, "GFZ");
        assert_eq!(config.resolve.pick_window_before_secs, 60);
        assert_eq!(config.resolve.pick_window_after_secs, 7200);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [resolve]
            include_all_magnitudes = true

            [bulletin]
            extra = true
            min_arrival_weight = 0.25

            [cube]
            network_code = "GR"
            event_version = "B"
            "#,
        )
        .expect("parse");

        assert!(config.resolve.include_all_magnitudes);
        assert!(!config.resolve.include_comments);
        assert_eq!(config.cube.network_code, "GR");
        assert_eq!(config.cube.event_version, 'B');

        let options = BulletinOptions::from(&config.bulletin);
        assert_eq!(options.mode, BulletinMode::Extra);
        assert!((options.min_arrival_weight - 0.25).abs() < f64::EPSILON);
        assert_eq!(options.min_depth_phase_count, 3);
        assert!(options.phase_tables);
    }

    #[test]
    fn malformed_document_is_invalid_format() {
        assert!(matches!(
            Config::from_toml("[cube]\nevent_version = 7"),
            Err(QuakeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(QuakeError::IoError(_))
        ));
    }

    #[test]
    fn file_is_read() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("quakebook.toml");
        std::fs::write(&path, "[mt]\nfallback_agency_id = \"BGR\"\n").expect("write");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.mt.fallback_agency_id, "BGR");
    }
}
