//! Configuration for the crowd renderer
//!
//! Serializable settings for the grid spec, steering tunables, draw path,
//! and RNG seed. Files are sniffed by extension: `.toml` or `.ron`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::cache::InstanceGridSpec;
use crate::steering::flock::DEFAULT_SEED;
use crate::steering::FlockParams;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading or writing the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file did not parse as the expected format
    #[error("parse error: {0}")]
    Parse(String),

    /// The settings could not be serialized
    #[error("serialization error: {0}")]
    Serialize(String),

    /// The file extension maps to no supported format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Complete renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdSettings {
    /// Instance grid layout and clip selection
    pub grid: InstanceGridSpec,

    /// Steering tunables
    pub flock: FlockParams,

    /// Use the indirect draw path (GPU-resident draw arguments)
    pub use_indirect: bool,

    /// Seed for the neighbor-sampling stream
    pub rng_seed: u64,
}

impl Default for CrowdSettings {
    fn default() -> Self {
        Self {
            grid: InstanceGridSpec::default(),
            flock: FlockParams::default(),
            use_indirect: true,
            rng_seed: DEFAULT_SEED,
        }
    }
}

impl CrowdSettings {
    /// Load settings from a `.toml` or `.ron` file
    ///
    /// # Errors
    ///
    /// Fails on IO problems, parse failures, or an unsupported extension.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_owned()))
        }
    }

    /// Save settings to a `.toml` or `.ron` file
    ///
    /// # Errors
    ///
    /// Fails on IO problems, serialization failures, or an unsupported
    /// extension.
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_owned()));
        };
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::cache::ClipFilter;

    #[test]
    fn defaults_match_reference_tunables() {
        let settings = CrowdSettings::default();
        assert_eq!(settings.flock.speed, 1.0);
        assert_eq!(settings.flock.separation_distance, 3.0);
        assert_eq!(settings.flock.max_neighbors, 50);
        assert_eq!(settings.rng_seed, DEFAULT_SEED);
        assert!(settings.use_indirect);
        assert_eq!(settings.grid.clip_filter, ClipFilter::All);
    }

    #[test]
    fn ron_round_trip() {
        let mut settings = CrowdSettings::default();
        settings.grid.count_x = 7;
        settings.grid.clip_filter = ClipFilter::Only(2);
        settings.flock.max_neighbors = 12;

        let text = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::default())
            .unwrap();
        let parsed: CrowdSettings = ron::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn toml_round_trip() {
        let mut settings = CrowdSettings::default();
        settings.use_indirect = false;
        settings.rng_seed = 42;

        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: CrowdSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = CrowdSettings::default()
            .save_to_file("settings.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
