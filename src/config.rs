//! Knowledge-base configuration.
//!
//! Replaces a process-wide verbosity switch with a value owned by each
//! [`KnowledgeBase`](crate::kb::KnowledgeBase). Loadable from TOML:
//!
//! ```toml
//! verbosity = "inferences"
//! dedup_support = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, KbResult};

/// How much of the engine's activity is logged at `info`/`debug` level.
///
/// Diagnostics (`warn`) are always emitted regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only diagnostics.
    #[default]
    Quiet,
    /// Log every external assertion and retraction.
    Assertions,
    /// Additionally log every add and every inference attempt.
    Inferences,
}

impl Verbosity {
    /// Map a `-v` count onto a level, saturating at [`Verbosity::Inferences`].
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Assertions,
            _ => Self::Inferences,
        }
    }
}

/// Configuration for a [`KnowledgeBase`](crate::kb::KnowledgeBase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Logging level for assertions, adds and inference attempts (default: quiet).
    pub verbosity: Verbosity,
    /// Drop a justification pair that is already recorded on the item it
    /// would support (default: true).
    pub dedup_support: bool,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Quiet,
            dedup_support: true,
        }
    }
}

impl KbConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> KbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> KbResult<Self> {
        toml::from_str(content).map_err(|e| {
            ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> KbResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            ConfigError::Write {
                path: path.display().to_string(),
                source: e,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;

    #[test]
    fn defaults() {
        let config = KbConfig::default();
        assert_eq!(config.verbosity, Verbosity::Quiet);
        assert!(config.dedup_support);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = KbConfig::from_toml("verbosity = \"inferences\"", Path::new("x.toml")).unwrap();
        assert_eq!(config.verbosity, Verbosity::Inferences);
        assert!(config.dedup_support);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = KbConfig::from_toml("verbosity = 3", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, KbError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("kb.toml");
        let config = KbConfig {
            verbosity: Verbosity::Assertions,
            dedup_support: false,
        };
        config.save(&path).unwrap();
        assert_eq!(KbConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = KbConfig::load(Path::new("/nonexistent/chainkb.toml")).unwrap_err();
        assert!(matches!(err, KbError::Config(ConfigError::Read { .. })));
    }

    #[test]
    fn verbosity_from_count_saturates() {
        assert_eq!(Verbosity::from_count(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_count(1), Verbosity::Assertions);
        assert_eq!(Verbosity::from_count(7), Verbosity::Inferences);
        assert!(Verbosity::Inferences > Verbosity::Assertions);
    }
}
