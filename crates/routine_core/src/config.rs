//! TOML-based core configuration.
//!
//! # Responsibility
//! - Describe edit policy, storage location and logging settings.
//! - Load them from an optional TOML file with defaults for every field.
//!
//! # Invariants
//! - A missing config file yields `CoreConfig::default()`.
//! - Unknown keys are rejected so typos do not silently fall back.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// How edits to locked (non-pending) slots are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPolicy {
    /// When `true`, changing the text of a locked slot fails the whole edit.
    /// When `false`, such changes are dropped and the rest of the edit applies.
    #[serde(default)]
    pub strict_locked_slot_edits: bool,
}

impl EditPolicy {
    pub fn strict() -> Self {
        Self {
            strict_locked_slot_edits: true,
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database file. Callers pick their own fallback when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`. Defaults per build mode.
    #[serde(default)]
    pub level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl LoggingConfig {
    /// Configured level, or the build-mode default.
    pub fn effective_level(&self) -> &str {
        self.level
            .as_deref()
            .unwrap_or(crate::logging::default_log_level())
    }
}

/// Core configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default)]
    pub edit: EditPolicy,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Loads configuration from `path`, or defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    /// Serializes configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Serialize(err) => write!(f, "failed to serialize config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, EditPolicy};
    use std::path::PathBuf;

    #[test]
    fn empty_config_uses_lenient_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(!config.edit.strict_locked_slot_edits);
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
            [edit]
            strict_locked_slot_edits = true

            [storage]
            db_path = "/var/lib/routine/routine.sqlite3"

            [logging]
            level = "warn"
            dir = "/var/log/routine"
            "#,
        )
        .unwrap();

        assert_eq!(config.edit, EditPolicy::strict());
        assert_eq!(
            config.storage.db_path,
            Some(PathBuf::from("/var/lib/routine/routine.sqlite3"))
        );
        assert_eq!(config.logging.effective_level(), "warn");
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/routine")));
    }

    #[test]
    fn unset_level_falls_back_to_build_default() {
        let config = CoreConfig::from_toml_str("[logging]\ndir = \"/var/log/routine\"\n").unwrap();
        assert_eq!(config.logging.effective_level(), crate::logging::default_log_level());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = CoreConfig::from_toml_str("[edit]\nstrict = true\n").unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut config = CoreConfig::default();
        config.edit = EditPolicy::strict();
        config.logging.level = Some("debug".to_string());
        let raw = config.to_toml_string().unwrap();
        assert_eq!(CoreConfig::from_toml_str(&raw).unwrap(), config);
    }
}
