//! CLI configuration file

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wizard_kernel::BindingConfig;
use wizard_recovery::{AutoSaveConfig, RecoveryConfig};

/// Configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the binary can be configured with
///
/// ```toml
/// storage_dir = "/var/lib/wizard"
///
/// [binding]
/// debounce_ms = 300
///
/// [recovery]
/// max_age_ms = 86400000
/// enable_cross_tab_recovery = false
///
/// [auto_save]
/// interval_ms = 30000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory of the durable storage scope
    pub storage_dir: PathBuf,
    /// Validation binding
    pub binding: BindingConfig,
    /// Recovery manager
    pub recovery: RecoveryConfig,
    /// Auto-save scheduler
    pub auto_save: AutoSaveConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".wizard"),
            binding: BindingConfig::default(),
            recovery: RecoveryConfig::default(),
            auto_save: AutoSaveConfig::default(),
        }
    }
}

impl CliConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML or mistyped values
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`, or defaults when no path is given
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse` if it is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// With storage directory
    #[inline]
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = CliConfig::from_toml(
            r#"
            storage_dir = "/tmp/w"

            [recovery]
            enable_cross_tab_recovery = true
            "#,
        )
        .unwrap();

        assert_eq!(config.storage_dir, PathBuf::from("/tmp/w"));
        assert!(config.recovery.enable_cross_tab_recovery);
        assert_eq!(config.recovery.max_age_ms, 86_400_000);
        assert_eq!(config.binding, BindingConfig::default());
        assert_eq!(config.auto_save.interval_ms, 30_000);
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = CliConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = CliConfig::from_toml("[binding]\ndebounce_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wizard.toml");
        std::fs::write(&path, "[auto_save]\ninterval_ms = 500\n").unwrap();
        assert_eq!(CliConfig::load(Some(&path)).unwrap().auto_save.interval_ms, 500);
    }
}
