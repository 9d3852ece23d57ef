//! Configuration types for migration runs

use pgweave_core::WeaveError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with an object that already exists.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdempotencyPolicy {
    /// Leave it alone and skip its creation
    Ignore,
    /// Drop it, then create it again
    Recreate,
    /// Attempt the creation and let the database report the conflict
    #[default]
    Fail,
}

impl std::fmt::Display for IdempotencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdempotencyPolicy::Ignore => write!(f, "ignore"),
            IdempotencyPolicy::Recreate => write!(f, "recreate"),
            IdempotencyPolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Settings for one migrator. Migrations are disabled unless turned on.
///
/// ```toml
/// enabled = true
/// policy = "recreate"
/// undo_on_error = true
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MigrationConfig {
    /// Every migration refuses to run while this is false
    pub enabled: bool,
    pub policy: IdempotencyPolicy,
    /// Drop the users (and their databases) created by a failed environment migration
    pub undo_on_error: bool,
}

impl MigrationConfig {
    /// Enabled, with the `fail` policy and no undo.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn ignore_existing(mut self) -> Self {
        self.policy = IdempotencyPolicy::Ignore;
        self
    }

    pub fn recreate_existing(mut self) -> Self {
        self.policy = IdempotencyPolicy::Recreate;
        self
    }

    pub fn undo_on_error(mut self) -> Self {
        self.undo_on_error = true;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub(crate) fn ensure_enabled(&self) -> pgweave_core::Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(WeaveError::Configuration(
                "migrations are disabled".to_string(),
            ))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<ConfigError> for WeaveError {
    fn from(err: ConfigError) -> Self {
        WeaveError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgweave_core::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let toml = r#"
enabled = true
policy = "recreate"
undo_on_error = true
"#;

        let config = MigrationConfig::parse(toml).unwrap();
        assert_eq!(
            config,
            MigrationConfig::enabled().recreate_existing().undo_on_error()
        );
    }

    #[test]
    fn test_default_config() {
        let config = MigrationConfig::parse("").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.policy, IdempotencyPolicy::Fail);
        assert!(!config.undo_on_error);
        assert_eq!(
            config.ensure_enabled().unwrap_err().kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = MigrationConfig::parse("policy = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert_eq!(WeaveError::from(err).kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "enabled = true\npolicy = \"ignore\"").unwrap();

        let config = MigrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config, MigrationConfig::enabled().ignore_existing());

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            MigrationConfig::from_file(&missing),
            Err(ConfigError::IoError(_))
        ));
    }
}
