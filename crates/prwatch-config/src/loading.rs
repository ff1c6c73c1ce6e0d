//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - accessor fallbacks on each section
//! 2. **User config** - `~/.prwatch/config.toml` (global user preferences)
//! 3. **Project config** - `./.prwatch/config.toml` (project-specific overrides)
//! 4. **CLI arguments** - Command-line flags (highest priority, applied by the caller)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::ConfigError;
use crate::types::PrwatchConfig;
use crate::validation::validate_config;

/// Load configuration from the hierarchy of config files.
///
/// Missing config files are not errors; parse and validation failures are.
pub fn load_hierarchy() -> Result<PrwatchConfig, ConfigError> {
    let user_path = prwatch_paths::PrwatchPaths::resolve()
        .ok()
        .map(|paths| paths.user_config());
    let project_path = std::env::current_dir()
        .ok()
        .map(|root| prwatch_paths::PrwatchPaths::project_config(&root));

    load_hierarchy_from(user_path, project_path)
}

/// Load and merge the given user and project config files.
pub(crate) fn load_hierarchy_from(
    user_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
) -> Result<PrwatchConfig, ConfigError> {
    let mut config = PrwatchConfig::default();

    for path in [user_path, project_path].into_iter().flatten() {
        match load_config_file(&path) {
            Ok(layer) => {
                debug!(event = "config.layer_loaded", path = %path.display());
                config = merge_configs(config, layer);
            }
            Err(ConfigError::IoError { source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!(event = "config.layer_missing", path = %path.display());
            }
            Err(e) => return Err(e),
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<PrwatchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })
}

/// Merge two configurations, with override_config taking precedence.
pub fn merge_configs(base: PrwatchConfig, override_config: PrwatchConfig) -> PrwatchConfig {
    PrwatchConfig::merge(&base, &override_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = load_hierarchy_from(
            Some(temp.path().join("absent-user.toml")),
            Some(temp.path().join("absent-project.toml")),
        )
        .unwrap();
        assert_eq!(config, PrwatchConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let temp = tempfile::tempdir().unwrap();
        let user = write(
            temp.path(),
            "user.toml",
            "[polling]\ninterval_seconds = 120\nbackground_enabled = true\n",
        );
        let project = write(temp.path(), "project.toml", "[polling]\ninterval_seconds = 45\n");

        let config = load_hierarchy_from(Some(user), Some(project)).unwrap();
        assert_eq!(config.polling.interval_seconds(), 45);
        assert!(config.polling.background_enabled());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let user = write(temp.path(), "user.toml", "[polling\ninterval_seconds = ");

        let result = load_hierarchy_from(Some(user), None);
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let temp = tempfile::tempdir().unwrap();
        let user = write(temp.path(), "user.toml", "[polling]\ninterval_seconds = 1\n");

        let result = load_hierarchy_from(Some(user), None);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }
}
