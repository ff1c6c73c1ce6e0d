use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found, set $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.prwatch/` directory layout.
///
/// Single source of truth for every path under `~/.prwatch/`. Use `resolve()`
/// in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct PrwatchPaths {
    base_dir: PathBuf,
}

impl PrwatchPaths {
    /// Resolve paths from the user's home directory (`~/.prwatch`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            base_dir: home.join(".prwatch"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// The base `~/.prwatch` directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding persisted key/value state (seen map, caches).
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    /// File backing a single persisted key. Path separators in the key are
    /// flattened so every key maps to one file directly under `state/`.
    pub fn state_file(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\'], "_");
        self.state_dir().join(format!("{}.json", safe_key))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn user_config(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    // --- Project-level paths (not under ~/.prwatch) ---

    /// `<project_root>/.prwatch/config.toml`
    pub fn project_config(project_root: &Path) -> PathBuf {
        project_root.join(".prwatch").join("config.toml")
    }
}
