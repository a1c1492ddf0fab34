//! Configuration management

use anyhow::{Context, Result};
use genforge_core::Settings;
use std::path::{Path, PathBuf};

pub struct SettingsManager;

impl SettingsManager {
    /// Get the genforge home directory (~/.genforge)
    pub fn genforge_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("GENFORGE_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".genforge"))
    }

    /// Locate the configuration file to use, if any
    ///
    /// An explicit path wins; otherwise the working directory is searched
    /// before the genforge home directory.
    pub fn resolve_config_file(
        explicit: Option<&Path>,
        working_dir: &Path,
        home: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        Settings::find_config_file(working_dir)
            .or_else(|| home.and_then(Settings::find_config_file))
    }

    /// Load settings from the resolved file layered under `GENFORGE_*` variables
    pub fn load(explicit: Option<&Path>) -> Result<Settings> {
        let working_dir = std::env::current_dir()?;
        let home = Self::genforge_home().ok();
        let path = Self::resolve_config_file(explicit, &working_dir, home.as_deref());

        if let Some(ref path) = path {
            tracing::debug!("Using configuration file {}", path.display());
        }
        Settings::load(path.as_deref()).context("Failed to load settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_working_dir_before_home() {
        let cwd = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("genforge.toml"), "").unwrap();

        assert_eq!(
            SettingsManager::resolve_config_file(None, cwd.path(), Some(home.path())),
            Some(home.path().join("genforge.toml"))
        );

        std::fs::write(cwd.path().join("genforge.json"), "{}").unwrap();
        assert_eq!(
            SettingsManager::resolve_config_file(None, cwd.path(), Some(home.path())),
            Some(cwd.path().join("genforge.json"))
        );
    }

    #[test]
    fn test_explicit_path_wins() {
        let cwd = TempDir::new().unwrap();
        std::fs::write(cwd.path().join("genforge.toml"), "").unwrap();
        let explicit = cwd.path().join("custom.toml");
        assert_eq!(
            SettingsManager::resolve_config_file(Some(&explicit), cwd.path(), None),
            Some(explicit)
        );
    }

    #[test]
    fn test_nothing_found() {
        let cwd = TempDir::new().unwrap();
        assert_eq!(SettingsManager::resolve_config_file(None, cwd.path(), None), None);
    }
}
