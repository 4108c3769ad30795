//! Immutable run settings.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// Name of the manifest file inside the config directory.
pub const MANIFEST_FILE: &str = "config.ini";

/// Directory and path settings for one invocation.
///
/// Built once and passed by reference into every operation.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Absolute path to the directory holding config.ini, templates and profiles.
    pub config_dir: PathBuf,
    /// Absolute path generated configs are written under by default.
    pub output_dir: PathBuf,
}

impl Settings {
    /// Resolve settings from user-supplied directories.
    ///
    /// The config directory must already exist. The output directory defaults
    /// to the config directory and may not exist yet.
    pub fn resolve(config_dir: &Path, output_dir: Option<&Path>) -> CoreResult<Self> {
        let config_dir = config_dir
            .canonicalize()
            .map_err(|_| CoreError::ConfigDirNotFound(config_dir.to_path_buf()))?;

        let output_dir = match output_dir {
            Some(dir) if dir.exists() => dir.canonicalize()?,
            Some(dir) => std::path::absolute(dir)?,
            None => config_dir.clone(),
        };

        Ok(Self {
            config_dir,
            output_dir,
        })
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.config_dir.join("templates")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.config_dir.join("profiles")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config_dir.join(MANIFEST_FILE)
    }

    /// Path of the override file for a profile.
    pub fn profile_path(&self, profile: &str) -> PathBuf {
        self.profiles_dir().join(format!("{}.ini", profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_defaults_to_config_dir() {
        let temp = tempdir().unwrap();
        let settings = Settings::resolve(temp.path(), None).unwrap();

        assert_eq!(settings.output_dir, settings.config_dir);
        assert!(settings.config_dir.is_absolute());
        assert_eq!(settings.templates_dir(), settings.config_dir.join("templates"));
        assert_eq!(
            settings.profile_path("prod"),
            settings.config_dir.join("profiles").join("prod.ini")
        );
    }

    #[test]
    fn test_missing_output_dir_is_allowed() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("not-yet");
        let settings = Settings::resolve(temp.path(), Some(out.as_path())).unwrap();

        assert!(settings.output_dir.is_absolute());
        assert!(settings.output_dir.ends_with("not-yet"));
    }

    #[test]
    fn test_missing_config_dir() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            Settings::resolve(&missing, None),
            Err(CoreError::ConfigDirNotFound(_))
        ));
    }
}
