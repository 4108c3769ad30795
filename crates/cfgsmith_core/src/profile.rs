//! Profile override files.

use std::fs;

use tracing::debug;

use crate::data::DataMap;
use crate::error::{CoreError, CoreResult};
use crate::ini::IniDocument;
use crate::settings::Settings;

/// A named set of overrides, loaded from `profiles/<name>.ini`.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub data: DataMap,
}

impl Profile {
    /// Load a profile's override file. Sections in the file are flattened.
    pub fn load(settings: &Settings, name: &str) -> CoreResult<Self> {
        let path = settings.profile_path(name);
        if !path.is_file() {
            return Err(CoreError::ProfileNotFound {
                profile: name.to_string(),
                path,
            });
        }

        let data = IniDocument::load(&path)?.flatten();
        debug!("Loaded profile {} with {} keys", name, data.len());

        Ok(Self {
            name: name.to_string(),
            data,
        })
    }

    /// Names of all profiles in the profiles directory, sorted.
    pub fn list(settings: &Settings) -> CoreResult<Vec<String>> {
        let dir = settings.profiles_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "ini") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
