//! Manifest definitions.
//!
//! The manifest (`config.ini`) declares every managed config in its
//! `[templates]` section and optional default data in `[data]`:
//!
//! ```ini
//! [templates]
//! web.configFileTemplate = ##TEMPLATES_DIR##/web.conf.tpl
//! web.configFile         = ##OUTPUT_DIR##/web.conf
//!
//! [data]
//! PORT = 8080
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::data::DataMap;
use crate::error::{CoreError, CoreResult};
use crate::ini::IniDocument;
use crate::settings::Settings;

pub const TEMPLATES_SECTION: &str = "templates";
pub const DATA_SECTION: &str = "data";

/// One declared config: a template and where its rendering goes.
///
/// Paths are stored unexpanded; they may contain built-in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub name: String,
    pub template_path: String,
    pub output_path: String,
}

/// The parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Declared configs, in manifest order.
    pub configs: Vec<ConfigEntry>,
    /// Default data shared by every profile.
    pub defaults: DataMap,
}

fn template_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^.]+)\.configFileTemplate$").expect("template key pattern is valid")
    })
}

impl Manifest {
    /// Load the manifest from the config directory.
    pub fn load(settings: &Settings) -> CoreResult<Self> {
        let path = settings.manifest_path();
        let doc = IniDocument::load(&path)?;
        Self::from_document(&doc, &path)
    }

    /// Build a manifest from an already parsed document read from `path`.
    pub fn from_document(doc: &IniDocument, path: &Path) -> CoreResult<Self> {
        let templates =
            doc.section(TEMPLATES_SECTION)
                .ok_or_else(|| CoreError::ManifestMissingSection {
                    section: TEMPLATES_SECTION.to_string(),
                    path: path.to_path_buf(),
                })?;

        let mut configs = Vec::new();
        for (key, template_path) in templates.iter() {
            let Some(caps) = template_key_pattern().captures(key) else {
                continue;
            };
            let name = &caps[1];
            let output_path = templates
                .get(&format!("{}.configFile", name))
                .ok_or_else(|| CoreError::ManifestMissingOutput {
                    config: name.to_string(),
                })?;

            debug!("Declared config {}: {} -> {}", name, template_path, output_path);
            configs.push(ConfigEntry {
                name: name.to_string(),
                template_path: template_path.to_string(),
                output_path: output_path.to_string(),
            });
        }

        let defaults = doc.section(DATA_SECTION).cloned().unwrap_or_default();

        Ok(Self { configs, defaults })
    }

    /// Find a config by name.
    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.configs.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(content: &str) -> CoreResult<Manifest> {
        let path = Path::new("config.ini");
        let doc = IniDocument::parse(content, path)?;
        Manifest::from_document(&doc, path)
    }

    #[test]
    fn test_configs_in_manifest_order() {
        let m = manifest(
            r#"
[templates]
web.configFileTemplate = ##TEMPLATES_DIR##/web.conf.tpl
web.configFile = ##OUTPUT_DIR##/web.conf
db.configFile = ##OUTPUT_DIR##/db.conf
db.configFileTemplate = ##TEMPLATES_DIR##/db.conf.tpl

[data]
PORT = 8080
"#,
        )
        .unwrap();

        let names: Vec<_> = m.configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["web", "db"]);
        assert_eq!(m.get("db").unwrap().output_path, "##OUTPUT_DIR##/db.conf");
        assert_eq!(m.defaults.get("PORT"), Some("8080"));
        assert_eq!(m.defaults.len(), 1);
        assert!(!m.defaults.contains_key("web.configFile"));
    }

    #[test]
    fn test_data_section_optional() {
        let m = manifest("[templates]\n").unwrap();
        assert!(m.configs.is_empty());
        assert!(m.defaults.is_empty());
    }

    #[test]
    fn test_missing_templates_section() {
        assert!(matches!(
            manifest("[data]\nA = 1\n"),
            Err(CoreError::ManifestMissingSection { .. })
        ));
    }

    #[test]
    fn test_missing_config_file_entry() {
        match manifest("[templates]\nweb.configFileTemplate = web.tpl\n") {
            Err(CoreError::ManifestMissingOutput { config }) => assert_eq!(config, "web"),
            other => panic!("expected missing output, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_names_are_not_configs() {
        let m = manifest("[templates]\na.b.configFileTemplate = x\na.b.configFile = y\n").unwrap();
        assert!(m.configs.is_empty());
    }
}
