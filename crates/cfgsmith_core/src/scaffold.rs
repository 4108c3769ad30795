//! Config directory bootstrapping.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::CoreResult;
use crate::settings::MANIFEST_FILE;

/// Starter manifest written into a freshly created config directory.
pub const STARTER_MANIFEST: &str = r#"; The "templates" section lists every config template managed by cfgsmith.
; Paths may use these tokens:
; ##CONFIG_DIR##    => Absolute path to the config directory.
; ##TEMPLATES_DIR## => Absolute path to the templates directory.
; ##OUTPUT_DIR##    => Absolute path to the output directory.
; ##PROFILE##       => The current profile name (ie dev/staging/production).
; ##CONFIG##        => The current config name (ie httpd, sh).
; Each config needs 2 entries under "templates":
;   - <config>.configFileTemplate => path to the input template file
;   - <config>.configFile         => path to write the output config file to
[templates]
example.configFileTemplate = ##TEMPLATES_DIR##/##CONFIG##.conf
example.configFile         = ##OUTPUT_DIR##/##CONFIG##.conf

[data]
; Default data. Each setting here can be overridden by the profile's ini file.
; Only keys in this section become ##TOKENS##; the entries under "templates"
; above do not.
"#;

/// Config directory scaffolding.
pub struct Scaffold;

impl Scaffold {
    /// Create the config directory layout if `config_dir` does not exist yet.
    ///
    /// Returns `true` if anything was created. An existing directory is left
    /// untouched, even if it is incomplete.
    pub fn ensure(config_dir: &Path) -> CoreResult<bool> {
        if config_dir.exists() {
            return Ok(false);
        }

        info!(
            "Config directory does not exist. Initializing new config directory at {}",
            config_dir.display()
        );

        for dir in [
            config_dir.to_path_buf(),
            config_dir.join("templates"),
            config_dir.join("profiles"),
        ] {
            info!("mkdir {}", dir.display());
            fs::create_dir_all(&dir)?;
        }

        fs::write(config_dir.join(MANIFEST_FILE), STARTER_MANIFEST)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::settings::Settings;
    use tempfile::tempdir;

    #[test]
    fn test_creates_layout() {
        let temp = tempdir().unwrap();
        let config_dir = temp.path().join("config");

        assert!(Scaffold::ensure(&config_dir).unwrap());
        assert!(config_dir.join("templates").is_dir());
        assert!(config_dir.join("profiles").is_dir());

        let settings = Settings::resolve(&config_dir, None).unwrap();
        let manifest = Manifest::load(&settings).unwrap();
        assert_eq!(manifest.configs.len(), 1);
        assert_eq!(manifest.configs[0].name, "example");
        assert!(manifest.defaults.is_empty());
        assert!(STARTER_MANIFEST.contains("Only keys in this section become ##TOKENS##"));
    }

    #[test]
    fn test_existing_directory_untouched() {
        let temp = tempdir().unwrap();
        assert!(!Scaffold::ensure(temp.path()).unwrap());
        assert!(!temp.path().join(MANIFEST_FILE).exists());
    }
}
