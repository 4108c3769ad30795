//! Writing every declared config for a profile.
//!
//! The writer drives one run:
//! - Load the profile and coalesce it over the manifest defaults
//! - For each config: expand its paths, check them, build its token table,
//!   render, expand, scan for leftovers and write
//! - Report leftover placeholders once all configs are written
//!
//! Structural problems (missing profile or template, path collision, write
//! errors) stop the run where they occur. Configs written before that point
//! stay written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::data::DataMap;
use crate::error::{CoreError, CoreResult, Miss};
use crate::manifest::{ConfigEntry, Manifest};
use crate::profile::Profile;
use crate::renderer::{RenderContext, TemplateRenderer};
use crate::settings::Settings;
use crate::tokens::{find_unresolved, BuiltinTokens, TokenTable};

/// Outcome for one config.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigOutcome {
    pub config: String,
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    /// Placeholders left after expansion, in first-seen order.
    pub misses: Vec<String>,
    /// Rendered body; only kept when previewing. Bytes that are not UTF-8
    /// show as U+FFFD here but are written unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub profile: String,
    pub configs: Vec<ConfigOutcome>,
}

impl RenderReport {
    fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            configs: Vec::new(),
        }
    }

    pub fn had_misses(&self) -> bool {
        self.configs.iter().any(|c| !c.misses.is_empty())
    }

    pub fn misses(&self) -> Vec<Miss> {
        self.configs
            .iter()
            .flat_map(|c| {
                c.misses.iter().map(|m| Miss {
                    config: c.config.clone(),
                    placeholder: m.clone(),
                })
            })
            .collect()
    }

    /// Turn leftover placeholders into [`CoreError::UnresolvedPlaceholders`].
    pub fn into_result(self) -> CoreResult<Self> {
        if self.had_misses() {
            return Err(CoreError::UnresolvedPlaceholders {
                misses: self.misses(),
            });
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Preview,
}

/// Renders and writes the configs declared in a manifest.
pub struct ConfigWriter<'a> {
    settings: &'a Settings,
    manifest: &'a Manifest,
    renderer: TemplateRenderer,
}

impl<'a> ConfigWriter<'a> {
    pub fn new(settings: &'a Settings, manifest: &'a Manifest) -> Self {
        Self {
            settings,
            manifest,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Write every config for `profile`, failing with
    /// [`CoreError::UnresolvedPlaceholders`] after the fact if any
    /// placeholder was left unresolved.
    pub fn write_profile(&self, profile: &str) -> CoreResult<RenderReport> {
        self.render_profile(profile)?.into_result()
    }

    /// Write every config for `profile` and report per-config outcomes.
    ///
    /// Leftover placeholders are only recorded in the report.
    pub fn render_profile(&self, profile: &str) -> CoreResult<RenderReport> {
        self.run(profile, Mode::Write)
    }

    /// Render every config for `profile` without touching the file system.
    pub fn preview(&self, profile: &str) -> CoreResult<RenderReport> {
        self.run(profile, Mode::Preview)
    }

    /// The resolved token table of one config.
    pub fn token_table(&self, profile: &str, config: &str) -> CoreResult<TokenTable> {
        let entry = self
            .manifest
            .get(config)
            .ok_or_else(|| CoreError::UnknownConfig(config.to_string()))?;
        let profile = Profile::load(self.settings, profile)?;
        let coalesced = self.manifest.defaults.merged(&profile.data);
        let builtins = BuiltinTokens::new(self.settings, &profile.name, &entry.name);
        TokenTable::build(&builtins, &coalesced)
    }

    fn run(&self, profile: &str, mode: Mode) -> CoreResult<RenderReport> {
        let profile = Profile::load(self.settings, profile)?;
        if mode == Mode::Write {
            self.ensure_output_dir()?;
        }

        let coalesced = self.manifest.defaults.merged(&profile.data);
        let mut report = RenderReport::new(&profile.name);

        for entry in &self.manifest.configs {
            let outcome = self.process(&profile.name, entry, &coalesced, mode)?;
            report.configs.push(outcome);
        }

        if report.had_misses() {
            warn!(
                "Some variables could not be substituted for profile {}",
                profile.name
            );
        }
        Ok(report)
    }

    fn process(
        &self,
        profile: &str,
        entry: &ConfigEntry,
        coalesced: &DataMap,
        mode: Mode,
    ) -> CoreResult<ConfigOutcome> {
        info!("{}", entry.name);

        let builtins = BuiltinTokens::new(self.settings, profile, &entry.name);
        let (template_path, output_path) = resolve_paths(&builtins, entry)?;

        if !template_path.is_file() {
            return Err(CoreError::TemplateNotFound {
                config: entry.name.clone(),
                path: template_path,
            });
        }

        info!(
            "{}: Creating {} from template {}",
            entry.name,
            output_path.display(),
            template_path.display()
        );

        let tokens = TokenTable::build(&builtins, coalesced)?;
        debug!("{}: {} tokens", entry.name, tokens.len());

        let ctx = RenderContext {
            profile,
            config: &entry.name,
            data: coalesced,
            tokens: &tokens,
        };
        let rendered = self.renderer.render_file(&template_path, &ctx)?;
        let expanded = tokens.expand_bytes(&rendered);

        let misses = find_unresolved(&expanded);
        for missed in &misses {
            warn!("{}: No substitution found for: {}", entry.name, missed);
        }

        let rendered = match mode {
            Mode::Write => {
                write_output(&entry.name, &output_path, &expanded)?;
                None
            }
            Mode::Preview => Some(String::from_utf8_lossy(&expanded).into_owned()),
        };

        Ok(ConfigOutcome {
            config: entry.name.clone(),
            template_path,
            output_path,
            misses,
            rendered,
        })
    }

    fn ensure_output_dir(&self) -> CoreResult<()> {
        let dir = &self.settings.output_dir;
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!(
                "Output directory does not exist. Created output directory at {}",
                dir.display()
            );
        }
        Ok(())
    }
}

/// Expand a config's template and output paths with the built-in tokens.
fn resolve_paths(builtins: &BuiltinTokens, entry: &ConfigEntry) -> CoreResult<(PathBuf, PathBuf)> {
    let table = TokenTable::with_builtins(builtins);
    let template = table.expand(&entry.template_path);
    let output = table.expand(&entry.output_path);

    if template == output {
        return Err(CoreError::OutputEqualsTemplate {
            config: entry.name.clone(),
            path: PathBuf::from(output),
        });
    }
    Ok((PathBuf::from(template), PathBuf::from(output)))
}

/// Replace `path` with `content` and leave it read-only.
///
/// The content goes to a temporary file next to `path` first and is renamed
/// into place, so readers never see a missing or partial file.
fn write_output(config: &str, path: &Path, content: &[u8]) -> CoreResult<()> {
    let fail = |source: std::io::Error| CoreError::WriteFailure {
        config: config.to_string(),
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(content).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.as_file()
        .set_permissions(read_only_permissions(tmp.as_file())?)
        .map_err(fail)?;

    // Windows refuses to replace a read-only file.
    #[cfg(windows)]
    {
        if let Ok(meta) = fs::metadata(path) {
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                fs::set_permissions(path, perms).map_err(fail)?;
            }
        }
    }

    tmp.persist(path).map_err(|e| fail(e.error))?;
    debug!("{}: wrote {} bytes to {}", config, content.len(), path.display());
    Ok(())
}

#[cfg(unix)]
fn read_only_permissions(_file: &fs::File) -> CoreResult<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o444))
}

#[cfg(not(unix))]
fn read_only_permissions(file: &fs::File) -> CoreResult<fs::Permissions> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(true);
    Ok(perms)
}
