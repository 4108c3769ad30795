//! CLI command definitions.
//!
//! This module defines the command structure for the cfgsmith CLI.
//! Each subcommand maps to one operation on a config directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cfgsmith_core::{Manifest, Scaffold, Settings};

pub mod init;
pub mod list;
pub mod render;
pub mod tokens;

/// cfgsmith - environment-specific config files from shared templates
#[derive(Parser)]
#[command(name = "cfgsmith")]
#[command(version, about = "cfgsmith - render config files per deployment profile")]
#[command(long_about = r#"
cfgsmith combines a set of config templates with per-profile data
(dev, staging, production, ...) and writes the finished config files.

LAYOUT:
  <config-dir>/config.ini          → manifest: [templates] and default [data]
  <config-dir>/templates/          → template files
  <config-dir>/profiles/<name>.ini → overrides for one profile

COMMANDS:
  init    → Create a starter config directory
  render  → Write every config for a profile
  list    → Show declared configs and available profiles
  tokens  → Show the resolved tokens for one config

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Unresolved placeholders (files were still written)
  4 - Template, manifest or profile error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding config.ini, templates/ and profiles/
    #[arg(short, long, global = true, env = "CFGSMITH_CONFIG_DIR", default_value = "./config")]
    pub config_dir: PathBuf,

    /// Directory generated configs are written to (defaults to the config directory)
    #[arg(short, long, global = true, env = "CFGSMITH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the config directory with a starter manifest
    Init(init::InitArgs),

    /// Render and write every config for a profile
    Render(render::RenderArgs),

    /// List declared configs and available profiles
    List(list::ListArgs),

    /// Print the resolved token table for one config
    Tokens(tokens::TokensArgs),
}

/// Create the config directory layout if it does not exist yet.
pub fn bootstrap(cli: &Cli) -> Result<bool> {
    Scaffold::ensure(&cli.config_dir).with_context(|| {
        format!(
            "Failed to initialize config directory {}",
            cli.config_dir.display()
        )
    })
}

/// Load settings and manifest from an existing config directory.
pub fn load(cli: &Cli) -> Result<(Settings, Manifest)> {
    let settings = Settings::resolve(&cli.config_dir, cli.output_dir.as_deref())?;
    let manifest = Manifest::load(&settings).context("Failed to load manifest")?;
    Ok((settings, manifest))
}
