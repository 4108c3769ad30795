//! List command - Show declared configs and available profiles.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use cfgsmith_core::Profile;

use super::Cli;

#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: &ListArgs, cli: &Cli) -> Result<()> {
    let (settings, manifest) = super::load(cli)?;
    let profiles = Profile::list(&settings).context("Failed to list profiles")?;

    if args.json {
        let output = json!({
            "config_dir": settings.config_dir,
            "output_dir": settings.output_dir,
            "configs": manifest.configs,
            "profiles": profiles,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("📁 Config directory: {}", settings.config_dir.display());
    println!();
    println!("Configs:");
    if manifest.configs.is_empty() {
        println!("  (none)");
    }
    for entry in &manifest.configs {
        println!("  {}", entry.name);
        println!("      template: {}", entry.template_path);
        println!("      output:   {}", entry.output_path);
    }

    println!();
    println!("Profiles:");
    if profiles.is_empty() {
        println!("  (none)");
    }
    for profile in &profiles {
        println!("  {}", profile);
    }

    Ok(())
}
