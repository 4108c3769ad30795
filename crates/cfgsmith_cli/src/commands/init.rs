//! Init command - Create a starter config directory.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::Cli;

#[derive(Args)]
pub struct InitArgs {}

pub fn execute(_args: &InitArgs, cli: &Cli) -> Result<()> {
    let config_dir = &cli.config_dir;
    info!("Initializing config directory at {}", config_dir.display());

    let created = super::bootstrap(cli)?;

    if cli.quiet {
        return Ok(());
    }

    if !created {
        println!("ℹ️  Config directory already exists: {}", config_dir.display());
        return Ok(());
    }

    println!("✅ Config directory initialized!");
    println!();
    println!("Created:");
    println!("  📄 config.ini   - Manifest: templates and default data");
    println!("  📁 templates/   - Config templates");
    println!("  📁 profiles/    - One <profile>.ini per deployment target");
    println!();
    println!("Next steps:");
    println!("  1. Add templates/example.conf");
    println!("  2. Add profiles/dev.ini");
    println!("  3. cfgsmith render dev");

    Ok(())
}
