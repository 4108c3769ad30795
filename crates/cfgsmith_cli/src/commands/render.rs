//! Render command - Write every config for a profile.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cfgsmith_core::{ConfigWriter, RenderReport};

use super::Cli;

#[derive(Args)]
pub struct RenderArgs {
    /// Profile to render (name of a file in profiles/ without .ini)
    profile: String,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Render without writing, printing each config to stdout
    #[arg(long)]
    dry_run: bool,
}

pub fn execute(args: &RenderArgs, cli: &Cli) -> Result<()> {
    super::bootstrap(cli)?;
    let (settings, manifest) = super::load(cli)?;
    info!(
        "Rendering profile {} into {}",
        args.profile,
        settings.output_dir.display()
    );

    let writer = ConfigWriter::new(&settings, &manifest);
    let result = if args.dry_run {
        writer.preview(&args.profile)
    } else {
        writer.render_profile(&args.profile)
    };
    let report = result.with_context(|| format!("Failed to render profile {}", args.profile))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.dry_run {
        print_preview(&report);
    } else if !cli.quiet {
        print_summary(&report);
    }

    report
        .into_result()
        .with_context(|| format!("Unresolved placeholders in profile {}", args.profile))?;
    Ok(())
}

fn print_summary(report: &RenderReport) {
    println!("📋 Profile: {}", report.profile);
    for config in &report.configs {
        if config.misses.is_empty() {
            println!("   ✅ {} -> {}", config.config, config.output_path.display());
        } else {
            println!("   ⚠️  {} -> {}", config.config, config.output_path.display());
            for missed in &config.misses {
                println!("      - no substitution for {}", missed);
            }
        }
    }
}

fn print_preview(report: &RenderReport) {
    for config in &report.configs {
        println!("# ==> {} ({})", config.config, config.output_path.display());
        if let Some(rendered) = &config.rendered {
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }
}
