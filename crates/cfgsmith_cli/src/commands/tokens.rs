//! Tokens command - Print the resolved token table for one config.

use anyhow::{Context, Result};
use clap::Args;

use cfgsmith_core::ConfigWriter;

use super::Cli;

#[derive(Args)]
pub struct TokensArgs {
    /// Profile whose data is coalesced over the manifest defaults
    profile: String,

    /// Config to build the table for
    #[arg(short = 'n', long = "config")]
    config: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: &TokensArgs, cli: &Cli) -> Result<()> {
    let (settings, manifest) = super::load(cli)?;
    let writer = ConfigWriter::new(&settings, &manifest);

    let table = writer
        .token_table(&args.profile, &args.config)
        .with_context(|| {
            format!(
                "Failed to build tokens for config {} in profile {}",
                args.config, args.profile
            )
        })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    let width = table.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in table.iter() {
        println!("{:width$} = {}", name, value, width = width);
    }
    Ok(())
}
