//! cfgsmith CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Unresolved placeholders (files were still written)
//! - 4: Template, manifest or profile error

use std::process::ExitCode;

use cfgsmith_core::CoreError;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const UNRESOLVED_PLACEHOLDERS: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Init(args) => commands::init::execute(args, &cli),
        Commands::Render(args) => commands::render::execute(args, &cli),
        Commands::List(args) => commands::list::execute(args, &cli),
        Commands::Tokens(args) => commands::tokens::execute(args, &cli),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Progress goes to `info`, detail to `debug`, misses to `warn`.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let Some(core) = e.chain().find_map(|c| c.downcast_ref::<CoreError>()) else {
        return ExitCodes::GENERAL_ERROR;
    };

    if core.is_soft() {
        return ExitCodes::UNRESOLVED_PLACEHOLDERS;
    }

    match core {
        CoreError::UnresolvedPlaceholders { .. } => ExitCodes::UNRESOLVED_PLACEHOLDERS,
        CoreError::UnknownConfig(_) => ExitCodes::INVALID_ARGS,
        CoreError::ManifestMissingSection { .. }
        | CoreError::ManifestMissingOutput { .. }
        | CoreError::IniSyntax { .. }
        | CoreError::ProfileNotFound { .. }
        | CoreError::TemplateNotFound { .. }
        | CoreError::OutputEqualsTemplate { .. }
        | CoreError::Expression { .. }
        | CoreError::Render { .. } => ExitCodes::TEMPLATE_ERROR,
        CoreError::ConfigDirNotFound(_) | CoreError::WriteFailure { .. } | CoreError::Io(_) => {
            ExitCodes::GENERAL_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use cfgsmith_core::Miss;

    #[test]
    fn test_categorize_core_errors_through_context() {
        let err: anyhow::Result<()> = Err(CoreError::UnresolvedPlaceholders {
            misses: vec![Miss {
                config: "web".into(),
                placeholder: "##X##".into(),
            }],
        })
        .context("Failed to render profile prod");
        assert_eq!(
            categorize_error(&err.unwrap_err()),
            ExitCodes::UNRESOLVED_PLACEHOLDERS
        );

        let err = anyhow::Error::new(CoreError::OutputEqualsTemplate {
            config: "a".into(),
            path: "/x".into(),
        });
        assert_eq!(categorize_error(&err), ExitCodes::TEMPLATE_ERROR);
    }

    #[test]
    fn test_categorize_other_errors() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
