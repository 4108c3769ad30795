//! Error types for config rendering.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A placeholder left in a rendered config after expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Miss {
    pub config: String,
    pub placeholder: String,
}

/// Errors that can occur while loading inputs or rendering configs.
///
/// Everything except [`CoreError::UnresolvedPlaceholders`] aborts a run at the
/// point it occurs.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config directory not found: {0}")]
    ConfigDirNotFound(PathBuf),

    #[error("Syntax error in {path}:{line}: {message}")]
    IniSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No '{section}' section in manifest {path}")]
    ManifestMissingSection { section: String, path: PathBuf },

    #[error("{config}: manifest declares a configFileTemplate but no {config}.configFile")]
    ManifestMissingOutput { config: String },

    #[error("No config named {0} in manifest")]
    UnknownConfig(String),

    #[error("Could not load profile {profile} from {path}")]
    ProfileNotFound { profile: String, path: PathBuf },

    #[error("{config}: configFileTemplate {path} does not exist")]
    TemplateNotFound { config: String, path: PathBuf },

    #[error("{config}: configFile and configFileTemplate cannot be the same. Both are set to: {path}")]
    OutputEqualsTemplate { config: String, path: PathBuf },

    #[error("{config}: error writing config file {path}: {source}")]
    WriteFailure {
        config: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expression in token {token} failed: {message}")]
    Expression { token: String, message: String },

    #[error("{config}: template rendering failed: {message}")]
    Render { config: String, message: String },

    #[error("{} placeholder(s) could not be substituted; generated files may be unsafe to use", misses.len())]
    UnresolvedPlaceholders { misses: Vec<Miss> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error was reported after every config had been written.
    pub fn is_soft(&self) -> bool {
        matches!(self, CoreError::UnresolvedPlaceholders { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unresolved_is_soft() {
        let soft = CoreError::UnresolvedPlaceholders {
            misses: vec![Miss {
                config: "web".into(),
                placeholder: "##MISSING##".into(),
            }],
        };
        assert!(soft.is_soft());
        assert!(soft.to_string().starts_with("1 placeholder(s)"));

        let fatal = CoreError::TemplateNotFound {
            config: "web".into(),
            path: PathBuf::from("/tmp/web.conf.tpl"),
        };
        assert!(!fatal.is_soft());
    }
}
