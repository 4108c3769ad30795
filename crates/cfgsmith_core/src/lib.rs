//! # cfgsmith_core
//!
//! Renders environment-specific config files from shared templates and
//! per-profile overrides.
//!
//! A config directory holds:
//!
//! - `config.ini`: the manifest, listing templates and default data
//! - `templates/`: one template per config
//! - `profiles/<name>.ini`: overrides for a deployment profile
//!
//! Rendering a profile builds a token table per config from the built-in
//! tokens and the coalesced data, renders the template, expands every
//! `##NAME##` placeholder, and writes the result read-only.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cfgsmith_core::{ConfigWriter, Manifest, Settings};
//! use std::path::Path;
//!
//! let settings = Settings::resolve(Path::new("config"), None).unwrap();
//! let manifest = Manifest::load(&settings).unwrap();
//!
//! let writer = ConfigWriter::new(&settings, &manifest);
//! let report = writer.write_profile("production").unwrap();
//! for config in &report.configs {
//!     println!("{} -> {}", config.config, config.output_path.display());
//! }
//! ```

pub mod data;
pub mod error;
pub mod expr;
pub mod ini;
pub mod manifest;
pub mod profile;
pub mod renderer;
pub mod scaffold;
pub mod settings;
pub mod tokens;
pub mod writer;

pub use data::DataMap;
pub use error::{CoreError, CoreResult, Miss};
pub use manifest::{ConfigEntry, Manifest};
pub use profile::Profile;
pub use renderer::{RenderContext, TemplateRenderer};
pub use scaffold::Scaffold;
pub use settings::Settings;
pub use tokens::{BuiltinTokens, TokenTable};
pub use writer::{ConfigOutcome, ConfigWriter, RenderReport};
