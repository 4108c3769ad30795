//! Token tables and placeholder expansion.
//!
//! A token is a `##NAME##` placeholder with a resolved value. Tables are
//! built per config: the five built-in tokens first, then one token per
//! coalesced data key, each value expanded against the tokens inserted
//! before it. Later tokens are never visible to earlier ones.

use std::cmp::Reverse;
use std::sync::OnceLock;

use regex::bytes::Regex;
use serde::Serialize;

use crate::data::DataMap;
use crate::error::CoreResult;
use crate::expr;
use crate::settings::Settings;

pub const CONFIG_DIR: &str = "CONFIG_DIR";
pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const TEMPLATES_DIR: &str = "TEMPLATES_DIR";
pub const PROFILE: &str = "PROFILE";
pub const CONFIG: &str = "CONFIG";

/// Wrap a token name in placeholder markers.
pub fn placeholder(name: &str) -> String {
    format!("##{}##", name)
}

fn leftover_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"##[A-Za-z0-9_.\-]+##").expect("placeholder pattern is valid")
    })
}

/// Placeholder-shaped substrings left in `text`, deduplicated in first-seen order.
///
/// `text` need not be UTF-8; placeholders themselves are always ASCII.
pub fn find_unresolved(text: impl AsRef<[u8]>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in leftover_pattern().find_iter(text.as_ref()) {
        let placeholder = String::from_utf8_lossy(m.as_bytes());
        if !found.iter().any(|f| *f == placeholder) {
            found.push(placeholder.into_owned());
        }
    }
    found
}

/// Values of the built-in tokens for one profile and config.
#[derive(Debug, Clone)]
pub struct BuiltinTokens {
    pub config_dir: String,
    pub output_dir: String,
    pub templates_dir: String,
    pub profile: String,
    pub config: String,
}

impl BuiltinTokens {
    pub fn new(settings: &Settings, profile: &str, config: &str) -> Self {
        Self {
            config_dir: settings.config_dir.display().to_string(),
            output_dir: settings.output_dir.display().to_string(),
            templates_dir: settings.templates_dir().display().to_string(),
            profile: profile.to_string(),
            config: config.to_string(),
        }
    }
}

/// Ordered mapping of placeholder to resolved value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenTable {
    tokens: DataMap,
}

impl TokenTable {
    /// A table holding only the built-in tokens.
    pub fn with_builtins(builtins: &BuiltinTokens) -> Self {
        let mut table = Self::default();
        table.insert(CONFIG_DIR, &builtins.config_dir);
        table.insert(OUTPUT_DIR, &builtins.output_dir);
        table.insert(TEMPLATES_DIR, &builtins.templates_dir);
        table.insert(PROFILE, &builtins.profile);
        table.insert(CONFIG, &builtins.config);
        table
    }

    /// Build the full table from built-ins and coalesced data.
    ///
    /// Each data value is expanded against the table as it stands (built-ins
    /// and earlier keys only), then evaluated if it embeds an expression.
    pub fn build(builtins: &BuiltinTokens, data: &DataMap) -> CoreResult<Self> {
        let mut table = Self::with_builtins(builtins);
        for (key, raw) in data.iter() {
            let expanded = table.expand(raw);
            let value = expr::resolve_value(key, &expanded)?;
            table.insert(key, value);
        }
        Ok(table)
    }

    /// Insert token `name`, overwriting an existing value in place.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.tokens.insert(placeholder(name), value);
    }

    /// Resolved value of token `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(&placeholder(name))
    }

    /// `(placeholder, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter()
    }

    /// `(name, value)` pairs in insertion order, without the markers.
    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens
            .iter()
            .map(|(k, v)| (&k[2..k.len() - 2], v))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Replace every placeholder in `input` with its value in one sweep.
    ///
    /// Substituted text is not scanned again, so a value that itself contains
    /// a placeholder is emitted literally. Where two placeholders start at the
    /// same position the longer one wins.
    pub fn expand(&self, input: &str) -> String {
        if self.is_empty() || !input.contains("##") {
            return input.to_string();
        }
        // Placeholders and values are whole UTF-8 strings, so the splice is too.
        String::from_utf8_lossy(&self.expand_bytes(input.as_bytes())).into_owned()
    }

    /// [`TokenTable::expand`] over raw bytes. Bytes outside placeholders are
    /// copied unchanged, whatever their encoding.
    pub fn expand_bytes(&self, input: &[u8]) -> Vec<u8> {
        let mut candidates: Vec<(&[u8], &[u8])> = self
            .iter()
            .map(|(k, v)| (k.as_bytes(), v.as_bytes()))
            .collect();
        candidates.sort_by_key(|(k, _)| Reverse(k.len()));

        let mut out = Vec::with_capacity(input.len());
        let mut rest = input;
        while let Some(pos) = rest.windows(2).position(|w| w == b"##") {
            out.extend_from_slice(&rest[..pos]);
            let tail = &rest[pos..];
            match candidates.iter().find(|(k, _)| tail.starts_with(k)) {
                Some((k, v)) => {
                    out.extend_from_slice(v);
                    rest = &tail[k.len()..];
                }
                None => {
                    out.push(b'#');
                    rest = &tail[1..];
                }
            }
        }
        out.extend_from_slice(rest);
        out
    }
}
