//! Line-oriented parser for the manifest and profile files.
//!
//! Supported syntax:
//!
//! - `; comment` and `# comment` lines
//! - `[section]` headers
//! - `key = value` pairs, with optional surrounding quotes on the value
//!
//! Values are kept as literal strings. Duplicate keys keep their first
//! position and take the last value.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::data::DataMap;
use crate::error::{CoreError, CoreResult};

/// A parsed key-value document.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    /// Keys that appear before any section header.
    pub global: DataMap,
    sections: Vec<(String, DataMap)>,
}

impl IniDocument {
    /// Read and parse a file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        debug!("Reading {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse document text. `origin` is only used for error messages.
    pub fn parse(content: &str, origin: &Path) -> CoreResult<Self> {
        let mut doc = IniDocument::default();
        let mut current: Option<usize> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let syntax_error = |message: &str| CoreError::IniSyntax {
                path: origin.to_path_buf(),
                line: idx + 1,
                message: message.to_string(),
            };

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| syntax_error("unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(syntax_error("empty section name"));
                }
                current = Some(doc.section_index(name));
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| syntax_error("expected `key = value`"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(syntax_error("empty key"));
            }
            let value = unquote(value.trim());

            match current {
                Some(i) => doc.sections[i].1.insert(key, value),
                None => doc.global.insert(key, value),
            };
        }

        Ok(doc)
    }

    /// Get a section by name.
    pub fn section(&self, name: &str) -> Option<&DataMap> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// All keys of the document, ignoring section boundaries.
    pub fn flatten(&self) -> DataMap {
        let mut flat = self.global.clone();
        for (_, data) in &self.sections {
            for (k, v) in data.iter() {
                flat.insert(k, v);
            }
        }
        flat
    }

    // A repeated header continues the earlier section.
    fn section_index(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|(n, _)| n == name) {
            Some(i) => i,
            None => {
                self.sections.push((name.to_string(), DataMap::new()));
                self.sections.len() - 1
            }
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
