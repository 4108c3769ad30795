//! Template rendering.
//!
//! Plain templates are returned verbatim, byte for byte, in any encoding.
//! Templates containing `{% ... %}` blocks must be UTF-8 and are rendered by a
//! sandboxed MiniJinja environment: no loader, so no includes or file access,
//! only the data passed in.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use minijinja::{context, Environment};
use tracing::debug;

use crate::data::DataMap;
use crate::error::{CoreError, CoreResult};
use crate::tokens::TokenTable;

/// Everything a template may read while rendering.
pub struct RenderContext<'a> {
    pub profile: &'a str,
    pub config: &'a str,
    /// Coalesced default and profile data, unexpanded.
    pub data: &'a DataMap,
    pub tokens: &'a TokenTable,
}

/// Template renderer.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Whether `source` uses block directives.
    pub fn has_directives(source: &str) -> bool {
        source.contains("{%")
    }

    /// Read and render a template file.
    pub fn render_file(&self, path: &Path, ctx: &RenderContext<'_>) -> CoreResult<Vec<u8>> {
        let fail = |message: String| CoreError::Render {
            config: ctx.config.to_string(),
            message,
        };

        let bytes = fs::read(path)
            .map_err(|e| fail(format!("cannot read template {}: {}", path.display(), e)))?;

        match String::from_utf8(bytes) {
            Ok(source) => Ok(self.render_str(&source, ctx)?.into_bytes()),
            Err(err) => {
                let bytes = err.into_bytes();
                if bytes.windows(2).any(|w| w == b"{%") {
                    return Err(fail(format!(
                        "template {} uses block directives but is not valid UTF-8",
                        path.display()
                    )));
                }
                debug!("{}: passing non-UTF-8 template through verbatim", ctx.config);
                Ok(bytes)
            }
        }
    }

    /// Render template text.
    pub fn render_str(&self, source: &str, ctx: &RenderContext<'_>) -> CoreResult<String> {
        if !Self::has_directives(source) {
            return Ok(source.to_string());
        }

        debug!("{}: rendering template directives", ctx.config);

        let data: BTreeMap<&str, &str> = ctx.data.iter().collect();
        let keys: Vec<&str> = ctx.data.keys().collect();
        let tokens: BTreeMap<&str, &str> = ctx.tokens.named().collect();

        self.env
            .render_str(
                source,
                context! {
                    profile => ctx.profile,
                    config => ctx.config,
                    data => data,
                    keys => keys,
                    tokens => tokens,
                },
            )
            .map_err(|e| CoreError::Render {
                config: ctx.config.to_string(),
                message: format!("{:#}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::BuiltinTokens;
    use tempfile::tempdir;

    fn builtins() -> BuiltinTokens {
        BuiltinTokens {
            config_dir: "/cfg".into(),
            output_dir: "/out".into(),
            templates_dir: "/cfg/templates".into(),
            profile: "prod".into(),
            config: "web".into(),
        }
    }

    fn render(source: &str, data: &[(&str, &str)]) -> CoreResult<String> {
        let data: DataMap = data.iter().copied().collect();
        let tokens = TokenTable::build(&builtins(), &data)?;
        let ctx = RenderContext {
            profile: "prod",
            config: "web",
            data: &data,
            tokens: &tokens,
        };
        TemplateRenderer::new().render_str(source, &ctx)
    }

    fn render_bytes(source: &[u8]) -> CoreResult<Vec<u8>> {
        let temp = tempdir().unwrap();
        let path = temp.path().join("web.conf.tpl");
        fs::write(&path, source).unwrap();

        let data = DataMap::new();
        let tokens = TokenTable::build(&builtins(), &data)?;
        let ctx = RenderContext {
            profile: "prod",
            config: "web",
            data: &data,
            tokens: &tokens,
        };
        TemplateRenderer::new().render_file(&path, &ctx)
    }

    #[test]
    fn test_plain_template_is_verbatim() {
        let source = "Listen ##PORT##\n{{ not a directive }}\n";
        assert_eq!(render(source, &[("PORT", "80")]).unwrap(), source);
    }

    #[test]
    fn test_conditionals_over_data() {
        let source = "{% if data.DEBUG == \"1\" %}LogLevel debug{% else %}LogLevel warn{% endif %}\n";
        assert_eq!(render(source, &[("DEBUG", "1")]).unwrap(), "LogLevel debug\n");
        assert_eq!(render(source, &[("DEBUG", "0")]).unwrap(), "LogLevel warn\n");
    }

    #[test]
    fn test_loop_over_keys_keeps_merge_order() {
        let source = "{% for k in keys %}{{ k }}={{ data[k] }};{% endfor %}";
        assert_eq!(
            render(source, &[("Z", "1"), ("A", "2")]).unwrap(),
            "Z=1;A=2;"
        );
    }

    #[test]
    fn test_tokens_and_names_in_scope() {
        let source = "{% if profile == \"prod\" %}{{ config }} {{ tokens.URL }}{% endif %}";
        let out = render(source, &[("HOST", "example.com"), ("URL", "https://##HOST##")]).unwrap();
        assert_eq!(out, "web https://example.com");
    }

    #[test]
    fn test_placeholders_survive_rendering() {
        let source = "{% if true %}Listen ##PORT##{% endif %}";
        assert_eq!(render(source, &[]).unwrap(), "Listen ##PORT##");
    }

    #[test]
    fn test_no_includes() {
        let err = render("{% include \"/etc/passwd\" %}", &[]).unwrap_err();
        assert!(matches!(err, CoreError::Render { .. }));
    }

    #[test]
    fn test_latin1_template_passes_through() {
        let source = b"# caf\xe9\nListen ##PORT##\n";
        assert_eq!(render_bytes(source).unwrap(), source.to_vec());
    }

    #[test]
    fn test_latin1_template_with_directives() {
        match render_bytes(b"{% if true %}caf\xe9{% endif %}") {
            Err(CoreError::Render { config, message }) => {
                assert_eq!(config, "web");
                assert!(message.contains("web.conf.tpl"));
                assert!(message.contains("not valid UTF-8"));
            }
            other => panic!("expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_template_names_path() {
        let temp = tempdir().unwrap();
        let data = DataMap::new();
        let tokens = TokenTable::build(&builtins(), &data).unwrap();
        let ctx = RenderContext {
            profile: "prod",
            config: "web",
            data: &data,
            tokens: &tokens,
        };
        let err = TemplateRenderer::new()
            .render_file(&temp.path().join("gone.tpl"), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("gone.tpl"));
    }

    #[test]
    fn test_syntax_error() {
        let err = render("{% if %}", &[]).unwrap_err();
        assert!(matches!(err, CoreError::Render { .. }));
    }
}
