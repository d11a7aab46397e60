// Layout manifest - the text contract between translation and runtime
//
//   uniforms [ rpColor rpMVPmatrixX ... ]
//   bindings [ ubo sampler ... ]
//
// Both sections are optional, but when present they appear in this order.
// Anything after the bindings section is an error.
// Every name must resolve against the fixed registries in `params`.

use crate::error::{RenderProgError, Result};
use crate::params::{BindingType, RenderParm};

/// Whitespace tokenizer where `[` and `]` are always tokens of their own
pub struct ManifestLexer<'a> {
    rest: &'a str,
}

impl<'a> ManifestLexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn peek(&self) -> Option<(&'a str, &'a str)> {
        let text = self.rest.trim_start();
        let first = text.chars().next()?;
        let len = if first == '[' || first == ']' {
            1
        } else {
            text.find(|c: char| c.is_whitespace() || c == '[' || c == ']')
                .unwrap_or(text.len())
        };
        Some((&text[..len], &text[len..]))
    }

    pub fn next_token(&mut self) -> Option<&'a str> {
        let (token, rest) = self.peek()?;
        self.rest = rest;
        Some(token)
    }

    /// Consume the next token if it equals `literal`
    pub fn check_literal(&mut self, literal: &str) -> bool {
        match self.peek() {
            Some((token, rest)) if token == literal => {
                self.rest = rest;
                true
            }
            _ => false,
        }
    }

    /// Consume the next token, failing unless it equals `literal`
    pub fn expect_literal(&mut self, literal: &str) -> std::result::Result<(), String> {
        match self.next_token() {
            Some(token) if token == literal => Ok(()),
            Some(token) => Err(format!("expected `{literal}`, found `{token}`")),
            None => Err(format!("expected `{literal}`, found end of input")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_none()
    }
}

/// Resolved contents of one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderLayout {
    pub uniforms: Vec<RenderParm>,
    pub bindings: Vec<BindingType>,
}

impl ShaderLayout {
    /// Parse manifest text. `file` names the owning shader in errors.
    pub fn parse(text: &str, file: &str) -> Result<Self> {
        let mut lexer = ManifestLexer::new(text);
        let mut layout = ShaderLayout::default();

        if lexer.check_literal("uniforms") {
            for token in section(&mut lexer, file)? {
                let parm = RenderParm::from_name(token).ok_or_else(|| RenderProgError::UnresolvedUniform {
                    token: token.to_string(),
                    file: file.to_string(),
                })?;
                layout.uniforms.push(parm);
            }
        }

        if lexer.check_literal("bindings") {
            for token in section(&mut lexer, file)? {
                let binding = BindingType::from_name(token).ok_or_else(|| RenderProgError::UnresolvedBinding {
                    token: token.to_string(),
                    file: file.to_string(),
                })?;
                layout.bindings.push(binding);
            }
        }

        if let Some(token) = lexer.next_token() {
            return Err(RenderProgError::Manifest {
                file: file.to_string(),
                message: format!("unexpected `{token}` after the bindings section"),
            });
        }

        log::debug!(
            "{}: {} uniforms, {} bindings",
            file,
            layout.uniforms.len(),
            layout.bindings.len()
        );
        Ok(layout)
    }

    pub fn to_manifest(&self) -> String {
        let mut out = String::from("uniforms [");
        for parm in &self.uniforms {
            out.push(' ');
            out.push_str(parm.name());
        }
        out.push_str(" ]\nbindings [");
        for binding in &self.bindings {
            out.push(' ');
            out.push_str(binding.name());
        }
        out.push_str(" ]\n");
        out
    }
}

/// Tokens between `[` and `]`
fn section<'a>(lexer: &mut ManifestLexer<'a>, file: &str) -> Result<Vec<&'a str>> {
    let malformed = |message: String| RenderProgError::Manifest {
        file: file.to_string(),
        message,
    };

    lexer.expect_literal("[").map_err(malformed)?;
    let mut tokens = Vec::new();
    while !lexer.check_literal("]") {
        match lexer.next_token() {
            Some(token) => tokens.push(token),
            None => return Err(malformed("unterminated section, expected `]`".to_string())),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_splits_brackets() {
        let mut lexer = ManifestLexer::new("uniforms [rpColor]\n");
        assert_eq!(lexer.next_token(), Some("uniforms"));
        assert!(lexer.check_literal("["));
        assert!(!lexer.check_literal("]"));
        assert_eq!(lexer.next_token(), Some("rpColor"));
        assert!(lexer.expect_literal("]").is_ok());
        assert!(lexer.is_empty());
        assert!(lexer.expect_literal("bindings").is_err());
    }

    #[test]
    fn test_parse_in_order() {
        let layout = ShaderLayout::parse(
            "uniforms [ rpMVPmatrixX rpColor rpMVPmatrixY ]\nbindings [ ubo sampler sampler ]\n",
            "test.vert",
        )
        .unwrap();
        assert_eq!(
            layout.uniforms,
            vec![RenderParm::MvpMatrixX, RenderParm::Color, RenderParm::MvpMatrixY]
        );
        assert_eq!(
            layout.bindings,
            vec![BindingType::UniformBuffer, BindingType::Sampler, BindingType::Sampler]
        );
    }

    #[test]
    fn test_scenario_color_sampler() {
        let layout = ShaderLayout::parse("uniforms [ rpColor ] bindings [ sampler ]", "example.frag").unwrap();
        assert_eq!(layout.uniforms, vec![RenderParm::Color]);
        assert_eq!(layout.bindings, vec![BindingType::Sampler]);
    }

    #[test]
    fn test_empty_and_missing_sections() {
        let layout = ShaderLayout::parse("uniforms [ ]\nbindings [ ]\n", "empty").unwrap();
        assert_eq!(layout, ShaderLayout::default());

        assert_eq!(ShaderLayout::parse("", "blank").unwrap(), ShaderLayout::default());

        let layout = ShaderLayout::parse("bindings [ sampler ]", "samplers-only").unwrap();
        assert!(layout.uniforms.is_empty());
        assert_eq!(layout.bindings, vec![BindingType::Sampler]);
    }

    #[test]
    fn test_unresolved_uniform() {
        let err = ShaderLayout::parse("uniforms [ rpColor rpBogus ]", "bad.frag").unwrap_err();
        match err {
            RenderProgError::UnresolvedUniform { token, file } => {
                assert_eq!(token, "rpBogus");
                assert_eq!(file, "bad.frag");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_binding() {
        let err = ShaderLayout::parse("uniforms [ ] bindings [ ubo texture ]", "bad.vert").unwrap_err();
        assert!(matches!(err, RenderProgError::UnresolvedBinding { ref token, .. } if token == "texture"));
    }

    #[test]
    fn test_unterminated_section() {
        let err = ShaderLayout::parse("uniforms [ rpColor", "cut.frag").unwrap_err();
        assert!(matches!(err, RenderProgError::Manifest { .. }));
        let err = ShaderLayout::parse("uniforms rpColor ]", "cut.frag").unwrap_err();
        assert!(matches!(err, RenderProgError::Manifest { .. }));
    }

    #[test]
    fn test_sections_out_of_order() {
        let err = ShaderLayout::parse("bindings [ ubo ]\nuniforms [ rpColor ]", "swapped.frag").unwrap_err();
        match err {
            RenderProgError::Manifest { file, message } => {
                assert_eq!(file, "swapped.frag");
                assert!(message.contains("`uniforms`"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = ShaderLayout::parse("uniforms [ ] bindings [ ] extra", "tail.frag").unwrap_err();
        assert!(matches!(err, RenderProgError::Manifest { .. }));
    }

    #[test]
    fn test_manifest_text_parses_back() {
        let layout = ShaderLayout {
            uniforms: vec![RenderParm::ShadowMatrix0X, RenderParm::Color],
            bindings: vec![BindingType::UniformBuffer, BindingType::Sampler],
        };
        assert_eq!(ShaderLayout::parse(&layout.to_manifest(), "x").unwrap(), layout);
    }
}
