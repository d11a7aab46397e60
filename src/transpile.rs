// Shader transpiler
//
// Two pure passes over renderprog source:
//   1. strip_dead_code: resolve #if/#ifdef/#ifndef/#elif/#else/#endif against
//      the shader's macro list, dropping inactive code
//   2. convert_to_glsl: rewrite the HLSL-flavoured dialect into Vulkan GLSL
//      and emit the layout manifest listing the uniforms and bindings it uses
//
// Source dialect conventions: stage inputs/outputs are global `in`/`out`
// declarations, the entry point is `void main()`, semantic parameters are
// referenced by their registry names (`rpColor`) and samplers are declared as
// `uniform sampler2D name : register(s0);`.

use crate::manifest::ShaderLayout;
use crate::params::{BindingType, RenderParm, ShaderStage, MATRIX_BLOCK_LEN};
use std::fmt::Write as _;

/// Macro visible to every builtin shader
pub const BUILTIN_MACRO: &str = "BUILTIN";

/// First binding number of the fragment stage. Program descriptor layouts
/// number vertex bindings first, and a vertex shader declares exactly its
/// uniform block.
pub const FRAGMENT_BINDING_BASE: u32 = 1;

const TYPE_NAMES: &[(&str, &str)] = &[
    ("float2", "vec2"),
    ("float3", "vec3"),
    ("float4", "vec4"),
    ("half", "float"),
    ("half2", "vec2"),
    ("half3", "vec3"),
    ("half4", "vec4"),
    ("int2", "ivec2"),
    ("int3", "ivec3"),
    ("int4", "ivec4"),
    ("float2x2", "mat2"),
    ("float3x3", "mat3"),
    ("float4x4", "mat4"),
    ("samplerCUBE", "samplerCube"),
];

const INTRINSIC_NAMES: &[(&str, &str)] = &[
    ("tex2D", "texture"),
    ("texCUBE", "texture"),
    ("tex2Dlod", "textureLod"),
    ("lerp", "mix"),
    ("frac", "fract"),
    ("rsqrt", "inversesqrt"),
    ("ddx", "dFdx"),
    ("ddy", "dFdy"),
    ("atan2", "atan"),
];

const SATURATE_HELPERS: &str = "\
float saturate( float v ) { return clamp( v, 0.0, 1.0 ); }
vec2 saturate( vec2 v ) { return clamp( v, 0.0, 1.0 ); }
vec3 saturate( vec3 v ) { return clamp( v, 0.0, 1.0 ); }
vec4 saturate( vec4 v ) { return clamp( v, 0.0, 1.0 ); }
";

const MUL_HELPERS: &str = "\
vec4 mul( vec4 v, mat4 m ) { return v * m; }
vec4 mul( mat4 m, vec4 v ) { return m * v; }
vec3 mul( vec3 v, mat3 m ) { return v * m; }
vec3 mul( mat3 m, vec3 v ) { return m * v; }
";

// =============================================================================
// DEAD CODE STRIPPING
// =============================================================================

struct Conditional {
    parent_active: bool,
    active: bool,
    /// Some branch of this conditional has already been taken
    taken: bool,
    else_seen: bool,
}

/// Remove code guarded by macros not present in `macros`
pub fn strip_dead_code(input: &str, file: &str, macros: &[&str], builtin: bool) -> String {
    let mut defines: Vec<&str> = macros.to_vec();
    if builtin {
        defines.push(BUILTIN_MACRO);
    }

    let mut output = String::with_capacity(input.len());
    let mut stack: Vec<Conditional> = Vec::new();

    for (line_number, line) in input.lines().enumerate() {
        let line_number = line_number + 1;
        let active = stack.last().map_or(true, |c| c.active);
        let trimmed = line.trim_start();

        let Some(directive_line) = trimmed.strip_prefix('#') else {
            if active {
                output.push_str(line);
                output.push('\n');
            }
            continue;
        };

        let directive_line = directive_line.trim_start();
        let name_len = directive_line
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(directive_line.len());
        let (directive, argument) = directive_line.split_at(name_len);
        let argument = strip_comment(argument).trim();

        match directive {
            "ifdef" | "ifndef" | "if" => {
                let condition = match directive {
                    "ifdef" => defines.contains(&argument),
                    "ifndef" => !defines.contains(&argument),
                    _ => eval_condition(argument, &defines, file, line_number),
                };
                stack.push(Conditional {
                    parent_active: active,
                    active: active && condition,
                    taken: condition,
                    else_seen: false,
                });
            }
            "elif" => match stack.last_mut() {
                Some(item) if !item.else_seen => {
                    let condition = eval_condition(argument, &defines, file, line_number);
                    item.active = item.parent_active && !item.taken && condition;
                    item.taken |= condition;
                }
                Some(_) => log::warn!("#elif after #else (line {line_number} of {file}), ignoring"),
                None => log::warn!("Mismatched #elif (line {line_number} of {file})"),
            },
            "else" => match stack.last_mut() {
                Some(item) if !item.else_seen => {
                    item.active = item.parent_active && !item.taken;
                    item.taken = true;
                    item.else_seen = true;
                }
                Some(_) => log::warn!("Second #else for the same #if (line {line_number} of {file}), ignoring"),
                None => log::warn!("Mismatched #else (line {line_number} of {file})"),
            },
            "endif" => {
                if stack.pop().is_none() {
                    log::warn!("Mismatched #endif (line {line_number} of {file})");
                }
            }
            _ => {
                // #define, #include, #pragma ... belong to the output
                if active {
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }
    }

    if !stack.is_empty() {
        log::warn!("{} unterminated conditional(s) at end of {}", stack.len(), file);
    }
    output
}

fn strip_comment(text: &str) -> &str {
    text.find("//").map_or(text, |index| &text[..index])
}

/// Evaluate an `#if`/`#elif` expression over `( ) ! && || defined`, integer
/// literals and bare macro names. Malformed expressions evaluate to false.
fn eval_condition(expr: &str, defines: &[&str], file: &str, line_number: usize) -> bool {
    let result = tokenize_condition(expr).and_then(|tokens| {
        let mut parser = ConditionParser {
            tokens,
            pos: 0,
            defines,
        };
        let value = parser.or()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(value),
            Some(CondToken::Close) => Err("unbalanced parentheses".to_string()),
            Some(token) => Err(format!("unexpected {token:?}")),
        }
    });

    result.unwrap_or_else(|message| {
        log::warn!("Unsupported #if expression `{expr}` ({message}, line {line_number} of {file}), treating as false");
        false
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CondToken<'a> {
    Open,
    Close,
    Not,
    And,
    Or,
    Number(i64),
    Ident(&'a str),
}

fn tokenize_condition(expr: &str) -> Result<Vec<CondToken<'_>>, String> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();

    while let Some(c) = rest.chars().next() {
        let (token, len) = match c {
            '(' => (CondToken::Open, 1),
            ')' => (CondToken::Close, 1),
            '!' => (CondToken::Not, 1),
            '&' if rest.starts_with("&&") => (CondToken::And, 2),
            '|' if rest.starts_with("||") => (CondToken::Or, 2),
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len());
                let word = &rest[..len];
                let token = if c.is_ascii_digit() {
                    CondToken::Number(word.parse().map_err(|_| format!("bad number `{word}`"))?)
                } else {
                    CondToken::Ident(word)
                };
                (token, len)
            }
            _ => return Err(format!("unexpected `{c}`")),
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }
    Ok(tokens)
}

/// or := and ('||' and)*, and := unary ('&&' unary)*, unary := '!' unary | primary
struct ConditionParser<'a, 'd> {
    tokens: Vec<CondToken<'a>>,
    pos: usize,
    defines: &'d [&'d str],
}

impl<'a> ConditionParser<'a, '_> {
    fn next(&mut self) -> Option<CondToken<'a>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: CondToken<'_>) -> bool {
        let matched = self.tokens.get(self.pos).is_some_and(|token| *token == expected);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn is_defined(&self, name: &str) -> bool {
        self.defines.iter().any(|define| *define == name)
    }

    fn or(&mut self) -> Result<bool, String> {
        let mut value = self.and()?;
        while self.eat(CondToken::Or) {
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, String> {
        let mut value = self.unary()?;
        while self.eat(CondToken::And) {
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<bool, String> {
        if self.eat(CondToken::Not) {
            return Ok(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<bool, String> {
        match self.next() {
            Some(CondToken::Open) => {
                let value = self.or()?;
                if !self.eat(CondToken::Close) {
                    return Err("unbalanced parentheses".to_string());
                }
                Ok(value)
            }
            Some(CondToken::Number(value)) => Ok(value != 0),
            Some(CondToken::Ident("defined")) => {
                let parenthesized = self.eat(CondToken::Open);
                let Some(CondToken::Ident(name)) = self.next() else {
                    return Err("expected a macro name after `defined`".to_string());
                };
                if parenthesized && !self.eat(CondToken::Close) {
                    return Err("unbalanced parentheses".to_string());
                }
                Ok(self.is_defined(name))
            }
            Some(CondToken::Ident(name)) => Ok(self.is_defined(name)),
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

// =============================================================================
// DIALECT TRANSLATION
// =============================================================================

/// Translated source plus its layout manifest text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub source: String,
    pub manifest: String,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// Convert stripped renderprog source into Vulkan GLSL.
///
/// Uniforms are listed in first-reference order; bindings are the uniform
/// block (if any uniform is used) followed by the samplers in declaration
/// order.
pub fn convert_to_glsl(input: &str, file: &str, stage: ShaderStage) -> Translation {
    if input.trim().is_empty() {
        return Translation::default();
    }

    let mut uniforms: Vec<RenderParm> = Vec::new();
    let mut samplers: Vec<(String, String)> = Vec::new();
    let mut body = String::with_capacity(input.len() * 2);
    let mut depth: i32 = 0;
    let mut in_location = 0;
    let mut out_location = 0;
    let mut in_block_comment = false;

    for line in input.lines() {
        let segments = split_comments(line, &mut in_block_comment);
        let global = depth == 0;
        let code: String = segments.iter().filter(|s| !s.comment).map(|s| s.text).collect();
        let strip = global && has_annotations(code.trim());
        let code = if strip { strip_annotations(&code) } else { code };
        let trimmed = code.trim();
        depth += brace_delta(trimmed);

        if global && trimmed.starts_with("uniform ") {
            let mut words = trimmed.trim_end_matches(';').split_whitespace().skip(1);
            let ty = words.next().unwrap_or_default();
            let name = words.next().unwrap_or_default();
            if ty.starts_with("sampler") {
                samplers.push((rename(ty).to_string(), name.to_string()));
                continue;
            }
            let base = name.split('[').next().unwrap_or_default();
            if let Some(parm) = RenderParm::from_name(base) {
                note_uniform(&mut uniforms, parm);
                continue;
            }
            log::warn!("{file}: uniform `{name}` is not a render parameter, passing it through");
        }

        let stage_io = global && (trimmed.starts_with("in ") || trimmed.starts_with("out "));
        if stage_io {
            let location = if trimmed.starts_with("in ") {
                &mut in_location
            } else {
                &mut out_location
            };
            let indent = &line[..line.len() - line.trim_start().len()];
            let _ = write!(body, "{indent}layout( location = {} ) ", *location);
            *location += 1;
        }

        let mut leading = stage_io;
        for segment in &segments {
            if segment.comment {
                body.push_str(segment.text);
                continue;
            }
            let text = if strip {
                strip_annotations(segment.text)
            } else {
                segment.text.to_string()
            };
            let text = if leading { text.trim_start() } else { text.as_str() };
            leading = false;
            rewrite_identifiers(text, &mut body, &mut uniforms);
        }
        body.push('\n');
    }

    let mut layout = ShaderLayout::default();
    let mut source = String::with_capacity(body.len() + 512);
    source.push_str("#version 450\n");
    let _ = writeln!(source, "#pragma shader_stage( {} )", stage.label());
    source.push_str("#extension GL_ARB_separate_shader_objects : enable\n\n");

    if contains_identifier(&body, "saturate") {
        source.push_str(SATURATE_HELPERS);
    }
    if contains_identifier(&body, "mul") {
        source.push_str(MUL_HELPERS);
    }

    let mut binding = match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Fragment => FRAGMENT_BINDING_BASE,
    };
    if !uniforms.is_empty() {
        let block = match stage {
            ShaderStage::Vertex => "UBOV",
            ShaderStage::Fragment => "UBOF",
        };
        let _ = writeln!(source, "\nlayout( binding = {binding} ) uniform {block} {{");
        for parm in &uniforms {
            if parm.is_matrix_block() {
                let _ = writeln!(source, "\tvec4 {}[{}];", parm.name(), MATRIX_BLOCK_LEN);
            } else {
                let _ = writeln!(source, "\tvec4 {};", parm.name());
            }
        }
        source.push_str("};\n");
        layout.bindings.push(BindingType::UniformBuffer);
        binding += 1;
    }

    if !samplers.is_empty() {
        source.push('\n');
    }
    for (ty, name) in &samplers {
        let _ = writeln!(source, "layout( binding = {binding} ) uniform {ty} {name};");
        layout.bindings.push(BindingType::Sampler);
        binding += 1;
    }

    source.push('\n');
    source.push_str(&body);
    layout.uniforms = uniforms;

    log::debug!(
        "Translated {} ({} uniforms, {} bindings)",
        file,
        layout.uniforms.len(),
        layout.bindings.len()
    );
    Translation {
        source,
        manifest: layout.to_manifest(),
    }
}

fn note_uniform(uniforms: &mut Vec<RenderParm>, parm: RenderParm) {
    if !uniforms.contains(&parm) {
        uniforms.push(parm);
    }
}

fn rename(ident: &str) -> &str {
    TYPE_NAMES
        .iter()
        .chain(INTRINSIC_NAMES)
        .find(|(from, _)| *from == ident)
        .map_or(ident, |(_, to)| to)
}

fn brace_delta(code: &str) -> i32 {
    code.chars()
        .map(|c| match c {
            '{' => 1,
            '}' => -1,
            _ => 0,
        })
        .sum()
}

/// Copy code into `out`, renaming types and intrinsics and recording
/// referenced render parameters. Numbers are copied verbatim.
fn rewrite_identifiers(code: &str, out: &mut String, uniforms: &mut Vec<RenderParm>) {
    let mut rest = code;
    while let Some(c) = rest.chars().next() {
        if c.is_ascii_alphanumeric() || c == '_' {
            let numeric = c.is_ascii_digit();
            let len = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || (numeric && ch == '.')))
                .unwrap_or(rest.len());
            let word = &rest[..len];
            if numeric {
                out.push_str(word);
            } else {
                if let Some(parm) = RenderParm::from_name(word) {
                    note_uniform(uniforms, parm);
                }
                out.push_str(rename(word));
            }
            rest = &rest[len..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
}

fn contains_identifier(text: &str, ident: &str) -> bool {
    text.match_indices(ident).any(|(index, _)| {
        let before = text[..index].chars().next_back();
        let after = text[index + ident.len()..].chars().next();
        let boundary = |c: Option<char>| c.map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
        boundary(before) && boundary(after)
    })
}

/// A piece of one source line, either code or comment text
struct Segment<'a> {
    text: &'a str,
    comment: bool,
}

/// Split a line into code and comment pieces. `in_block` carries an open
/// `/* */` comment from one line to the next.
fn split_comments<'a>(line: &'a str, in_block: &mut bool) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut rest = line;

    while !rest.is_empty() {
        if *in_block {
            let end = match rest.find("*/") {
                Some(close) => {
                    *in_block = false;
                    close + 2
                }
                None => rest.len(),
            };
            segments.push(Segment {
                text: &rest[..end],
                comment: true,
            });
            rest = &rest[end..];
            continue;
        }

        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        let (start, block) = match (line_comment, block_comment) {
            (Some(l), Some(b)) if b < l => (b, true),
            (Some(l), _) => (l, false),
            (None, Some(b)) => (b, true),
            (None, None) => (rest.len(), false),
        };

        if start > 0 {
            segments.push(Segment {
                text: &rest[..start],
                comment: false,
            });
        }
        rest = &rest[start..];
        if block {
            segments.push(Segment {
                text: &rest[..2],
                comment: true,
            });
            rest = &rest[2..];
            *in_block = true;
        } else if !rest.is_empty() {
            segments.push(Segment {
                text: rest,
                comment: true,
            });
            rest = "";
        }
    }
    segments
}

/// Global stage declarations and function headers may carry `: SEMANTIC`
/// or `: register(...)`; code inside bodies never does.
fn has_annotations(code: &str) -> bool {
    let header = code.split('{').next().unwrap_or_default();
    ["in ", "out ", "uniform "].iter().any(|prefix| header.starts_with(prefix))
        || (header.contains('(') && !header.contains('=') && !header.contains('?'))
}

/// Remove `: register(...)` and `: SEMANTIC` annotations up to the first `{`
fn strip_annotations(line: &str) -> String {
    let (header, body) = line.split_at(line.find('{').unwrap_or(line.len()));
    let mut out = String::with_capacity(line.len());
    let mut rest = header;

    while let Some(index) = rest.find(':') {
        let (head, tail) = rest.split_at(index);
        let after = tail[1..].trim_start();

        let register_args = after
            .strip_prefix("register")
            .map(str::trim_start)
            .and_then(|args| args.strip_prefix('('));
        if let Some(args) = register_args {
            if let Some(close) = args.find(')') {
                out.push_str(head.trim_end());
                rest = &args[close + 1..];
                continue;
            }
        }

        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let ident = &after[..ident_len];
        let next = after[ident_len..].trim_start().chars().next();
        let is_semantic = !ident.is_empty()
            && ident.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && ident.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && matches!(next, None | Some(';' | ',' | ')' | '{'));

        if is_semantic {
            out.push_str(head.trim_end());
            rest = &after[ident_len..];
        } else {
            out.push_str(head);
            out.push(':');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out.push_str(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOG_SOURCE: &str = "\
float4 base = rpColor;
#ifdef USE_FOG
float fog = rpDiffuseModifier.x;
#else
float fog = 0.0;
#endif
#if defined( USE_GPU_SKINNING ) && !defined( USE_SRGB )
skinned();
#endif
";

    #[test]
    fn test_strip_selects_macros() {
        let out = strip_dead_code(FOG_SOURCE, "fog.ps.hlsl", &["USE_FOG"], false);
        assert!(out.contains("rpDiffuseModifier"));
        assert!(!out.contains("fog = 0.0"));
        assert!(!out.contains("skinned"));
        assert!(!out.contains('#'));

        let out = strip_dead_code(FOG_SOURCE, "fog.ps.hlsl", &["USE_GPU_SKINNING"], false);
        assert!(out.contains("fog = 0.0"));
        assert!(out.contains("skinned"));
    }

    #[test]
    fn test_strip_nested() {
        let source = "\
#ifdef A
a
#ifdef B
ab
#else
a_not_b
#endif
#elif defined(C)
c
#else
none
#endif
#ifndef BUILTIN
user
#endif
";
        let strip = |macros: &[&str]| strip_dead_code(source, "nested", macros, true);
        assert_eq!(strip(&["A", "B"]), "a\nab\n");
        assert_eq!(strip(&["A"]), "a\na_not_b\n");
        assert_eq!(strip(&["C"]), "c\n");
        assert_eq!(strip(&[]), "none\n");
        assert_eq!(strip_dead_code(source, "nested", &[], false), "none\nuser\n");
    }

    #[test]
    fn test_strip_inactive_parent_wins() {
        let source = "#if 0\n#ifdef A\nhidden\n#else\nalso_hidden\n#endif\n#endif\nshown\n";
        assert_eq!(strip_dead_code(source, "zero", &["A"], false), "shown\n");
    }

    #[test]
    fn test_strip_grouped_conditions() {
        let source = "#if (defined(A) || defined(B)) && defined(C)\nyes\n#else\nno\n#endif\n";
        let strip = |macros: &[&str]| strip_dead_code(source, "grouped", macros, false);
        assert_eq!(strip(&["A"]), "no\n");
        assert_eq!(strip(&["B", "C"]), "yes\n");
        assert_eq!(strip(&["A", "C"]), "yes\n");
        assert_eq!(strip(&["C"]), "no\n");

        let negated = "#if !(defined A && defined B) || 0\nyes\n#endif\n";
        assert_eq!(strip_dead_code(negated, "negated", &["A"], false), "yes\n");
        assert_eq!(strip_dead_code(negated, "negated", &["A", "B"], false), "");
    }

    #[test]
    fn test_strip_malformed_condition_is_false() {
        for expr in ["(defined(A) || defined(B)", "defined(A))", "defined(A) &&", "A == 1"] {
            let source = format!("#if {expr}\nyes\n#else\nno\n#endif\n");
            assert_eq!(strip_dead_code(&source, "malformed", &["A", "B"], false), "no\n", "{expr}");
        }
    }

    #[test]
    fn test_convert_collects_layout() {
        let source = "\
uniform sampler2D samp0 : register(s0);
uniform samplerCUBE samp1 : register(s1);
in float4 in_Position : POSITION;
in float2 in_TexCoord : TEXCOORD0;
out float4 out_Color;
void main() {
	float4 pos = in_Position;
	float4 color = tex2D( samp0, in_TexCoord ) * rpColor;
	out_Color = saturate( lerp( color, rpVertexColorAdd, frac( pos.x ) ) ) + rpColor;
}
";
        let translation = convert_to_glsl(source, "test.ps.hlsl", ShaderStage::Fragment);
        let layout = ShaderLayout::parse(&translation.manifest, "test.frag").unwrap();
        assert_eq!(
            layout.uniforms,
            vec![RenderParm::Color, RenderParm::VertexColorAdd]
        );
        assert_eq!(
            layout.bindings,
            vec![BindingType::UniformBuffer, BindingType::Sampler, BindingType::Sampler]
        );

        let glsl = &translation.source;
        assert!(glsl.starts_with("#version 450\n"));
        assert!(glsl.contains("layout( binding = 1 ) uniform UBOF {\n\tvec4 rpColor;\n\tvec4 rpVertexColorAdd;\n};"));
        assert!(glsl.contains("layout( binding = 2 ) uniform sampler2D samp0;"));
        assert!(glsl.contains("layout( binding = 3 ) uniform samplerCube samp1;"));
        assert!(glsl.contains("layout( location = 0 ) in vec4 in_Position;"));
        assert!(glsl.contains("layout( location = 1 ) in vec2 in_TexCoord;"));
        assert!(glsl.contains("layout( location = 0 ) out vec4 out_Color;"));
        assert!(glsl.contains("texture( samp0, in_TexCoord )"));
        assert!(glsl.contains("mix( color"));
        assert!(glsl.contains("fract( pos.x )"));
        assert!(glsl.contains("vec4 saturate( vec4 v )"));
        assert!(!glsl.contains("register"));
        assert!(!glsl.contains("float4"));
        assert!(!glsl.contains("vec4 mul("));
    }

    #[test]
    fn test_convert_declared_uniforms_and_matrix_block() {
        let source = "\
uniform float4 rpShadowMatrices[24];
uniform float4 rpMVPmatrixX;
void main() {
	gl_Position = mul( rpShadowMatrices[0], rpMVPmatrixX );
}
";
        let translation = convert_to_glsl(source, "shadow.vs.hlsl", ShaderStage::Vertex);
        assert_eq!(
            translation.manifest,
            "uniforms [ rpShadowMatrices rpMVPmatrixX ]\nbindings [ ubo ]\n"
        );
        assert!(translation.source.contains("uniform UBOV"));
        assert!(translation.source.contains("\tvec4 rpShadowMatrices[24];"));
        assert!(translation.source.contains("vec4 mul( vec4 v, mat4 m )"));
        assert!(!translation.source.contains("uniform vec4 rpMVPmatrixX;"));
    }

    #[test]
    fn test_convert_without_uniforms() {
        let source = "out float4 color;\nvoid main() { color = float4( 1.0, 0.5f, 0.0, 1.0 ); }\n";
        let translation = convert_to_glsl(source, "plain.ps.hlsl", ShaderStage::Fragment);
        assert_eq!(translation.manifest, "uniforms [ ]\nbindings [ ]\n");
        assert!(!translation.source.contains("binding"));
        assert!(translation.source.contains("vec4( 1.0, 0.5f, 0.0, 1.0 )"));
    }

    #[test]
    fn test_convert_keeps_comments_and_ternaries() {
        let source = "void main() {\n\tfloat x = a ? b : c; // float4 rpColor stays a comment\n}\n";
        let translation = convert_to_glsl(source, "misc.ps.hlsl", ShaderStage::Fragment);
        assert!(translation.manifest.starts_with("uniforms [ ]"));
        assert!(translation.source.contains("a ? b : c; // float4 rpColor"));
    }

    #[test]
    fn test_convert_keeps_uppercase_ternary_branch() {
        let source = "\
out float4 fragColor : COLOR;
void main() {
	float x = rpColor.x > 0.0 ? 1.0 : FLT_MAX;
	float y = rpColor.y > 0.0 ? x : (FLT_MAX);
	fragColor = float4( x, y, 0.0, 1.0 );
}
";
        let glsl = convert_to_glsl(source, "ternary.ps.hlsl", ShaderStage::Fragment).source;
        assert!(glsl.contains("float x = rpColor.x > 0.0 ? 1.0 : FLT_MAX;"));
        assert!(glsl.contains("float y = rpColor.y > 0.0 ? x : (FLT_MAX);"));
        assert!(glsl.contains("layout( location = 0 ) out vec4 fragColor;"));
    }

    #[test]
    fn test_convert_strips_function_header_semantics() {
        let source = "float4 shade( float4 color : COLOR0 ) : COLOR { return color ? color : ZERO; }\n";
        let glsl = convert_to_glsl(source, "header.ps.hlsl", ShaderStage::Fragment).source;
        assert!(glsl.contains("vec4 shade( vec4 color ) { return color ? color : ZERO; }"));
    }

    #[test]
    fn test_convert_skips_block_comments() {
        let source = "\
out float4 fragColor : COLOR;
/* uniform float4 rpDiffuseModifier;
   fragColor = rpDiffuseModifier; */
void main() {
	fragColor = /* rpSpecularModifier */ rpColor;
}
";
        let translation = convert_to_glsl(source, "commented.ps.hlsl", ShaderStage::Fragment);
        assert_eq!(translation.manifest, "uniforms [ rpColor ]\nbindings [ ubo ]\n");
        assert!(translation.source.contains("\tvec4 rpColor;\n};"));
        assert!(translation.source.contains("fragColor = /* rpSpecularModifier */ rpColor;"));
        assert!(translation.source.contains("/* uniform float4 rpDiffuseModifier;"));
    }

    #[test]
    fn test_empty_translation() {
        let translation = convert_to_glsl(" \n\n", "empty.vs.hlsl", ShaderStage::Vertex);
        assert!(translation.is_empty());
    }
}
