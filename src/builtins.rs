// Builtin program declarations
//
// The renderer addresses builtin programs by `BuiltinProgram` discriminant,
// which is also the program's index in the registry.

use crate::params::ShaderFeatures;
use crate::vertex_layout::VertexLayoutType;

/// Variant selection for one stage of a builtin program
#[derive(Debug, Clone, Copy)]
pub struct StageDecl {
    pub suffix: &'static str,
    pub features: ShaderFeatures,
}

const PLAIN: StageDecl = StageDecl {
    suffix: "",
    features: ShaderFeatures::empty(),
};

#[derive(Debug, Clone, Copy)]
pub struct BuiltinProgramDecl {
    /// Source base name under `renderprogs/`
    pub source: &'static str,
    pub vertex: StageDecl,
    pub fragment: StageDecl,
    pub vertex_layout: VertexLayoutType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BuiltinProgram {
    Color,
    TextureVertexColor,
    TextureVertexColorSkinned,
    Interaction,
    InteractionFog,
    InteractionSunLight,
    Depth,
    Shadow,
    ShadowSkinned,
}

impl BuiltinProgram {
    pub const ALL: [BuiltinProgram; 9] = [
        BuiltinProgram::Color,
        BuiltinProgram::TextureVertexColor,
        BuiltinProgram::TextureVertexColorSkinned,
        BuiltinProgram::Interaction,
        BuiltinProgram::InteractionFog,
        BuiltinProgram::InteractionSunLight,
        BuiltinProgram::Depth,
        BuiltinProgram::Shadow,
        BuiltinProgram::ShadowSkinned,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn decl(self) -> BuiltinProgramDecl {
        use BuiltinProgram::*;
        let (source, vertex, fragment, vertex_layout) = match self {
            Color => ("color", PLAIN, PLAIN, VertexLayoutType::DrawVert),
            TextureVertexColor => ("texture_color", PLAIN, PLAIN, VertexLayoutType::DrawVert),
            TextureVertexColorSkinned => (
                "texture_color",
                StageDecl {
                    suffix: "_skinned",
                    features: ShaderFeatures::GPU_SKINNING,
                },
                PLAIN,
                VertexLayoutType::DrawVert,
            ),
            Interaction => ("interaction", PLAIN, PLAIN, VertexLayoutType::DrawVert),
            InteractionFog => {
                let fog = StageDecl {
                    suffix: "_fog",
                    features: ShaderFeatures::FOG,
                };
                ("interaction", fog, fog, VertexLayoutType::DrawVert)
            }
            InteractionSunLight => {
                let sun = StageDecl {
                    suffix: "_sun",
                    features: ShaderFeatures::LIGHT_PARALLEL,
                };
                ("interaction", sun, sun, VertexLayoutType::DrawVert)
            }
            Depth => ("depth", PLAIN, PLAIN, VertexLayoutType::DrawVert),
            Shadow => ("shadow", PLAIN, PLAIN, VertexLayoutType::DrawShadowVert),
            ShadowSkinned => (
                "shadow",
                StageDecl {
                    suffix: "_skinned",
                    features: ShaderFeatures::GPU_SKINNING,
                },
                PLAIN,
                VertexLayoutType::DrawShadowVertSkinned,
            ),
        };
        BuiltinProgramDecl {
            source,
            vertex,
            fragment,
            vertex_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_declaration_order() {
        for (i, program) in BuiltinProgram::ALL.iter().enumerate() {
            assert_eq!(program.index(), i);
        }
    }

    #[test]
    fn test_skinned_variants_use_skinning_bit() {
        for program in [BuiltinProgram::TextureVertexColorSkinned, BuiltinProgram::ShadowSkinned] {
            let decl = program.decl();
            assert!(decl.vertex.features.contains(ShaderFeatures::GPU_SKINNING));
            assert!(decl.fragment.features.is_empty());
        }
        assert_eq!(
            BuiltinProgram::ShadowSkinned.decl().vertex_layout,
            VertexLayoutType::DrawShadowVertSkinned
        );
    }
}
