// Fixed symbol tables shared by the transpiler, the manifest parser and the
// uniform commit path.
//
// - RenderParm: semantic uniform parameters (name <-> index)
// - ShaderFeatures: per-shader feature bits, each mapped to a macro name
// - BindingType / ShaderStage: small closed enums with their text forms

use bitflags::bitflags;
use std::collections::HashMap;
use std::sync::OnceLock;

macro_rules! render_parms {
    ($($variant:ident => $name:literal,)*) => {
        /// Semantic uniform parameter. The discriminant is the slot index in
        /// the uniform value table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum RenderParm {
            $($variant,)*
        }

        impl RenderParm {
            pub const ALL: &'static [RenderParm] = &[$(RenderParm::$variant,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(RenderParm::$variant => $name,)*
                }
            }
        }
    };
}

render_parms! {
    ScreenCorrectionFactor => "rpScreenCorrectionFactor",
    WindowCoord => "rpWindowCoord",
    DiffuseModifier => "rpDiffuseModifier",
    SpecularModifier => "rpSpecularModifier",

    LocalLightOrigin => "rpLocalLightOrigin",
    LocalViewOrigin => "rpLocalViewOrigin",

    LightProjectionS => "rpLightProjectionS",
    LightProjectionT => "rpLightProjectionT",
    LightProjectionQ => "rpLightProjectionQ",
    LightFalloffS => "rpLightFalloffS",

    BumpMatrixS => "rpBumpMatrixS",
    BumpMatrixT => "rpBumpMatrixT",
    DiffuseMatrixS => "rpDiffuseMatrixS",
    DiffuseMatrixT => "rpDiffuseMatrixT",
    SpecularMatrixS => "rpSpecularMatrixS",
    SpecularMatrixT => "rpSpecularMatrixT",

    VertexColorModulate => "rpVertexColorModulate",
    VertexColorAdd => "rpVertexColorAdd",

    Color => "rpColor",
    ViewOrigin => "rpViewOrigin",
    GlobalEyePos => "rpGlobalEyePos",

    MvpMatrixX => "rpMVPmatrixX",
    MvpMatrixY => "rpMVPmatrixY",
    MvpMatrixZ => "rpMVPmatrixZ",
    MvpMatrixW => "rpMVPmatrixW",

    ModelMatrixX => "rpModelMatrixX",
    ModelMatrixY => "rpModelMatrixY",
    ModelMatrixZ => "rpModelMatrixZ",
    ModelMatrixW => "rpModelMatrixW",

    ProjectionMatrixX => "rpProjectionMatrixX",
    ProjectionMatrixY => "rpProjectionMatrixY",
    ProjectionMatrixZ => "rpProjectionMatrixZ",
    ProjectionMatrixW => "rpProjectionMatrixW",

    ModelViewMatrixX => "rpModelViewMatrixX",
    ModelViewMatrixY => "rpModelViewMatrixY",
    ModelViewMatrixZ => "rpModelViewMatrixZ",
    ModelViewMatrixW => "rpModelViewMatrixW",

    TextureMatrixS => "rpTextureMatrixS",
    TextureMatrixT => "rpTextureMatrixT",

    TexGen0S => "rpTexGen0S",
    TexGen0T => "rpTexGen0T",
    TexGen0Q => "rpTexGen0Q",
    TexGen0Enabled => "rpTexGen0Enabled",

    TexGen1S => "rpTexGen1S",
    TexGen1T => "rpTexGen1T",
    TexGen1Q => "rpTexGen1Q",
    TexGen1Enabled => "rpTexGen1Enabled",

    WobbleSkyX => "rpWobbleSkyX",
    WobbleSkyY => "rpWobbleSkyY",
    WobbleSkyZ => "rpWobbleSkyZ",

    Overbright => "rpOverbright",
    EnableSkinning => "rpEnableSkinning",
    AlphaTest => "rpAlphaTest",

    AmbientColor => "rpAmbientColor",
    GlobalLightOrigin => "rpGlobalLightOrigin",
    JitterTexScale => "rpJitterTexScale",
    JitterTexOffset => "rpJitterTexOffset",
    CascadeDistances => "rpCascadeDistances",

    // Matrix block: 6 cascades x 4 rows. Only the first slot is ever named
    // in a manifest; the rest ride along during commit.
    ShadowMatrix0X => "rpShadowMatrices",
    ShadowMatrix0Y => "rpShadowMatrix0Y",
    ShadowMatrix0Z => "rpShadowMatrix0Z",
    ShadowMatrix0W => "rpShadowMatrix0W",
    ShadowMatrix1X => "rpShadowMatrix1X",
    ShadowMatrix1Y => "rpShadowMatrix1Y",
    ShadowMatrix1Z => "rpShadowMatrix1Z",
    ShadowMatrix1W => "rpShadowMatrix1W",
    ShadowMatrix2X => "rpShadowMatrix2X",
    ShadowMatrix2Y => "rpShadowMatrix2Y",
    ShadowMatrix2Z => "rpShadowMatrix2Z",
    ShadowMatrix2W => "rpShadowMatrix2W",
    ShadowMatrix3X => "rpShadowMatrix3X",
    ShadowMatrix3Y => "rpShadowMatrix3Y",
    ShadowMatrix3Z => "rpShadowMatrix3Z",
    ShadowMatrix3W => "rpShadowMatrix3W",
    ShadowMatrix4X => "rpShadowMatrix4X",
    ShadowMatrix4Y => "rpShadowMatrix4Y",
    ShadowMatrix4Z => "rpShadowMatrix4Z",
    ShadowMatrix4W => "rpShadowMatrix4W",
    ShadowMatrix5X => "rpShadowMatrix5X",
    ShadowMatrix5Y => "rpShadowMatrix5Y",
    ShadowMatrix5Z => "rpShadowMatrix5Z",
    ShadowMatrix5W => "rpShadowMatrix5W",

    User0 => "rpUser0",
    User1 => "rpUser1",
    User2 => "rpUser2",
    User3 => "rpUser3",
    User4 => "rpUser4",
    User5 => "rpUser5",
    User6 => "rpUser6",
    User7 => "rpUser7",
}

/// First parameter of the shadow matrix block
pub const MATRIX_BLOCK_START: RenderParm = RenderParm::ShadowMatrix0X;

/// Vectors covered by one declaration of the matrix block
pub const MATRIX_BLOCK_LEN: usize = 6 * 4;

impl RenderParm {
    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Exact, case-sensitive lookup in the parameter registry
    pub fn from_name(name: &str) -> Option<Self> {
        static BY_NAME: OnceLock<HashMap<&'static str, RenderParm>> = OnceLock::new();
        BY_NAME
            .get_or_init(|| Self::ALL.iter().map(|&parm| (parm.name(), parm)).collect())
            .get(name)
            .copied()
    }

    #[inline]
    pub fn is_matrix_block(self) -> bool {
        self == MATRIX_BLOCK_START
    }
}

pub const MAX_SHADER_MACRO_NAMES: usize = 8;

/// Macro name per feature bit, indexed by bit position
pub const SHADER_MACRO_NAMES: [&str; MAX_SHADER_MACRO_NAMES] = [
    "USE_GPU_SKINNING",
    "LIGHT_POINT",
    "USE_FOG",
    "LIGHT_PARALLEL",
    "BRIGHTPASS",
    "HDR_DEBUG",
    "USE_SRGB",
    "USE_PBR",
];

bitflags! {
    /// Optional code paths compiled into a shader
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFeatures: u32 {
        const GPU_SKINNING = 1 << 0;
        const LIGHT_POINT = 1 << 1;
        const FOG = 1 << 2;
        const LIGHT_PARALLEL = 1 << 3;
        const BRIGHTPASS = 1 << 4;
        const HDR_DEBUG = 1 << 5;
        const SRGB = 1 << 6;
        const PBR = 1 << 7;
    }
}

impl ShaderFeatures {
    /// Macro names for the set bits, in bit order
    pub fn macro_names(self) -> Vec<&'static str> {
        (0..MAX_SHADER_MACRO_NAMES)
            .filter(|bit| self.bits() & (1 << bit) != 0)
            .map(|bit| SHADER_MACRO_NAMES[bit])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    Sampler,
}

impl BindingType {
    pub const ALL: [BindingType; 2] = [BindingType::UniformBuffer, BindingType::Sampler];

    pub const fn name(self) -> &'static str {
        match self {
            BindingType::UniformBuffer => "ubo",
            BindingType::Sampler => "sampler",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|binding| binding.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Stage marker in source file names (`.vs.hlsl` / `.ps.hlsl`)
    pub const fn source_suffix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::Fragment => "ps",
        }
    }

    /// Extension of the translated GLSL file
    pub const fn target_extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parm_names_are_unique() {
        let mut names: Vec<_> = RenderParm::ALL.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RenderParm::COUNT);
    }

    #[test]
    fn test_parm_lookup() {
        assert_eq!(RenderParm::from_name("rpColor"), Some(RenderParm::Color));
        assert_eq!(RenderParm::from_name("rpcolor"), None);
        assert_eq!(RenderParm::from_name("rpShadowMatrices"), Some(MATRIX_BLOCK_START));
        for (i, parm) in RenderParm::ALL.iter().enumerate() {
            assert_eq!(parm.index(), i);
            assert_eq!(RenderParm::from_index(i), Some(*parm));
        }
    }

    #[test]
    fn test_matrix_block_is_contiguous() {
        let last = RenderParm::ShadowMatrix5W.index();
        assert_eq!(last - MATRIX_BLOCK_START.index() + 1, MATRIX_BLOCK_LEN);
        assert!(last < RenderParm::COUNT);
    }

    #[test]
    fn test_macro_names_follow_bit_order() {
        assert_eq!(ShaderFeatures::FOG.macro_names(), vec!["USE_FOG"]);
        let features = ShaderFeatures::SRGB | ShaderFeatures::GPU_SKINNING;
        assert_eq!(features.macro_names(), vec!["USE_GPU_SKINNING", "USE_SRGB"]);
        assert!(ShaderFeatures::empty().macro_names().is_empty());
    }

    #[test]
    fn test_binding_names() {
        assert_eq!(BindingType::from_name("ubo"), Some(BindingType::UniformBuffer));
        assert_eq!(BindingType::from_name("sampler"), Some(BindingType::Sampler));
        assert_eq!(BindingType::from_name("Sampler"), None);
    }
}
