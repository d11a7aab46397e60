// Builtin shader sources compiled into the binary
//
// Used when `renderprogs/` is missing from the source root.

use crate::storage::EmbeddedTable;

macro_rules! embed {
    ($($file:literal),* $(,)?) => {
        &[$((concat!("renderprogs/", $file), include_str!(concat!("../renderprogs/", $file))),)*]
    };
}

pub static EMBEDDED_SHADERS: EmbeddedTable = embed![
    "color.vs.hlsl",
    "color.ps.hlsl",
    "texture_color.vs.hlsl",
    "texture_color.ps.hlsl",
    "interaction.vs.hlsl",
    "interaction.ps.hlsl",
    "depth.vs.hlsl",
    "depth.ps.hlsl",
    "shadow.vs.hlsl",
    "shadow.ps.hlsl",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinProgram;
    use crate::cache::ShaderPaths;
    use crate::params::ShaderStage;

    #[test]
    fn test_every_builtin_source_is_embedded() {
        for program in BuiltinProgram::ALL {
            let decl = program.decl();
            for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                let paths = ShaderPaths::derive(decl.source, "", stage);
                assert!(
                    EMBEDDED_SHADERS.iter().any(|(path, source)| *path == paths.source && !source.is_empty()),
                    "{} is not embedded",
                    paths.source
                );
            }
        }
    }
}
