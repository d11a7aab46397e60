// =============================================================================
// RENDERPROGS - shader cross-compilation and render program management
// =============================================================================
//
// PIPELINE:
//   renderprogs/<name>.<vs|ps>.hlsl
//     -> strip_dead_code (feature macros)     -> renderprogs/hlsl/...
//     -> convert_to_glsl (+ layout manifest)  -> renderprogs/vkglsl/...
//     -> ShaderLayout::parse                  -> uniform/binding indices
//     -> GraphicsDevice::compile_module / link_program
//
// PER FRAME:
//   DescriptorPools::begin_frame -> bind_program -> commit_uniforms
//
// =============================================================================

pub mod backend;
pub mod binding;
pub mod builtins;
pub mod cache;
pub mod config;
pub mod descriptor_pool;
pub mod device;
pub mod embedded;
pub mod error;
pub mod headless;
pub mod manifest;
pub mod params;
pub mod registry;
pub mod storage;
pub mod transpile;
pub mod uniforms;
pub mod vertex_layout;

pub use builtins::BuiltinProgram;
pub use cache::{RetranslatePolicy, ShaderCache};
pub use descriptor_pool::{DescriptorPoolSpec, DescriptorPools};
pub use device::GraphicsDevice;
pub use error::{RenderProgError, Result};
pub use params::{BindingType, RenderParm, ShaderFeatures, ShaderStage};
pub use registry::RenderProgManager;
pub use uniforms::UniformValueTable;
