// Graphics device interface consumed by the render program core
//
// The core never talks to Vulkan directly. Everything that creates a GPU
// object goes through this trait, so the registry can run against a mock.

use crate::descriptor_pool::DescriptorPoolSpec;
use crate::params::{BindingType, ShaderStage};
use crate::vertex_layout::VertexLayout;
use glam::Vec4;
use std::fmt::Debug;

/// One entry of a program's resource binding layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBinding {
    pub binding: u32,
    pub kind: BindingType,
    pub stage: ShaderStage,
}

/// Everything the device needs to link a program
#[derive(Debug)]
pub struct ProgramDesc<'a, M> {
    pub name: &'a str,
    pub vertex_module: M,
    pub fragment_module: M,
    pub bindings: &'a [LayoutBinding],
    pub vertex_layout: &'a VertexLayout,
}

pub trait GraphicsDevice {
    type Pool: Copy + Eq + Debug;
    type Module: Copy + Eq + Debug;
    type Pipeline: Copy + Eq + Debug;

    fn create_descriptor_pool(&mut self, spec: &DescriptorPoolSpec) -> anyhow::Result<Self::Pool>;

    /// Recycle every set allocated from `pool`
    fn reset_descriptor_pool(&mut self, pool: Self::Pool) -> anyhow::Result<()>;

    fn compile_module(
        &mut self,
        name: &str,
        source: &str,
        stage: ShaderStage,
    ) -> anyhow::Result<Self::Module>;

    fn link_program(&mut self, desc: &ProgramDesc<'_, Self::Module>) -> anyhow::Result<Self::Pipeline>;

    /// Upload one batched uniform block, returning its offset in the
    /// current frame's uniform storage
    fn upload_uniform_block(&mut self, block: &[Vec4]) -> anyhow::Result<u64>;
}
