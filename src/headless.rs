// Headless device - records device calls without touching a GPU
//
// Used by the `validate` command to run the whole load/link path on
// machines without Vulkan, and by tests to count device side effects.

use crate::descriptor_pool::DescriptorPoolSpec;
use crate::device::{GraphicsDevice, LayoutBinding, ProgramDesc};
use crate::params::ShaderStage;
use glam::Vec4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub pools_created: usize,
    pub pool_resets: usize,
    pub modules_compiled: usize,
    pub programs_linked: usize,
    pub uniform_uploads: usize,
}

/// Opaque handle handed out by the headless device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessHandle(pub u64);

#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub name: String,
    pub bindings: Vec<LayoutBinding>,
    pub stride: u32,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u64,
    stats: DeviceStats,
    pool_specs: Vec<DescriptorPoolSpec>,
    modules: Vec<(String, ShaderStage)>,
    programs: Vec<LinkedProgram>,
    uploads: Vec<Vec<Vec4>>,
    upload_cursor: u64,
    pool_budget: Option<usize>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn pool_specs(&self) -> &[DescriptorPoolSpec] {
        &self.pool_specs
    }

    /// Compiled modules as (name, stage), in compile order
    pub fn modules(&self) -> &[(String, ShaderStage)] {
        &self.modules
    }

    pub fn programs(&self) -> &[LinkedProgram] {
        &self.programs
    }

    pub fn uploads(&self) -> &[Vec<Vec4>] {
        &self.uploads
    }

    /// Make pool creation fail once `count` pools exist
    pub fn fail_pool_creation_after(&mut self, count: usize) {
        self.pool_budget = Some(count);
    }

    fn handle(&mut self) -> HeadlessHandle {
        self.next_handle += 1;
        HeadlessHandle(self.next_handle)
    }
}

impl GraphicsDevice for HeadlessDevice {
    type Pool = HeadlessHandle;
    type Module = HeadlessHandle;
    type Pipeline = HeadlessHandle;

    fn create_descriptor_pool(&mut self, spec: &DescriptorPoolSpec) -> anyhow::Result<HeadlessHandle> {
        if self.pool_budget.is_some_and(|budget| self.pool_specs.len() >= budget) {
            anyhow::bail!("out of device memory");
        }
        self.pool_specs.push(*spec);
        self.stats.pools_created += 1;
        Ok(self.handle())
    }

    fn reset_descriptor_pool(&mut self, _pool: HeadlessHandle) -> anyhow::Result<()> {
        self.stats.pool_resets += 1;
        Ok(())
    }

    fn compile_module(
        &mut self,
        name: &str,
        source: &str,
        stage: ShaderStage,
    ) -> anyhow::Result<HeadlessHandle> {
        if !source.contains("void main") {
            anyhow::bail!("{name}: no entry point");
        }
        self.modules.push((name.to_string(), stage));
        self.stats.modules_compiled += 1;
        Ok(self.handle())
    }

    fn link_program(&mut self, desc: &ProgramDesc<'_, HeadlessHandle>) -> anyhow::Result<HeadlessHandle> {
        self.programs.push(LinkedProgram {
            name: desc.name.to_string(),
            bindings: desc.bindings.to_vec(),
            stride: desc.vertex_layout.stride,
        });
        self.stats.programs_linked += 1;
        Ok(self.handle())
    }

    fn upload_uniform_block(&mut self, block: &[Vec4]) -> anyhow::Result<u64> {
        let offset = self.upload_cursor;
        self.upload_cursor += std::mem::size_of_val(block) as u64;
        self.uploads.push(block.to_vec());
        self.stats.uniform_uploads += 1;
        Ok(offset)
    }
}
