// Vulkan implementation of the graphics device interface
//
// Owns every Vulkan object created on behalf of the registry and destroys
// them on drop, before the device goes away.

use super::buffer::UniformRing;
use super::pipeline::{self, LinkedPipeline, RenderTargetFormats};
use super::shader;
use super::VulkanDevice;
use crate::descriptor_pool::DescriptorPoolSpec;
use crate::device::{GraphicsDevice, ProgramDesc};
use crate::params::ShaderStage;
use anyhow::{Context, Result};
use ash::vk;
use glam::Vec4;

pub struct VulkanBackend {
    glslc: String,
    formats: RenderTargetFormats,
    uniforms: UniformRing,
    modules: Vec<vk::ShaderModule>,
    pipelines: Vec<LinkedPipeline>,
    pools: Vec<vk::DescriptorPool>,
    // Declared last so it outlives everything above
    device: VulkanDevice,
}

impl VulkanBackend {
    pub fn new(device: VulkanDevice, glslc: impl Into<String>, frames_in_flight: usize, uniform_ring_size: u64) -> Result<Self> {
        let uniforms = UniformRing::new(&device, frames_in_flight, uniform_ring_size)?;
        Ok(Self {
            glslc: glslc.into(),
            formats: RenderTargetFormats::default(),
            uniforms,
            modules: Vec::new(),
            pipelines: Vec::new(),
            pools: Vec::new(),
            device,
        })
    }

    pub fn with_formats(mut self, formats: RenderTargetFormats) -> Self {
        self.formats = formats;
        self
    }

    pub fn device(&self) -> &VulkanDevice {
        &self.device
    }

    /// Rewind the uniform ring slot for `frame_number`
    pub fn begin_frame(&mut self, frame_number: u64) {
        self.uniforms.begin_frame(frame_number);
    }

    pub fn uniform_buffer(&self) -> Option<vk::Buffer> {
        self.uniforms.current_buffer()
    }

    /// Layout objects behind a pipeline handle returned by `link_program`
    pub fn pipeline_layout(&self, pipeline: vk::Pipeline) -> Option<&LinkedPipeline> {
        self.pipelines.iter().find(|linked| linked.pipeline == pipeline)
    }
}

impl GraphicsDevice for VulkanBackend {
    type Pool = vk::DescriptorPool;
    type Module = vk::ShaderModule;
    type Pipeline = vk::Pipeline;

    fn create_descriptor_pool(&mut self, spec: &DescriptorPoolSpec) -> Result<vk::DescriptorPool> {
        let pool = pipeline::create_descriptor_pool(&self.device, spec)?;
        self.pools.push(pool);
        Ok(pool)
    }

    fn reset_descriptor_pool(&mut self, pool: vk::DescriptorPool) -> Result<()> {
        unsafe {
            self.device
                .device
                .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                .context("Failed to reset descriptor pool")
        }
    }

    fn compile_module(&mut self, name: &str, source: &str, stage: ShaderStage) -> Result<vk::ShaderModule> {
        let code = shader::compile_glsl(&self.glslc, name, source, stage)?;
        let module = shader::create_shader_module(&self.device, &code)?;
        log::debug!("Compiled {} ({} words)", name, code.len());
        self.modules.push(module);
        Ok(module)
    }

    fn link_program(&mut self, desc: &ProgramDesc<'_, vk::ShaderModule>) -> Result<vk::Pipeline> {
        let linked = pipeline::create_graphics_pipeline(
            &self.device,
            &self.formats,
            desc.vertex_module,
            desc.fragment_module,
            desc.bindings,
            desc.vertex_layout,
        )
        .with_context(|| format!("Failed to link {}", desc.name))?;
        self.pipelines.push(linked);
        Ok(linked.pipeline)
    }

    fn upload_uniform_block(&mut self, block: &[Vec4]) -> Result<u64> {
        self.uniforms.push(bytemuck::cast_slice(block))
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        let _ = self.device.wait_idle();

        unsafe {
            for linked in self.pipelines.drain(..) {
                linked.destroy(&self.device.device);
            }
            for module in self.modules.drain(..) {
                self.device.device.destroy_shader_module(module, None);
            }
            for pool in self.pools.drain(..) {
                self.device.device.destroy_descriptor_pool(pool, None);
            }
        }
        self.uniforms.destroy(&self.device);
    }
}
