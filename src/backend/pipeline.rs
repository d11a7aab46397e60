// Graphics pipeline creation
//
// A linked program is a descriptor set layout built from the program's
// binding layout, a pipeline layout over it, and a graphics pipeline
// targeting dynamic rendering. Viewport and scissor are dynamic state.

use super::VulkanDevice;
use crate::descriptor_pool::DescriptorPoolSpec;
use crate::device::LayoutBinding;
use crate::params::{BindingType, ShaderStage};
use crate::vertex_layout::VertexLayout;
use anyhow::{Context, Result};
use ash::vk;

/// Attachment formats every program renders into
#[derive(Debug, Clone, Copy)]
pub struct RenderTargetFormats {
    pub color: vk::Format,
    pub depth: vk::Format,
}

impl Default for RenderTargetFormats {
    fn default() -> Self {
        Self {
            color: vk::Format::B8G8R8A8_UNORM,
            depth: vk::Format::D32_SFLOAT,
        }
    }
}

/// Vulkan objects backing one linked program
#[derive(Debug, Clone, Copy)]
pub struct LinkedPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub set_layout: vk::DescriptorSetLayout,
}

impl LinkedPipeline {
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.layout, None);
        device.destroy_descriptor_set_layout(self.set_layout, None);
    }
}

pub fn descriptor_type(kind: BindingType) -> vk::DescriptorType {
    match kind {
        BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::Sampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

pub fn stage_flags(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

pub fn create_descriptor_pool(device: &VulkanDevice, spec: &DescriptorPoolSpec) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize::builder()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(spec.max_uniform_buffers)
            .build(),
        vk::DescriptorPoolSize::builder()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(spec.max_image_samplers)
            .build(),
    ];

    let pool_info = vk::DescriptorPoolCreateInfo::builder()
        .max_sets(spec.max_sets)
        .pool_sizes(&pool_sizes);

    unsafe {
        device
            .device
            .create_descriptor_pool(&pool_info, None)
            .context("Failed to create descriptor pool")
    }
}

pub fn create_descriptor_set_layout(
    device: &VulkanDevice,
    bindings: &[LayoutBinding],
) -> Result<vk::DescriptorSetLayout> {
    let bindings: Vec<_> = bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding.binding)
                .descriptor_type(descriptor_type(binding.kind))
                .descriptor_count(1)
                .stage_flags(stage_flags(binding.stage))
                .build()
        })
        .collect();

    let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

    unsafe {
        device
            .device
            .create_descriptor_set_layout(&layout_info, None)
            .context("Failed to create descriptor set layout")
    }
}

/// Build the pipeline for one program
pub fn create_graphics_pipeline(
    device: &VulkanDevice,
    formats: &RenderTargetFormats,
    vert_shader: vk::ShaderModule,
    frag_shader: vk::ShaderModule,
    bindings: &[LayoutBinding],
    vertex_layout: &VertexLayout,
) -> Result<LinkedPipeline> {
    let entry_point = c"main";

    let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::VERTEX)
        .module(vert_shader)
        .name(entry_point)
        .build();

    let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
        .stage(vk::ShaderStageFlags::FRAGMENT)
        .module(frag_shader)
        .name(entry_point)
        .build();

    let shader_stages = &[vert_stage, frag_stage];

    let vertex_bindings = [vertex_layout.binding_description()];
    let attributes = vertex_layout.attribute_descriptions();
    let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Counts only; the rectangles are set per draw
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)
        .build();

    let color_blend_attachments = &[color_blend_attachment];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .attachments(color_blend_attachments);

    let set_layout = create_descriptor_set_layout(device, bindings)?;

    let set_layouts = [set_layout];
    let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);

    let pipeline_layout = match unsafe { device.device.create_pipeline_layout(&layout_info, None) } {
        Ok(layout) => layout,
        Err(e) => {
            unsafe { device.device.destroy_descriptor_set_layout(set_layout, None) };
            return Err(e).context("Failed to create pipeline layout");
        }
    };

    let color_formats = [formats.color];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::builder()
        .color_attachment_formats(&color_formats)
        .depth_attachment_format(formats.depth);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(pipeline_layout)
        .push_next(&mut rendering_info)
        .build();

    let pipelines = unsafe {
        device
            .device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
            .map_err(|(_, e)| e)
    };

    match pipelines {
        Ok(pipelines) => Ok(LinkedPipeline {
            pipeline: pipelines[0],
            layout: pipeline_layout,
            set_layout,
        }),
        Err(e) => {
            unsafe {
                device.device.destroy_pipeline_layout(pipeline_layout, None);
                device.device.destroy_descriptor_set_layout(set_layout, None);
            }
            Err(e).context("Failed to create graphics pipeline")
        }
    }
}
