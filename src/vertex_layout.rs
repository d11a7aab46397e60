// Vertex layouts - fixed vertex buffer formats and their Vulkan input state
//
// Each layout describes one interleaved binding. Attribute offsets accumulate
// from 0 in declaration order, sized by the matching vertex struct fields.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Standard draw vertex (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct DrawVert {
    pub xyz: [f32; 3],
    /// Half-float texture coordinates
    pub st: [u16; 2],
    pub normal: [u8; 4],
    pub tangent: [u8; 4],
    pub color: [u8; 4],
    pub color2: [u8; 4],
}

/// Shadow volume vertex carrying skinning weights in its colors
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ShadowVertSkinned {
    pub xyzw: [f32; 4],
    pub color: [u8; 4],
    pub color2: [u8; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ShadowVert {
    pub xyzw: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayoutType {
    DrawVert,
    DrawShadowVertSkinned,
    DrawShadowVert,
}

impl VertexLayoutType {
    pub const ALL: [VertexLayoutType; 3] = [
        VertexLayoutType::DrawVert,
        VertexLayoutType::DrawShadowVertSkinned,
        VertexLayoutType::DrawShadowVert,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: vk::Format,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u32,
    pub input_rate: vk::VertexInputRate,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    fn new(stride: usize) -> Self {
        Self {
            stride: stride as u32,
            input_rate: vk::VertexInputRate::VERTEX,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute at the next location, starting at `offset`.
    /// Returns the offset following it.
    fn push(&mut self, format: vk::Format, offset: usize, size: usize) -> usize {
        self.attributes.push(VertexAttribute {
            location: self.attributes.len() as u32,
            format,
            offset: offset as u32,
        });
        offset + size
    }

    pub fn binding_description(&self) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(self.stride)
            .input_rate(self.input_rate)
            .build()
    }

    pub fn attribute_descriptions(&self) -> Vec<vk::VertexInputAttributeDescription> {
        self.attributes
            .iter()
            .map(|attr| {
                vk::VertexInputAttributeDescription::builder()
                    .binding(0)
                    .location(attr.location)
                    .format(attr.format)
                    .offset(attr.offset)
                    .build()
            })
            .collect()
    }
}

/// Table of all vertex layouts, indexed by `VertexLayoutType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayouts {
    layouts: [VertexLayout; 3],
}

impl VertexLayouts {
    pub fn build() -> Self {
        Self {
            layouts: [draw_vert_layout(), shadow_vert_skinned_layout(), shadow_vert_layout()],
        }
    }

    pub fn get(&self, ty: VertexLayoutType) -> &VertexLayout {
        &self.layouts[ty.index()]
    }
}

fn draw_vert_layout() -> VertexLayout {
    let mut layout = VertexLayout::new(size_of::<DrawVert>());
    let mut offset = 0;
    offset = layout.push(vk::Format::R32G32B32_SFLOAT, offset, size_of::<[f32; 3]>());
    offset = layout.push(vk::Format::R16G16_SFLOAT, offset, size_of::<[u16; 2]>());
    offset = layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>()); // normal
    offset = layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>()); // tangent
    offset = layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>()); // color
    layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>()); // color2
    layout
}

fn shadow_vert_skinned_layout() -> VertexLayout {
    let mut layout = VertexLayout::new(size_of::<ShadowVertSkinned>());
    let mut offset = 0;
    offset = layout.push(vk::Format::R32G32B32A32_SFLOAT, offset, size_of::<[f32; 4]>());
    offset = layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>());
    layout.push(vk::Format::R8G8B8A8_UNORM, offset, size_of::<[u8; 4]>());
    layout
}

fn shadow_vert_layout() -> VertexLayout {
    let mut layout = VertexLayout::new(size_of::<ShadowVert>());
    layout.push(vk::Format::R32G32B32A32_SFLOAT, 0, size_of::<[f32; 4]>());
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_draw_vert_matches_struct() {
        let layouts = VertexLayouts::build();
        let layout = layouts.get(VertexLayoutType::DrawVert);
        assert_eq!(layout.stride, 32);
        let offsets: Vec<u32> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(
            offsets,
            vec![
                offset_of!(DrawVert, xyz) as u32,
                offset_of!(DrawVert, st) as u32,
                offset_of!(DrawVert, normal) as u32,
                offset_of!(DrawVert, tangent) as u32,
                offset_of!(DrawVert, color) as u32,
                offset_of!(DrawVert, color2) as u32,
            ]
        );
        assert_eq!(layout.attributes[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(layout.attributes[1].format, vk::Format::R16G16_SFLOAT);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_shadow_layouts() {
        let layouts = VertexLayouts::build();

        let skinned = layouts.get(VertexLayoutType::DrawShadowVertSkinned);
        assert_eq!(skinned.stride, 24);
        let offsets: Vec<u32> = skinned.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 20]);

        let plain = layouts.get(VertexLayoutType::DrawShadowVert);
        assert_eq!(plain.stride, 16);
        assert_eq!(
            plain.attributes,
            vec![VertexAttribute {
                location: 0,
                format: vk::Format::R32G32B32A32_SFLOAT,
                offset: 0,
            }]
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(VertexLayouts::build(), VertexLayouts::build());
    }

    #[test]
    fn test_vulkan_descriptions() {
        let layouts = VertexLayouts::build();
        let layout = layouts.get(VertexLayoutType::DrawVert);
        let binding = layout.binding_description();
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
        let attributes = layout.attribute_descriptions();
        assert_eq!(attributes.len(), 6);
        assert_eq!(attributes[5].offset, 28);
    }
}
