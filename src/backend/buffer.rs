// Uniform ring - per-frame host visible uniform storage
//
// Each frame in flight owns one mapped buffer. Committed uniform blocks are
// appended at aligned offsets; the cursor rewinds when the frame's slot
// comes back into rotation.

use super::VulkanDevice;
use anyhow::{Context, Result};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;

struct FrameBuffer {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

pub struct UniformRing {
    frames: Vec<FrameBuffer>,
    size: u64,
    alignment: u64,
    slot: usize,
    cursor: u64,
}

impl UniformRing {
    pub fn new(device: &VulkanDevice, frames_in_flight: usize, size: u64) -> Result<Self> {
        let mut ring = Self {
            frames: Vec::with_capacity(frames_in_flight),
            size,
            alignment: device.min_uniform_alignment(),
            slot: 0,
            cursor: 0,
        };

        for i in 0..frames_in_flight {
            match Self::create_frame_buffer(device, size, i) {
                Ok(frame) => ring.frames.push(frame),
                Err(e) => {
                    ring.destroy(device);
                    return Err(e);
                }
            }
        }

        log::info!(
            "Uniform ring: {} x {} bytes, alignment {}",
            frames_in_flight,
            size,
            ring.alignment
        );
        Ok(ring)
    }

    fn create_frame_buffer(device: &VulkanDevice, size: u64, index: usize) -> Result<FrameBuffer> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::UNIFORM_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .device
                .create_buffer(&buffer_info, None)
                .context("Failed to create uniform buffer")?
        };

        let requirements = unsafe { device.device.get_buffer_memory_requirements(buffer) };

        let allocation = device.allocator.lock().allocate(&AllocationCreateDesc {
            name: &format!("uniform ring {index}"),
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.device.destroy_buffer(buffer, None) };
                return Err(e).context("Failed to allocate uniform buffer memory");
            }
        };

        let bound = unsafe { device.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) };
        let mut frame = FrameBuffer {
            buffer,
            allocation: Some(allocation),
        };
        if let Err(e) = bound {
            Self::free_frame(device, &mut frame);
            return Err(e).context("Failed to bind uniform buffer memory");
        }

        Ok(frame)
    }

    fn free_frame(device: &VulkanDevice, frame: &mut FrameBuffer) {
        if let Some(allocation) = frame.allocation.take() {
            if let Err(e) = device.allocator.lock().free(allocation) {
                log::warn!("Failed to free uniform buffer memory: {}", e);
            }
        }
        unsafe { device.device.destroy_buffer(frame.buffer, None) };
    }

    /// Switch to the slot for `frame_number` and rewind it
    pub fn begin_frame(&mut self, frame_number: u64) {
        if self.frames.is_empty() {
            return;
        }
        self.slot = (frame_number % self.frames.len() as u64) as usize;
        self.cursor = 0;
    }

    /// Copy `bytes` into the current slot, returning the offset
    pub fn push(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.cursor.next_multiple_of(self.alignment);
        let end = offset + bytes.len() as u64;
        if end > self.size {
            anyhow::bail!("Uniform ring overflow: {} of {} bytes used this frame", offset, self.size);
        }

        let frame = self.frames.get_mut(self.slot).context("Uniform ring has no buffers")?;
        let mapped = frame
            .allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .context("Uniform buffer is not host visible")?;
        mapped[offset as usize..end as usize].copy_from_slice(bytes);

        self.cursor = end;
        Ok(offset)
    }

    pub fn current_buffer(&self) -> Option<vk::Buffer> {
        self.frames.get(self.slot).map(|frame| frame.buffer)
    }

    pub fn destroy(&mut self, device: &VulkanDevice) {
        for mut frame in self.frames.drain(..) {
            Self::free_frame(device, &mut frame);
        }
    }
}
