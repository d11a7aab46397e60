// Descriptor pools - one fixed-capacity pool per frame in flight
//
// The pool for a frame is `frame_number % frames_in_flight`. A slot is reset
// (never destroyed) when it comes back into rotation; the caller guarantees
// the GPU has finished with the slot's previous frame before that happens.

use crate::device::GraphicsDevice;
use crate::error::{RenderProgError, Result};

pub const MAX_DESC_UNIFORM_BUFFERS: u32 = 8192;
pub const MAX_DESC_IMAGE_SAMPLERS: u32 = 12384;
pub const MAX_DESC_SETS: u32 = 16384;

/// Default number of frames in flight
pub const NUM_FRAME_DATA: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolSpec {
    pub max_uniform_buffers: u32,
    pub max_image_samplers: u32,
    pub max_sets: u32,
}

impl Default for DescriptorPoolSpec {
    fn default() -> Self {
        Self {
            max_uniform_buffers: MAX_DESC_UNIFORM_BUFFERS,
            max_image_samplers: MAX_DESC_IMAGE_SAMPLERS,
            max_sets: MAX_DESC_SETS,
        }
    }
}

#[derive(Debug)]
pub struct DescriptorPools<P> {
    pools: Vec<P>,
    spec: DescriptorPoolSpec,
    current: usize,
}

impl<P: Copy> DescriptorPools<P> {
    /// Create `frames_in_flight` identical pools. Any device failure aborts
    /// the whole set.
    pub fn create<D>(device: &mut D, spec: DescriptorPoolSpec, frames_in_flight: usize) -> Result<Self>
    where
        D: GraphicsDevice<Pool = P>,
    {
        let frames_in_flight = frames_in_flight.max(1);
        let pools = (0..frames_in_flight)
            .map(|slot| {
                device
                    .create_descriptor_pool(&spec)
                    .map_err(|e| RenderProgError::device(format!("descriptor pool {slot}"), e))
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Created {} descriptor pools ({} ubo / {} sampler / {} sets each)",
            pools.len(),
            spec.max_uniform_buffers,
            spec.max_image_samplers,
            spec.max_sets
        );

        Ok(Self {
            pools,
            spec,
            current: 0,
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.pools.len()
    }

    pub fn spec(&self) -> &DescriptorPoolSpec {
        &self.spec
    }

    pub fn slot_for_frame(&self, frame_number: u64) -> usize {
        (frame_number % self.pools.len() as u64) as usize
    }

    /// Rotate to the slot for `frame_number` and reset its pool
    pub fn begin_frame<D>(&mut self, device: &mut D, frame_number: u64) -> Result<P>
    where
        D: GraphicsDevice<Pool = P>,
    {
        let slot = self.slot_for_frame(frame_number);
        let pool = self.pools[slot];
        device
            .reset_descriptor_pool(pool)
            .map_err(|e| RenderProgError::device(format!("descriptor pool {slot} reset"), e))?;
        self.current = slot;
        Ok(pool)
    }

    /// Pool of the slot selected by the last `begin_frame`
    pub fn current(&self) -> P {
        self.pools[self.current]
    }

    pub fn pools(&self) -> &[P] {
        &self.pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDevice;

    #[test]
    fn test_one_pool_per_frame() {
        let mut device = HeadlessDevice::new();
        let pools = DescriptorPools::create(&mut device, DescriptorPoolSpec::default(), 3).unwrap();
        assert_eq!(pools.frames_in_flight(), 3);
        assert_eq!(device.stats().pools_created, 3);
        assert_eq!(device.pool_specs(), &[DescriptorPoolSpec::default(); 3]);
    }

    #[test]
    fn test_rotation_resets_slot() {
        let mut device = HeadlessDevice::new();
        let mut pools = DescriptorPools::create(&mut device, DescriptorPoolSpec::default(), 2).unwrap();

        let first = pools.begin_frame(&mut device, 0).unwrap();
        let second = pools.begin_frame(&mut device, 1).unwrap();
        let third = pools.begin_frame(&mut device, 2).unwrap();

        assert_ne!(first, second);
        assert_eq!(first, third);
        assert_eq!(pools.current(), first);
        assert_eq!(device.stats().pool_resets, 3);
    }

    #[test]
    fn test_creation_failure_is_fatal() {
        let mut device = HeadlessDevice::new();
        device.fail_pool_creation_after(1);
        let err = DescriptorPools::create(&mut device, DescriptorPoolSpec::default(), 2).unwrap_err();
        assert!(matches!(err, RenderProgError::Device { .. }));
    }
}
