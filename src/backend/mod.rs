// Backend module - Vulkan implementation of the graphics device
//
// Design: Thin wrapper around ash, headless (dynamic rendering, no swapchain)

pub mod buffer;
pub mod context;
pub mod device;
pub mod pipeline;
pub mod shader;

pub use context::VulkanBackend;
pub use device::VulkanDevice;
