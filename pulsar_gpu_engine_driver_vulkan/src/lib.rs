/*!
# Pulsar GPU Engine - Vulkan Driver

Vulkan implementation of the `DeviceDriver` facade from
`pulsar_gpu_engine`, built on `ash` and `gpu-allocator`.

The driver owns the Vulkan instance/device (`GpuContext`), translates the
engine's device-agnostic descriptors and barrier values into their `vk::*`
equivalents, and implements the swapchain/frame primitives the engine's
FrameContext drives.

Enable the `vulkan-validation` feature to compile in the Khronos
validation layer and a debug-utils messenger that forwards messages to the
engine's logging system.
*/

mod vulkan_context;
mod vulkan_debug;
mod vulkan_format;
mod vulkan_swapchain;
mod vulkan_driver;

// Main pulsar namespace module
pub mod pulsar {
    pub use crate::vulkan_context::{Config, GpuContext};
    pub use crate::vulkan_driver::VulkanDriver;
}

pub use pulsar::{Config, GpuContext, VulkanDriver};
