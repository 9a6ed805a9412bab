/// Vulkan swapchain creation and recreation

use ash::vk;
use pulsar_gpu_engine::engine_err;
use pulsar_gpu_engine::pulsar::gpu::SwapchainInfo;
use pulsar_gpu_engine::pulsar::Result;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_to_format;

const SOURCE: &str = "pulsar::vulkan";

/// Native swapchain plus everything needed to present and recreate it
pub(crate) struct SwapchainBundle {
    pub(crate) loader: ash::khr::swapchain::Device,
    pub(crate) vk_swapchain: vk::SwapchainKHR,
    pub(crate) surface_format: vk::SurfaceFormatKHR,
    pub(crate) extent: vk::Extent2D,
    pub(crate) images: Vec<vk::Image>,
}

impl SwapchainBundle {
    /// Create a swapchain for the context's surface.
    ///
    /// `extent_hint` is used only when the surface does not dictate its own
    /// extent. `old` allows the driver to hand resources over from the
    /// swapchain being replaced.
    pub(crate) fn create(
        ctx: &GpuContext,
        extent_hint: (u32, u32),
        old: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        unsafe {
            let capabilities = ctx
                .surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to query surface capabilities: {:?}", e))?;

            let formats = ctx
                .surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to query surface formats: {:?}", e))?;

            // Prefer BGRA8 UNORM; fall back to whatever the surface offers
            let surface_format = formats
                .iter()
                .copied()
                .find(|f| {
                    f.format == vk::Format::B8G8R8A8_UNORM
                        && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
                })
                .or_else(|| formats.first().copied())
                .ok_or_else(|| engine_err!(SOURCE, "Surface reports no formats"))?;

            let extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: extent_hint.0.clamp(
                        capabilities.min_image_extent.width,
                        capabilities.max_image_extent.width,
                    ),
                    height: extent_hint.1.clamp(
                        capabilities.min_image_extent.height,
                        capabilities.max_image_extent.height,
                    ),
                }
            };

            let mut image_count = capabilities.min_image_count + 1;
            if capabilities.max_image_count > 0 {
                image_count = image_count.min(capabilities.max_image_count);
            }

            let queue_family_indices = [ctx.queue_family];
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(ctx.surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
                )
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .queue_family_indices(&queue_family_indices)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                // FIFO is the only mode every implementation must support
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old.unwrap_or(vk::SwapchainKHR::null()));

            let loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
            let vk_swapchain = loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain: {:?}", e))?;

            let images = loader
                .get_swapchain_images(vk_swapchain)
                .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?;

            Ok(Self {
                loader,
                vk_swapchain,
                surface_format,
                extent,
                images,
            })
        }
    }

    /// Engine-facing properties of this swapchain
    pub(crate) fn info(&self) -> SwapchainInfo {
        SwapchainInfo {
            image_count: self.images.len() as u32,
            width: self.extent.width,
            height: self.extent.height,
            format: vk_to_format(self.surface_format.format),
        }
    }

    pub(crate) fn destroy(&mut self) {
        unsafe {
            self.loader.destroy_swapchain(self.vk_swapchain, None);
        }
    }
}
