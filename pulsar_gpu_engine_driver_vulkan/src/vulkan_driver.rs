/// VulkanDriver - Vulkan implementation of the DeviceDriver facade
///
/// Translates the engine's device-agnostic descriptors, commands and
/// barrier values into `ash` calls. Native handles cross the facade as
/// their raw `u64` bits; allocations and pipeline layouts are tracked here,
/// keyed by those bits, so the engine never sees backend bookkeeping.

use std::ffi::CString;
use std::sync::{Arc, Mutex};

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use rustc_hash::FxHashMap;

use pulsar_gpu_engine::pulsar::gpu::{
    AcquireOutcome, BufferBarrier, BufferCopy, BufferDesc, BufferImageCopy, BufferViewDesc,
    ClearValue, ComputePipelineDesc, DescriptorSetLayoutDesc, DescriptorType, DeviceDriver,
    Filter, FramebufferDesc, GraphicsPipelineDesc, ImageBarrier, ImageBlit, ImageCopy, ImageDesc,
    ImageResolve, ImageSubresourceRange, ImageViewDesc, IndexType, NativeBuffer, NativeBufferView,
    NativeCommandBuffer, NativeDescriptorResource, NativeDescriptorSet, NativeDescriptorSetLayout,
    NativeDescriptorWrite, NativeFence, NativeFramebuffer, NativeImage, NativeImageView,
    NativePipeline, NativeRenderPass, NativeRenderingAttachment, NativeRenderingInfo,
    NativeSampler, NativeSemaphore, NativeShader, NativeSwapchain, PipelineBindPoint,
    PresentOutcome, Rect2D, RenderPassDesc, SamplerDesc, ShaderDesc, ShaderStages, StencilFaces,
    Swapchain, SwapchainInfo, Viewport,
};
use pulsar_gpu_engine::pulsar::{Result, Status};
use pulsar_gpu_engine::{engine_err, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::*;
use crate::vulkan_swapchain::SwapchainBundle;

const SOURCE: &str = "pulsar::vulkan";

/// Mutable driver-side bookkeeping, keyed by raw native-handle bits
struct DriverState {
    buffer_allocations: FxHashMap<u64, Allocation>,
    image_allocations: FxHashMap<u64, Allocation>,
    /// Pipeline → (layout, push-constant stages); released with the pipeline
    pipeline_layouts: FxHashMap<u64, (vk::PipelineLayout, vk::ShaderStageFlags)>,
    /// Command buffer → layout of the most recently bound pipeline
    bound_layouts: FxHashMap<u64, vk::PipelineLayout>,
    descriptor_pools: Vec<vk::DescriptorPool>,
    swapchains: FxHashMap<u64, SwapchainBundle>,
    next_swapchain_id: u64,
}

/// Vulkan rendition of the device driver facade
pub struct VulkanDriver {
    ctx: Arc<GpuContext>,
    state: Mutex<DriverState>,
}

impl VulkanDriver {
    /// Wrap a GPU context as a driver facade
    pub fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx,
            state: Mutex::new(DriverState {
                buffer_allocations: FxHashMap::default(),
                image_allocations: FxHashMap::default(),
                pipeline_layouts: FxHashMap::default(),
                bound_layouts: FxHashMap::default(),
                descriptor_pools: Vec::new(),
                swapchains: FxHashMap::default(),
                next_swapchain_id: 1,
            }),
        }
    }

    /// Shared GPU context
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Create a swapchain for the context's surface and hand it to the
    /// engine as a `Swapchain` state object
    pub fn create_swapchain(&self, width: u32, height: u32) -> Result<Swapchain> {
        let bundle = SwapchainBundle::create(&self.ctx, (width, height), None)?;
        let info = bundle.info();
        let mut state = self.state.lock().unwrap();
        let id = state.next_swapchain_id;
        state.next_swapchain_id += 1;
        state.swapchains.insert(id, bundle);
        Ok(Swapchain::new(NativeSwapchain(id), info))
    }

    /// Destroy a swapchain previously created by this driver
    pub fn destroy_swapchain(&self, swapchain: Swapchain) {
        let mut state = self.state.lock().unwrap();
        if let Some(mut bundle) = state.swapchains.remove(&swapchain.native().0) {
            bundle.destroy();
        }
    }

    fn vk_cmd(cmd: NativeCommandBuffer) -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(cmd.0)
    }

    /// Create a descriptor pool with fixed capacity.
    /// Called during the first allocation and whenever the current pools
    /// are exhausted.
    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2048,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLED_IMAGE,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: 256,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
                descriptor_count: 256,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(1024);

        unsafe {
            device
                .create_descriptor_pool(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor pool: {:?}", e))
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[NativeDescriptorSetLayout],
        push_constant_size: u32,
        push_stages: vk::ShaderStageFlags,
    ) -> Result<vk::PipelineLayout> {
        let vk_layouts: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|l| vk::DescriptorSetLayout::from_raw(l.0))
            .collect();
        let push_ranges = if push_constant_size > 0 {
            vec![vk::PushConstantRange {
                stage_flags: push_stages,
                offset: 0,
                size: push_constant_size,
            }]
        } else {
            Vec::new()
        };
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&vk_layouts)
            .push_constant_ranges(&push_ranges);
        unsafe {
            self.ctx
                .device
                .create_pipeline_layout(&info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create pipeline layout: {:?}", e))
        }
    }
}

impl DeviceDriver for VulkanDriver {
    // ===== RESOURCE LIFECYCLE =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<NativeBuffer> {
        unsafe {
            let info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self
                .ctx
                .device
                .create_buffer(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_buffer"))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);
            let location = if desc.host_visible {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };
            let allocation = self
                .ctx
                .allocator
                .lock()
                .unwrap()
                .allocate(&AllocationCreateDesc {
                    name: "pulsar buffer",
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    self.ctx.device.destroy_buffer(buffer, None);
                    engine_err!(SOURCE, "Buffer allocation failed: {:?}", e);
                    Status::OutOfDeviceMemory
                })?;

            if let Err(e) =
                self.ctx
                    .device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.ctx.allocator.lock().unwrap().free(allocation).ok();
                self.ctx.device.destroy_buffer(buffer, None);
                return Err(vk_result_to_status(e, "bind_buffer_memory"));
            }

            let native = NativeBuffer(buffer.as_raw());
            self.state
                .lock()
                .unwrap()
                .buffer_allocations
                .insert(native.0, allocation);
            Ok(native)
        }
    }

    fn create_buffer_view(
        &self,
        buffer: NativeBuffer,
        desc: &BufferViewDesc,
    ) -> Result<NativeBufferView> {
        unsafe {
            let info = vk::BufferViewCreateInfo::default()
                .buffer(vk::Buffer::from_raw(buffer.0))
                .format(format_to_vk(desc.format))
                .offset(desc.offset)
                .range(desc.size);
            let view = self
                .ctx
                .device
                .create_buffer_view(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_buffer_view"))?;
            Ok(NativeBufferView(view.as_raw()))
        }
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<NativeImage> {
        unsafe {
            let info = vk::ImageCreateInfo::default()
                .image_type(image_type_to_vk(desc.image_type))
                .format(format_to_vk(desc.format))
                .extent(vk::Extent3D {
                    width: desc.extent.width,
                    height: desc.extent.height,
                    depth: desc.extent.depth,
                })
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_layers)
                .samples(sample_count_to_vk(desc.sample_count))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(image_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);
            let image = self
                .ctx
                .device
                .create_image(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_image"))?;

            let requirements = self.ctx.device.get_image_memory_requirements(image);
            let allocation = self
                .ctx
                .allocator
                .lock()
                .unwrap()
                .allocate(&AllocationCreateDesc {
                    name: "pulsar image",
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    self.ctx.device.destroy_image(image, None);
                    engine_err!(SOURCE, "Image allocation failed: {:?}", e);
                    Status::OutOfDeviceMemory
                })?;

            if let Err(e) =
                self.ctx
                    .device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                self.ctx.allocator.lock().unwrap().free(allocation).ok();
                self.ctx.device.destroy_image(image, None);
                return Err(vk_result_to_status(e, "bind_image_memory"));
            }

            let native = NativeImage(image.as_raw());
            self.state
                .lock()
                .unwrap()
                .image_allocations
                .insert(native.0, allocation);
            Ok(native)
        }
    }

    fn create_image_view(
        &self,
        image: NativeImage,
        desc: &ImageViewDesc,
    ) -> Result<NativeImageView> {
        unsafe {
            let view_type = if desc.array_layer_count > 1 {
                vk::ImageViewType::TYPE_2D_ARRAY
            } else {
                vk::ImageViewType::TYPE_2D
            };
            let info = vk::ImageViewCreateInfo::default()
                .image(vk::Image::from_raw(image.0))
                .view_type(view_type)
                .format(format_to_vk(desc.format))
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspects_to_vk(desc.aspects),
                    base_mip_level: desc.base_mip_level,
                    level_count: desc.mip_level_count,
                    base_array_layer: desc.base_array_layer,
                    layer_count: desc.array_layer_count,
                });
            let view = self
                .ctx
                .device
                .create_image_view(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_image_view"))?;
            Ok(NativeImageView(view.as_raw()))
        }
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<NativeSampler> {
        unsafe {
            let info = vk::SamplerCreateInfo::default()
                .mag_filter(filter_to_vk(desc.mag_filter))
                .min_filter(filter_to_vk(desc.min_filter))
                .mipmap_mode(mipmap_mode_to_vk(desc.mipmap_filter))
                .address_mode_u(address_mode_to_vk(desc.address_mode_u))
                .address_mode_v(address_mode_to_vk(desc.address_mode_v))
                .address_mode_w(address_mode_to_vk(desc.address_mode_w))
                .min_lod(desc.min_lod)
                .max_lod(desc.max_lod)
                .anisotropy_enable(desc.max_anisotropy > 1.0)
                .max_anisotropy(desc.max_anisotropy);
            let sampler = self
                .ctx
                .device
                .create_sampler(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_sampler"))?;
            Ok(NativeSampler(sampler.as_raw()))
        }
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<NativeShader> {
        unsafe {
            let info = vk::ShaderModuleCreateInfo::default().code(&desc.spirv);
            let module = self
                .ctx
                .device
                .create_shader_module(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_shader"))?;
            Ok(NativeShader(module.as_raw()))
        }
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<NativeRenderPass> {
        unsafe {
            let mut attachments = Vec::new();
            let mut color_refs = Vec::new();
            for attachment in &desc.color_attachments {
                color_refs.push(vk::AttachmentReference {
                    attachment: attachments.len() as u32,
                    layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                });
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(format_to_vk(attachment.format))
                        .samples(sample_count_to_vk(attachment.sample_count))
                        .load_op(load_op_to_vk(attachment.load_op))
                        .store_op(store_op_to_vk(attachment.store_op))
                        .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                        .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                        .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                );
            }

            let depth_ref = desc.depth_stencil_attachment.as_ref().map(|attachment| {
                let reference = vk::AttachmentReference {
                    attachment: attachments.len() as u32,
                    layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                };
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(format_to_vk(attachment.format))
                        .samples(sample_count_to_vk(attachment.sample_count))
                        .load_op(load_op_to_vk(attachment.load_op))
                        .store_op(store_op_to_vk(attachment.store_op))
                        .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                        .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                        .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
                );
                reference
            });

            let mut subpass = vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&color_refs);
            if let Some(depth_ref) = &depth_ref {
                subpass = subpass.depth_stencil_attachment(depth_ref);
            }
            let subpasses = [subpass];

            let info = vk::RenderPassCreateInfo::default()
                .attachments(&attachments)
                .subpasses(&subpasses);
            let render_pass = self
                .ctx
                .device
                .create_render_pass(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_render_pass"))?;
            Ok(NativeRenderPass(render_pass.as_raw()))
        }
    }

    fn create_framebuffer(
        &self,
        render_pass: NativeRenderPass,
        attachments: &[NativeImageView],
        desc: &FramebufferDesc,
    ) -> Result<NativeFramebuffer> {
        unsafe {
            let views: Vec<vk::ImageView> = attachments
                .iter()
                .map(|v| vk::ImageView::from_raw(v.0))
                .collect();
            let info = vk::FramebufferCreateInfo::default()
                .render_pass(vk::RenderPass::from_raw(render_pass.0))
                .attachments(&views)
                .width(desc.width)
                .height(desc.height)
                .layers(desc.layers);
            let framebuffer = self
                .ctx
                .device
                .create_framebuffer(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_framebuffer"))?;
            Ok(NativeFramebuffer(framebuffer.as_raw()))
        }
    }

    fn create_descriptor_set_layout(
        &self,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<NativeDescriptorSetLayout> {
        unsafe {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
                .bindings
                .iter()
                .map(|binding| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(binding.binding)
                        .descriptor_type(descriptor_type_to_vk(binding.ty))
                        .descriptor_count(binding.count)
                        .stage_flags(shader_stages_to_vk(binding.stages))
                })
                .collect();
            let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let layout = self
                .ctx
                .device
                .create_descriptor_set_layout(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_descriptor_set_layout"))?;
            Ok(NativeDescriptorSetLayout(layout.as_raw()))
        }
    }

    fn create_descriptor_set(
        &self,
        layout: NativeDescriptorSetLayout,
    ) -> Result<NativeDescriptorSet> {
        let mut state = self.state.lock().unwrap();
        if state.descriptor_pools.is_empty() {
            let pool = Self::create_descriptor_pool(&self.ctx.device)?;
            state.descriptor_pools.push(pool);
        }

        let vk_layouts = [vk::DescriptorSetLayout::from_raw(layout.0)];
        // Try the newest pool first; grow when exhausted
        for _ in 0..2 {
            let pool = *state.descriptor_pools.last().expect("pool list is non-empty");
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&vk_layouts);
            match unsafe { self.ctx.device.allocate_descriptor_sets(&info) } {
                Ok(sets) => return Ok(NativeDescriptorSet(sets[0].as_raw())),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY)
                | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let pool = Self::create_descriptor_pool(&self.ctx.device)?;
                    state.descriptor_pools.push(pool);
                }
                Err(e) => return Err(vk_result_to_status(e, "allocate_descriptor_sets")),
            }
        }
        Err(Status::OutOfDeviceMemory)
    }

    fn update_descriptor_set(&self, set: NativeDescriptorSet, writes: &[NativeDescriptorWrite]) {
        let vk_set = vk::DescriptorSet::from_raw(set.0);
        unsafe {
            for write in writes {
                let vk_type = descriptor_type_to_vk(write.ty);
                let base = vk::WriteDescriptorSet::default()
                    .dst_set(vk_set)
                    .dst_binding(write.binding)
                    .descriptor_type(vk_type);

                match write.ty {
                    DescriptorType::UniformBuffer
                    | DescriptorType::StorageBuffer
                    | DescriptorType::DynamicUniformBuffer
                    | DescriptorType::DynamicStorageBuffer => {
                        let infos: Vec<vk::DescriptorBufferInfo> = write
                            .resources
                            .iter()
                            .filter_map(|resource| match resource {
                                NativeDescriptorResource::Buffer {
                                    buffer,
                                    offset,
                                    size,
                                } => Some(vk::DescriptorBufferInfo {
                                    buffer: vk::Buffer::from_raw(buffer.0),
                                    offset: *offset,
                                    range: *size,
                                }),
                                _ => None,
                            })
                            .collect();
                        let vk_write = base.buffer_info(&infos);
                        self.ctx.device.update_descriptor_sets(&[vk_write], &[]);
                    }
                    DescriptorType::UniformTexelBuffer | DescriptorType::StorageTexelBuffer => {
                        let views: Vec<vk::BufferView> = write
                            .resources
                            .iter()
                            .filter_map(|resource| match resource {
                                NativeDescriptorResource::TexelBuffer { view } => {
                                    Some(vk::BufferView::from_raw(view.0))
                                }
                                _ => None,
                            })
                            .collect();
                        let vk_write = base.texel_buffer_view(&views);
                        self.ctx.device.update_descriptor_sets(&[vk_write], &[]);
                    }
                    DescriptorType::Sampler
                    | DescriptorType::CombinedImageSampler
                    | DescriptorType::SampledImage
                    | DescriptorType::StorageImage => {
                        let infos: Vec<vk::DescriptorImageInfo> = write
                            .resources
                            .iter()
                            .filter_map(|resource| match resource {
                                NativeDescriptorResource::Image { view, layout } => {
                                    Some(vk::DescriptorImageInfo {
                                        sampler: vk::Sampler::null(),
                                        image_view: vk::ImageView::from_raw(view.0),
                                        image_layout: layout_to_vk(*layout),
                                    })
                                }
                                NativeDescriptorResource::CombinedImageSampler {
                                    view,
                                    sampler,
                                    layout,
                                } => Some(vk::DescriptorImageInfo {
                                    sampler: vk::Sampler::from_raw(sampler.0),
                                    image_view: vk::ImageView::from_raw(view.0),
                                    image_layout: layout_to_vk(*layout),
                                }),
                                NativeDescriptorResource::Sampler { sampler } => {
                                    Some(vk::DescriptorImageInfo {
                                        sampler: vk::Sampler::from_raw(sampler.0),
                                        image_view: vk::ImageView::null(),
                                        image_layout: vk::ImageLayout::UNDEFINED,
                                    })
                                }
                                _ => None,
                            })
                            .collect();
                        let vk_write = base.image_info(&infos);
                        self.ctx.device.update_descriptor_sets(&[vk_write], &[]);
                    }
                }
            }
        }
    }

    fn create_compute_pipeline(
        &self,
        shader: NativeShader,
        set_layouts: &[NativeDescriptorSetLayout],
        desc: &ComputePipelineDesc,
    ) -> Result<NativePipeline> {
        let push_stages = vk::ShaderStageFlags::COMPUTE;
        let layout =
            self.create_pipeline_layout(set_layouts, desc.push_constant_size, push_stages)?;

        let entry_point = CString::new(desc.entry_point.clone())
            .map_err(|_| Status::BackendError("Entry point contains NUL".to_string()))?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(vk::ShaderModule::from_raw(shader.0))
            .name(&entry_point);
        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipeline = unsafe {
            match self.ctx.device.create_compute_pipelines(
                vk::PipelineCache::null(),
                &[info],
                None,
            ) {
                Ok(pipelines) => pipelines[0],
                Err((_, e)) => {
                    self.ctx.device.destroy_pipeline_layout(layout, None);
                    return Err(vk_result_to_status(e, "create_compute_pipeline"));
                }
            }
        };

        let native = NativePipeline(pipeline.as_raw());
        self.state
            .lock()
            .unwrap()
            .pipeline_layouts
            .insert(native.0, (layout, push_stages));
        Ok(native)
    }

    fn create_graphics_pipeline(
        &self,
        vertex_shader: NativeShader,
        fragment_shader: NativeShader,
        set_layouts: &[NativeDescriptorSetLayout],
        desc: &GraphicsPipelineDesc,
    ) -> Result<NativePipeline> {
        let push_stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        let layout =
            self.create_pipeline_layout(set_layouts, desc.push_constant_size, push_stages)?;

        let vertex_entry = CString::new(desc.vertex_entry_point.clone())
            .map_err(|_| Status::BackendError("Entry point contains NUL".to_string()))?;
        let fragment_entry = CString::new(desc.fragment_entry_point.clone())
            .map_err(|_| Status::BackendError("Entry point contains NUL".to_string()))?;
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vk::ShaderModule::from_raw(vertex_shader.0))
                .name(&vertex_entry),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(vk::ShaderModule::from_raw(fragment_shader.0))
                .name(&fragment_entry),
        ];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vertex_input_rate_to_vk(binding.input_rate),
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology));

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(desc.sample_count));

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_format.is_some())
            .depth_write_enable(desc.depth_format.is_some())
            .depth_compare_op(vk::CompareOp::LESS);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
            .color_formats
            .iter()
            .map(|_| {
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
            })
            .collect();
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [
            vk::DynamicState::VIEWPORT,
            vk::DynamicState::SCISSOR,
            vk::DynamicState::BLEND_CONSTANTS,
            vk::DynamicState::STENCIL_COMPARE_MASK,
            vk::DynamicState::STENCIL_REFERENCE,
            vk::DynamicState::STENCIL_WRITE_MASK,
        ];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats: Vec<vk::Format> = desc
            .color_formats
            .iter()
            .map(|&format| format_to_vk(format))
            .collect();
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(
                desc.depth_format.map(format_to_vk).unwrap_or(vk::Format::UNDEFINED),
            )
            .stencil_attachment_format(
                desc.stencil_format.map(format_to_vk).unwrap_or(vk::Format::UNDEFINED),
            );

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let pipeline = unsafe {
            match self.ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[info],
                None,
            ) {
                Ok(pipelines) => pipelines[0],
                Err((_, e)) => {
                    self.ctx.device.destroy_pipeline_layout(layout, None);
                    return Err(vk_result_to_status(e, "create_graphics_pipeline"));
                }
            }
        };

        let native = NativePipeline(pipeline.as_raw());
        self.state
            .lock()
            .unwrap()
            .pipeline_layouts
            .insert(native.0, (layout, push_stages));
        Ok(native)
    }

    fn release_buffer(&self, buffer: NativeBuffer) {
        let allocation = self.state.lock().unwrap().buffer_allocations.remove(&buffer.0);
        if let Some(allocation) = allocation {
            self.ctx.allocator.lock().unwrap().free(allocation).ok();
        }
        unsafe {
            self.ctx
                .device
                .destroy_buffer(vk::Buffer::from_raw(buffer.0), None);
        }
    }

    fn release_buffer_view(&self, view: NativeBufferView) {
        unsafe {
            self.ctx
                .device
                .destroy_buffer_view(vk::BufferView::from_raw(view.0), None);
        }
    }

    fn release_image(&self, image: NativeImage) {
        let allocation = self.state.lock().unwrap().image_allocations.remove(&image.0);
        if let Some(allocation) = allocation {
            self.ctx.allocator.lock().unwrap().free(allocation).ok();
        }
        unsafe {
            self.ctx
                .device
                .destroy_image(vk::Image::from_raw(image.0), None);
        }
    }

    fn release_image_view(&self, view: NativeImageView) {
        unsafe {
            self.ctx
                .device
                .destroy_image_view(vk::ImageView::from_raw(view.0), None);
        }
    }

    fn release_sampler(&self, sampler: NativeSampler) {
        unsafe {
            self.ctx
                .device
                .destroy_sampler(vk::Sampler::from_raw(sampler.0), None);
        }
    }

    fn release_shader(&self, shader: NativeShader) {
        unsafe {
            self.ctx
                .device
                .destroy_shader_module(vk::ShaderModule::from_raw(shader.0), None);
        }
    }

    fn release_render_pass(&self, render_pass: NativeRenderPass) {
        unsafe {
            self.ctx
                .device
                .destroy_render_pass(vk::RenderPass::from_raw(render_pass.0), None);
        }
    }

    fn release_framebuffer(&self, framebuffer: NativeFramebuffer) {
        unsafe {
            self.ctx
                .device
                .destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.0), None);
        }
    }

    fn release_descriptor_set_layout(&self, layout: NativeDescriptorSetLayout) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(
                vk::DescriptorSetLayout::from_raw(layout.0),
                None,
            );
        }
    }

    fn release_descriptor_set(&self, set: NativeDescriptorSet) {
        let state = self.state.lock().unwrap();
        // Sets allocate from the newest pool; try each pool until one
        // accepts the free
        for &pool in state.descriptor_pools.iter().rev() {
            let result = unsafe {
                self.ctx
                    .device
                    .free_descriptor_sets(pool, &[vk::DescriptorSet::from_raw(set.0)])
            };
            if result.is_ok() {
                return;
            }
        }
        engine_warn!(SOURCE, "Failed to free descriptor set {:#x}", set.0);
    }

    fn release_pipeline(&self, pipeline: NativePipeline) {
        let layout = self.state.lock().unwrap().pipeline_layouts.remove(&pipeline.0);
        unsafe {
            self.ctx
                .device
                .destroy_pipeline(vk::Pipeline::from_raw(pipeline.0), None);
            if let Some((layout, _)) = layout {
                self.ctx.device.destroy_pipeline_layout(layout, None);
            }
        }
    }

    // ===== COMMAND BUFFERS =====

    fn create_command_buffer(&self) -> Result<NativeCommandBuffer> {
        unsafe {
            let info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.ctx.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let buffers = self
                .ctx
                .device
                .allocate_command_buffers(&info)
                .map_err(|e| vk_result_to_status(e, "allocate_command_buffers"))?;
            Ok(NativeCommandBuffer(buffers[0].as_raw()))
        }
    }

    fn release_command_buffer(&self, cmd: NativeCommandBuffer) {
        self.state.lock().unwrap().bound_layouts.remove(&cmd.0);
        unsafe {
            self.ctx
                .device
                .free_command_buffers(self.ctx.command_pool, &[Self::vk_cmd(cmd)]);
        }
    }

    fn begin_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()> {
        unsafe {
            let info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(Self::vk_cmd(cmd), &info)
                .map_err(|e| vk_result_to_status(e, "begin_command_buffer"))
        }
    }

    fn end_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .end_command_buffer(Self::vk_cmd(cmd))
                .map_err(|e| vk_result_to_status(e, "end_command_buffer"))
        }
    }

    fn reset_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()> {
        self.state.lock().unwrap().bound_layouts.remove(&cmd.0);
        unsafe {
            self.ctx
                .device
                .reset_command_buffer(Self::vk_cmd(cmd), vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_result_to_status(e, "reset_command_buffer"))
        }
    }

    // ===== NATIVE COMMAND EMISSION =====

    fn cmd_insert_barriers(
        &self,
        cmd: NativeCommandBuffer,
        buffers: &[BufferBarrier],
        images: &[ImageBarrier],
    ) {
        let mut src_stages = vk::PipelineStageFlags::empty();
        let mut dst_stages = vk::PipelineStageFlags::empty();

        let buffer_barriers: Vec<vk::BufferMemoryBarrier> = buffers
            .iter()
            .map(|barrier| {
                src_stages |= stages_to_vk(barrier.transition.src.stages);
                dst_stages |= stages_to_vk(barrier.transition.dst.stages);
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(access_to_vk(barrier.transition.src.access))
                    .dst_access_mask(access_to_vk(barrier.transition.dst.access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(vk::Buffer::from_raw(barrier.buffer.0))
                    .offset(barrier.offset)
                    .size(barrier.size)
            })
            .collect();

        let image_barriers: Vec<vk::ImageMemoryBarrier> = images
            .iter()
            .map(|barrier| {
                src_stages |= stages_to_vk(barrier.transition.src.stages);
                dst_stages |= stages_to_vk(barrier.transition.dst.stages);
                vk::ImageMemoryBarrier::default()
                    .src_access_mask(access_to_vk(barrier.transition.src.access))
                    .dst_access_mask(access_to_vk(barrier.transition.dst.access))
                    .old_layout(layout_to_vk(barrier.transition.src.layout))
                    .new_layout(layout_to_vk(barrier.transition.dst.layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(vk::Image::from_raw(barrier.image.0))
                    .subresource_range(subresource_range_to_vk(&barrier.range))
            })
            .collect();

        if src_stages.is_empty() {
            src_stages = vk::PipelineStageFlags::TOP_OF_PIPE;
        }
        if dst_stages.is_empty() {
            dst_stages = vk::PipelineStageFlags::BOTTOM_OF_PIPE;
        }

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                Self::vk_cmd(cmd),
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
    }

    fn cmd_fill_buffer(
        &self,
        cmd: NativeCommandBuffer,
        dst: NativeBuffer,
        offset: u64,
        size: u64,
        data: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_fill_buffer(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(dst.0),
                offset,
                size,
                data,
            );
        }
    }

    fn cmd_copy_buffer(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeBuffer,
        dst: NativeBuffer,
        regions: &[BufferCopy],
    ) {
        let vk_regions: Vec<vk::BufferCopy> = regions
            .iter()
            .map(|region| vk::BufferCopy {
                src_offset: region.src_offset,
                dst_offset: region.dst_offset,
                size: region.size,
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_copy_buffer(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(src.0),
                vk::Buffer::from_raw(dst.0),
                &vk_regions,
            );
        }
    }

    fn cmd_update_buffer(
        &self,
        cmd: NativeCommandBuffer,
        dst: NativeBuffer,
        offset: u64,
        data: &[u8],
    ) {
        unsafe {
            self.ctx.device.cmd_update_buffer(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(dst.0),
                offset,
                data,
            );
        }
    }

    fn cmd_copy_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageCopy],
    ) {
        let vk_regions: Vec<vk::ImageCopy> = regions
            .iter()
            .map(|region| vk::ImageCopy {
                src_subresource: subresource_layers_to_vk(&region.src_layers),
                src_offset: offset_to_vk(region.src_offset),
                dst_subresource: subresource_layers_to_vk(&region.dst_layers),
                dst_offset: offset_to_vk(region.dst_offset),
                extent: vk::Extent3D {
                    width: region.extent.width,
                    height: region.extent.height,
                    depth: region.extent.depth,
                },
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_copy_image(
                Self::vk_cmd(cmd),
                vk::Image::from_raw(src.0),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
            );
        }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeBuffer,
        dst: NativeImage,
        regions: &[BufferImageCopy],
    ) {
        let vk_regions: Vec<vk::BufferImageCopy> = regions
            .iter()
            .map(|region| vk::BufferImageCopy {
                buffer_offset: region.buffer_offset,
                buffer_row_length: region.buffer_row_length,
                buffer_image_height: region.buffer_image_height,
                image_subresource: subresource_layers_to_vk(&region.image_layers),
                image_offset: offset_to_vk(region.image_offset),
                image_extent: vk::Extent3D {
                    width: region.image_extent.width,
                    height: region.image_extent.height,
                    depth: region.image_extent.depth,
                },
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(src.0),
                vk::Image::from_raw(dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
            );
        }
    }

    fn cmd_blit_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageBlit],
        filter: Filter,
    ) {
        let vk_regions: Vec<vk::ImageBlit> = regions
            .iter()
            .map(|region| vk::ImageBlit {
                src_subresource: subresource_layers_to_vk(&region.src_layers),
                src_offsets: [
                    offset_to_vk(region.src_offsets[0]),
                    offset_to_vk(region.src_offsets[1]),
                ],
                dst_subresource: subresource_layers_to_vk(&region.dst_layers),
                dst_offsets: [
                    offset_to_vk(region.dst_offsets[0]),
                    offset_to_vk(region.dst_offsets[1]),
                ],
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_blit_image(
                Self::vk_cmd(cmd),
                vk::Image::from_raw(src.0),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
                filter_to_vk(filter),
            );
        }
    }

    fn cmd_resolve_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageResolve],
    ) {
        let vk_regions: Vec<vk::ImageResolve> = regions
            .iter()
            .map(|region| vk::ImageResolve {
                src_subresource: subresource_layers_to_vk(&region.src_layers),
                src_offset: offset_to_vk(region.src_offset),
                dst_subresource: subresource_layers_to_vk(&region.dst_layers),
                dst_offset: offset_to_vk(region.dst_offset),
                extent: vk::Extent3D {
                    width: region.extent.width,
                    height: region.extent.height,
                    depth: region.extent.depth,
                },
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_resolve_image(
                Self::vk_cmd(cmd),
                vk::Image::from_raw(src.0),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
            );
        }
    }

    fn cmd_clear_color_image(
        &self,
        cmd: NativeCommandBuffer,
        image: NativeImage,
        value: [f32; 4],
        ranges: &[ImageSubresourceRange],
    ) {
        let vk_ranges: Vec<vk::ImageSubresourceRange> =
            ranges.iter().map(subresource_range_to_vk).collect();
        let clear_value = vk::ClearColorValue { float32: value };
        unsafe {
            self.ctx.device.cmd_clear_color_image(
                Self::vk_cmd(cmd),
                vk::Image::from_raw(image.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear_value,
                &vk_ranges,
            );
        }
    }

    fn cmd_clear_depth_stencil_image(
        &self,
        cmd: NativeCommandBuffer,
        image: NativeImage,
        depth: f32,
        stencil: u32,
        ranges: &[ImageSubresourceRange],
    ) {
        let vk_ranges: Vec<vk::ImageSubresourceRange> =
            ranges.iter().map(subresource_range_to_vk).collect();
        let clear_value = vk::ClearDepthStencilValue { depth, stencil };
        unsafe {
            self.ctx.device.cmd_clear_depth_stencil_image(
                Self::vk_cmd(cmd),
                vk::Image::from_raw(image.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear_value,
                &vk_ranges,
            );
        }
    }

    fn cmd_begin_render_pass(&self, cmd: NativeCommandBuffer, info: &NativeRenderingInfo) {
        fn to_vk_attachment(
            attachment: &NativeRenderingAttachment,
        ) -> vk::RenderingAttachmentInfo<'static> {
            let clear_value = match attachment.clear {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue { float32: color },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
                },
            };
            let mut vk_attachment = vk::RenderingAttachmentInfo::default()
                .image_view(vk::ImageView::from_raw(attachment.view.0))
                .image_layout(layout_to_vk(attachment.layout))
                .load_op(load_op_to_vk(attachment.load_op))
                .store_op(store_op_to_vk(attachment.store_op))
                .clear_value(clear_value);
            if let Some(resolve) = attachment.resolve_view {
                vk_attachment = vk_attachment
                    .resolve_mode(vk::ResolveModeFlags::AVERAGE)
                    .resolve_image_view(vk::ImageView::from_raw(resolve.0))
                    .resolve_image_layout(layout_to_vk(attachment.resolve_layout));
            }
            vk_attachment
        }

        let color_attachments: Vec<vk::RenderingAttachmentInfo> =
            info.color_attachments.iter().map(to_vk_attachment).collect();
        let depth_attachment = info.depth_attachment.as_ref().map(to_vk_attachment);
        let stencil_attachment = info.stencil_attachment.as_ref().map(to_vk_attachment);

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D {
                    x: info.render_area.x,
                    y: info.render_area.y,
                },
                extent: vk::Extent2D {
                    width: info.render_area.width,
                    height: info.render_area.height,
                },
            })
            .layer_count(info.num_layers)
            .color_attachments(&color_attachments);
        if let Some(depth) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth);
        }
        if let Some(stencil) = &stencil_attachment {
            rendering_info = rendering_info.stencil_attachment(stencil);
        }

        unsafe {
            self.ctx
                .device
                .cmd_begin_rendering(Self::vk_cmd(cmd), &rendering_info);
        }
    }

    fn cmd_end_render_pass(&self, cmd: NativeCommandBuffer) {
        unsafe {
            self.ctx.device.cmd_end_rendering(Self::vk_cmd(cmd));
        }
    }

    fn cmd_bind_graphics_pipeline(&self, cmd: NativeCommandBuffer, pipeline: NativePipeline) {
        let mut state = self.state.lock().unwrap();
        if let Some(&(layout, _)) = state.pipeline_layouts.get(&pipeline.0) {
            state.bound_layouts.insert(cmd.0, layout);
        }
        drop(state);
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                Self::vk_cmd(cmd),
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.0),
            );
        }
    }

    fn cmd_bind_compute_pipeline(&self, cmd: NativeCommandBuffer, pipeline: NativePipeline) {
        let mut state = self.state.lock().unwrap();
        if let Some(&(layout, _)) = state.pipeline_layouts.get(&pipeline.0) {
            state.bound_layouts.insert(cmd.0, layout);
        }
        drop(state);
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                Self::vk_cmd(cmd),
                vk::PipelineBindPoint::COMPUTE,
                vk::Pipeline::from_raw(pipeline.0),
            );
        }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: NativeCommandBuffer,
        bind_point: PipelineBindPoint,
        first_set: u32,
        sets: &[NativeDescriptorSet],
        dynamic_offsets: &[u32],
    ) {
        let layout = match self.state.lock().unwrap().bound_layouts.get(&cmd.0) {
            Some(&layout) => layout,
            None => {
                engine_warn!(SOURCE, "bind_descriptor_sets with no bound pipeline layout");
                return;
            }
        };
        let vk_sets: Vec<vk::DescriptorSet> = sets
            .iter()
            .map(|set| vk::DescriptorSet::from_raw(set.0))
            .collect();
        let vk_bind_point = match bind_point {
            PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        };
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                Self::vk_cmd(cmd),
                vk_bind_point,
                layout,
                first_set,
                &vk_sets,
                dynamic_offsets,
            );
        }
    }

    fn cmd_bind_vertex_buffers(
        &self,
        cmd: NativeCommandBuffer,
        first_binding: u32,
        buffers: &[NativeBuffer],
        offsets: &[u64],
    ) {
        let vk_buffers: Vec<vk::Buffer> = buffers
            .iter()
            .map(|buffer| vk::Buffer::from_raw(buffer.0))
            .collect();
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(
                Self::vk_cmd(cmd),
                first_binding,
                &vk_buffers,
                offsets,
            );
        }
    }

    fn cmd_bind_index_buffer(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        index_type: IndexType,
    ) {
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(buffer.0),
                offset,
                index_type_to_vk(index_type),
            );
        }
    }

    fn cmd_push_constants(
        &self,
        cmd: NativeCommandBuffer,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        let layout = match self.state.lock().unwrap().bound_layouts.get(&cmd.0) {
            Some(&layout) => layout,
            None => {
                engine_warn!(SOURCE, "push_constants with no bound pipeline layout");
                return;
            }
        };
        unsafe {
            self.ctx.device.cmd_push_constants(
                Self::vk_cmd(cmd),
                layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
    }

    fn cmd_set_viewport(&self, cmd: NativeCommandBuffer, viewport: &Viewport) {
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.ctx
                .device
                .cmd_set_viewport(Self::vk_cmd(cmd), 0, &[vk_viewport]);
        }
    }

    fn cmd_set_scissor(&self, cmd: NativeCommandBuffer, scissor: &Rect2D) {
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D {
                x: scissor.x,
                y: scissor.y,
            },
            extent: vk::Extent2D {
                width: scissor.width,
                height: scissor.height,
            },
        };
        unsafe {
            self.ctx
                .device
                .cmd_set_scissor(Self::vk_cmd(cmd), 0, &[vk_scissor]);
        }
    }

    fn cmd_set_blend_constants(&self, cmd: NativeCommandBuffer, constants: [f32; 4]) {
        unsafe {
            self.ctx
                .device
                .cmd_set_blend_constants(Self::vk_cmd(cmd), &constants);
        }
    }

    fn cmd_set_stencil_compare_mask(
        &self,
        cmd: NativeCommandBuffer,
        faces: StencilFaces,
        mask: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_set_stencil_compare_mask(
                Self::vk_cmd(cmd),
                stencil_faces_to_vk(faces),
                mask,
            );
        }
    }

    fn cmd_set_stencil_reference(
        &self,
        cmd: NativeCommandBuffer,
        faces: StencilFaces,
        reference: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_set_stencil_reference(
                Self::vk_cmd(cmd),
                stencil_faces_to_vk(faces),
                reference,
            );
        }
    }

    fn cmd_set_stencil_write_mask(&self, cmd: NativeCommandBuffer, faces: StencilFaces, mask: u32) {
        unsafe {
            self.ctx.device.cmd_set_stencil_write_mask(
                Self::vk_cmd(cmd),
                stencil_faces_to_vk(faces),
                mask,
            );
        }
    }

    fn cmd_dispatch(&self, cmd: NativeCommandBuffer, groups_x: u32, groups_y: u32, groups_z: u32) {
        unsafe {
            self.ctx
                .device
                .cmd_dispatch(Self::vk_cmd(cmd), groups_x, groups_y, groups_z);
        }
    }

    fn cmd_dispatch_indirect(&self, cmd: NativeCommandBuffer, buffer: NativeBuffer, offset: u64) {
        unsafe {
            self.ctx.device.cmd_dispatch_indirect(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(buffer.0),
                offset,
            );
        }
    }

    fn cmd_draw(
        &self,
        cmd: NativeCommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_draw(
                Self::vk_cmd(cmd),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    fn cmd_draw_indexed(
        &self,
        cmd: NativeCommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                Self::vk_cmd(cmd),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    fn cmd_draw_indirect(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_draw_indirect(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(buffer.0),
                offset,
                draw_count,
                stride,
            );
        }
    }

    fn cmd_draw_indexed_indirect(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        unsafe {
            self.ctx.device.cmd_draw_indexed_indirect(
                Self::vk_cmd(cmd),
                vk::Buffer::from_raw(buffer.0),
                offset,
                draw_count,
                stride,
            );
        }
    }

    // ===== FRAME PRIMITIVES =====

    fn create_fence(&self, signaled: bool) -> Result<NativeFence> {
        unsafe {
            let flags = if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            };
            let info = vk::FenceCreateInfo::default().flags(flags);
            let fence = self
                .ctx
                .device
                .create_fence(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_fence"))?;
            Ok(NativeFence(fence.as_raw()))
        }
    }

    fn release_fence(&self, fence: NativeFence) {
        unsafe {
            self.ctx
                .device
                .destroy_fence(vk::Fence::from_raw(fence.0), None);
        }
    }

    fn wait_fence(&self, fence: NativeFence) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[vk::Fence::from_raw(fence.0)], true, u64::MAX / 2)
                .map_err(|e| vk_result_to_status(e, "wait_for_fences"))
        }
    }

    fn reset_fence(&self, fence: NativeFence) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[vk::Fence::from_raw(fence.0)])
                .map_err(|e| vk_result_to_status(e, "reset_fences"))
        }
    }

    fn create_semaphore(&self) -> Result<NativeSemaphore> {
        unsafe {
            let info = vk::SemaphoreCreateInfo::default();
            let semaphore = self
                .ctx
                .device
                .create_semaphore(&info, None)
                .map_err(|e| vk_result_to_status(e, "create_semaphore"))?;
            Ok(NativeSemaphore(semaphore.as_raw()))
        }
    }

    fn release_semaphore(&self, semaphore: NativeSemaphore) {
        unsafe {
            self.ctx
                .device
                .destroy_semaphore(vk::Semaphore::from_raw(semaphore.0), None);
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: NativeSwapchain,
        signal: NativeSemaphore,
    ) -> Result<AcquireOutcome> {
        let state = self.state.lock().unwrap();
        let bundle = state
            .swapchains
            .get(&swapchain.0)
            .ok_or_else(|| engine_err!(SOURCE, "Unknown swapchain {:#x}", swapchain.0))?;
        let result = unsafe {
            bundle.loader.acquire_next_image(
                bundle.vk_swapchain,
                u64::MAX,
                vk::Semaphore::from_raw(signal.0),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(vk_result_to_status(e, "acquire_next_image")),
        }
    }

    fn queue_submit(
        &self,
        cmd: NativeCommandBuffer,
        wait: Option<NativeSemaphore>,
        signal: Option<NativeSemaphore>,
        fence: NativeFence,
    ) -> Result<()> {
        let command_buffers = [Self::vk_cmd(cmd)];
        let wait_semaphores: Vec<vk::Semaphore> = wait
            .iter()
            .map(|semaphore| vk::Semaphore::from_raw(semaphore.0))
            .collect();
        let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<vk::Semaphore> = signal
            .iter()
            .map(|semaphore| vk::Semaphore::from_raw(semaphore.0))
            .collect();

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(
                    self.ctx.queue,
                    &[submit_info],
                    vk::Fence::from_raw(fence.0),
                )
                .map_err(|e| vk_result_to_status(e, "queue_submit"))
        }
    }

    fn present(
        &self,
        swapchain: NativeSwapchain,
        image_index: u32,
        wait: NativeSemaphore,
    ) -> Result<PresentOutcome> {
        let state = self.state.lock().unwrap();
        let bundle = state
            .swapchains
            .get(&swapchain.0)
            .ok_or_else(|| engine_err!(SOURCE, "Unknown swapchain {:#x}", swapchain.0))?;

        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let swapchains = [bundle.vk_swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { bundle.loader.queue_present(self.ctx.queue, &present_info) };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_result_to_status(e, "queue_present")),
        }
    }

    fn recreate_swapchain(&self, swapchain: NativeSwapchain) -> Result<SwapchainInfo> {
        // Build the replacement first so the old swapchain can be handed
        // over via old_swapchain, then destroy the old one
        let old_handle = {
            let state = self.state.lock().unwrap();
            let bundle = state
                .swapchains
                .get(&swapchain.0)
                .ok_or_else(|| engine_err!(SOURCE, "Unknown swapchain {:#x}", swapchain.0))?;
            bundle.vk_swapchain
        };

        let new_bundle = SwapchainBundle::create(
            &self.ctx,
            (0, 0), // the surface dictates the extent on recreation
            Some(old_handle),
        )?;
        let info = new_bundle.info();

        let mut state = self.state.lock().unwrap();
        if let Some(mut old) = state.swapchains.insert(swapchain.0, new_bundle) {
            old.destroy();
        }
        Ok(info)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| vk_result_to_status(e, "device_wait_idle"))
        }
    }
}

impl Drop for VulkanDriver {
    fn drop(&mut self) {
        unsafe {
            let _ = self.ctx.device.device_wait_idle();
        }
        let mut state = self.state.lock().unwrap();
        for (_, mut bundle) in state.swapchains.drain() {
            bundle.destroy();
        }
        unsafe {
            for pool in state.descriptor_pools.drain(..) {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
            for (_, (layout, _)) in state.pipeline_layouts.drain() {
                self.ctx.device.destroy_pipeline_layout(layout, None);
            }
        }
        let mut allocator = self.ctx.allocator.lock().unwrap();
        for (_, allocation) in state.buffer_allocations.drain() {
            allocator.free(allocation).ok();
        }
        for (_, allocation) in state.image_allocations.drain() {
            allocator.free(allocation).ok();
        }
    }
}
