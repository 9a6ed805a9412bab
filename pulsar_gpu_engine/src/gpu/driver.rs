/// Device driver facade
///
/// The capability object the core records against. A backend (Vulkan, or a
/// mock in tests) implements `DeviceDriver`; the core never touches a
/// native API directly and never keeps the driver in process-wide state —
/// it is passed explicitly into the ResourcePool, CommandRecorder and
/// FrameContext constructors.

use crate::error::Result;
use crate::gpu::barrier::{BufferBarrier, ImageBarrier};
use crate::gpu::buffer::{BufferCopy, BufferDesc, BufferViewDesc, IndexType};
use crate::gpu::descriptor::{DescriptorSetLayoutDesc, DescriptorType};
use crate::gpu::image::{
    BufferImageCopy, Filter, Format, ImageBlit, ImageCopy, ImageDesc, ImageResolve,
    ImageSubresourceRange, ImageViewDesc,
};
use crate::gpu::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, ShaderDesc, ShaderStages};
use crate::gpu::recorder::{Rect2D, Viewport};
use crate::gpu::render_pass::{ClearValue, FramebufferDesc, LoadOp, RenderPassDesc, StoreOp};
use crate::gpu::sampler::SamplerDesc;
use crate::gpu::image::ImageLayout;

// ===== NATIVE HANDLES =====

macro_rules! native_handle {
    ($(#[$doc:meta] $name:ident),* $(,)?) => {
        $(
            #[$doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            pub struct $name(pub u64);
        )*
    };
}

native_handle! {
    /// Native buffer handle
    NativeBuffer,
    /// Native buffer view handle
    NativeBufferView,
    /// Native image handle
    NativeImage,
    /// Native image view handle
    NativeImageView,
    /// Native sampler handle
    NativeSampler,
    /// Native shader module handle
    NativeShader,
    /// Native render pass handle
    NativeRenderPass,
    /// Native framebuffer handle
    NativeFramebuffer,
    /// Native descriptor set layout handle
    NativeDescriptorSetLayout,
    /// Native descriptor set handle
    NativeDescriptorSet,
    /// Native pipeline handle (compute or graphics)
    NativePipeline,
    /// Native command buffer handle
    NativeCommandBuffer,
    /// Native fence handle
    NativeFence,
    /// Native semaphore handle
    NativeSemaphore,
    /// Native swapchain handle
    NativeSwapchain,
}

// ===== SUPPORT TYPES =====

/// Pipeline binding point for descriptor set binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Stencil faces addressed by dynamic stencil state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFaces {
    Front,
    Back,
    FrontAndBack,
}

/// Resource reference resolved to native handles for a descriptor write
#[derive(Debug, Clone, Copy)]
pub enum NativeDescriptorResource {
    Buffer {
        buffer: NativeBuffer,
        offset: u64,
        size: u64,
    },
    TexelBuffer {
        view: NativeBufferView,
    },
    Image {
        view: NativeImageView,
        layout: ImageLayout,
    },
    CombinedImageSampler {
        view: NativeImageView,
        sampler: NativeSampler,
        layout: ImageLayout,
    },
    Sampler {
        sampler: NativeSampler,
    },
}

/// Descriptor set update resolved to native handles
#[derive(Debug, Clone)]
pub struct NativeDescriptorWrite {
    pub binding: u32,
    pub ty: DescriptorType,
    pub resources: Vec<NativeDescriptorResource>,
}

/// One attachment of a native begin-rendering call, with its synchronized
/// layout already decided by the two-pass synchronizer
#[derive(Debug, Clone, Copy)]
pub struct NativeRenderingAttachment {
    pub view: NativeImageView,
    pub layout: ImageLayout,
    pub resolve_view: Option<NativeImageView>,
    pub resolve_layout: ImageLayout,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Fully resolved begin-rendering parameters
#[derive(Debug, Clone)]
pub struct NativeRenderingInfo {
    pub render_area: Rect2D,
    pub num_layers: u32,
    pub color_attachments: Vec<NativeRenderingAttachment>,
    pub depth_attachment: Option<NativeRenderingAttachment>,
    pub stencil_attachment: Option<NativeRenderingAttachment>,
}

/// Result of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` flags a stale-but-usable swapchain
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain is out of date and must be recreated
    OutOfDate,
}

/// Result of a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Presented, but the swapchain no longer matches the surface optimally
    Suboptimal,
    /// The swapchain is out of date and must be recreated
    OutOfDate,
}

/// Properties of a (re)created swapchain
#[derive(Debug, Clone, Copy)]
pub struct SwapchainInfo {
    pub image_count: u32,
    pub width: u32,
    pub height: u32,
    pub format: Format,
}

// ===== FACADE TRAIT =====

/// Capability table of the underlying graphics device
///
/// Grouped exactly as the core consumes it: resource lifecycle, native
/// command emission, and frame primitives. Command emission is infallible —
/// recording errors on the modeled API surface later, at submit.
pub trait DeviceDriver: Send + Sync {
    // ----- Resource lifecycle -----

    fn create_buffer(&self, desc: &BufferDesc) -> Result<NativeBuffer>;
    fn create_buffer_view(&self, buffer: NativeBuffer, desc: &BufferViewDesc)
        -> Result<NativeBufferView>;
    fn create_image(&self, desc: &ImageDesc) -> Result<NativeImage>;
    fn create_image_view(&self, image: NativeImage, desc: &ImageViewDesc)
        -> Result<NativeImageView>;
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<NativeSampler>;
    fn create_shader(&self, desc: &ShaderDesc) -> Result<NativeShader>;
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<NativeRenderPass>;
    fn create_framebuffer(
        &self,
        render_pass: NativeRenderPass,
        attachments: &[NativeImageView],
        desc: &FramebufferDesc,
    ) -> Result<NativeFramebuffer>;
    fn create_descriptor_set_layout(
        &self,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<NativeDescriptorSetLayout>;
    fn create_descriptor_set(
        &self,
        layout: NativeDescriptorSetLayout,
    ) -> Result<NativeDescriptorSet>;
    fn update_descriptor_set(&self, set: NativeDescriptorSet, writes: &[NativeDescriptorWrite]);
    fn create_compute_pipeline(
        &self,
        shader: NativeShader,
        set_layouts: &[NativeDescriptorSetLayout],
        desc: &ComputePipelineDesc,
    ) -> Result<NativePipeline>;
    fn create_graphics_pipeline(
        &self,
        vertex_shader: NativeShader,
        fragment_shader: NativeShader,
        set_layouts: &[NativeDescriptorSetLayout],
        desc: &GraphicsPipelineDesc,
    ) -> Result<NativePipeline>;

    fn release_buffer(&self, buffer: NativeBuffer);
    fn release_buffer_view(&self, view: NativeBufferView);
    fn release_image(&self, image: NativeImage);
    fn release_image_view(&self, view: NativeImageView);
    fn release_sampler(&self, sampler: NativeSampler);
    fn release_shader(&self, shader: NativeShader);
    fn release_render_pass(&self, render_pass: NativeRenderPass);
    fn release_framebuffer(&self, framebuffer: NativeFramebuffer);
    fn release_descriptor_set_layout(&self, layout: NativeDescriptorSetLayout);
    fn release_descriptor_set(&self, set: NativeDescriptorSet);
    fn release_pipeline(&self, pipeline: NativePipeline);

    // ----- Command buffers -----

    fn create_command_buffer(&self) -> Result<NativeCommandBuffer>;
    fn release_command_buffer(&self, cmd: NativeCommandBuffer);
    fn begin_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()>;
    fn end_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()>;
    fn reset_command_buffer(&self, cmd: NativeCommandBuffer) -> Result<()>;

    // ----- Native command emission -----

    fn cmd_insert_barriers(
        &self,
        cmd: NativeCommandBuffer,
        buffers: &[BufferBarrier],
        images: &[ImageBarrier],
    );
    fn cmd_fill_buffer(
        &self,
        cmd: NativeCommandBuffer,
        dst: NativeBuffer,
        offset: u64,
        size: u64,
        data: u32,
    );
    fn cmd_copy_buffer(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeBuffer,
        dst: NativeBuffer,
        regions: &[BufferCopy],
    );
    fn cmd_update_buffer(
        &self,
        cmd: NativeCommandBuffer,
        dst: NativeBuffer,
        offset: u64,
        data: &[u8],
    );
    fn cmd_copy_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageCopy],
    );
    fn cmd_copy_buffer_to_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeBuffer,
        dst: NativeImage,
        regions: &[BufferImageCopy],
    );
    fn cmd_blit_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageBlit],
        filter: Filter,
    );
    fn cmd_resolve_image(
        &self,
        cmd: NativeCommandBuffer,
        src: NativeImage,
        dst: NativeImage,
        regions: &[ImageResolve],
    );
    fn cmd_clear_color_image(
        &self,
        cmd: NativeCommandBuffer,
        image: NativeImage,
        value: [f32; 4],
        ranges: &[ImageSubresourceRange],
    );
    fn cmd_clear_depth_stencil_image(
        &self,
        cmd: NativeCommandBuffer,
        image: NativeImage,
        depth: f32,
        stencil: u32,
        ranges: &[ImageSubresourceRange],
    );
    fn cmd_begin_render_pass(&self, cmd: NativeCommandBuffer, info: &NativeRenderingInfo);
    fn cmd_end_render_pass(&self, cmd: NativeCommandBuffer);
    fn cmd_bind_graphics_pipeline(&self, cmd: NativeCommandBuffer, pipeline: NativePipeline);
    fn cmd_bind_compute_pipeline(&self, cmd: NativeCommandBuffer, pipeline: NativePipeline);
    fn cmd_bind_descriptor_sets(
        &self,
        cmd: NativeCommandBuffer,
        bind_point: PipelineBindPoint,
        first_set: u32,
        sets: &[NativeDescriptorSet],
        dynamic_offsets: &[u32],
    );
    fn cmd_bind_vertex_buffers(
        &self,
        cmd: NativeCommandBuffer,
        first_binding: u32,
        buffers: &[NativeBuffer],
        offsets: &[u64],
    );
    fn cmd_bind_index_buffer(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        index_type: IndexType,
    );
    fn cmd_push_constants(
        &self,
        cmd: NativeCommandBuffer,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );
    fn cmd_set_viewport(&self, cmd: NativeCommandBuffer, viewport: &Viewport);
    fn cmd_set_scissor(&self, cmd: NativeCommandBuffer, scissor: &Rect2D);
    fn cmd_set_blend_constants(&self, cmd: NativeCommandBuffer, constants: [f32; 4]);
    fn cmd_set_stencil_compare_mask(&self, cmd: NativeCommandBuffer, faces: StencilFaces, mask: u32);
    fn cmd_set_stencil_reference(&self, cmd: NativeCommandBuffer, faces: StencilFaces, reference: u32);
    fn cmd_set_stencil_write_mask(&self, cmd: NativeCommandBuffer, faces: StencilFaces, mask: u32);
    fn cmd_dispatch(&self, cmd: NativeCommandBuffer, groups_x: u32, groups_y: u32, groups_z: u32);
    fn cmd_dispatch_indirect(&self, cmd: NativeCommandBuffer, buffer: NativeBuffer, offset: u64);
    fn cmd_draw(
        &self,
        cmd: NativeCommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
    fn cmd_draw_indexed(
        &self,
        cmd: NativeCommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn cmd_draw_indirect(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    );
    fn cmd_draw_indexed_indirect(
        &self,
        cmd: NativeCommandBuffer,
        buffer: NativeBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    );

    // ----- Frame primitives -----

    fn create_fence(&self, signaled: bool) -> Result<NativeFence>;
    fn release_fence(&self, fence: NativeFence);
    /// Block until the fence signals. The wait is effectively unbounded; a
    /// wait that never completes is a device-lost condition.
    fn wait_fence(&self, fence: NativeFence) -> Result<()>;
    fn reset_fence(&self, fence: NativeFence) -> Result<()>;
    fn create_semaphore(&self) -> Result<NativeSemaphore>;
    fn release_semaphore(&self, semaphore: NativeSemaphore);
    fn acquire_next_image(
        &self,
        swapchain: NativeSwapchain,
        signal: NativeSemaphore,
    ) -> Result<AcquireOutcome>;
    fn queue_submit(
        &self,
        cmd: NativeCommandBuffer,
        wait: Option<NativeSemaphore>,
        signal: Option<NativeSemaphore>,
        fence: NativeFence,
    ) -> Result<()>;
    fn present(
        &self,
        swapchain: NativeSwapchain,
        image_index: u32,
        wait: NativeSemaphore,
    ) -> Result<PresentOutcome>;
    fn recreate_swapchain(&self, swapchain: NativeSwapchain) -> Result<SwapchainInfo>;
    /// Block until the device is idle
    fn wait_idle(&self) -> Result<()>;
}
