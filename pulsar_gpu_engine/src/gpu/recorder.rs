/// Command recorder
///
/// The public command-buffer API. Every operation resolves logical handles
/// through the resource pool, validates its preconditions, requests
/// accesses through the access state tracker, batches the resulting
/// barriers, and only then records the native command.
///
/// Recording states: `Reset` → `Recording` → {`RenderPass` | `ComputePass`}
/// → `Recording` → `Ended`. Transfer commands and compute dispatches
/// synchronize eagerly; render passes buffer their commands and synchronize
/// in two passes at `end_rendering`, because mid-pass barriers are illegal
/// on the modeled API and the attachments' final layouts are only known
/// once the whole pass has been seen.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::engine_error;
use crate::engine_fatal;
use crate::error::{Result, Status};
use crate::gpu::access::{
    self, AccessFlags, BufferAccess, ImageAccess, PipelineStages,
};
use crate::gpu::arena::FrameArena;
use crate::gpu::barrier::{BarrierBatch, BufferBarrier, ImageBarrier};
use crate::gpu::buffer::{BufferCopy, BufferUsage, IndexType};
use crate::gpu::driver::{
    DeviceDriver, NativeCommandBuffer, NativeDescriptorSet, NativeRenderingAttachment,
    NativeRenderingInfo, PipelineBindPoint, StencilFaces,
};
use crate::gpu::handle::{
    BufferId, ComputePipelineId, DescriptorSetId, GraphicsPipelineId, ImageId, ImageViewId,
};
use crate::gpu::image::{
    BufferImageCopy, Filter, ImageAspects, ImageBlit, ImageCopy, ImageLayout, ImageResolve,
    ImageSubresourceRange, ImageUsage,
};
use crate::gpu::pipeline::ShaderStages;
use crate::gpu::pool::ResourcePool;
use crate::gpu::render_command::RenderCommand;
use crate::gpu::render_pass::{ClearValue, LoadOp, StoreOp};
use crate::gpu::validator;
use crate::gpu::{
    DYNAMIC_OFFSET_ALIGNMENT, MAX_COLOR_ATTACHMENTS, MAX_DESCRIPTOR_SETS, MAX_PUSH_CONSTANT_SIZE,
    MAX_UPDATE_BUFFER_SIZE, MAX_VERTEX_BUFFER_BINDINGS, TRANSFER_ALIGNMENT,
};

const SOURCE: &str = "pulsar::gpu::recorder";

/// Pipeline stages descriptor-bound resources are synchronized for inside
/// a render pass
const GRAPHICS_SHADER_STAGES: PipelineStages =
    PipelineStages::VERTEX_SHADER.union(PipelineStages::FRAGMENT_SHADER);

/// Byte size of one native indirect draw argument
const DRAW_INDIRECT_STRIDE: u64 = 16;
/// Byte size of one native indexed indirect draw argument
const DRAW_INDEXED_INDIRECT_STRIDE: u64 = 20;
/// Byte size of the native indirect dispatch argument
const DISPATCH_INDIRECT_SIZE: u64 = 12;

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One attachment of a `begin_rendering` call
#[derive(Debug, Clone)]
pub struct RenderingAttachment {
    /// Attachment view
    pub view: ImageViewId,
    /// Multisample resolve target, if any
    pub resolve: Option<ImageViewId>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear: ClearValue,
}

/// Parameters of a render pass opened with `begin_rendering`
#[derive(Debug, Clone)]
pub struct RenderingInfo {
    pub render_area: Rect2D,
    pub num_layers: u32,
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
    pub stencil_attachment: Option<RenderingAttachment>,
}

/// Recording state machine of a command recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Not recording; awaiting the frame's begin
    Reset,
    /// Recording, outside any pass
    Recording,
    /// Inside a `begin_rendering` scope
    RenderPass,
    /// Inside a `begin_compute_pass` scope
    ComputePass,
    /// Recording finished for this cycle
    Ended,
}

/// Records commands for one ring slot
pub struct CommandRecorder {
    driver: Arc<dyn DeviceDriver>,
    cmd: NativeCommandBuffer,
    state: RecordingState,
    /// Sticky status: once an arena allocation fails, every subsequent
    /// recording call is a silent no-op until the next begin
    status: Result<()>,
    barriers: BarrierBatch,

    // Per-frame transient arenas (reset at ring-slot reuse)
    commands: FrameArena<RenderCommand>,
    set_spans: FrameArena<DescriptorSetId>,
    buffer_spans: FrameArena<BufferId>,
    u32_spans: FrameArena<u32>,
    u64_spans: FrameArena<u64>,
    byte_spans: FrameArena<u8>,

    // Open render pass scratch
    rendering: Option<RenderingInfo>,
    pass_first_command: usize,
    pass_pipeline_bound: bool,
    pass_index_buffer_bound: bool,

    // Open compute pass scratch
    bound_compute_pipeline: Option<ComputePipelineId>,
    bound_compute_sets: [Option<DescriptorSetId>; MAX_DESCRIPTOR_SETS],
}

impl CommandRecorder {
    /// Create a recorder with a fresh native command buffer
    pub(crate) fn new(driver: Arc<dyn DeviceDriver>, arena_capacity: usize) -> Result<Self> {
        let cmd = driver.create_command_buffer()?;
        Ok(Self {
            driver,
            cmd,
            state: RecordingState::Reset,
            status: Ok(()),
            barriers: BarrierBatch::new(),
            commands: FrameArena::with_limit(arena_capacity),
            set_spans: FrameArena::with_limit(arena_capacity),
            buffer_spans: FrameArena::with_limit(arena_capacity),
            u32_spans: FrameArena::with_limit(arena_capacity),
            u64_spans: FrameArena::with_limit(arena_capacity),
            byte_spans: FrameArena::with_limit(arena_capacity),
            rendering: None,
            pass_first_command: 0,
            pass_pipeline_bound: false,
            pass_index_buffer_bound: false,
            bound_compute_pipeline: None,
            bound_compute_sets: [None; MAX_DESCRIPTOR_SETS],
        })
    }

    /// Current recording state
    pub fn recording_state(&self) -> RecordingState {
        self.state
    }

    /// Sticky recording status; `Err` after an arena exhaustion
    pub fn status(&self) -> &Result<()> {
        &self.status
    }

    pub(crate) fn native(&self) -> NativeCommandBuffer {
        self.cmd
    }

    /// Reset the recorder for a new frame and begin the native command
    /// buffer. Only called once the ring slot's fence has signaled.
    pub(crate) fn begin(&mut self) -> Result<()> {
        self.driver.reset_command_buffer(self.cmd)?;
        self.driver.begin_command_buffer(self.cmd)?;
        self.state = RecordingState::Recording;
        self.status = Ok(());
        self.commands.reset();
        self.set_spans.reset();
        self.buffer_spans.reset();
        self.u32_spans.reset();
        self.u64_spans.reset();
        self.byte_spans.reset();
        self.rendering = None;
        self.pass_first_command = 0;
        self.pass_pipeline_bound = false;
        self.pass_index_buffer_bound = false;
        self.bound_compute_pipeline = None;
        self.bound_compute_sets = [None; MAX_DESCRIPTOR_SETS];
        Ok(())
    }

    /// End the native command buffer, surfacing any sticky status
    pub(crate) fn end(&mut self) -> Result<()> {
        if let Err(status) = &self.status {
            let status = status.clone();
            self.state = RecordingState::Ended;
            return Err(status);
        }
        self.require_state(RecordingState::Recording, "end_command_buffer");
        self.driver.end_command_buffer(self.cmd)?;
        self.state = RecordingState::Ended;
        Ok(())
    }

    fn require_state(&self, expected: RecordingState, operation: &str) {
        if self.state != expected {
            engine_fatal!(
                SOURCE,
                "{} requires recording state {:?}, current state is {:?}",
                operation,
                expected,
                self.state
            );
        }
    }

    /// Record the sticky out-of-host-memory status on arena exhaustion
    fn arena_exhausted(&mut self, what: &str) {
        engine_error!(SOURCE, "per-frame arena exhausted while recording {}", what);
        self.status = Err(Status::OutOfHostMemory);
    }

    // ===== ACCESS SYNCHRONIZATION =====

    fn sync_buffer_access(&mut self, pool: &mut ResourcePool, id: BufferId, requested: BufferAccess) {
        let entry = pool.buffer_mut(id);
        let (transition, new_state) = access::sync_buffer(entry.state, requested);
        entry.state = new_state;
        if let Some(transition) = transition {
            self.barriers.push_buffer(BufferBarrier {
                buffer: entry.native,
                offset: 0,
                size: entry.desc.size,
                transition,
            });
        }
    }

    fn sync_image_access(&mut self, pool: &mut ResourcePool, id: ImageId, requested: ImageAccess) {
        let entry = pool.image_mut(id);
        let (transition, new_state) = access::sync_image(entry.state, requested);
        entry.state = new_state;
        if let Some(transition) = transition {
            self.barriers.push_image(ImageBarrier {
                image: entry.native,
                aspects: entry.desc.aspects,
                range: ImageSubresourceRange {
                    aspects: entry.desc.aspects,
                    base_mip_level: 0,
                    mip_level_count: entry.desc.mip_levels,
                    base_array_layer: 0,
                    array_layer_count: entry.desc.array_layers,
                },
                transition,
            });
        }
    }

    /// Synchronize every buffer and image bound in a descriptor set for
    /// shader access at the given pipeline stages
    fn sync_descriptor_set(
        &mut self,
        pool: &mut ResourcePool,
        set: DescriptorSetId,
        stages: PipelineStages,
    ) {
        let resources = pool.descriptor_set_resources(set);
        for (ty, resource) in resources {
            match resource {
                crate::gpu::descriptor::DescriptorResource::Buffer { buffer, .. } => {
                    self.sync_buffer_access(pool, buffer, access::descriptor_buffer_access(ty, stages));
                }
                crate::gpu::descriptor::DescriptorResource::TexelBuffer { view } => {
                    let buffer = pool.buffer_view(view).desc.buffer;
                    self.sync_buffer_access(pool, buffer, access::descriptor_buffer_access(ty, stages));
                }
                crate::gpu::descriptor::DescriptorResource::Image { view }
                | crate::gpu::descriptor::DescriptorResource::CombinedImageSampler {
                    view, ..
                } => {
                    let image = pool.image_view(view).desc.image;
                    self.sync_image_access(pool, image, access::descriptor_image_access(ty, stages));
                }
                crate::gpu::descriptor::DescriptorResource::Sampler { .. } => {}
            }
        }
    }

    /// Emit the batched barriers in one native call, if any
    fn flush_barriers(&mut self) {
        self.barriers.flush(self.driver.as_ref(), self.cmd);
    }

    // ===== TRANSFER COMMANDS =====
    //
    // Transfer commands validate, synchronize eagerly, then record. All are
    // illegal inside a render or compute pass.

    /// Fill a buffer range with a repeated 32-bit word
    pub fn fill_buffer(
        &mut self,
        pool: &mut ResourcePool,
        dst: BufferId,
        offset: u64,
        size: u64,
        data: u32,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "fill_buffer");
        {
            let entry = pool.buffer(dst);
            validator::check_buffer_usage(&entry.desc, BufferUsage::TRANSFER_DST, "fill_buffer destination");
            validator::check_nonzero(size, "fill_buffer size");
            validator::check_alignment(offset, TRANSFER_ALIGNMENT, "fill_buffer offset");
            validator::check_alignment(size, TRANSFER_ALIGNMENT, "fill_buffer size");
            validator::check_buffer_range(&entry.desc, offset, size, "fill_buffer range");
        }
        self.sync_buffer_access(pool, dst, BufferAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let native = pool.buffer(dst).native;
        self.driver.cmd_fill_buffer(self.cmd, native, offset, size, data);
    }

    /// Copy regions between two buffers
    pub fn copy_buffer(
        &mut self,
        pool: &mut ResourcePool,
        src: BufferId,
        dst: BufferId,
        regions: &[BufferCopy],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "copy_buffer");
        {
            let src_entry = pool.buffer(src);
            let dst_entry = pool.buffer(dst);
            validator::check_buffer_usage(&src_entry.desc, BufferUsage::TRANSFER_SRC, "copy_buffer source");
            validator::check_buffer_usage(&dst_entry.desc, BufferUsage::TRANSFER_DST, "copy_buffer destination");
            for region in regions {
                validator::check_buffer_range(&src_entry.desc, region.src_offset, region.size, "copy_buffer source range");
                validator::check_buffer_range(&dst_entry.desc, region.dst_offset, region.size, "copy_buffer destination range");
            }
        }
        self.sync_buffer_access(pool, src, BufferAccess::TRANSFER_READ);
        self.sync_buffer_access(pool, dst, BufferAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let src_native = pool.buffer(src).native;
        let dst_native = pool.buffer(dst).native;
        self.driver.cmd_copy_buffer(self.cmd, src_native, dst_native, regions);
    }

    /// Write inline data into a buffer
    pub fn update_buffer(
        &mut self,
        pool: &mut ResourcePool,
        dst: BufferId,
        offset: u64,
        data: &[u8],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "update_buffer");
        {
            let entry = pool.buffer(dst);
            validator::check_buffer_usage(&entry.desc, BufferUsage::TRANSFER_DST, "update_buffer destination");
            validator::check_nonzero(data.len() as u64, "update_buffer size");
            validator::check_count(data.len(), MAX_UPDATE_BUFFER_SIZE, "update_buffer byte");
            validator::check_alignment(offset, TRANSFER_ALIGNMENT, "update_buffer offset");
            validator::check_alignment(data.len() as u64, TRANSFER_ALIGNMENT, "update_buffer size");
            validator::check_buffer_range(&entry.desc, offset, data.len() as u64, "update_buffer range");
        }
        self.sync_buffer_access(pool, dst, BufferAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let native = pool.buffer(dst).native;
        self.driver.cmd_update_buffer(self.cmd, native, offset, data);
    }

    /// Copy regions between two images
    pub fn copy_image(
        &mut self,
        pool: &mut ResourcePool,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageCopy],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "copy_image");
        {
            let src_entry = pool.image(src);
            let dst_entry = pool.image(dst);
            validator::check_image_usage(&src_entry.desc, ImageUsage::TRANSFER_SRC, "copy_image source");
            validator::check_image_usage(&dst_entry.desc, ImageUsage::TRANSFER_DST, "copy_image destination");
            for region in regions {
                validator::check_subresource_layers(&src_entry.desc, &region.src_layers, "copy_image source layers");
                validator::check_subresource_layers(&dst_entry.desc, &region.dst_layers, "copy_image destination layers");
            }
        }
        self.sync_image_access(pool, src, ImageAccess::TRANSFER_READ);
        self.sync_image_access(pool, dst, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let src_native = pool.image(src).native;
        let dst_native = pool.image(dst).native;
        self.driver.cmd_copy_image(self.cmd, src_native, dst_native, regions);
    }

    /// Copy buffer contents into an image
    pub fn copy_buffer_to_image(
        &mut self,
        pool: &mut ResourcePool,
        src: BufferId,
        dst: ImageId,
        regions: &[BufferImageCopy],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "copy_buffer_to_image");
        {
            let src_entry = pool.buffer(src);
            let dst_entry = pool.image(dst);
            validator::check_buffer_usage(&src_entry.desc, BufferUsage::TRANSFER_SRC, "copy_buffer_to_image source");
            validator::check_image_usage(&dst_entry.desc, ImageUsage::TRANSFER_DST, "copy_buffer_to_image destination");
            for region in regions {
                validator::check_subresource_layers(&dst_entry.desc, &region.image_layers, "copy_buffer_to_image layers");
                validator::check_alignment(region.buffer_offset, TRANSFER_ALIGNMENT, "copy_buffer_to_image buffer offset");
            }
        }
        self.sync_buffer_access(pool, src, BufferAccess::TRANSFER_READ);
        self.sync_image_access(pool, dst, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let src_native = pool.buffer(src).native;
        let dst_native = pool.image(dst).native;
        self.driver.cmd_copy_buffer_to_image(self.cmd, src_native, dst_native, regions);
    }

    /// Scaled, filtered copy between two images
    pub fn blit_image(
        &mut self,
        pool: &mut ResourcePool,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageBlit],
        filter: Filter,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "blit_image");
        {
            let src_entry = pool.image(src);
            let dst_entry = pool.image(dst);
            validator::check_image_usage(&src_entry.desc, ImageUsage::TRANSFER_SRC, "blit_image source");
            validator::check_image_usage(&dst_entry.desc, ImageUsage::TRANSFER_DST, "blit_image destination");
            for region in regions {
                validator::check_subresource_layers(&src_entry.desc, &region.src_layers, "blit_image source layers");
                validator::check_subresource_layers(&dst_entry.desc, &region.dst_layers, "blit_image destination layers");
            }
        }
        self.sync_image_access(pool, src, ImageAccess::TRANSFER_READ);
        self.sync_image_access(pool, dst, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let src_native = pool.image(src).native;
        let dst_native = pool.image(dst).native;
        self.driver.cmd_blit_image(self.cmd, src_native, dst_native, regions, filter);
    }

    /// Resolve a multisampled image into a single-sampled one
    pub fn resolve_image(
        &mut self,
        pool: &mut ResourcePool,
        src: ImageId,
        dst: ImageId,
        regions: &[ImageResolve],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "resolve_image");
        {
            let src_entry = pool.image(src);
            let dst_entry = pool.image(dst);
            validator::check_image_usage(&src_entry.desc, ImageUsage::TRANSFER_SRC, "resolve_image source");
            validator::check_image_usage(&dst_entry.desc, ImageUsage::TRANSFER_DST, "resolve_image destination");
            for region in regions {
                validator::check_subresource_layers(&src_entry.desc, &region.src_layers, "resolve_image source layers");
                validator::check_subresource_layers(&dst_entry.desc, &region.dst_layers, "resolve_image destination layers");
            }
        }
        self.sync_image_access(pool, src, ImageAccess::TRANSFER_READ);
        self.sync_image_access(pool, dst, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let src_native = pool.image(src).native;
        let dst_native = pool.image(dst).native;
        self.driver.cmd_resolve_image(self.cmd, src_native, dst_native, regions);
    }

    /// Clear a color image's subresource ranges
    pub fn clear_color_image(
        &mut self,
        pool: &mut ResourcePool,
        image: ImageId,
        value: [f32; 4],
        ranges: &[ImageSubresourceRange],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "clear_color_image");
        {
            let entry = pool.image(image);
            validator::check_image_usage(&entry.desc, ImageUsage::TRANSFER_DST, "clear_color_image destination");
            for range in ranges {
                validator::check_subresource_range(&entry.desc, range, "clear_color_image range");
            }
        }
        self.sync_image_access(pool, image, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let native = pool.image(image).native;
        self.driver.cmd_clear_color_image(self.cmd, native, value, ranges);
    }

    /// Clear a depth/stencil image's subresource ranges
    pub fn clear_depth_stencil_image(
        &mut self,
        pool: &mut ResourcePool,
        image: ImageId,
        depth: f32,
        stencil: u32,
        ranges: &[ImageSubresourceRange],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "clear_depth_stencil_image");
        {
            let entry = pool.image(image);
            validator::check_image_usage(&entry.desc, ImageUsage::TRANSFER_DST, "clear_depth_stencil_image destination");
            for range in ranges {
                validator::check_subresource_range(&entry.desc, range, "clear_depth_stencil_image range");
            }
        }
        self.sync_image_access(pool, image, ImageAccess::TRANSFER_WRITE);
        self.flush_barriers();
        let native = pool.image(image).native;
        self.driver.cmd_clear_depth_stencil_image(self.cmd, native, depth, stencil, ranges);
    }

    // ===== RENDER PASS SCOPE =====

    /// Open a render pass over the given attachments.
    ///
    /// No barrier is emitted here: commands are buffered until
    /// `end_rendering`, which discovers every touched resource, issues one
    /// combined barrier batch, emits the native begin, and replays.
    pub fn begin_rendering(&mut self, pool: &ResourcePool, info: &RenderingInfo) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "begin_rendering");
        validator::check_count(
            info.color_attachments.len(),
            MAX_COLOR_ATTACHMENTS,
            "rendering color attachment",
        );
        validator::check_nonzero(info.render_area.width as u64, "render area width");
        validator::check_nonzero(info.render_area.height as u64, "render area height");
        validator::check_nonzero(info.num_layers as u64, "rendering layer count");
        for attachment in &info.color_attachments {
            self.check_attachment(pool, attachment, ImageAspects::COLOR, ImageUsage::COLOR_ATTACHMENT, "color attachment");
        }
        if let Some(attachment) = &info.depth_attachment {
            self.check_attachment(pool, attachment, ImageAspects::DEPTH, ImageUsage::DEPTH_STENCIL_ATTACHMENT, "depth attachment");
        }
        if let Some(attachment) = &info.stencil_attachment {
            self.check_attachment(pool, attachment, ImageAspects::STENCIL, ImageUsage::DEPTH_STENCIL_ATTACHMENT, "stencil attachment");
        }
        self.rendering = Some(info.clone());
        self.pass_first_command = self.commands.len();
        self.pass_pipeline_bound = false;
        self.pass_index_buffer_bound = false;
        self.state = RecordingState::RenderPass;
    }

    fn check_attachment(
        &self,
        pool: &ResourcePool,
        attachment: &RenderingAttachment,
        aspect: ImageAspects,
        usage: ImageUsage,
        role: &str,
    ) {
        let view = pool.image_view(attachment.view);
        if !view.desc.aspects.contains(aspect) {
            engine_fatal!(
                SOURCE,
                "{} view aspects {:?} do not include {:?}",
                role,
                view.desc.aspects,
                aspect
            );
        }
        validator::check_image_usage(&pool.image(view.desc.image).desc, usage, role);
        if let Some(resolve) = attachment.resolve {
            let resolve_view = pool.image_view(resolve);
            validator::check_image_usage(&pool.image(resolve_view.desc.image).desc, usage, role);
        }
    }

    /// Close the render pass: two-pass synchronization, then replay.
    ///
    /// Pass 1 walks the buffered commands and synchronizes every
    /// descriptor-set-bound resource plus vertex/index/indirect buffers.
    /// Pass 2 synchronizes the attachments into their final layouts. The
    /// combined batch is flushed in a single barrier insertion before the
    /// native begin; no barrier is emitted between begin and end.
    pub fn end_rendering(&mut self, pool: &mut ResourcePool) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "end_rendering");
        let info = match self.rendering.take() {
            Some(info) => info,
            None => engine_fatal!(SOURCE, "end_rendering without rendering info"),
        };

        // Pass 1: discover and synchronize every resource the buffered
        // commands read in shaders or fixed-function stages.
        let mut seen_sets: FxHashSet<DescriptorSetId> = FxHashSet::default();
        for index in self.pass_first_command..self.commands.len() {
            let command = self.commands.at(index);
            match command {
                RenderCommand::BindDescriptorSets { sets, .. } => {
                    let set_ids = self.set_spans.get(sets).to_vec();
                    for set in set_ids {
                        if seen_sets.insert(set) {
                            self.sync_descriptor_set(pool, set, GRAPHICS_SHADER_STAGES);
                        }
                    }
                }
                RenderCommand::BindVertexBuffers { buffers, .. } => {
                    let buffer_ids = self.buffer_spans.get(buffers).to_vec();
                    for buffer in buffer_ids {
                        self.sync_buffer_access(pool, buffer, BufferAccess::VERTEX_ATTRIBUTE_READ);
                    }
                }
                RenderCommand::BindIndexBuffer { buffer, .. } => {
                    self.sync_buffer_access(pool, buffer, BufferAccess::INDEX_READ);
                }
                RenderCommand::DrawIndirect { buffer, .. }
                | RenderCommand::DrawIndexedIndirect { buffer, .. } => {
                    self.sync_buffer_access(pool, buffer, BufferAccess::INDIRECT_READ);
                }
                _ => {}
            }
        }

        // Pass 2: attachments, in declaration order.
        let native_info = self.sync_attachments(pool, &info);

        self.flush_barriers();
        self.driver.cmd_begin_render_pass(self.cmd, &native_info);
        for index in self.pass_first_command..self.commands.len() {
            let command = self.commands.at(index);
            self.replay(pool, command);
        }
        self.driver.cmd_end_render_pass(self.cmd);

        self.pass_pipeline_bound = false;
        self.pass_index_buffer_bound = false;
        self.state = RecordingState::Recording;
    }

    /// Synchronize all attachments and build the native rendering info with
    /// their final layouts
    fn sync_attachments(
        &mut self,
        pool: &mut ResourcePool,
        info: &RenderingInfo,
    ) -> NativeRenderingInfo {
        let mut color_attachments = Vec::with_capacity(info.color_attachments.len());
        for attachment in &info.color_attachments {
            let mut access = AccessFlags::empty();
            if matches!(attachment.load_op, LoadOp::Clear | LoadOp::DontCare)
                || matches!(attachment.store_op, StoreOp::Store | StoreOp::DontCare)
            {
                access |= AccessFlags::COLOR_ATTACHMENT_WRITE;
            }
            if attachment.load_op == LoadOp::Load {
                access |= AccessFlags::COLOR_ATTACHMENT_READ;
            }
            if attachment.resolve.is_some() {
                // The resolve reads the attachment at the end of the pass
                access |= AccessFlags::COLOR_ATTACHMENT_READ;
            }
            let image = pool.image_view(attachment.view).desc.image;
            self.sync_image_access(
                pool,
                image,
                ImageAccess {
                    stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    access,
                    layout: ImageLayout::ColorAttachment,
                },
            );
            let resolve_view = attachment.resolve.map(|resolve| {
                let resolve_image = pool.image_view(resolve).desc.image;
                self.sync_image_access(
                    pool,
                    resolve_image,
                    ImageAccess {
                        stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                        access: AccessFlags::COLOR_ATTACHMENT_READ
                            | AccessFlags::COLOR_ATTACHMENT_WRITE,
                        layout: ImageLayout::ColorAttachment,
                    },
                );
                pool.image_view(resolve).native
            });
            color_attachments.push(NativeRenderingAttachment {
                view: pool.image_view(attachment.view).native,
                layout: ImageLayout::ColorAttachment,
                resolve_view,
                resolve_layout: ImageLayout::ColorAttachment,
                load_op: attachment.load_op,
                store_op: attachment.store_op,
                clear: attachment.clear,
            });
        }

        let depth_attachment = info
            .depth_attachment
            .as_ref()
            .map(|attachment| self.sync_depth_stencil_attachment(pool, attachment));
        let stencil_attachment = info
            .stencil_attachment
            .as_ref()
            .map(|attachment| self.sync_depth_stencil_attachment(pool, attachment));

        NativeRenderingInfo {
            render_area: info.render_area,
            num_layers: info.num_layers,
            color_attachments,
            depth_attachment,
            stencil_attachment,
        }
    }

    fn sync_depth_stencil_attachment(
        &mut self,
        pool: &mut ResourcePool,
        attachment: &RenderingAttachment,
    ) -> NativeRenderingAttachment {
        let mut access = AccessFlags::empty();
        if matches!(attachment.load_op, LoadOp::Clear | LoadOp::DontCare)
            || matches!(attachment.store_op, StoreOp::Store | StoreOp::DontCare)
        {
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        }
        if attachment.load_op == LoadOp::Load {
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
        }
        if attachment.resolve.is_some() {
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        }
        // Writes need the writable layout; a pure load can stay read-only
        let layout = if access::has_write_access(access) {
            ImageLayout::DepthStencilAttachment
        } else {
            ImageLayout::DepthStencilReadOnly
        };
        let image = pool.image_view(attachment.view).desc.image;
        self.sync_image_access(
            pool,
            image,
            ImageAccess {
                stages: PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
                access,
                layout,
            },
        );
        let resolve_view = attachment.resolve.map(|resolve| {
            let resolve_image = pool.image_view(resolve).desc.image;
            self.sync_image_access(
                pool,
                resolve_image,
                ImageAccess {
                    stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                        | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    layout: ImageLayout::DepthStencilAttachment,
                },
            );
            pool.image_view(resolve).native
        });
        NativeRenderingAttachment {
            view: pool.image_view(attachment.view).native,
            layout,
            resolve_view,
            resolve_layout: ImageLayout::DepthStencilAttachment,
            load_op: attachment.load_op,
            store_op: attachment.store_op,
            clear: attachment.clear,
        }
    }

    /// Emit one buffered command as its native call
    fn replay(&self, pool: &ResourcePool, command: RenderCommand) {
        match command {
            RenderCommand::BindPipeline { pipeline } => {
                let native = pool.graphics_pipeline(pipeline).native;
                self.driver.cmd_bind_graphics_pipeline(self.cmd, native);
            }
            RenderCommand::BindDescriptorSets {
                first_set,
                sets,
                dynamic_offsets,
            } => {
                let natives: Vec<NativeDescriptorSet> = self
                    .set_spans
                    .get(sets)
                    .iter()
                    .map(|&set| pool.descriptor_set(set).native)
                    .collect();
                self.driver.cmd_bind_descriptor_sets(
                    self.cmd,
                    PipelineBindPoint::Graphics,
                    first_set,
                    &natives,
                    self.u32_spans.get(dynamic_offsets),
                );
            }
            RenderCommand::BindVertexBuffers {
                first_binding,
                buffers,
                offsets,
            } => {
                let natives: Vec<_> = self
                    .buffer_spans
                    .get(buffers)
                    .iter()
                    .map(|&buffer| pool.buffer(buffer).native)
                    .collect();
                self.driver.cmd_bind_vertex_buffers(
                    self.cmd,
                    first_binding,
                    &natives,
                    self.u64_spans.get(offsets),
                );
            }
            RenderCommand::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => {
                let native = pool.buffer(buffer).native;
                self.driver.cmd_bind_index_buffer(self.cmd, native, offset, index_type);
            }
            RenderCommand::PushConstants {
                stages,
                offset,
                data,
            } => {
                self.driver.cmd_push_constants(
                    self.cmd,
                    stages,
                    offset,
                    self.byte_spans.get(data),
                );
            }
            RenderCommand::SetViewport { viewport } => {
                self.driver.cmd_set_viewport(self.cmd, &viewport);
            }
            RenderCommand::SetScissor { scissor } => {
                self.driver.cmd_set_scissor(self.cmd, &scissor);
            }
            RenderCommand::SetBlendConstants { constants } => {
                self.driver.cmd_set_blend_constants(self.cmd, constants);
            }
            RenderCommand::SetStencilCompareMask { faces, mask } => {
                self.driver.cmd_set_stencil_compare_mask(self.cmd, faces, mask);
            }
            RenderCommand::SetStencilReference { faces, reference } => {
                self.driver.cmd_set_stencil_reference(self.cmd, faces, reference);
            }
            RenderCommand::SetStencilWriteMask { faces, mask } => {
                self.driver.cmd_set_stencil_write_mask(self.cmd, faces, mask);
            }
            RenderCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                self.driver.cmd_draw(self.cmd, vertex_count, instance_count, first_vertex, first_instance);
            }
            RenderCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => {
                self.driver.cmd_draw_indexed(
                    self.cmd,
                    index_count,
                    instance_count,
                    first_index,
                    vertex_offset,
                    first_instance,
                );
            }
            RenderCommand::DrawIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => {
                let native = pool.buffer(buffer).native;
                self.driver.cmd_draw_indirect(self.cmd, native, offset, draw_count, stride);
            }
            RenderCommand::DrawIndexedIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => {
                let native = pool.buffer(buffer).native;
                self.driver.cmd_draw_indexed_indirect(self.cmd, native, offset, draw_count, stride);
            }
        }
    }

    fn push_command(&mut self, command: RenderCommand) {
        if self.commands.push(command).is_none() {
            self.arena_exhausted("render pass command");
        }
    }

    // ===== BIND COMMANDS =====

    /// Bind a graphics pipeline (render pass only; buffered)
    pub fn bind_graphics_pipeline(&mut self, pool: &ResourcePool, pipeline: GraphicsPipelineId) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "bind_graphics_pipeline");
        // Handle validation up front so the replay cannot fail
        let _ = pool.graphics_pipeline(pipeline);
        self.pass_pipeline_bound = true;
        self.push_command(RenderCommand::BindPipeline { pipeline });
    }

    /// Bind a compute pipeline (compute pass only; recorded immediately)
    pub fn bind_compute_pipeline(&mut self, pool: &ResourcePool, pipeline: ComputePipelineId) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::ComputePass, "bind_compute_pipeline");
        let native = pool.compute_pipeline(pipeline).native;
        self.bound_compute_pipeline = Some(pipeline);
        self.driver.cmd_bind_compute_pipeline(self.cmd, native);
    }

    /// Bind descriptor sets at consecutive set indices.
    ///
    /// Buffered inside a render pass; recorded immediately inside a compute
    /// pass. Illegal outside any pass.
    pub fn bind_descriptor_sets(
        &mut self,
        pool: &ResourcePool,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) {
        if self.status.is_err() {
            return;
        }
        validator::check_count(
            first_set as usize + sets.len(),
            MAX_DESCRIPTOR_SETS,
            "descriptor set binding",
        );
        for &offset in dynamic_offsets {
            validator::check_alignment(
                offset as u64,
                DYNAMIC_OFFSET_ALIGNMENT,
                "dynamic descriptor offset",
            );
        }
        for &set in sets {
            let _ = pool.descriptor_set(set);
        }
        match self.state {
            RecordingState::RenderPass => {
                // The native bind resolves through the bound pipeline's layout
                self.require_pass_pipeline("bind_descriptor_sets");
                let (Some(set_span), Some(offset_span)) = (
                    self.set_spans.alloc(sets),
                    self.u32_spans.alloc(dynamic_offsets),
                ) else {
                    self.arena_exhausted("descriptor set binding");
                    return;
                };
                self.push_command(RenderCommand::BindDescriptorSets {
                    first_set,
                    sets: set_span,
                    dynamic_offsets: offset_span,
                });
            }
            RecordingState::ComputePass => {
                if self.bound_compute_pipeline.is_none() {
                    engine_fatal!(SOURCE, "bind_descriptor_sets without a bound compute pipeline");
                }
                for (i, &set) in sets.iter().enumerate() {
                    self.bound_compute_sets[first_set as usize + i] = Some(set);
                }
                let natives: Vec<NativeDescriptorSet> =
                    sets.iter().map(|&set| pool.descriptor_set(set).native).collect();
                self.driver.cmd_bind_descriptor_sets(
                    self.cmd,
                    PipelineBindPoint::Compute,
                    first_set,
                    &natives,
                    dynamic_offsets,
                );
            }
            _ => engine_fatal!(
                SOURCE,
                "bind_descriptor_sets requires an active render or compute pass, current state is {:?}",
                self.state
            ),
        }
    }

    /// Bind vertex buffers at consecutive binding slots (render pass only)
    pub fn bind_vertex_buffers(
        &mut self,
        pool: &ResourcePool,
        first_binding: u32,
        buffers: &[BufferId],
        offsets: &[u64],
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "bind_vertex_buffers");
        if buffers.len() != offsets.len() {
            engine_fatal!(
                SOURCE,
                "bind_vertex_buffers: {} buffers but {} offsets",
                buffers.len(),
                offsets.len()
            );
        }
        validator::check_count(
            first_binding as usize + buffers.len(),
            MAX_VERTEX_BUFFER_BINDINGS,
            "vertex buffer binding",
        );
        for (&buffer, &offset) in buffers.iter().zip(offsets) {
            let entry = pool.buffer(buffer);
            validator::check_buffer_usage(&entry.desc, BufferUsage::VERTEX, "vertex buffer");
            validator::check_buffer_range(&entry.desc, offset, 0, "vertex buffer offset");
        }
        let (Some(buffer_span), Some(offset_span)) =
            (self.buffer_spans.alloc(buffers), self.u64_spans.alloc(offsets))
        else {
            self.arena_exhausted("vertex buffer binding");
            return;
        };
        self.push_command(RenderCommand::BindVertexBuffers {
            first_binding,
            buffers: buffer_span,
            offsets: offset_span,
        });
    }

    /// Bind an index buffer (render pass only)
    pub fn bind_index_buffer(
        &mut self,
        pool: &ResourcePool,
        buffer: BufferId,
        offset: u64,
        index_type: IndexType,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "bind_index_buffer");
        {
            let entry = pool.buffer(buffer);
            validator::check_buffer_usage(&entry.desc, BufferUsage::INDEX, "index buffer");
            validator::check_alignment(offset, index_type.size_bytes(), "index buffer offset");
            validator::check_buffer_range(&entry.desc, offset, 0, "index buffer offset");
        }
        self.pass_index_buffer_bound = true;
        self.push_command(RenderCommand::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        });
    }

    /// Push constant data into the bound pipeline's push range.
    ///
    /// Buffered inside a render pass; recorded immediately inside a compute
    /// pass. Illegal outside any pass.
    pub fn push_constants(&mut self, stages: ShaderStages, offset: u32, data: &[u8]) {
        if self.status.is_err() {
            return;
        }
        validator::check_nonzero(data.len() as u64, "push constant size");
        validator::check_alignment(offset as u64, 4, "push constant offset");
        validator::check_alignment(data.len() as u64, 4, "push constant size");
        validator::check_count(
            offset as usize + data.len(),
            MAX_PUSH_CONSTANT_SIZE,
            "push constant byte",
        );
        match self.state {
            RecordingState::RenderPass => {
                // The native push resolves through the bound pipeline's layout
                self.require_pass_pipeline("push_constants");
                let Some(span) = self.byte_spans.alloc(data) else {
                    self.arena_exhausted("push constants");
                    return;
                };
                self.push_command(RenderCommand::PushConstants {
                    stages,
                    offset,
                    data: span,
                });
            }
            RecordingState::ComputePass => {
                if self.bound_compute_pipeline.is_none() {
                    engine_fatal!(SOURCE, "push_constants without a bound compute pipeline");
                }
                self.driver.cmd_push_constants(self.cmd, stages, offset, data);
            }
            _ => engine_fatal!(
                SOURCE,
                "push_constants requires an active render or compute pass, current state is {:?}",
                self.state
            ),
        }
    }

    // ===== DYNAMIC STATE (render pass only; buffered) =====

    /// Set the viewport
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_viewport");
        self.push_command(RenderCommand::SetViewport { viewport });
    }

    /// Set the scissor rectangle
    pub fn set_scissor(&mut self, scissor: Rect2D) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_scissor");
        self.push_command(RenderCommand::SetScissor { scissor });
    }

    /// Set the blend constants
    pub fn set_blend_constants(&mut self, constants: [f32; 4]) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_blend_constants");
        self.push_command(RenderCommand::SetBlendConstants { constants });
    }

    /// Set the stencil compare mask
    pub fn set_stencil_compare_mask(&mut self, faces: StencilFaces, mask: u32) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_stencil_compare_mask");
        self.push_command(RenderCommand::SetStencilCompareMask { faces, mask });
    }

    /// Set the stencil reference value
    pub fn set_stencil_reference(&mut self, faces: StencilFaces, reference: u32) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_stencil_reference");
        self.push_command(RenderCommand::SetStencilReference { faces, reference });
    }

    /// Set the stencil write mask
    pub fn set_stencil_write_mask(&mut self, faces: StencilFaces, mask: u32) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "set_stencil_write_mask");
        self.push_command(RenderCommand::SetStencilWriteMask { faces, mask });
    }

    // ===== DRAW COMMANDS (render pass only; buffered) =====

    /// Draw non-indexed vertices
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "draw");
        self.require_pass_pipeline("draw");
        self.push_command(RenderCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    /// Draw indexed vertices
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "draw_indexed");
        self.require_pass_pipeline("draw_indexed");
        if !self.pass_index_buffer_bound {
            engine_fatal!(SOURCE, "draw_indexed without a bound index buffer");
        }
        self.push_command(RenderCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    /// Draw with arguments fetched from a buffer
    pub fn draw_indirect(
        &mut self,
        pool: &ResourcePool,
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "draw_indirect");
        self.require_pass_pipeline("draw_indirect");
        self.check_indirect_args(pool, buffer, offset, draw_count, stride, DRAW_INDIRECT_STRIDE, "draw_indirect");
        self.push_command(RenderCommand::DrawIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    /// Draw indexed with arguments fetched from a buffer
    pub fn draw_indexed_indirect(
        &mut self,
        pool: &ResourcePool,
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::RenderPass, "draw_indexed_indirect");
        self.require_pass_pipeline("draw_indexed_indirect");
        if !self.pass_index_buffer_bound {
            engine_fatal!(SOURCE, "draw_indexed_indirect without a bound index buffer");
        }
        self.check_indirect_args(
            pool,
            buffer,
            offset,
            draw_count,
            stride,
            DRAW_INDEXED_INDIRECT_STRIDE,
            "draw_indexed_indirect",
        );
        self.push_command(RenderCommand::DrawIndexedIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    fn require_pass_pipeline(&self, operation: &str) {
        if !self.pass_pipeline_bound {
            engine_fatal!(SOURCE, "{} without a bound graphics pipeline", operation);
        }
    }

    fn check_indirect_args(
        &self,
        pool: &ResourcePool,
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
        argument_size: u64,
        role: &str,
    ) {
        let entry = pool.buffer(buffer);
        validator::check_buffer_usage(&entry.desc, BufferUsage::INDIRECT, role);
        validator::check_alignment(offset, TRANSFER_ALIGNMENT, "indirect argument offset");
        validator::check_alignment(stride as u64, TRANSFER_ALIGNMENT, "indirect argument stride");
        if draw_count > 0 {
            if (stride as u64) < argument_size {
                engine_fatal!(
                    SOURCE,
                    "{}: stride {} smaller than argument size {}",
                    role,
                    stride,
                    argument_size
                );
            }
            let span = (draw_count as u64 - 1) * stride as u64 + argument_size;
            validator::check_buffer_range(&entry.desc, offset, span, "indirect argument range");
        }
    }

    // ===== COMPUTE PASS SCOPE =====

    /// Open a compute pass
    pub fn begin_compute_pass(&mut self) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::Recording, "begin_compute_pass");
        self.bound_compute_pipeline = None;
        self.bound_compute_sets = [None; MAX_DESCRIPTOR_SETS];
        self.state = RecordingState::ComputePass;
    }

    /// Close the compute pass and invalidate its bound state
    pub fn end_compute_pass(&mut self) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::ComputePass, "end_compute_pass");
        self.bound_compute_pipeline = None;
        self.bound_compute_sets = [None; MAX_DESCRIPTOR_SETS];
        self.state = RecordingState::Recording;
    }

    /// Dispatch compute work.
    ///
    /// Unlike draws, dispatches synchronize eagerly: every resource bound
    /// in the active descriptor sets is barriered for compute-shader access
    /// immediately before the native dispatch. Successive dispatches over
    /// the same storage resources therefore barrier between each other.
    pub fn dispatch(&mut self, pool: &mut ResourcePool, groups_x: u32, groups_y: u32, groups_z: u32) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::ComputePass, "dispatch");
        if self.bound_compute_pipeline.is_none() {
            engine_fatal!(SOURCE, "dispatch without a bound compute pipeline");
        }
        self.sync_compute_bindings(pool);
        self.flush_barriers();
        self.driver.cmd_dispatch(self.cmd, groups_x, groups_y, groups_z);
    }

    /// Dispatch compute work with arguments fetched from a buffer
    pub fn dispatch_indirect(&mut self, pool: &mut ResourcePool, buffer: BufferId, offset: u64) {
        if self.status.is_err() {
            return;
        }
        self.require_state(RecordingState::ComputePass, "dispatch_indirect");
        if self.bound_compute_pipeline.is_none() {
            engine_fatal!(SOURCE, "dispatch_indirect without a bound compute pipeline");
        }
        {
            let entry = pool.buffer(buffer);
            validator::check_buffer_usage(&entry.desc, BufferUsage::INDIRECT, "dispatch_indirect");
            validator::check_alignment(offset, TRANSFER_ALIGNMENT, "indirect argument offset");
            validator::check_buffer_range(&entry.desc, offset, DISPATCH_INDIRECT_SIZE, "indirect argument range");
        }
        self.sync_compute_bindings(pool);
        self.sync_buffer_access(pool, buffer, BufferAccess::INDIRECT_READ);
        self.flush_barriers();
        let native = pool.buffer(buffer).native;
        self.driver.cmd_dispatch_indirect(self.cmd, native, offset);
    }

    fn sync_compute_bindings(&mut self, pool: &mut ResourcePool) {
        for slot in 0..self.bound_compute_sets.len() {
            if let Some(set) = self.bound_compute_sets[slot] {
                self.sync_descriptor_set(pool, set, PipelineStages::COMPUTE_SHADER);
            }
        }
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        self.driver.release_command_buffer(self.cmd);
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
