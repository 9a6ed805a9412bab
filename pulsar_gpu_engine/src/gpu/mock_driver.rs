/// Mock device driver for unit tests (no GPU required)
///
/// Records one call-name string per facade call so tests can assert on
/// command ordering, hands out sequential native handles, and exposes
/// manually-triggered fences so tests can exercise the frame ring's
/// fence gating. Barrier insertions are additionally captured in full for
/// assertions on batch contents and ordering.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

use rustc_hash::FxHashMap;

use crate::error::{Result, Status};
use crate::gpu::barrier::{BufferBarrier, ImageBarrier};
use crate::gpu::buffer::{BufferCopy, BufferDesc, BufferViewDesc, IndexType};
use crate::gpu::descriptor::DescriptorSetLayoutDesc;
use crate::gpu::driver::*;
use crate::gpu::image::{
    BufferImageCopy, Filter, Format, ImageBlit, ImageCopy, ImageDesc, ImageResolve,
    ImageSubresourceRange, ImageViewDesc,
};
use crate::gpu::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, ShaderDesc, ShaderStages};
use crate::gpu::recorder::{Rect2D, Viewport};
use crate::gpu::render_pass::{FramebufferDesc, RenderPassDesc};
use crate::gpu::sampler::SamplerDesc;

/// Call-recording mock of the device driver facade
pub struct MockDriver {
    calls: Mutex<Vec<String>>,
    next_handle: AtomicU64,
    fences: Mutex<FxHashMap<u64, bool>>,
    fence_signaled: Condvar,
    /// When set (the default), `queue_submit` signals its fence
    /// immediately, as if the GPU completed the work instantly
    auto_signal_submits: AtomicBool,
    fail_next_creation: AtomicBool,
    acquire_counter: AtomicU64,
    suboptimal_acquire: AtomicBool,
    out_of_date_acquire: AtomicBool,
    present_outcomes: Mutex<VecDeque<PresentOutcome>>,
    barrier_batches: Mutex<Vec<(Vec<BufferBarrier>, Vec<ImageBarrier>)>>,
    image_count: u32,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            fences: Mutex::new(FxHashMap::default()),
            fence_signaled: Condvar::new(),
            auto_signal_submits: AtomicBool::new(true),
            fail_next_creation: AtomicBool::new(false),
            acquire_counter: AtomicU64::new(0),
            suboptimal_acquire: AtomicBool::new(false),
            out_of_date_acquire: AtomicBool::new(false),
            present_outcomes: Mutex::new(VecDeque::new()),
            barrier_batches: Mutex::new(Vec::new()),
            image_count: 3,
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn check_creation_failure(&self) -> Result<()> {
        if self.fail_next_creation.swap(false, Ordering::Relaxed) {
            return Err(Status::OutOfDeviceMemory);
        }
        Ok(())
    }

    // ----- Test controls -----

    /// All recorded call names, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls with the given name
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    /// Forget all recorded calls and barrier batches
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.barrier_batches.lock().unwrap().clear();
    }

    /// Every `cmd_insert_barriers` batch, in call order
    pub fn barrier_batches(&self) -> Vec<(Vec<BufferBarrier>, Vec<ImageBarrier>)> {
        self.barrier_batches.lock().unwrap().clone()
    }

    /// Disable (or re-enable) instant fence signaling at submit
    pub fn set_auto_signal_submits(&self, enabled: bool) {
        self.auto_signal_submits.store(enabled, Ordering::Relaxed);
    }

    /// Signal a fence, waking any blocked `wait_fence`
    pub fn trigger_fence(&self, fence: NativeFence) {
        let mut fences = self.fences.lock().unwrap();
        fences.insert(fence.0, true);
        self.fence_signaled.notify_all();
    }

    /// Whether a fence is currently signaled
    pub fn fence_signaled(&self, fence: NativeFence) -> bool {
        *self.fences.lock().unwrap().get(&fence.0).unwrap_or(&false)
    }

    /// Every live fence, in no particular order
    pub fn live_fences(&self) -> Vec<NativeFence> {
        self.fences.lock().unwrap().keys().map(|&f| NativeFence(f)).collect()
    }

    /// Make the next resource creation fail with OutOfDeviceMemory
    pub fn fail_next_creation(&self) {
        self.fail_next_creation.store(true, Ordering::Relaxed);
    }

    /// Make subsequent acquisitions report a suboptimal swapchain
    pub fn set_suboptimal_acquire(&self, suboptimal: bool) {
        self.suboptimal_acquire.store(suboptimal, Ordering::Relaxed);
    }

    /// Make the next acquisition report an out-of-date swapchain
    pub fn set_out_of_date_acquire(&self) {
        self.out_of_date_acquire.store(true, Ordering::Relaxed);
    }

    /// Queue the outcome of the next present
    pub fn queue_present_outcome(&self, outcome: PresentOutcome) {
        self.present_outcomes.lock().unwrap().push_back(outcome);
    }

    /// A swapchain handle + info pair for tests
    pub fn test_swapchain_info(&self) -> SwapchainInfo {
        SwapchainInfo {
            image_count: self.image_count,
            width: 800,
            height: 600,
            format: Format::B8G8R8A8_UNORM,
        }
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDriver for MockDriver {
    // ----- Resource lifecycle -----

    fn create_buffer(&self, _desc: &BufferDesc) -> Result<NativeBuffer> {
        self.record("create_buffer");
        self.check_creation_failure()?;
        Ok(NativeBuffer(self.next()))
    }

    fn create_buffer_view(
        &self,
        _buffer: NativeBuffer,
        _desc: &BufferViewDesc,
    ) -> Result<NativeBufferView> {
        self.record("create_buffer_view");
        self.check_creation_failure()?;
        Ok(NativeBufferView(self.next()))
    }

    fn create_image(&self, _desc: &ImageDesc) -> Result<NativeImage> {
        self.record("create_image");
        self.check_creation_failure()?;
        Ok(NativeImage(self.next()))
    }

    fn create_image_view(
        &self,
        _image: NativeImage,
        _desc: &ImageViewDesc,
    ) -> Result<NativeImageView> {
        self.record("create_image_view");
        self.check_creation_failure()?;
        Ok(NativeImageView(self.next()))
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Result<NativeSampler> {
        self.record("create_sampler");
        self.check_creation_failure()?;
        Ok(NativeSampler(self.next()))
    }

    fn create_shader(&self, _desc: &ShaderDesc) -> Result<NativeShader> {
        self.record("create_shader");
        self.check_creation_failure()?;
        Ok(NativeShader(self.next()))
    }

    fn create_render_pass(&self, _desc: &RenderPassDesc) -> Result<NativeRenderPass> {
        self.record("create_render_pass");
        self.check_creation_failure()?;
        Ok(NativeRenderPass(self.next()))
    }

    fn create_framebuffer(
        &self,
        _render_pass: NativeRenderPass,
        _attachments: &[NativeImageView],
        _desc: &FramebufferDesc,
    ) -> Result<NativeFramebuffer> {
        self.record("create_framebuffer");
        self.check_creation_failure()?;
        Ok(NativeFramebuffer(self.next()))
    }

    fn create_descriptor_set_layout(
        &self,
        _desc: &DescriptorSetLayoutDesc,
    ) -> Result<NativeDescriptorSetLayout> {
        self.record("create_descriptor_set_layout");
        self.check_creation_failure()?;
        Ok(NativeDescriptorSetLayout(self.next()))
    }

    fn create_descriptor_set(
        &self,
        _layout: NativeDescriptorSetLayout,
    ) -> Result<NativeDescriptorSet> {
        self.record("create_descriptor_set");
        self.check_creation_failure()?;
        Ok(NativeDescriptorSet(self.next()))
    }

    fn update_descriptor_set(&self, _set: NativeDescriptorSet, _writes: &[NativeDescriptorWrite]) {
        self.record("update_descriptor_set");
    }

    fn create_compute_pipeline(
        &self,
        _shader: NativeShader,
        _set_layouts: &[NativeDescriptorSetLayout],
        _desc: &ComputePipelineDesc,
    ) -> Result<NativePipeline> {
        self.record("create_compute_pipeline");
        self.check_creation_failure()?;
        Ok(NativePipeline(self.next()))
    }

    fn create_graphics_pipeline(
        &self,
        _vertex_shader: NativeShader,
        _fragment_shader: NativeShader,
        _set_layouts: &[NativeDescriptorSetLayout],
        _desc: &GraphicsPipelineDesc,
    ) -> Result<NativePipeline> {
        self.record("create_graphics_pipeline");
        self.check_creation_failure()?;
        Ok(NativePipeline(self.next()))
    }

    fn release_buffer(&self, _buffer: NativeBuffer) {
        self.record("release_buffer");
    }

    fn release_buffer_view(&self, _view: NativeBufferView) {
        self.record("release_buffer_view");
    }

    fn release_image(&self, _image: NativeImage) {
        self.record("release_image");
    }

    fn release_image_view(&self, _view: NativeImageView) {
        self.record("release_image_view");
    }

    fn release_sampler(&self, _sampler: NativeSampler) {
        self.record("release_sampler");
    }

    fn release_shader(&self, _shader: NativeShader) {
        self.record("release_shader");
    }

    fn release_render_pass(&self, _render_pass: NativeRenderPass) {
        self.record("release_render_pass");
    }

    fn release_framebuffer(&self, _framebuffer: NativeFramebuffer) {
        self.record("release_framebuffer");
    }

    fn release_descriptor_set_layout(&self, _layout: NativeDescriptorSetLayout) {
        self.record("release_descriptor_set_layout");
    }

    fn release_descriptor_set(&self, _set: NativeDescriptorSet) {
        self.record("release_descriptor_set");
    }

    fn release_pipeline(&self, _pipeline: NativePipeline) {
        self.record("release_pipeline");
    }

    // ----- Command buffers -----

    fn create_command_buffer(&self) -> Result<NativeCommandBuffer> {
        self.record("create_command_buffer");
        self.check_creation_failure()?;
        Ok(NativeCommandBuffer(self.next()))
    }

    fn release_command_buffer(&self, _cmd: NativeCommandBuffer) {
        self.record("release_command_buffer");
    }

    fn begin_command_buffer(&self, _cmd: NativeCommandBuffer) -> Result<()> {
        self.record("begin_command_buffer");
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: NativeCommandBuffer) -> Result<()> {
        self.record("end_command_buffer");
        Ok(())
    }

    fn reset_command_buffer(&self, _cmd: NativeCommandBuffer) -> Result<()> {
        self.record("reset_command_buffer");
        Ok(())
    }

    // ----- Native command emission -----

    fn cmd_insert_barriers(
        &self,
        _cmd: NativeCommandBuffer,
        buffers: &[BufferBarrier],
        images: &[ImageBarrier],
    ) {
        self.record("cmd_insert_barriers");
        self.barrier_batches
            .lock()
            .unwrap()
            .push((buffers.to_vec(), images.to_vec()));
    }

    fn cmd_fill_buffer(
        &self,
        _cmd: NativeCommandBuffer,
        _dst: NativeBuffer,
        _offset: u64,
        _size: u64,
        _data: u32,
    ) {
        self.record("cmd_fill_buffer");
    }

    fn cmd_copy_buffer(
        &self,
        _cmd: NativeCommandBuffer,
        _src: NativeBuffer,
        _dst: NativeBuffer,
        _regions: &[BufferCopy],
    ) {
        self.record("cmd_copy_buffer");
    }

    fn cmd_update_buffer(
        &self,
        _cmd: NativeCommandBuffer,
        _dst: NativeBuffer,
        _offset: u64,
        _data: &[u8],
    ) {
        self.record("cmd_update_buffer");
    }

    fn cmd_copy_image(
        &self,
        _cmd: NativeCommandBuffer,
        _src: NativeImage,
        _dst: NativeImage,
        _regions: &[ImageCopy],
    ) {
        self.record("cmd_copy_image");
    }

    fn cmd_copy_buffer_to_image(
        &self,
        _cmd: NativeCommandBuffer,
        _src: NativeBuffer,
        _dst: NativeImage,
        _regions: &[BufferImageCopy],
    ) {
        self.record("cmd_copy_buffer_to_image");
    }

    fn cmd_blit_image(
        &self,
        _cmd: NativeCommandBuffer,
        _src: NativeImage,
        _dst: NativeImage,
        _regions: &[ImageBlit],
        _filter: Filter,
    ) {
        self.record("cmd_blit_image");
    }

    fn cmd_resolve_image(
        &self,
        _cmd: NativeCommandBuffer,
        _src: NativeImage,
        _dst: NativeImage,
        _regions: &[ImageResolve],
    ) {
        self.record("cmd_resolve_image");
    }

    fn cmd_clear_color_image(
        &self,
        _cmd: NativeCommandBuffer,
        _image: NativeImage,
        _value: [f32; 4],
        _ranges: &[ImageSubresourceRange],
    ) {
        self.record("cmd_clear_color_image");
    }

    fn cmd_clear_depth_stencil_image(
        &self,
        _cmd: NativeCommandBuffer,
        _image: NativeImage,
        _depth: f32,
        _stencil: u32,
        _ranges: &[ImageSubresourceRange],
    ) {
        self.record("cmd_clear_depth_stencil_image");
    }

    fn cmd_begin_render_pass(&self, _cmd: NativeCommandBuffer, _info: &NativeRenderingInfo) {
        self.record("cmd_begin_render_pass");
    }

    fn cmd_end_render_pass(&self, _cmd: NativeCommandBuffer) {
        self.record("cmd_end_render_pass");
    }

    fn cmd_bind_graphics_pipeline(&self, _cmd: NativeCommandBuffer, _pipeline: NativePipeline) {
        self.record("cmd_bind_graphics_pipeline");
    }

    fn cmd_bind_compute_pipeline(&self, _cmd: NativeCommandBuffer, _pipeline: NativePipeline) {
        self.record("cmd_bind_compute_pipeline");
    }

    fn cmd_bind_descriptor_sets(
        &self,
        _cmd: NativeCommandBuffer,
        _bind_point: PipelineBindPoint,
        _first_set: u32,
        _sets: &[NativeDescriptorSet],
        _dynamic_offsets: &[u32],
    ) {
        self.record("cmd_bind_descriptor_sets");
    }

    fn cmd_bind_vertex_buffers(
        &self,
        _cmd: NativeCommandBuffer,
        _first_binding: u32,
        _buffers: &[NativeBuffer],
        _offsets: &[u64],
    ) {
        self.record("cmd_bind_vertex_buffers");
    }

    fn cmd_bind_index_buffer(
        &self,
        _cmd: NativeCommandBuffer,
        _buffer: NativeBuffer,
        _offset: u64,
        _index_type: IndexType,
    ) {
        self.record("cmd_bind_index_buffer");
    }

    fn cmd_push_constants(
        &self,
        _cmd: NativeCommandBuffer,
        _stages: ShaderStages,
        _offset: u32,
        _data: &[u8],
    ) {
        self.record("cmd_push_constants");
    }

    fn cmd_set_viewport(&self, _cmd: NativeCommandBuffer, _viewport: &Viewport) {
        self.record("cmd_set_viewport");
    }

    fn cmd_set_scissor(&self, _cmd: NativeCommandBuffer, _scissor: &Rect2D) {
        self.record("cmd_set_scissor");
    }

    fn cmd_set_blend_constants(&self, _cmd: NativeCommandBuffer, _constants: [f32; 4]) {
        self.record("cmd_set_blend_constants");
    }

    fn cmd_set_stencil_compare_mask(
        &self,
        _cmd: NativeCommandBuffer,
        _faces: StencilFaces,
        _mask: u32,
    ) {
        self.record("cmd_set_stencil_compare_mask");
    }

    fn cmd_set_stencil_reference(
        &self,
        _cmd: NativeCommandBuffer,
        _faces: StencilFaces,
        _reference: u32,
    ) {
        self.record("cmd_set_stencil_reference");
    }

    fn cmd_set_stencil_write_mask(
        &self,
        _cmd: NativeCommandBuffer,
        _faces: StencilFaces,
        _mask: u32,
    ) {
        self.record("cmd_set_stencil_write_mask");
    }

    fn cmd_dispatch(&self, _cmd: NativeCommandBuffer, _x: u32, _y: u32, _z: u32) {
        self.record("cmd_dispatch");
    }

    fn cmd_dispatch_indirect(&self, _cmd: NativeCommandBuffer, _buffer: NativeBuffer, _offset: u64) {
        self.record("cmd_dispatch_indirect");
    }

    fn cmd_draw(
        &self,
        _cmd: NativeCommandBuffer,
        _vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.record("cmd_draw");
    }

    fn cmd_draw_indexed(
        &self,
        _cmd: NativeCommandBuffer,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record("cmd_draw_indexed");
    }

    fn cmd_draw_indirect(
        &self,
        _cmd: NativeCommandBuffer,
        _buffer: NativeBuffer,
        _offset: u64,
        _draw_count: u32,
        _stride: u32,
    ) {
        self.record("cmd_draw_indirect");
    }

    fn cmd_draw_indexed_indirect(
        &self,
        _cmd: NativeCommandBuffer,
        _buffer: NativeBuffer,
        _offset: u64,
        _draw_count: u32,
        _stride: u32,
    ) {
        self.record("cmd_draw_indexed_indirect");
    }

    // ----- Frame primitives -----

    fn create_fence(&self, signaled: bool) -> Result<NativeFence> {
        self.record("create_fence");
        let fence = NativeFence(self.next());
        self.fences.lock().unwrap().insert(fence.0, signaled);
        Ok(fence)
    }

    fn release_fence(&self, fence: NativeFence) {
        self.record("release_fence");
        self.fences.lock().unwrap().remove(&fence.0);
    }

    fn wait_fence(&self, fence: NativeFence) -> Result<()> {
        self.record("wait_fence");
        let mut fences = self.fences.lock().unwrap();
        while !fences.get(&fence.0).copied().unwrap_or(true) {
            fences = self.fence_signaled.wait(fences).unwrap();
        }
        Ok(())
    }

    fn reset_fence(&self, fence: NativeFence) -> Result<()> {
        self.record("reset_fence");
        self.fences.lock().unwrap().insert(fence.0, false);
        Ok(())
    }

    fn create_semaphore(&self) -> Result<NativeSemaphore> {
        self.record("create_semaphore");
        Ok(NativeSemaphore(self.next()))
    }

    fn release_semaphore(&self, _semaphore: NativeSemaphore) {
        self.record("release_semaphore");
    }

    fn acquire_next_image(
        &self,
        _swapchain: NativeSwapchain,
        _signal: NativeSemaphore,
    ) -> Result<AcquireOutcome> {
        self.record("acquire_next_image");
        if self.out_of_date_acquire.swap(false, Ordering::Relaxed) {
            return Ok(AcquireOutcome::OutOfDate);
        }
        let index = self.acquire_counter.fetch_add(1, Ordering::Relaxed) % self.image_count as u64;
        Ok(AcquireOutcome::Acquired {
            image_index: index as u32,
            suboptimal: self.suboptimal_acquire.load(Ordering::Relaxed),
        })
    }

    fn queue_submit(
        &self,
        _cmd: NativeCommandBuffer,
        _wait: Option<NativeSemaphore>,
        _signal: Option<NativeSemaphore>,
        fence: NativeFence,
    ) -> Result<()> {
        self.record("queue_submit");
        if self.auto_signal_submits.load(Ordering::Relaxed) {
            self.trigger_fence(fence);
        }
        Ok(())
    }

    fn present(
        &self,
        _swapchain: NativeSwapchain,
        _image_index: u32,
        _wait: NativeSemaphore,
    ) -> Result<PresentOutcome> {
        self.record("present");
        Ok(self
            .present_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PresentOutcome::Presented))
    }

    fn recreate_swapchain(&self, _swapchain: NativeSwapchain) -> Result<SwapchainInfo> {
        self.record("recreate_swapchain");
        Ok(self.test_swapchain_info())
    }

    fn wait_idle(&self) -> Result<()> {
        self.record("wait_idle");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_driver_tests.rs"]
mod tests;

