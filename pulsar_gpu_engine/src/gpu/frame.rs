/// Frame context
///
/// Ring-buffered frame orchestration: one command recorder, submission
/// fence and semaphore pair per in-flight frame. The fence of ring slot `r`
/// must signal before slot `r`'s command buffer is reset and reused — that
/// fence wait in `begin_frame` is the sole mechanism preventing the host
/// and the GPU from touching the same command buffer concurrently, and the
/// sole intentional stall point of the engine.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::engine_fatal;
use crate::engine_info;
use crate::engine_warn;
use crate::error::Result;
use crate::gpu::driver::{
    AcquireOutcome, DeviceDriver, NativeFence, NativeSemaphore, PresentOutcome,
};
use crate::gpu::handle::{
    BufferId, BufferViewId, ComputePipelineId, DescriptorSetId, DescriptorSetLayoutId,
    FramebufferId, GraphicsPipelineId, ImageId, ImageViewId, RenderPassId, SamplerId, ShaderId,
};
use crate::gpu::pool::ResourcePool;
use crate::gpu::recorder::CommandRecorder;
use crate::gpu::swapchain::Swapchain;
use crate::gpu::{DEFAULT_ARENA_CAPACITY, MAX_FRAMES_IN_FLIGHT};

const SOURCE: &str = "pulsar::gpu::frame";

/// A resource retired through the deferred-release queue
#[derive(Debug, Clone, Copy)]
enum DeferredRelease {
    Buffer(BufferId),
    BufferView(BufferViewId),
    Image(ImageId),
    ImageView(ImageViewId),
    Sampler(SamplerId),
    Shader(ShaderId),
    RenderPass(RenderPassId),
    Framebuffer(FramebufferId),
    DescriptorSetLayout(DescriptorSetLayoutId),
    DescriptorSet(DescriptorSetId),
    ComputePipeline(ComputePipelineId),
    GraphicsPipeline(GraphicsPipelineId),
}

/// Ring-buffered per-frame state spanning the renderer's lifetime
pub struct FrameContext {
    driver: Arc<dyn DeviceDriver>,
    buffering: u32,
    recorders: Vec<CommandRecorder>,
    submit_fences: Vec<NativeFence>,
    acquire_semaphores: Vec<NativeSemaphore>,
    submit_semaphores: Vec<NativeSemaphore>,
    current_frame: u64,
    tail_frame: u64,
    ring_index: usize,
    image_acquired: bool,
    /// Resources retired at a given frame; destroyed once `tail_frame` has
    /// passed that frame, i.e. once no in-flight work can reference them
    release_queue: VecDeque<(u64, DeferredRelease)>,
}

impl FrameContext {
    /// Create a frame context with `buffering` ring slots.
    ///
    /// Fences start signaled so the first `buffering` frames do not wait.
    pub fn new(driver: Arc<dyn DeviceDriver>, buffering: u32) -> Result<Self> {
        if buffering == 0 || buffering as usize > MAX_FRAMES_IN_FLIGHT {
            engine_fatal!(
                SOURCE,
                "buffering {} outside supported range 1..={}",
                buffering,
                MAX_FRAMES_IN_FLIGHT
            );
        }
        let mut recorders = Vec::with_capacity(buffering as usize);
        let mut submit_fences = Vec::with_capacity(buffering as usize);
        let mut acquire_semaphores = Vec::with_capacity(buffering as usize);
        let mut submit_semaphores = Vec::with_capacity(buffering as usize);
        for _ in 0..buffering {
            recorders.push(CommandRecorder::new(driver.clone(), DEFAULT_ARENA_CAPACITY)?);
            submit_fences.push(driver.create_fence(true)?);
            acquire_semaphores.push(driver.create_semaphore()?);
            submit_semaphores.push(driver.create_semaphore()?);
        }
        engine_info!(SOURCE, "frame context created with {} frames in flight", buffering);
        Ok(Self {
            driver,
            buffering,
            recorders,
            submit_fences,
            acquire_semaphores,
            submit_semaphores,
            current_frame: 0,
            tail_frame: 0,
            ring_index: 0,
            image_acquired: false,
            release_queue: VecDeque::new(),
        })
    }

    /// Number of frames allowed in flight
    pub fn buffering(&self) -> u32 {
        self.buffering
    }

    /// Monotonic frame counter
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Oldest frame that may still be executing on the GPU
    pub fn tail_frame(&self) -> u64 {
        self.tail_frame
    }

    /// Ring slot the next/current frame records into
    pub fn ring_index(&self) -> usize {
        self.ring_index
    }

    /// Recorder of the current ring slot
    pub fn recorder(&mut self) -> &mut CommandRecorder {
        &mut self.recorders[self.ring_index]
    }

    /// Begin the frame for the current ring slot.
    ///
    /// Blocks on the slot's submission fence from `buffering` frames ago,
    /// recreates the swapchain if it was flagged invalid, acquires the next
    /// image, and resets + begins the slot's command buffer. A suboptimal
    /// acquisition marks the swapchain non-optimal but proceeds; an
    /// out-of-date acquisition flags it for recreation and the frame
    /// proceeds without a presentable image.
    pub fn begin_frame(&mut self, pool: &mut ResourcePool, swapchain: &mut Swapchain) -> Result<()> {
        let slot = self.ring_index;
        self.driver.wait_fence(self.submit_fences[slot])?;
        self.driver.reset_fence(self.submit_fences[slot])?;
        self.flush_releases(pool);

        if !swapchain.is_valid {
            let info = self.driver.recreate_swapchain(swapchain.native)?;
            swapchain.apply_recreated(info);
            engine_info!(
                SOURCE,
                "swapchain recreated at {}x{}",
                info.width,
                info.height
            );
        }

        match self
            .driver
            .acquire_next_image(swapchain.native, self.acquire_semaphores[slot])?
        {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => {
                swapchain.current_image = Some(image_index);
                if suboptimal {
                    swapchain.is_optimal = false;
                }
                self.image_acquired = true;
            }
            AcquireOutcome::OutOfDate => {
                engine_warn!(SOURCE, "swapchain out of date at acquire, frame proceeds unpresented");
                swapchain.is_valid = false;
                swapchain.current_image = None;
                self.image_acquired = false;
            }
        }

        self.recorders[slot].begin()
    }

    /// Submit the frame recorded in the current ring slot and present.
    ///
    /// Surfaces the recorder's sticky status, submits with the acquire
    /// semaphore as wait and the submit semaphore as signal (only when an
    /// image was acquired), advances the frame counters and ring index,
    /// then presents. An out-of-date present marks the swapchain for
    /// recreation on the next `begin_frame`; a suboptimal present only
    /// marks it non-optimal.
    pub fn submit_frame(&mut self, swapchain: &mut Swapchain) -> Result<()> {
        let slot = self.ring_index;
        self.recorders[slot].end()?;

        let presentable = self.image_acquired && swapchain.is_valid;
        let wait = if presentable {
            Some(self.acquire_semaphores[slot])
        } else {
            None
        };
        let signal = if presentable {
            Some(self.submit_semaphores[slot])
        } else {
            None
        };
        self.driver.queue_submit(
            self.recorders[slot].native(),
            wait,
            signal,
            self.submit_fences[slot],
        )?;

        // Advance the ring even when presentation is skipped: the frame was
        // submitted, its fence will signal, and its slot must rotate.
        self.current_frame += 1;
        self.tail_frame = self.current_frame.max(self.buffering as u64) - self.buffering as u64;
        self.ring_index = (self.ring_index + 1) % self.buffering as usize;

        if presentable {
            if let Some(image_index) = swapchain.current_image {
                match self
                    .driver
                    .present(swapchain.native, image_index, self.submit_semaphores[slot])?
                {
                    PresentOutcome::Presented => {}
                    PresentOutcome::Suboptimal => {
                        swapchain.is_optimal = false;
                    }
                    PresentOutcome::OutOfDate => {
                        swapchain.is_valid = false;
                    }
                }
            }
        }
        swapchain.current_image = None;
        self.image_acquired = false;
        Ok(())
    }

    // ----- Deferred release -----
    //
    // The pool performs no liveness tracking; these queues are what makes
    // destruction safe against in-flight frames. A resource retired at
    // frame F is destroyed once tail_frame > F.

    /// Retire a buffer once no in-flight frame can reference it
    pub fn release_buffer(&mut self, id: BufferId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::Buffer(id)));
    }

    /// Retire a buffer view once no in-flight frame can reference it
    pub fn release_buffer_view(&mut self, id: BufferViewId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::BufferView(id)));
    }

    /// Retire an image once no in-flight frame can reference it
    pub fn release_image(&mut self, id: ImageId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::Image(id)));
    }

    /// Retire an image view once no in-flight frame can reference it
    pub fn release_image_view(&mut self, id: ImageViewId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::ImageView(id)));
    }

    /// Retire a sampler once no in-flight frame can reference it
    pub fn release_sampler(&mut self, id: SamplerId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::Sampler(id)));
    }

    /// Retire a shader module once no in-flight frame can reference it
    pub fn release_shader(&mut self, id: ShaderId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::Shader(id)));
    }

    /// Retire a render pass once no in-flight frame can reference it
    pub fn release_render_pass(&mut self, id: RenderPassId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::RenderPass(id)));
    }

    /// Retire a framebuffer once no in-flight frame can reference it
    pub fn release_framebuffer(&mut self, id: FramebufferId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::Framebuffer(id)));
    }

    /// Retire a descriptor set layout once no in-flight frame can reference it
    pub fn release_descriptor_set_layout(&mut self, id: DescriptorSetLayoutId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::DescriptorSetLayout(id)));
    }

    /// Retire a descriptor set once no in-flight frame can reference it
    pub fn release_descriptor_set(&mut self, id: DescriptorSetId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::DescriptorSet(id)));
    }

    /// Retire a compute pipeline once no in-flight frame can reference it
    pub fn release_compute_pipeline(&mut self, id: ComputePipelineId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::ComputePipeline(id)));
    }

    /// Retire a graphics pipeline once no in-flight frame can reference it
    pub fn release_graphics_pipeline(&mut self, id: GraphicsPipelineId) {
        self.release_queue
            .push_back((self.current_frame, DeferredRelease::GraphicsPipeline(id)));
    }

    /// Number of retired resources still awaiting destruction
    pub fn pending_releases(&self) -> usize {
        self.release_queue.len()
    }

    fn flush_releases(&mut self, pool: &mut ResourcePool) {
        while let Some(&(frame, release)) = self.release_queue.front() {
            if frame >= self.tail_frame {
                break;
            }
            self.release_queue.pop_front();
            match release {
                DeferredRelease::Buffer(id) => pool.destroy_buffer(id),
                DeferredRelease::BufferView(id) => pool.destroy_buffer_view(id),
                DeferredRelease::Image(id) => pool.destroy_image(id),
                DeferredRelease::ImageView(id) => pool.destroy_image_view(id),
                DeferredRelease::Sampler(id) => pool.destroy_sampler(id),
                DeferredRelease::Shader(id) => pool.destroy_shader(id),
                DeferredRelease::RenderPass(id) => pool.destroy_render_pass(id),
                DeferredRelease::Framebuffer(id) => pool.destroy_framebuffer(id),
                DeferredRelease::DescriptorSetLayout(id) => pool.destroy_descriptor_set_layout(id),
                DeferredRelease::DescriptorSet(id) => pool.destroy_descriptor_set(id),
                DeferredRelease::ComputePipeline(id) => pool.destroy_compute_pipeline(id),
                DeferredRelease::GraphicsPipeline(id) => pool.destroy_graphics_pipeline(id),
            }
        }
    }

    /// Destroy everything still queued, regardless of frame age.
    ///
    /// Call after `wait_idle` during teardown, when no work is in flight.
    pub fn drain_releases(&mut self, pool: &mut ResourcePool) {
        let tail = self.tail_frame;
        self.tail_frame = u64::MAX;
        self.flush_releases(pool);
        self.tail_frame = tail;
    }
}

impl Drop for FrameContext {
    fn drop(&mut self) {
        // The ring's native objects may still be referenced by in-flight
        // work; settle the device before releasing them.
        if self.driver.wait_idle().is_err() {
            engine_warn!(SOURCE, "device wait failed during frame context teardown");
        }
        for &fence in &self.submit_fences {
            self.driver.release_fence(fence);
        }
        for &semaphore in &self.acquire_semaphores {
            self.driver.release_semaphore(semaphore);
        }
        for &semaphore in &self.submit_semaphores {
            self.driver.release_semaphore(semaphore);
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
