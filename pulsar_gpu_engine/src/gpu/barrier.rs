/// Barrier values and per-command batching
///
/// Barriers are transient: computed from access-state transitions, batched
/// for one logical command, emitted through a single native
/// `insert_barriers` call, then discarded.

use crate::gpu::access::{BufferTransition, ImageTransition};
use crate::gpu::driver::{DeviceDriver, NativeBuffer, NativeCommandBuffer, NativeImage};
use crate::gpu::image::{ImageAspects, ImageSubresourceRange};

/// Synchronization point for a buffer
#[derive(Debug, Clone, Copy)]
pub struct BufferBarrier {
    /// Native buffer the barrier applies to
    pub buffer: NativeBuffer,
    /// Byte offset of the affected range
    pub offset: u64,
    /// Byte size of the affected range
    pub size: u64,
    /// Source and destination access scopes
    pub transition: BufferTransition,
}

/// Synchronization point and layout transition for an image
#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    /// Native image the barrier applies to
    pub image: NativeImage,
    /// Affected aspects
    pub aspects: ImageAspects,
    /// Affected mip/layer range
    pub range: ImageSubresourceRange,
    /// Source and destination access scopes, including old/new layout
    pub transition: ImageTransition,
}

/// Ordered barrier collection for one logical command
///
/// A command that touches several resources collects every required barrier
/// here, in touch order, and flushes them with exactly one native
/// `insert_barriers` call before the command itself is recorded. Merging is
/// the point: one driver call amortizes the pipeline-barrier overhead over
/// all dependent resources.
#[derive(Debug, Default)]
pub struct BarrierBatch {
    buffers: Vec<BufferBarrier>,
    images: Vec<ImageBarrier>,
}

impl BarrierBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a buffer barrier
    pub fn push_buffer(&mut self, barrier: BufferBarrier) {
        self.buffers.push(barrier);
    }

    /// Queue an image barrier
    pub fn push_image(&mut self, barrier: ImageBarrier) {
        self.images.push(barrier);
    }

    /// Whether no barriers are queued
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }

    /// Queued buffer barriers, in push order
    pub fn buffer_barriers(&self) -> &[BufferBarrier] {
        &self.buffers
    }

    /// Queued image barriers, in push order
    pub fn image_barriers(&self) -> &[ImageBarrier] {
        &self.images
    }

    /// Emit all queued barriers in one native call and clear the batch.
    ///
    /// Does nothing when the batch is empty — a command whose resources are
    /// all already in the requested state inserts no barrier at all.
    pub fn flush(&mut self, driver: &dyn DeviceDriver, cmd: NativeCommandBuffer) {
        if self.is_empty() {
            return;
        }
        driver.cmd_insert_barriers(cmd, &self.buffers, &self.images);
        self.buffers.clear();
        self.images.clear();
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
