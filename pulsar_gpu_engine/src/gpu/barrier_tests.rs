/// Unit tests for barrier batching

use std::sync::Arc;

use crate::gpu::access::{BufferAccess, BufferTransition, ImageAccess, ImageTransition};
use crate::gpu::barrier::{BarrierBatch, BufferBarrier, ImageBarrier};
use crate::gpu::driver::{NativeBuffer, NativeCommandBuffer, NativeImage};
use crate::gpu::image::{ImageAspects, ImageSubresourceRange};
use crate::gpu::mock_driver::MockDriver;

fn buffer_barrier(handle: u64) -> BufferBarrier {
    BufferBarrier {
        buffer: NativeBuffer(handle),
        offset: 0,
        size: 64,
        transition: BufferTransition {
            src: BufferAccess::NONE,
            dst: BufferAccess::TRANSFER_WRITE,
        },
    }
}

fn image_barrier(handle: u64) -> ImageBarrier {
    ImageBarrier {
        image: NativeImage(handle),
        aspects: ImageAspects::COLOR,
        range: ImageSubresourceRange {
            aspects: ImageAspects::COLOR,
            base_mip_level: 0,
            mip_level_count: 1,
            base_array_layer: 0,
            array_layer_count: 1,
        },
        transition: ImageTransition {
            src: ImageAccess::UNDEFINED,
            dst: ImageAccess::TRANSFER_WRITE,
        },
    }
}

#[test]
fn test_batch_preserves_push_order() {
    let mut batch = BarrierBatch::new();
    batch.push_buffer(buffer_barrier(1));
    batch.push_buffer(buffer_barrier(2));
    batch.push_buffer(buffer_barrier(3));

    let handles: Vec<u64> = batch.buffer_barriers().iter().map(|b| b.buffer.0).collect();
    assert_eq!(handles, vec![1, 2, 3]);
}

#[test]
fn test_flush_issues_exactly_one_insertion() {
    let driver = Arc::new(MockDriver::new());
    let mut batch = BarrierBatch::new();
    batch.push_buffer(buffer_barrier(1));
    batch.push_buffer(buffer_barrier(2));
    batch.push_image(image_barrier(3));

    batch.flush(driver.as_ref(), NativeCommandBuffer(7));

    assert_eq!(driver.call_count("cmd_insert_barriers"), 1);
    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (buffers, images) = &batches[0];
    assert_eq!(buffers.len(), 2);
    assert_eq!(images.len(), 1);
    assert_eq!(buffers[0].buffer.0, 1);
    assert_eq!(buffers[1].buffer.0, 2);
    assert_eq!(images[0].image.0, 3);
}

#[test]
fn test_flush_clears_the_batch() {
    let driver = Arc::new(MockDriver::new());
    let mut batch = BarrierBatch::new();
    batch.push_buffer(buffer_barrier(1));
    batch.flush(driver.as_ref(), NativeCommandBuffer(7));

    assert!(batch.is_empty());

    // Flushing again emits nothing
    batch.flush(driver.as_ref(), NativeCommandBuffer(7));
    assert_eq!(driver.call_count("cmd_insert_barriers"), 1);
}

#[test]
fn test_empty_batch_flush_is_a_no_op() {
    let driver = Arc::new(MockDriver::new());
    let mut batch = BarrierBatch::new();
    batch.flush(driver.as_ref(), NativeCommandBuffer(7));
    assert_eq!(driver.call_count("cmd_insert_barriers"), 0);
}
