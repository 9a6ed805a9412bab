/// Unit tests for the command recorder
///
/// Driven entirely through the mock driver: assertions run against the
/// recorded native-call sequence and the captured barrier batches.

use std::sync::Arc;

use crate::error::Status;
use crate::gpu::access::AccessFlags;
use crate::gpu::buffer::{BufferCopy, BufferDesc, BufferUsage};
use crate::gpu::descriptor::{
    DescriptorBindingDesc, DescriptorResource, DescriptorSetDesc, DescriptorSetLayoutDesc,
    DescriptorType, DescriptorWrite,
};
use crate::gpu::handle::{
    BufferId, ComputePipelineId, DescriptorSetId, GraphicsPipelineId, ImageId, ImageViewId,
};
use crate::gpu::image::{
    Extent3D, Format, ImageAspects, ImageDesc, ImageLayout, ImageType, ImageUsage, ImageViewDesc,
    SampleCount,
};
use crate::gpu::mock_driver::MockDriver;
use crate::gpu::pipeline::{
    ComputePipelineDesc, GraphicsPipelineDesc, PrimitiveTopology, ShaderDesc, ShaderStages,
};
use crate::gpu::pool::ResourcePool;
use crate::gpu::recorder::{
    CommandRecorder, Rect2D, RecordingState, RenderingAttachment, RenderingInfo,
};
use crate::gpu::render_pass::{ClearValue, LoadOp, StoreOp};

fn setup() -> (Arc<MockDriver>, ResourcePool, CommandRecorder) {
    let driver = Arc::new(MockDriver::new());
    let pool = ResourcePool::new(driver.clone());
    let mut recorder = CommandRecorder::new(driver.clone(), 64).unwrap();
    recorder.begin().unwrap();
    (driver, pool, recorder)
}

fn make_buffer(pool: &mut ResourcePool, size: u64, usage: BufferUsage) -> BufferId {
    pool.create_buffer(BufferDesc {
        size,
        usage,
        host_visible: false,
    })
    .unwrap()
}

fn make_image(pool: &mut ResourcePool, usage: ImageUsage) -> ImageId {
    pool.create_image(ImageDesc {
        image_type: ImageType::Tex2D,
        format: Format::R8G8B8A8_UNORM,
        extent: Extent3D {
            width: 32,
            height: 32,
            depth: 1,
        },
        mip_levels: 1,
        array_layers: 1,
        sample_count: SampleCount::S1,
        usage,
        aspects: ImageAspects::COLOR,
    })
    .unwrap()
}

fn make_view(pool: &mut ResourcePool, image: ImageId) -> ImageViewId {
    pool.create_image_view(ImageViewDesc {
        image,
        format: Format::R8G8B8A8_UNORM,
        aspects: ImageAspects::COLOR,
        base_mip_level: 0,
        mip_level_count: 1,
        base_array_layer: 0,
        array_layer_count: 1,
    })
    .unwrap()
}

/// Descriptor set with one sampled image at binding 0
fn sampled_image_set(pool: &mut ResourcePool, view: ImageViewId) -> DescriptorSetId {
    let layout = pool
        .create_descriptor_set_layout(DescriptorSetLayoutDesc {
            bindings: vec![DescriptorBindingDesc {
                binding: 0,
                ty: DescriptorType::SampledImage,
                count: 1,
                stages: ShaderStages::FRAGMENT,
            }],
        })
        .unwrap();
    let set = pool.create_descriptor_set(DescriptorSetDesc { layout }).unwrap();
    pool.update_descriptor_set(
        set,
        &[DescriptorWrite {
            binding: 0,
            resources: vec![DescriptorResource::Image { view }],
        }],
    );
    set
}

/// Descriptor set with one storage buffer at binding 0
fn storage_buffer_set(pool: &mut ResourcePool, buffer: BufferId) -> DescriptorSetId {
    let layout = pool
        .create_descriptor_set_layout(DescriptorSetLayoutDesc {
            bindings: vec![DescriptorBindingDesc {
                binding: 0,
                ty: DescriptorType::StorageBuffer,
                count: 1,
                stages: ShaderStages::COMPUTE,
            }],
        })
        .unwrap();
    let set = pool.create_descriptor_set(DescriptorSetDesc { layout }).unwrap();
    pool.update_descriptor_set(
        set,
        &[DescriptorWrite {
            binding: 0,
            resources: vec![DescriptorResource::Buffer {
                buffer,
                offset: 0,
                size: 256,
            }],
        }],
    );
    set
}

fn make_graphics_pipeline(pool: &mut ResourcePool) -> GraphicsPipelineId {
    let vertex = pool.create_shader(ShaderDesc { spirv: vec![1] }).unwrap();
    let fragment = pool.create_shader(ShaderDesc { spirv: vec![2] }).unwrap();
    pool.create_graphics_pipeline(GraphicsPipelineDesc {
        vertex_shader: vertex,
        vertex_entry_point: "main".to_string(),
        fragment_shader: fragment,
        fragment_entry_point: "main".to_string(),
        set_layouts: vec![],
        push_constant_size: 0,
        vertex_bindings: vec![],
        vertex_attributes: vec![],
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![Format::R8G8B8A8_UNORM],
        depth_format: None,
        stencil_format: None,
        sample_count: SampleCount::S1,
    })
    .unwrap()
}

fn make_compute_pipeline(pool: &mut ResourcePool) -> ComputePipelineId {
    let shader = pool.create_shader(ShaderDesc { spirv: vec![3] }).unwrap();
    pool.create_compute_pipeline(ComputePipelineDesc {
        shader,
        entry_point: "main".to_string(),
        set_layouts: vec![],
        push_constant_size: 0,
    })
    .unwrap()
}

fn color_pass(view: ImageViewId) -> RenderingInfo {
    RenderingInfo {
        render_area: Rect2D {
            x: 0,
            y: 0,
            width: 32,
            height: 32,
        },
        num_layers: 1,
        color_attachments: vec![RenderingAttachment {
            view,
            resolve: None,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear: ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
        }],
        depth_attachment: None,
        stencil_attachment: None,
    }
}

// ============================================================================
// Transfer commands and barrier batching
// ============================================================================

#[test]
fn test_copy_buffer_batches_barriers_in_touch_order() {
    let (driver, mut pool, mut recorder) = setup();
    let src = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_SRC);
    let dst = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_DST);
    let src_native = pool.buffer(src).native;
    let dst_native = pool.buffer(dst).native;
    driver.clear_calls();

    recorder.copy_buffer(
        &mut pool,
        src,
        dst,
        &[BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: 256,
        }],
    );

    // One combined insertion before the native copy, in touch order
    assert_eq!(
        driver.calls(),
        vec!["cmd_insert_barriers", "cmd_copy_buffer"]
    );
    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (buffers, images) = &batches[0];
    assert!(images.is_empty());
    assert_eq!(buffers.len(), 2);
    assert_eq!(buffers[0].buffer, src_native);
    assert_eq!(buffers[1].buffer, dst_native);
    assert!(buffers[0].transition.dst.access.contains(AccessFlags::TRANSFER_READ));
    assert!(buffers[1].transition.dst.access.contains(AccessFlags::TRANSFER_WRITE));
}

#[test]
fn test_repeated_copy_emits_only_write_barrier() {
    // The §8 scenario: the second identical copy re-barriers the
    // destination's write-after-write but not the source's read-after-read
    let (driver, mut pool, mut recorder) = setup();
    let a = make_buffer(
        &mut pool,
        256,
        BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
    );
    let b = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_DST);
    let b_native = pool.buffer(b).native;
    let regions = [BufferCopy {
        src_offset: 0,
        dst_offset: 0,
        size: 256,
    }];
    driver.clear_calls();

    recorder.copy_buffer(&mut pool, a, b, &regions);
    recorder.copy_buffer(&mut pool, a, b, &regions);

    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].0.len(), 2);
    // Second copy: A's read is already satisfied, only B barriers
    assert_eq!(batches[1].0.len(), 1);
    assert_eq!(batches[1].0[0].buffer, b_native);
    assert!(batches[1].0[0]
        .transition
        .src
        .access
        .contains(AccessFlags::TRANSFER_WRITE));
    assert!(batches[1].0[0]
        .transition
        .dst
        .access
        .contains(AccessFlags::TRANSFER_WRITE));
}

#[test]
fn test_fill_buffer_transitions_and_records() {
    let (driver, mut pool, mut recorder) = setup();
    let dst = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_DST);
    driver.clear_calls();

    recorder.fill_buffer(&mut pool, dst, 0, 256, 0xdead_beef);

    assert_eq!(driver.calls(), vec!["cmd_insert_barriers", "cmd_fill_buffer"]);
}

#[test]
fn test_clear_color_image_transitions_to_transfer_dst() {
    let (driver, mut pool, mut recorder) = setup();
    let image = make_image(&mut pool, ImageUsage::TRANSFER_DST);
    driver.clear_calls();

    recorder.clear_color_image(
        &mut pool,
        image,
        [0.0; 4],
        &[crate::gpu::image::ImageSubresourceRange {
            aspects: ImageAspects::COLOR,
            base_mip_level: 0,
            mip_level_count: 1,
            base_array_layer: 0,
            array_layer_count: 1,
        }],
    );

    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (_, images) = &batches[0];
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].transition.src.layout, ImageLayout::Undefined);
    assert_eq!(images[0].transition.dst.layout, ImageLayout::TransferDst);
    assert_eq!(pool.image(image).state.layout, ImageLayout::TransferDst);
}

// ============================================================================
// Validator integration
// ============================================================================

#[test]
#[should_panic(expected = "copy_buffer source requires buffer usage")]
fn test_copy_buffer_without_transfer_src_usage_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let src = make_buffer(&mut pool, 256, BufferUsage::VERTEX);
    let dst = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_DST);

    recorder.copy_buffer(
        &mut pool,
        src,
        dst,
        &[BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: 256,
        }],
    );
}

#[test]
#[should_panic(expected = "exceeds buffer size")]
fn test_copy_buffer_out_of_bounds_region_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let src = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_SRC);
    let dst = make_buffer(&mut pool, 128, BufferUsage::TRANSFER_DST);

    recorder.copy_buffer(
        &mut pool,
        src,
        dst,
        &[BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: 256,
        }],
    );
}

#[test]
#[should_panic(expected = "fill_buffer offset must be aligned")]
fn test_fill_buffer_misaligned_offset_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let dst = make_buffer(&mut pool, 256, BufferUsage::TRANSFER_DST);
    recorder.fill_buffer(&mut pool, dst, 2, 4, 0);
}

// ============================================================================
// Recording state machine
// ============================================================================

#[test]
fn test_state_walk_through_passes() {
    let (_, mut pool, mut recorder) = setup();
    assert_eq!(recorder.recording_state(), RecordingState::Recording);

    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let view = make_view(&mut pool, color);
    recorder.begin_rendering(&pool, &color_pass(view));
    assert_eq!(recorder.recording_state(), RecordingState::RenderPass);
    recorder.end_rendering(&mut pool);
    assert_eq!(recorder.recording_state(), RecordingState::Recording);

    recorder.begin_compute_pass();
    assert_eq!(recorder.recording_state(), RecordingState::ComputePass);
    recorder.end_compute_pass();
    assert_eq!(recorder.recording_state(), RecordingState::Recording);

    recorder.end().unwrap();
    assert_eq!(recorder.recording_state(), RecordingState::Ended);
}

#[test]
#[should_panic(expected = "draw requires recording state")]
fn test_draw_outside_render_pass_is_fatal() {
    let (_, _, mut recorder) = setup();
    recorder.draw(3, 1, 0, 0);
}

#[test]
#[should_panic(expected = "begin_rendering requires recording state")]
fn test_nested_render_pass_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let view = make_view(&mut pool, color);
    let info = color_pass(view);
    recorder.begin_rendering(&pool, &info);
    recorder.begin_rendering(&pool, &info);
}

#[test]
#[should_panic(expected = "copy_buffer requires recording state")]
fn test_transfer_inside_render_pass_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let view = make_view(&mut pool, color);
    let buffer = make_buffer(
        &mut pool,
        64,
        BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
    );
    recorder.begin_rendering(&pool, &color_pass(view));
    recorder.copy_buffer(
        &mut pool,
        buffer,
        buffer,
        &[BufferCopy {
            src_offset: 0,
            dst_offset: 32,
            size: 32,
        }],
    );
}

#[test]
#[should_panic(expected = "bind_descriptor_sets requires an active render or compute pass")]
fn test_pass_scoped_bind_outside_pass_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let buffer = make_buffer(&mut pool, 256, BufferUsage::STORAGE);
    let set = storage_buffer_set(&mut pool, buffer);
    recorder.bind_descriptor_sets(&pool, 0, &[set], &[]);
}

#[test]
#[should_panic(expected = "draw_indexed without a bound index buffer")]
fn test_draw_indexed_without_index_buffer_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let view = make_view(&mut pool, color);
    let pipeline = make_graphics_pipeline(&mut pool);
    recorder.begin_rendering(&pool, &color_pass(view));
    recorder.bind_graphics_pipeline(&pool, pipeline);
    recorder.draw_indexed(3, 1, 0, 0, 0);
}

// ============================================================================
// Render pass two-pass synchronization
// ============================================================================

#[test]
fn test_render_pass_single_barrier_insertion_before_begin() {
    let (driver, mut pool, mut recorder) = setup();

    // Sampled image the pass reads through a descriptor set
    let sampled = make_image(&mut pool, ImageUsage::SAMPLED);
    let sampled_view = make_view(&mut pool, sampled);
    let set = sampled_image_set(&mut pool, sampled_view);
    let sampled_native = pool.image(sampled).native;

    // Color attachment
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let color_view = make_view(&mut pool, color);

    let pipeline = make_graphics_pipeline(&mut pool);
    driver.clear_calls();

    recorder.begin_rendering(&pool, &color_pass(color_view));
    recorder.bind_graphics_pipeline(&pool, pipeline);
    recorder.bind_descriptor_sets(&pool, 0, &[set], &[]);
    recorder.draw(3, 1, 0, 0);
    recorder.end_rendering(&mut pool);

    let calls = driver.calls();

    // Exactly one barrier insertion in the whole pass
    assert_eq!(driver.call_count("cmd_insert_barriers"), 1);

    // It sits immediately before the native begin; nothing between the
    // native begin and end inserts barriers
    let begin = calls.iter().position(|c| c == "cmd_begin_render_pass").unwrap();
    let end = calls.iter().position(|c| c == "cmd_end_render_pass").unwrap();
    assert_eq!(calls[begin - 1], "cmd_insert_barriers");
    assert!(!calls[begin + 1..end].iter().any(|c| c == "cmd_insert_barriers"));

    // The buffered commands replay between begin and end, in record order
    assert_eq!(
        &calls[begin + 1..end],
        &[
            "cmd_bind_graphics_pipeline".to_string(),
            "cmd_bind_descriptor_sets".to_string(),
            "cmd_draw".to_string(),
        ]
    );

    // The batch transitions the sampled image to shader-read-only and the
    // attachment to color-attachment layout, pass 1 before pass 2
    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (_, images) = &batches[0];
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].image, sampled_native);
    assert_eq!(images[0].transition.dst.layout, ImageLayout::ShaderReadOnly);
    assert_eq!(images[1].transition.dst.layout, ImageLayout::ColorAttachment);

    // Pool states reflect the synchronized accesses
    assert_eq!(pool.image(sampled).state.layout, ImageLayout::ShaderReadOnly);
    assert_eq!(pool.image(color).state.layout, ImageLayout::ColorAttachment);
}

#[test]
fn test_render_pass_already_synchronized_image_needs_no_barrier() {
    let (driver, mut pool, mut recorder) = setup();
    let sampled = make_image(&mut pool, ImageUsage::SAMPLED);
    let sampled_view = make_view(&mut pool, sampled);
    let set = sampled_image_set(&mut pool, sampled_view);
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let color_view = make_view(&mut pool, color);
    let pipeline = make_graphics_pipeline(&mut pool);

    // First pass transitions everything
    recorder.begin_rendering(&pool, &color_pass(color_view));
    recorder.bind_graphics_pipeline(&pool, pipeline);
    recorder.bind_descriptor_sets(&pool, 0, &[set], &[]);
    recorder.draw(3, 1, 0, 0);
    recorder.end_rendering(&mut pool);
    driver.clear_calls();

    // Second identical pass: the sampled read is satisfied; only the
    // attachment's write-after-write barriers
    recorder.begin_rendering(&pool, &color_pass(color_view));
    recorder.bind_graphics_pipeline(&pool, pipeline);
    recorder.bind_descriptor_sets(&pool, 0, &[set], &[]);
    recorder.draw(3, 1, 0, 0);
    recorder.end_rendering(&mut pool);

    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (_, images) = &batches[0];
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].transition.dst.layout, ImageLayout::ColorAttachment);
}

#[test]
fn test_vertex_and_index_buffers_synchronized_at_end_rendering() {
    let (driver, mut pool, mut recorder) = setup();
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let color_view = make_view(&mut pool, color);
    let pipeline = make_graphics_pipeline(&mut pool);
    let vertex = make_buffer(&mut pool, 1024, BufferUsage::VERTEX);
    let index = make_buffer(&mut pool, 512, BufferUsage::INDEX);
    let vertex_native = pool.buffer(vertex).native;
    let index_native = pool.buffer(index).native;
    driver.clear_calls();

    recorder.begin_rendering(&pool, &color_pass(color_view));
    recorder.bind_graphics_pipeline(&pool, pipeline);
    recorder.bind_vertex_buffers(&pool, 0, &[vertex], &[0]);
    recorder.bind_index_buffer(&pool, index, 0, crate::gpu::buffer::IndexType::U16);
    recorder.draw_indexed(3, 1, 0, 0, 0);
    recorder.end_rendering(&mut pool);

    let batches = driver.barrier_batches();
    assert_eq!(batches.len(), 1);
    let (buffers, _) = &batches[0];
    assert_eq!(buffers.len(), 2);
    assert_eq!(buffers[0].buffer, vertex_native);
    assert!(buffers[0]
        .transition
        .dst
        .access
        .contains(AccessFlags::VERTEX_ATTRIBUTE_READ));
    assert_eq!(buffers[1].buffer, index_native);
    assert!(buffers[1].transition.dst.access.contains(AccessFlags::INDEX_READ));
}

#[test]
fn test_read_only_depth_attachment_uses_read_only_layout() {
    let (driver, mut pool, mut recorder) = setup();
    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let color_view = make_view(&mut pool, color);
    let depth = pool
        .create_image(ImageDesc {
            image_type: ImageType::Tex2D,
            format: Format::D32_SFLOAT,
            extent: Extent3D {
                width: 32,
                height: 32,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            sample_count: SampleCount::S1,
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            aspects: ImageAspects::DEPTH,
        })
        .unwrap();
    let depth_view = pool
        .create_image_view(ImageViewDesc {
            image: depth,
            format: Format::D32_SFLOAT,
            aspects: ImageAspects::DEPTH,
            base_mip_level: 0,
            mip_level_count: 1,
            base_array_layer: 0,
            array_layer_count: 1,
        })
        .unwrap();
    driver.clear_calls();

    let mut info = color_pass(color_view);
    // Depth is only tested against, never written
    info.depth_attachment = Some(RenderingAttachment {
        view: depth_view,
        resolve: None,
        load_op: LoadOp::Load,
        store_op: StoreOp::None,
        clear: ClearValue::DepthStencil {
            depth: 1.0,
            stencil: 0,
        },
    });
    recorder.begin_rendering(&pool, &info);
    recorder.end_rendering(&mut pool);

    assert_eq!(
        pool.image(depth).state.layout,
        ImageLayout::DepthStencilReadOnly
    );
    assert!(!pool.image(depth).state.is_write());
}

// ============================================================================
// Compute pass eager synchronization
// ============================================================================

#[test]
fn test_dispatch_synchronizes_bound_sets_eagerly() {
    let (driver, mut pool, mut recorder) = setup();
    let buffer = make_buffer(&mut pool, 256, BufferUsage::STORAGE);
    let set = storage_buffer_set(&mut pool, buffer);
    let pipeline = make_compute_pipeline(&mut pool);
    driver.clear_calls();

    recorder.begin_compute_pass();
    recorder.bind_compute_pipeline(&pool, pipeline);
    recorder.bind_descriptor_sets(&pool, 0, &[set], &[]);
    recorder.dispatch(&mut pool, 8, 8, 1);
    recorder.dispatch(&mut pool, 8, 8, 1);
    recorder.end_compute_pass();

    // Storage read/write re-barriers before every dispatch
    assert_eq!(
        driver.calls(),
        vec![
            "cmd_bind_compute_pipeline",
            "cmd_bind_descriptor_sets",
            "cmd_insert_barriers",
            "cmd_dispatch",
            "cmd_insert_barriers",
            "cmd_dispatch",
        ]
    );
}

#[test]
#[should_panic(expected = "dispatch without a bound compute pipeline")]
fn test_dispatch_without_pipeline_is_fatal() {
    let (_, mut pool, mut recorder) = setup();
    recorder.begin_compute_pass();
    recorder.dispatch(&mut pool, 1, 1, 1);
}

// ============================================================================
// Sticky allocation failure
// ============================================================================

#[test]
fn test_arena_exhaustion_sets_sticky_status_and_silences_recording() {
    let driver = Arc::new(MockDriver::new());
    let mut pool = ResourcePool::new(driver.clone());
    // Room for only two buffered commands
    let mut recorder = CommandRecorder::new(driver.clone(), 2).unwrap();
    recorder.begin().unwrap();

    let color = make_image(&mut pool, ImageUsage::COLOR_ATTACHMENT);
    let view = make_view(&mut pool, color);
    recorder.begin_rendering(&pool, &color_pass(view));

    recorder.set_blend_constants([0.0; 4]);
    recorder.set_blend_constants([0.0; 4]);
    assert!(recorder.status().is_ok());

    // Third command exceeds the arena budget
    recorder.set_blend_constants([0.0; 4]);
    assert_eq!(*recorder.status(), Err(Status::OutOfHostMemory));

    // Every further call is a silent no-op, even ones that would
    // otherwise be recording-state violations
    recorder.set_blend_constants([0.0; 4]);
    recorder.draw(3, 1, 0, 0);

    // The failure surfaces when the frame is ended for submission
    assert_eq!(recorder.end(), Err(Status::OutOfHostMemory));
}
