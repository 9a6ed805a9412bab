/// Buffered render-pass commands
///
/// Commands recorded between `begin_rendering` and `end_rendering` are not
/// emitted immediately: they are accumulated in the per-frame arena so the
/// two-pass synchronizer at `end_rendering` can discover every
/// descriptor-bound resource before any barrier is issued, then replayed as
/// native calls once the pass has begun. A closed tagged enum keeps both
/// walks exhaustive: adding a variant breaks the build until the
/// synchronizer and the replay emitter handle it.

use crate::gpu::arena::ArenaSpan;
use crate::gpu::buffer::IndexType;
use crate::gpu::driver::StencilFaces;
use crate::gpu::handle::{BufferId, GraphicsPipelineId};
use crate::gpu::pipeline::ShaderStages;
use crate::gpu::recorder::{Rect2D, Viewport};

/// One recorded command of an open render pass
///
/// Variable-length payloads live in the recorder's frame arenas and are
/// referenced by span:
/// - `BindDescriptorSets.sets` spans `DescriptorSetId` elements,
///   `dynamic_offsets` spans `u32` elements
/// - `BindVertexBuffers.buffers` spans `BufferId` elements, `offsets`
///   spans `u64` elements
/// - `PushConstants.data` spans `u8` elements
#[derive(Debug, Clone, Copy)]
pub enum RenderCommand {
    BindPipeline {
        pipeline: GraphicsPipelineId,
    },
    BindDescriptorSets {
        first_set: u32,
        sets: ArenaSpan,
        dynamic_offsets: ArenaSpan,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: ArenaSpan,
        offsets: ArenaSpan,
    },
    BindIndexBuffer {
        buffer: BufferId,
        offset: u64,
        index_type: IndexType,
    },
    PushConstants {
        stages: ShaderStages,
        offset: u32,
        data: ArenaSpan,
    },
    SetViewport {
        viewport: Viewport,
    },
    SetScissor {
        scissor: Rect2D,
    },
    SetBlendConstants {
        constants: [f32; 4],
    },
    SetStencilCompareMask {
        faces: StencilFaces,
        mask: u32,
    },
    SetStencilReference {
        faces: StencilFaces,
        reference: u32,
    },
    SetStencilWriteMask {
        faces: StencilFaces,
        mask: u32,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirect {
        buffer: BufferId,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
}
