/// Access state tracking
///
/// Every live buffer and image carries a record of the last pipeline
/// stage/access-mode (and, for images, layout) the GPU timeline has been
/// instructed to establish for it. The `sync_buffer`/`sync_image` functions
/// below are the whole synchronization decision: given the current state and
/// a newly requested access, they decide whether a barrier is needed and
/// what the state becomes.
///
/// The state model is a snapshot: the new state is always exactly the
/// requested access, never a union of prior readers. A sequence of
/// differing read-only accesses therefore re-barriers where union tracking
/// would not; over-barriering is safe on the modeled API, under-barriering
/// is not.

use bitflags::bitflags;

use crate::gpu::descriptor::DescriptorType;
use crate::gpu::image::ImageLayout;
use crate::gpu::pipeline::ShaderStages;

bitflags! {
    /// Pipeline stage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const FRAGMENT_SHADER = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS = 1 << 6;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        const COMPUTE_SHADER = 1 << 8;
        const TRANSFER = 1 << 9;
        const BOTTOM_OF_PIPE = 1 << 10;
        const HOST = 1 << 11;
        const ALL_GRAPHICS = 1 << 12;
        const ALL_COMMANDS = 1 << 13;
    }
}

bitflags! {
    /// Memory access flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const SHADER_READ = 1 << 4;
        const SHADER_WRITE = 1 << 5;
        const COLOR_ATTACHMENT_READ = 1 << 6;
        const COLOR_ATTACHMENT_WRITE = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 9;
        const TRANSFER_READ = 1 << 10;
        const TRANSFER_WRITE = 1 << 11;
        const HOST_READ = 1 << 12;
        const HOST_WRITE = 1 << 13;
        const MEMORY_READ = 1 << 14;
        const MEMORY_WRITE = 1 << 15;
    }
}

/// All access bits that imply a memory write
const WRITE_ACCESS: AccessFlags = AccessFlags::SHADER_WRITE
    .union(AccessFlags::COLOR_ATTACHMENT_WRITE)
    .union(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
    .union(AccessFlags::TRANSFER_WRITE)
    .union(AccessFlags::HOST_WRITE)
    .union(AccessFlags::MEMORY_WRITE);

/// Whether the access set contains any write bit
pub fn has_write_access(access: AccessFlags) -> bool {
    access.intersects(WRITE_ACCESS)
}

/// Whether the access set contains any read bit
pub fn has_read_access(access: AccessFlags) -> bool {
    access.intersects(WRITE_ACCESS.complement()) && !access.is_empty()
}

/// Last-known (or requested) access of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferAccess {
    /// Pipeline stages the access happens in
    pub stages: PipelineStages,
    /// Access modes
    pub access: AccessFlags,
}

impl BufferAccess {
    /// No access (creation default)
    pub const NONE: Self = Self {
        stages: PipelineStages::empty(),
        access: AccessFlags::empty(),
    };

    /// Transfer-stage read (copy/blit source)
    pub const TRANSFER_READ: Self = Self {
        stages: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_READ,
    };

    /// Transfer-stage write (copy/fill/update destination)
    pub const TRANSFER_WRITE: Self = Self {
        stages: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_WRITE,
    };

    /// Index fetch for indexed draws
    pub const INDEX_READ: Self = Self {
        stages: PipelineStages::VERTEX_INPUT,
        access: AccessFlags::INDEX_READ,
    };

    /// Vertex attribute fetch for draws
    pub const VERTEX_ATTRIBUTE_READ: Self = Self {
        stages: PipelineStages::VERTEX_INPUT,
        access: AccessFlags::VERTEX_ATTRIBUTE_READ,
    };

    /// Indirect argument fetch for indirect draws/dispatches
    pub const INDIRECT_READ: Self = Self {
        stages: PipelineStages::DRAW_INDIRECT,
        access: AccessFlags::INDIRECT_COMMAND_READ,
    };

    /// Whether the access includes a write
    pub fn is_write(&self) -> bool {
        has_write_access(self.access)
    }
}

/// Last-known (or requested) access of an image, including its layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAccess {
    /// Pipeline stages the access happens in
    pub stages: PipelineStages,
    /// Access modes
    pub access: AccessFlags,
    /// Layout the image is (or must be) in
    pub layout: ImageLayout,
}

impl Default for ImageAccess {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl ImageAccess {
    /// No access, undefined layout (creation default)
    pub const UNDEFINED: Self = Self {
        stages: PipelineStages::empty(),
        access: AccessFlags::empty(),
        layout: ImageLayout::Undefined,
    };

    /// Transfer-stage read in transfer-source layout
    pub const TRANSFER_READ: Self = Self {
        stages: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_READ,
        layout: ImageLayout::TransferSrc,
    };

    /// Transfer-stage write in transfer-destination layout
    pub const TRANSFER_WRITE: Self = Self {
        stages: PipelineStages::TRANSFER,
        access: AccessFlags::TRANSFER_WRITE,
        layout: ImageLayout::TransferDst,
    };

    /// Color attachment write
    pub const COLOR_ATTACHMENT_WRITE: Self = Self {
        stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        layout: ImageLayout::ColorAttachment,
    };

    /// Presentation handoff
    pub const PRESENT: Self = Self {
        stages: PipelineStages::BOTTOM_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::Present,
    };

    /// Whether the access includes a write
    pub fn is_write(&self) -> bool {
        has_write_access(self.access)
    }
}

/// Required transition of a buffer between two access scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTransition {
    pub src: BufferAccess,
    pub dst: BufferAccess,
}

/// Required transition of an image between two access scopes/layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    pub src: ImageAccess,
    pub dst: ImageAccess,
}

/// Decide whether a buffer access needs a barrier.
///
/// Returns the transition to emit (if any) and the new access state, which
/// is always exactly `requested`. An access is already satisfied only when
/// it is identical to the current state and read-only: read-after-read with
/// the same stage/access set needs no barrier. Anything else — a write on
/// either side, or any stage/access difference — barriers from the last
/// known state.
pub fn sync_buffer(
    current: BufferAccess,
    requested: BufferAccess,
) -> (Option<BufferTransition>, BufferAccess) {
    if current == requested && !has_write_access(requested.access) {
        return (None, requested);
    }
    (
        Some(BufferTransition {
            src: current,
            dst: requested,
        }),
        requested,
    )
}

/// Decide whether an image access needs a barrier.
///
/// Same rule as `sync_buffer`, with the layout folded into the state
/// comparison: a layout change always forces a barrier even when stage and
/// access are identical, because the underlying API requires an explicit
/// layout transition.
pub fn sync_image(
    current: ImageAccess,
    requested: ImageAccess,
) -> (Option<ImageTransition>, ImageAccess) {
    if current == requested && !has_write_access(requested.access) {
        return (None, requested);
    }
    (
        Some(ImageTransition {
            src: current,
            dst: requested,
        }),
        requested,
    )
}

/// Pipeline stages a set of shader stages executes in
pub fn shader_pipeline_stages(stages: ShaderStages) -> PipelineStages {
    let mut out = PipelineStages::empty();
    if stages.contains(ShaderStages::VERTEX) {
        out |= PipelineStages::VERTEX_SHADER;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        out |= PipelineStages::FRAGMENT_SHADER;
    }
    if stages.contains(ShaderStages::COMPUTE) {
        out |= PipelineStages::COMPUTE_SHADER;
    }
    out
}

/// Access a descriptor-bound buffer requires at the given shader stages
pub fn descriptor_buffer_access(ty: DescriptorType, stages: PipelineStages) -> BufferAccess {
    let access = match ty {
        DescriptorType::UniformBuffer
        | DescriptorType::DynamicUniformBuffer
        | DescriptorType::UniformTexelBuffer => AccessFlags::UNIFORM_READ,
        DescriptorType::StorageBuffer
        | DescriptorType::DynamicStorageBuffer
        | DescriptorType::StorageTexelBuffer => {
            AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE
        }
        // Image and sampler descriptors never reach buffer sync
        _ => AccessFlags::SHADER_READ,
    };
    BufferAccess { stages, access }
}

/// Access a descriptor-bound image requires at the given shader stages
///
/// Sampled images are read in shader-read-only layout; storage images are
/// read/written in general layout.
pub fn descriptor_image_access(ty: DescriptorType, stages: PipelineStages) -> ImageAccess {
    match ty {
        DescriptorType::StorageImage => ImageAccess {
            stages,
            access: AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
            layout: ImageLayout::General,
        },
        _ => ImageAccess {
            stages,
            access: AccessFlags::SHADER_READ,
            layout: ImageLayout::ShaderReadOnly,
        },
    }
}

#[cfg(test)]
#[path = "access_tests.rs"]
mod tests;
