/// Buffer descriptors, usage flags and copy regions

use bitflags::bitflags;

use crate::gpu::handle::BufferId;
use crate::gpu::image::Format;

bitflags! {
    /// Buffer usage flags
    ///
    /// Declared at creation; the validator rejects any command that uses a
    /// buffer in a role its usage flags do not cover.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        /// Source of transfer commands (copies, blits)
        const TRANSFER_SRC = 1 << 0;
        /// Destination of transfer commands (copies, fills, updates)
        const TRANSFER_DST = 1 << 1;
        /// Uniform texel buffer accessed through a buffer view
        const UNIFORM_TEXEL = 1 << 2;
        /// Storage texel buffer accessed through a buffer view
        const STORAGE_TEXEL = 1 << 3;
        /// Uniform buffer bound through a descriptor set
        const UNIFORM = 1 << 4;
        /// Storage buffer bound through a descriptor set
        const STORAGE = 1 << 5;
        /// Index buffer for indexed draws
        const INDEX = 1 << 6;
        /// Vertex buffer for draws
        const VERTEX = 1 << 7;
        /// Source of indirect draw/dispatch arguments
        const INDIRECT = 1 << 8;
    }
}

/// Descriptor for creating a buffer
///
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage flags
    pub usage: BufferUsage,
    /// Whether the buffer memory is host-visible (mappable)
    pub host_visible: bool,
}

/// Descriptor for creating a buffer view
///
/// A buffer view exposes a formatted range of a texel buffer to shaders.
#[derive(Debug, Clone)]
pub struct BufferViewDesc {
    /// Parent buffer
    pub buffer: BufferId,
    /// Texel format of the view
    pub format: Format,
    /// Offset into the parent buffer in bytes
    pub offset: u64,
    /// Size of the viewed range in bytes
    pub size: u64,
}

/// Index element type for index buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit unsigned indices
    U16,
    /// 32-bit unsigned indices
    U32,
}

impl IndexType {
    /// Returns size in bytes of one index element.
    ///
    /// This is also the required alignment of an index buffer binding
    /// offset.
    pub fn size_bytes(&self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Region of a buffer-to-buffer copy
#[derive(Debug, Clone, Copy)]
pub struct BufferCopy {
    /// Offset into the source buffer in bytes
    pub src_offset: u64,
    /// Offset into the destination buffer in bytes
    pub dst_offset: u64,
    /// Number of bytes to copy
    pub size: u64,
}
