/// Image descriptors, formats, layouts and copy regions

use bitflags::bitflags;

use crate::gpu::handle::ImageId;

/// Image pixel formats
///
/// A representative subset of the formats the modeled API exposes: the
/// common color formats plus every depth/stencil combination, which the
/// aspect inference below depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    Undefined,

    // Color formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_UINT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth/stencil formats
    D16_UNORM,
    D32_SFLOAT,
    S8_UINT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl Format {
    /// Aspects implied by this format
    pub fn aspects(&self) -> ImageAspects {
        match self {
            Format::Undefined => ImageAspects::empty(),
            Format::D16_UNORM | Format::D32_SFLOAT => ImageAspects::DEPTH,
            Format::S8_UINT => ImageAspects::STENCIL,
            Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT => {
                ImageAspects::DEPTH | ImageAspects::STENCIL
            }
            _ => ImageAspects::COLOR,
        }
    }

    /// Whether this format has a depth or stencil aspect
    pub fn is_depth_stencil(&self) -> bool {
        self.aspects()
            .intersects(ImageAspects::DEPTH | ImageAspects::STENCIL)
    }
}

/// Image dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// 1D image
    Tex1D,
    /// 2D image (or 2D array when array_layers > 1)
    Tex2D,
    /// 3D image
    Tex3D,
}

/// Multisample count per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
}

impl SampleCount {
    /// Sample count as an integer
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
        }
    }
}

bitflags! {
    /// Image usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageUsage: u32 {
        /// Source of transfer commands (copies, blits, resolves)
        const TRANSFER_SRC = 1 << 0;
        /// Destination of transfer commands (copies, clears, blits)
        const TRANSFER_DST = 1 << 1;
        /// Sampled in shaders through a descriptor set
        const SAMPLED = 1 << 2;
        /// Storage image accessed in shaders through a descriptor set
        const STORAGE = 1 << 3;
        /// Color attachment of a render pass
        const COLOR_ATTACHMENT = 1 << 4;
        /// Depth/stencil attachment of a render pass
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

bitflags! {
    /// Image aspect mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageAspects: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// GPU-internal memory arrangement of an image
///
/// The layout must match the operation about to use the image; transitions
/// between layouts are explicit barrier operations on the modeled API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Initial layout; contents undefined
    Undefined,
    /// Usable by any operation, potentially suboptimal
    General,
    /// Optimal for color attachment writes
    ColorAttachment,
    /// Optimal for depth/stencil attachment access
    DepthStencilAttachment,
    /// Optimal for read-only depth/stencil access
    DepthStencilReadOnly,
    /// Optimal for shader sampling
    ShaderReadOnly,
    /// Optimal as a transfer source
    TransferSrc,
    /// Optimal as a transfer destination
    TransferDst,
    /// Presentable by the swapchain
    Present,
}

/// 3D extent in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// 3D signed offset in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Descriptor for creating an image
///
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct ImageDesc {
    /// Image dimensionality
    pub image_type: ImageType,
    /// Pixel format
    pub format: Format,
    /// Size in texels
    pub extent: Extent3D,
    /// Number of mip levels
    pub mip_levels: u32,
    /// Number of array layers
    pub array_layers: u32,
    /// Samples per pixel
    pub sample_count: SampleCount,
    /// Usage flags
    pub usage: ImageUsage,
    /// Aspect mask (must match the format's aspects)
    pub aspects: ImageAspects,
}

/// Descriptor for creating an image view
#[derive(Debug, Clone)]
pub struct ImageViewDesc {
    /// Parent image
    pub image: ImageId,
    /// View format (usually the image format)
    pub format: Format,
    /// Viewed aspects (subset of the image's aspect mask)
    pub aspects: ImageAspects,
    /// First mip level visible through the view
    pub base_mip_level: u32,
    /// Number of mip levels visible through the view
    pub mip_level_count: u32,
    /// First array layer visible through the view
    pub base_array_layer: u32,
    /// Number of array layers visible through the view
    pub array_layer_count: u32,
}

/// Range of mip levels and array layers within an image
#[derive(Debug, Clone, Copy)]
pub struct ImageSubresourceRange {
    pub aspects: ImageAspects,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

/// Single mip level and layer range within an image (for copy regions)
#[derive(Debug, Clone, Copy)]
pub struct ImageSubresourceLayers {
    pub aspects: ImageAspects,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

/// Region of an image-to-image copy
#[derive(Debug, Clone, Copy)]
pub struct ImageCopy {
    pub src_layers: ImageSubresourceLayers,
    pub src_offset: Offset3D,
    pub dst_layers: ImageSubresourceLayers,
    pub dst_offset: Offset3D,
    pub extent: Extent3D,
}

/// Region of a buffer-to-image copy
#[derive(Debug, Clone, Copy)]
pub struct BufferImageCopy {
    /// Offset into the buffer in bytes
    pub buffer_offset: u64,
    /// Texels per row in the buffer (0 = tightly packed)
    pub buffer_row_length: u32,
    /// Rows per image in the buffer (0 = tightly packed)
    pub buffer_image_height: u32,
    pub image_layers: ImageSubresourceLayers,
    pub image_offset: Offset3D,
    pub image_extent: Extent3D,
}

/// Region of an image blit (scaled copy)
#[derive(Debug, Clone, Copy)]
pub struct ImageBlit {
    pub src_layers: ImageSubresourceLayers,
    /// Two opposite corners of the source region
    pub src_offsets: [Offset3D; 2],
    pub dst_layers: ImageSubresourceLayers,
    /// Two opposite corners of the destination region
    pub dst_offsets: [Offset3D; 2],
}

/// Region of a multisample resolve
#[derive(Debug, Clone, Copy)]
pub struct ImageResolve {
    pub src_layers: ImageSubresourceLayers,
    pub src_offset: Offset3D,
    pub dst_layers: ImageSubresourceLayers,
    pub dst_offset: Offset3D,
    pub extent: Extent3D,
}

/// Sampling filter for blits and samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}
