/// Render pass and framebuffer descriptors

use crate::gpu::handle::{ImageViewId, RenderPassId};
use crate::gpu::image::{Format, SampleCount};

/// What happens to an attachment's contents when a pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Preserve the existing contents (counts as an attachment read)
    Load,
    /// Clear to the pass's clear value
    Clear,
    /// Contents may be discarded
    DontCare,
}

/// What happens to an attachment's contents when a pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Write results out
    Store,
    /// Results may be discarded
    DontCare,
    /// The attachment is not written at all (read-only attachments)
    None,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// One attachment slot of a render pass object
#[derive(Debug, Clone)]
pub struct AttachmentDesc {
    pub format: Format,
    pub sample_count: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
}

/// Descriptor for creating a render pass object
///
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_stencil_attachment: Option<AttachmentDesc>,
}

/// Descriptor for creating a framebuffer
#[derive(Debug, Clone)]
pub struct FramebufferDesc {
    /// Render pass the framebuffer is compatible with
    pub render_pass: RenderPassId,
    /// Color attachment views, in attachment order
    pub color_attachments: Vec<ImageViewId>,
    /// Depth/stencil attachment view, if any
    pub depth_stencil_attachment: Option<ImageViewId>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of layers
    pub layers: u32,
}
