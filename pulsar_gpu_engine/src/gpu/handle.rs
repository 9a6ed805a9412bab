/// Logical resource handles
///
/// Opaque, copyable identifiers backed by generational slotmap keys.
/// A handle carries no ownership: the ResourcePool owns the resource, and a
/// handle is either live (present in its pool) or invalid. Dereferencing an
/// invalid handle through the pool is a fatal error.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a buffer resource
    pub struct BufferId;

    /// Handle to a buffer view resource
    pub struct BufferViewId;

    /// Handle to an image resource
    pub struct ImageId;

    /// Handle to an image view resource
    pub struct ImageViewId;

    /// Handle to a sampler resource
    pub struct SamplerId;

    /// Handle to a shader module resource
    pub struct ShaderId;

    /// Handle to a render pass resource
    pub struct RenderPassId;

    /// Handle to a framebuffer resource
    pub struct FramebufferId;

    /// Handle to a descriptor set layout resource
    pub struct DescriptorSetLayoutId;

    /// Handle to a descriptor set resource
    pub struct DescriptorSetId;

    /// Handle to a compute pipeline resource
    pub struct ComputePipelineId;

    /// Handle to a graphics pipeline resource
    pub struct GraphicsPipelineId;
}
