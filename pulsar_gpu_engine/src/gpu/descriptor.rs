/// Descriptor set layouts, descriptor sets and binding updates

use crate::gpu::handle::{BufferId, BufferViewId, ImageViewId, SamplerId, DescriptorSetLayoutId};
use crate::gpu::pipeline::ShaderStages;

/// Kind of resource a descriptor binding holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    DynamicUniformBuffer,
    DynamicStorageBuffer,
}

impl DescriptorType {
    /// Whether shaders may write through this descriptor
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            DescriptorType::StorageImage
                | DescriptorType::StorageTexelBuffer
                | DescriptorType::StorageBuffer
                | DescriptorType::DynamicStorageBuffer
        )
    }

    /// Whether this descriptor consumes a dynamic offset at bind time
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            DescriptorType::DynamicUniformBuffer | DescriptorType::DynamicStorageBuffer
        )
    }
}

/// One binding slot of a descriptor set layout
#[derive(Debug, Clone)]
pub struct DescriptorBindingDesc {
    /// Binding index within the set
    pub binding: u32,
    /// Resource kind
    pub ty: DescriptorType,
    /// Number of array elements
    pub count: u32,
    /// Shader stages that access this binding
    pub stages: ShaderStages,
}

/// Descriptor for creating a descriptor set layout
///
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutDesc {
    /// Bindings in ascending binding-index order
    pub bindings: Vec<DescriptorBindingDesc>,
}

/// Descriptor for allocating a descriptor set
#[derive(Debug, Clone)]
pub struct DescriptorSetDesc {
    /// Layout the set is allocated against
    pub layout: DescriptorSetLayoutId,
}

/// A resource bound into one descriptor array element
#[derive(Debug, Clone, Copy)]
pub enum DescriptorResource {
    /// Uniform or storage buffer range
    Buffer {
        buffer: BufferId,
        offset: u64,
        size: u64,
    },
    /// Uniform or storage texel buffer view
    TexelBuffer { view: BufferViewId },
    /// Sampled or storage image view
    Image { view: ImageViewId },
    /// Combined image + sampler
    CombinedImageSampler {
        view: ImageViewId,
        sampler: SamplerId,
    },
    /// Standalone sampler
    Sampler { sampler: SamplerId },
}

/// Update of one binding of a descriptor set
#[derive(Debug, Clone)]
pub struct DescriptorWrite {
    /// Binding index within the set
    pub binding: u32,
    /// Resources written to the binding's array elements, starting at 0
    pub resources: Vec<DescriptorResource>,
}
