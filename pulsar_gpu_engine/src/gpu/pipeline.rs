/// Shader and pipeline descriptors

use bitflags::bitflags;

use crate::gpu::handle::{DescriptorSetLayoutId, ShaderId};
use crate::gpu::image::{Format, SampleCount};

bitflags! {
    /// Shader stage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

/// Descriptor for creating a shader module
///
/// The engine treats the SPIR-V blob as opaque; shader authoring and
/// compilation happen outside this layer.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// SPIR-V code words
    pub spirv: Vec<u32>,
}

/// Descriptor for creating a compute pipeline
#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    /// Compute shader module
    pub shader: ShaderId,
    /// Entry point name in the shader module
    pub entry_point: String,
    /// Descriptor set layouts, in set-index order
    pub set_layouts: Vec<DescriptorSetLayoutId>,
    /// Push constant range size in bytes (0 = none)
    pub push_constant_size: u32,
}

/// Vertex fetch rate of a vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    /// Advance per vertex
    Vertex,
    /// Advance per instance
    Instance,
}

/// One vertex buffer binding slot of a graphics pipeline
#[derive(Debug, Clone, Copy)]
pub struct VertexBinding {
    /// Binding index
    pub binding: u32,
    /// Stride between consecutive elements in bytes
    pub stride: u32,
    /// Fetch rate
    pub input_rate: VertexInputRate,
}

/// One vertex attribute of a graphics pipeline
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Vertex buffer binding the attribute reads from
    pub binding: u32,
    /// Attribute format
    pub format: Format,
    /// Offset within one element in bytes
    pub offset: u32,
}

/// Primitive assembly topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

/// Descriptor for creating a graphics pipeline
///
/// Kept to the state this layer needs; rasterizer/blend fine-tuning rides
/// on the backend's defaults.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    /// Vertex shader module
    pub vertex_shader: ShaderId,
    /// Vertex entry point name
    pub vertex_entry_point: String,
    /// Fragment shader module
    pub fragment_shader: ShaderId,
    /// Fragment entry point name
    pub fragment_entry_point: String,
    /// Descriptor set layouts, in set-index order
    pub set_layouts: Vec<DescriptorSetLayoutId>,
    /// Push constant range size in bytes (0 = none)
    pub push_constant_size: u32,
    /// Vertex buffer bindings
    pub vertex_bindings: Vec<VertexBinding>,
    /// Vertex attributes
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Formats of the color attachments rendered into
    pub color_formats: Vec<Format>,
    /// Format of the depth attachment, if any
    pub depth_format: Option<Format>,
    /// Format of the stencil attachment, if any
    pub stencil_format: Option<Format>,
    /// Samples per pixel
    pub sample_count: SampleCount,
}
