/// Sampler descriptor

use crate::gpu::image::Filter;

/// Texture coordinate addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Descriptor for creating a sampler
///
/// Immutable after creation.
#[derive(Debug, Clone)]
pub struct SamplerDesc {
    /// Magnification filter
    pub mag_filter: Filter,
    /// Minification filter
    pub min_filter: Filter,
    /// Filter between mip levels
    pub mipmap_filter: Filter,
    /// Addressing in u
    pub address_mode_u: AddressMode,
    /// Addressing in v
    pub address_mode_v: AddressMode,
    /// Addressing in w
    pub address_mode_w: AddressMode,
    /// Minimum level-of-detail clamp
    pub min_lod: f32,
    /// Maximum level-of-detail clamp
    pub max_lod: f32,
    /// Maximum anisotropy (1.0 disables anisotropic filtering)
    pub max_anisotropy: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_filter: Filter::Linear,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            min_lod: 0.0,
            max_lod: f32::MAX,
            max_anisotropy: 1.0,
        }
    }
}
