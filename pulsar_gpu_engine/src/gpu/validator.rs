/// Precondition validation
///
/// Every mutating or recording entry point runs its checks here before any
/// state changes or native command is emitted. A failed check is a contract
/// breach by the caller, not a runtime condition: it terminates through
/// `engine_fatal!` with a diagnostic, because recording past a violated
/// precondition risks silent GPU corruption, which is categorically worse
/// than a host-side abort. The checks are cheap (O(1) or O(region count))
/// and run unconditionally in every build.

use crate::engine_fatal;
use crate::gpu::buffer::{BufferDesc, BufferUsage};
use crate::gpu::image::{
    ImageAspects, ImageDesc, ImageSubresourceLayers, ImageSubresourceRange, ImageUsage,
};

const SOURCE: &str = "pulsar::gpu::validator";

/// The buffer must carry every flag in `required` for the given role
pub fn check_buffer_usage(desc: &BufferDesc, required: BufferUsage, role: &str) {
    if !desc.usage.contains(required) {
        engine_fatal!(
            SOURCE,
            "{} requires buffer usage {:?}, buffer was created with {:?}",
            role,
            required,
            desc.usage
        );
    }
}

/// The image must carry every flag in `required` for the given role
pub fn check_image_usage(desc: &ImageDesc, required: ImageUsage, role: &str) {
    if !desc.usage.contains(required) {
        engine_fatal!(
            SOURCE,
            "{} requires image usage {:?}, image was created with {:?}",
            role,
            required,
            desc.usage
        );
    }
}

/// `[offset, offset + size)` must lie within the buffer
///
/// Offset, size, and their sum are checked independently so an overflowing
/// sum cannot slip a bad range past a single combined comparison.
pub fn check_buffer_range(desc: &BufferDesc, offset: u64, size: u64, role: &str) {
    if offset > desc.size {
        engine_fatal!(
            SOURCE,
            "{}: offset {} exceeds buffer size {}",
            role,
            offset,
            desc.size
        );
    }
    if size > desc.size {
        engine_fatal!(
            SOURCE,
            "{}: size {} exceeds buffer size {}",
            role,
            size,
            desc.size
        );
    }
    match offset.checked_add(size) {
        Some(end) if end <= desc.size => {}
        _ => engine_fatal!(
            SOURCE,
            "{}: range [{}, {} + {}) exceeds buffer size {}",
            role,
            offset,
            offset,
            size,
            desc.size
        ),
    }
}

/// `value` must be a multiple of `alignment`
pub fn check_alignment(value: u64, alignment: u64, what: &str) {
    if value % alignment != 0 {
        engine_fatal!(
            SOURCE,
            "{} must be aligned to {} bytes, got {}",
            what,
            alignment,
            value
        );
    }
}

/// The subresource range must stay within the image's declared aspects,
/// mip levels and array layers
pub fn check_subresource_range(desc: &ImageDesc, range: &ImageSubresourceRange, role: &str) {
    check_aspects(desc, range.aspects, role);
    check_mip_layer_span(
        desc,
        range.base_mip_level,
        range.mip_level_count,
        range.base_array_layer,
        range.array_layer_count,
        role,
    );
}

/// The subresource layers must stay within the image's declared aspects,
/// mip levels and array layers
pub fn check_subresource_layers(desc: &ImageDesc, layers: &ImageSubresourceLayers, role: &str) {
    check_aspects(desc, layers.aspects, role);
    check_mip_layer_span(
        desc,
        layers.mip_level,
        1,
        layers.base_array_layer,
        layers.array_layer_count,
        role,
    );
}

/// The aspects must be non-empty and a subset of the image's aspect mask
pub fn check_aspects(desc: &ImageDesc, aspects: ImageAspects, role: &str) {
    if aspects.is_empty() {
        engine_fatal!(SOURCE, "{}: empty aspect mask", role);
    }
    if !desc.aspects.contains(aspects) {
        engine_fatal!(
            SOURCE,
            "{}: aspects {:?} not covered by image aspects {:?}",
            role,
            aspects,
            desc.aspects
        );
    }
}

fn check_mip_layer_span(
    desc: &ImageDesc,
    base_mip: u32,
    mip_count: u32,
    base_layer: u32,
    layer_count: u32,
    role: &str,
) {
    if mip_count == 0 || layer_count == 0 {
        engine_fatal!(SOURCE, "{}: empty mip or layer range", role);
    }
    match base_mip.checked_add(mip_count) {
        Some(end) if end <= desc.mip_levels => {}
        _ => engine_fatal!(
            SOURCE,
            "{}: mip range [{}, {} + {}) exceeds {} mip levels",
            role,
            base_mip,
            base_mip,
            mip_count,
            desc.mip_levels
        ),
    }
    match base_layer.checked_add(layer_count) {
        Some(end) if end <= desc.array_layers => {}
        _ => engine_fatal!(
            SOURCE,
            "{}: layer range [{}, {} + {}) exceeds {} array layers",
            role,
            base_layer,
            base_layer,
            layer_count,
            desc.array_layers
        ),
    }
}

/// `count` must not exceed the fixed maximum for the given argument kind
pub fn check_count(count: usize, max: usize, what: &str) {
    if count > max {
        engine_fatal!(SOURCE, "{} count {} exceeds maximum {}", what, count, max);
    }
}

/// `value` must be non-zero
pub fn check_nonzero(value: u64, what: &str) {
    if value == 0 {
        engine_fatal!(SOURCE, "{} must be non-zero", what);
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
