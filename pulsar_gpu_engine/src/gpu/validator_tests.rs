/// Unit tests for precondition validation
///
/// Violations terminate; the passing paths simply return.

use crate::gpu::buffer::{BufferDesc, BufferUsage};
use crate::gpu::image::{
    Extent3D, Format, ImageAspects, ImageDesc, ImageSubresourceLayers, ImageSubresourceRange,
    ImageType, ImageUsage, SampleCount,
};
use crate::gpu::validator::*;

fn test_buffer_desc() -> BufferDesc {
    BufferDesc {
        size: 256,
        usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
        host_visible: false,
    }
}

fn test_image_desc() -> ImageDesc {
    ImageDesc {
        image_type: ImageType::Tex2D,
        format: Format::R8G8B8A8_UNORM,
        extent: Extent3D {
            width: 64,
            height: 64,
            depth: 1,
        },
        mip_levels: 4,
        array_layers: 2,
        sample_count: SampleCount::S1,
        usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
        aspects: ImageAspects::COLOR,
    }
}

// ============================================================================
// Usage flags
// ============================================================================

#[test]
fn test_buffer_usage_present_passes() {
    check_buffer_usage(&test_buffer_desc(), BufferUsage::TRANSFER_SRC, "copy source");
}

#[test]
#[should_panic(expected = "copy source requires buffer usage")]
fn test_buffer_usage_absent_is_fatal() {
    check_buffer_usage(&test_buffer_desc(), BufferUsage::STORAGE, "copy source");
}

#[test]
#[should_panic(expected = "storage image requires image usage")]
fn test_image_usage_absent_is_fatal() {
    check_image_usage(&test_image_desc(), ImageUsage::STORAGE, "storage image");
}

// ============================================================================
// Ranges and alignment
// ============================================================================

#[test]
fn test_buffer_range_within_bounds_passes() {
    let desc = test_buffer_desc();
    check_buffer_range(&desc, 0, 256, "range");
    check_buffer_range(&desc, 128, 128, "range");
    check_buffer_range(&desc, 256, 0, "range");
}

#[test]
#[should_panic(expected = "offset 300 exceeds buffer size 256")]
fn test_buffer_range_offset_out_of_bounds_is_fatal() {
    check_buffer_range(&test_buffer_desc(), 300, 0, "range");
}

#[test]
#[should_panic(expected = "size 512 exceeds buffer size 256")]
fn test_buffer_range_size_out_of_bounds_is_fatal() {
    check_buffer_range(&test_buffer_desc(), 0, 512, "range");
}

#[test]
#[should_panic(expected = "exceeds buffer size 256")]
fn test_buffer_range_end_out_of_bounds_is_fatal() {
    check_buffer_range(&test_buffer_desc(), 128, 200, "range");
}

#[test]
#[should_panic(expected = "exceeds buffer size")]
fn test_buffer_range_overflowing_sum_is_fatal() {
    let desc = BufferDesc {
        size: u64::MAX,
        usage: BufferUsage::TRANSFER_DST,
        host_visible: false,
    };
    // offset + size wraps u64; the overflow must be caught, not wrapped
    check_buffer_range(&desc, u64::MAX, 2, "range");
}

#[test]
fn test_alignment_passes() {
    check_alignment(0, 4, "offset");
    check_alignment(256, 4, "offset");
}

#[test]
#[should_panic(expected = "offset must be aligned to 4 bytes, got 3")]
fn test_misalignment_is_fatal() {
    check_alignment(3, 4, "offset");
}

// ============================================================================
// Subresources
// ============================================================================

#[test]
fn test_subresource_range_within_bounds_passes() {
    let desc = test_image_desc();
    check_subresource_range(
        &desc,
        &ImageSubresourceRange {
            aspects: ImageAspects::COLOR,
            base_mip_level: 1,
            mip_level_count: 3,
            base_array_layer: 0,
            array_layer_count: 2,
        },
        "range",
    );
}

#[test]
#[should_panic(expected = "not covered by image aspects")]
fn test_subresource_foreign_aspect_is_fatal() {
    let desc = test_image_desc();
    check_subresource_range(
        &desc,
        &ImageSubresourceRange {
            aspects: ImageAspects::DEPTH,
            base_mip_level: 0,
            mip_level_count: 1,
            base_array_layer: 0,
            array_layer_count: 1,
        },
        "range",
    );
}

#[test]
#[should_panic(expected = "mip range")]
fn test_subresource_mip_overflow_is_fatal() {
    let desc = test_image_desc();
    check_subresource_range(
        &desc,
        &ImageSubresourceRange {
            aspects: ImageAspects::COLOR,
            base_mip_level: 2,
            mip_level_count: 3,
            base_array_layer: 0,
            array_layer_count: 1,
        },
        "range",
    );
}

#[test]
#[should_panic(expected = "layer range")]
fn test_subresource_layer_overflow_is_fatal() {
    let desc = test_image_desc();
    check_subresource_layers(
        &desc,
        &ImageSubresourceLayers {
            aspects: ImageAspects::COLOR,
            mip_level: 0,
            base_array_layer: 1,
            array_layer_count: 2,
        },
        "layers",
    );
}

// ============================================================================
// Counts
// ============================================================================

#[test]
fn test_count_within_maximum_passes() {
    check_count(8, 8, "attachment");
}

#[test]
#[should_panic(expected = "attachment count 9 exceeds maximum 8")]
fn test_count_above_maximum_is_fatal() {
    check_count(9, 8, "attachment");
}

#[test]
#[should_panic(expected = "size must be non-zero")]
fn test_zero_value_is_fatal() {
    check_nonzero(0, "size");
}
