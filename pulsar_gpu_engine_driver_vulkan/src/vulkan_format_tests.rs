/// Unit tests for engine ↔ Vulkan conversions

use ash::vk;
use pulsar_gpu_engine::pulsar::gpu::{
    AccessFlags, Format, ImageLayout, PipelineStages, StencilFaces,
};
use pulsar_gpu_engine::pulsar::Status;

use super::*;

#[test]
fn test_format_round_trip() {
    let formats = [
        Format::R8_UNORM,
        Format::R8G8B8A8_UNORM,
        Format::B8G8R8A8_SRGB,
        Format::R16G16B16A16_SFLOAT,
        Format::D32_SFLOAT,
        Format::D24_UNORM_S8_UINT,
        Format::S8_UINT,
    ];
    for format in formats {
        assert_eq!(vk_to_format(format_to_vk(format)), format);
    }
}

#[test]
fn test_unknown_vk_format_maps_to_undefined() {
    assert_eq!(vk_to_format(vk::Format::ASTC_4X4_SRGB_BLOCK), Format::Undefined);
}

#[test]
fn test_layout_mapping() {
    assert_eq!(layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(
        layout_to_vk(ImageLayout::ShaderReadOnly),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
    assert_eq!(
        layout_to_vk(ImageLayout::Present),
        vk::ImageLayout::PRESENT_SRC_KHR
    );
}

#[test]
fn test_stage_mask_mapping_is_bitwise() {
    let stages = PipelineStages::TRANSFER | PipelineStages::COMPUTE_SHADER;
    let vk_stages = stages_to_vk(stages);
    assert!(vk_stages.contains(vk::PipelineStageFlags::TRANSFER));
    assert!(vk_stages.contains(vk::PipelineStageFlags::COMPUTE_SHADER));
    assert!(!vk_stages.contains(vk::PipelineStageFlags::FRAGMENT_SHADER));
}

#[test]
fn test_access_mask_mapping_is_bitwise() {
    let access = AccessFlags::TRANSFER_READ | AccessFlags::SHADER_WRITE;
    let vk_access = access_to_vk(access);
    assert!(vk_access.contains(vk::AccessFlags::TRANSFER_READ));
    assert!(vk_access.contains(vk::AccessFlags::SHADER_WRITE));
    assert!(!vk_access.contains(vk::AccessFlags::TRANSFER_WRITE));
}

#[test]
fn test_empty_barrier_scopes_resolve_to_pipe_ends() {
    assert_eq!(
        src_stages_to_vk(PipelineStages::empty()),
        vk::PipelineStageFlags::TOP_OF_PIPE
    );
    assert_eq!(
        dst_stages_to_vk(PipelineStages::empty()),
        vk::PipelineStageFlags::BOTTOM_OF_PIPE
    );
    assert_eq!(
        src_stages_to_vk(PipelineStages::TRANSFER),
        vk::PipelineStageFlags::TRANSFER
    );
}

#[test]
fn test_stencil_faces_mapping() {
    assert_eq!(
        stencil_faces_to_vk(StencilFaces::FrontAndBack),
        vk::StencilFaceFlags::FRONT_AND_BACK
    );
}

#[test]
fn test_vk_result_to_status_taxonomy() {
    assert_eq!(
        vk_result_to_status(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY, "alloc"),
        Status::OutOfDeviceMemory
    );
    assert_eq!(
        vk_result_to_status(vk::Result::ERROR_DEVICE_LOST, "submit"),
        Status::DeviceLost
    );
    match vk_result_to_status(vk::Result::ERROR_UNKNOWN, "submit") {
        Status::BackendError(message) => assert!(message.contains("submit")),
        other => panic!("unexpected status {:?}", other),
    }
}
