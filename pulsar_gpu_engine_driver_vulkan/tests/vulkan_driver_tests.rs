//! Integration tests for the Vulkan driver
//!
//! Tests requiring a GPU and a display are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_driver_tests -- --ignored

use std::sync::{Arc, OnceLock};

use pulsar_gpu_engine::pulsar::gpu::{
    BufferDesc, BufferUsage, DeviceDriver, ShaderStages,
};
use pulsar_gpu_engine::pulsar::gpu::{
    DescriptorBindingDesc, DescriptorSetLayoutDesc, DescriptorType,
};
use pulsar_gpu_engine_driver_vulkan::pulsar::{Config, GpuContext, VulkanDriver};
use serial_test::serial;
use winit::event_loop::EventLoopBuilder;
use winit::window::Window;

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;

/// Shared driver: one EventLoop/surface per test process
static DRIVER: OnceLock<Arc<VulkanDriver>> = OnceLock::new();
static WINDOW: OnceLock<Window> = OnceLock::new();

#[allow(deprecated)]
fn create_driver() -> Arc<VulkanDriver> {
    DRIVER
        .get_or_init(|| {
            let event_loop = {
                #[cfg(target_os = "windows")]
                {
                    EventLoopBuilder::new()
                        .with_any_thread(true)
                        .build()
                        .unwrap()
                }
                #[cfg(not(target_os = "windows"))]
                {
                    EventLoopBuilder::new().build().unwrap()
                }
            };
            let window = event_loop
                .create_window(
                    Window::default_attributes()
                        .with_inner_size(winit::dpi::LogicalSize::new(640, 480))
                        .with_visible(false),
                )
                .unwrap();
            std::mem::forget(event_loop);

            let ctx = GpuContext::new(&window, Config::default()).unwrap();
            WINDOW.set(window).ok();
            Arc::new(VulkanDriver::new(Arc::new(ctx)))
        })
        .clone()
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_driver_resource_roundtrip() {
    let driver = create_driver();

    let buffer = driver
        .create_buffer(&BufferDesc {
            size: 1024,
            usage: BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST,
            host_visible: false,
        })
        .unwrap();

    let layout = driver
        .create_descriptor_set_layout(&DescriptorSetLayoutDesc {
            bindings: vec![DescriptorBindingDesc {
                binding: 0,
                ty: DescriptorType::UniformBuffer,
                count: 1,
                stages: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            }],
        })
        .unwrap();
    let set = driver.create_descriptor_set(layout).unwrap();

    driver.release_descriptor_set(set);
    driver.release_descriptor_set_layout(layout);
    driver.release_buffer(buffer);
    driver.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_swapchain_creation_and_recreation() {
    let driver = create_driver();

    let swapchain = driver.create_swapchain(640, 480).unwrap();
    assert!(swapchain.image_count() >= 2);
    assert!(swapchain.is_valid());

    let info = driver.recreate_swapchain(swapchain.native()).unwrap();
    assert!(info.image_count >= 2);

    driver.destroy_swapchain(swapchain);
}
