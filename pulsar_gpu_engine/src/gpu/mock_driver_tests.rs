/// Unit tests for the mock driver itself

use std::sync::Arc;

use crate::gpu::buffer::{BufferDesc, BufferUsage};
use crate::gpu::driver::{DeviceDriver, NativeCommandBuffer};
use crate::gpu::mock_driver::MockDriver;

#[test]
fn test_calls_are_recorded_in_order() {
    let driver = MockDriver::new();
    let desc = BufferDesc {
        size: 64,
        usage: BufferUsage::TRANSFER_DST,
        host_visible: false,
    };

    let buffer = driver.create_buffer(&desc).unwrap();
    driver.cmd_fill_buffer(NativeCommandBuffer(1), buffer, 0, 64, 0);
    driver.release_buffer(buffer);

    assert_eq!(
        driver.calls(),
        vec!["create_buffer", "cmd_fill_buffer", "release_buffer"]
    );
}

#[test]
fn test_handles_are_unique() {
    let driver = MockDriver::new();
    let desc = BufferDesc {
        size: 64,
        usage: BufferUsage::TRANSFER_DST,
        host_visible: false,
    };
    let a = driver.create_buffer(&desc).unwrap();
    let b = driver.create_buffer(&desc).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_fence_lifecycle() {
    let driver = Arc::new(MockDriver::new());
    let fence = driver.create_fence(true).unwrap();
    assert!(driver.fence_signaled(fence));

    driver.reset_fence(fence).unwrap();
    assert!(!driver.fence_signaled(fence));

    driver.trigger_fence(fence);
    assert!(driver.fence_signaled(fence));

    // A signaled fence does not block
    driver.wait_fence(fence).unwrap();
}

#[test]
fn test_failure_injection_is_one_shot() {
    let driver = MockDriver::new();
    let desc = BufferDesc {
        size: 64,
        usage: BufferUsage::TRANSFER_DST,
        host_visible: false,
    };
    driver.fail_next_creation();
    assert!(driver.create_buffer(&desc).is_err());
    assert!(driver.create_buffer(&desc).is_ok());
}
