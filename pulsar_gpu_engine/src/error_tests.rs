/// Unit tests for Status and Result types

use crate::error::Status;

#[test]
fn test_status_display_simple_variants() {
    assert_eq!(Status::OutOfHostMemory.to_string(), "Out of host memory");
    assert_eq!(Status::OutOfDeviceMemory.to_string(), "Out of device memory");
    assert_eq!(Status::DeviceLost.to_string(), "Device lost");
    assert_eq!(Status::Timeout.to_string(), "Wait timed out");
}

#[test]
fn test_status_display_with_message() {
    let status = Status::BackendError("queue submit failed".to_string());
    assert_eq!(status.to_string(), "Backend error: queue submit failed");

    let status = Status::InitializationFailed("no suitable device".to_string());
    assert_eq!(status.to_string(), "Initialization failed: no suitable device");
}

#[test]
fn test_status_is_error_trait_object() {
    let status: Box<dyn std::error::Error> = Box::new(Status::DeviceLost);
    assert_eq!(status.to_string(), "Device lost");
}

#[test]
fn test_status_equality() {
    assert_eq!(Status::OutOfHostMemory, Status::OutOfHostMemory);
    assert_ne!(Status::OutOfHostMemory, Status::OutOfDeviceMemory);
    assert_eq!(
        Status::BackendError("a".to_string()),
        Status::BackendError("a".to_string())
    );
}
