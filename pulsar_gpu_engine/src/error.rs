//! Error types for the Pulsar GPU engine
//!
//! This module defines the recoverable error taxonomy used throughout the
//! engine: resource exhaustion, device loss, and backend failures.
//! Precondition violations are NOT represented here — they are programmer
//! errors and terminate through the validator's fatal path.

use std::fmt;

/// Result type for Pulsar GPU engine operations
pub type Result<T> = std::result::Result<T, Status>;

/// Recoverable failure statuses reported by the device or the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Host allocation failed (including per-frame arena exhaustion)
    OutOfHostMemory,

    /// Device allocation failed during resource creation
    OutOfDeviceMemory,

    /// The device was lost; no recovery is attempted at this layer
    DeviceLost,

    /// A fence or device wait timed out
    Timeout,

    /// Backend-specific error (Vulkan, driver, etc.)
    BackendError(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::OutOfHostMemory => write!(f, "Out of host memory"),
            Status::OutOfDeviceMemory => write!(f, "Out of device memory"),
            Status::DeviceLost => write!(f, "Device lost"),
            Status::Timeout => write!(f, "Wait timed out"),
            Status::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Status::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
