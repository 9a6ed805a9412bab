/// GPU module - render graph and synchronization engine
///
/// Records device-agnostic commands against logical resource handles,
/// tracks each resource's last-known GPU access state, and inserts the
/// minimal pipeline barriers needed for correct execution on an explicit,
/// no-implicit-synchronization graphics API.

// Module declarations
pub mod handle;
pub mod buffer;
pub mod image;
pub mod sampler;
pub mod render_pass;
pub mod descriptor;
pub mod pipeline;
pub mod access;
pub mod barrier;
pub mod driver;
pub mod arena;
pub mod pool;
pub mod validator;
pub mod render_command;
pub mod recorder;
pub mod swapchain;
pub mod frame;

// Re-export everything from the leaf modules
pub use handle::*;
pub use buffer::*;
pub use image::*;
pub use sampler::*;
pub use render_pass::*;
pub use descriptor::*;
pub use pipeline::*;
pub use access::*;
pub use barrier::*;
pub use driver::*;
pub use arena::*;
pub use pool::*;
pub use render_command::*;
pub use recorder::*;
pub use swapchain::*;
pub use frame::*;

// Mock driver for tests (no GPU required)
#[cfg(test)]
pub mod mock_driver;

// ===== FIXED LIMITS =====

/// Maximum color attachments of a render pass or pipeline
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

/// Maximum descriptor sets bound at once
pub const MAX_DESCRIPTOR_SETS: usize = 8;

/// Maximum vertex buffer binding slots
pub const MAX_VERTEX_BUFFER_BINDINGS: usize = 8;

/// Maximum push constant range size in bytes
pub const MAX_PUSH_CONSTANT_SIZE: usize = 128;

/// Maximum inline data size of `update_buffer` in bytes
pub const MAX_UPDATE_BUFFER_SIZE: usize = 65536;

/// Required alignment of transfer offsets and sizes in bytes
pub const TRANSFER_ALIGNMENT: u64 = 4;

/// Required alignment of dynamic descriptor offsets in bytes
pub const DYNAMIC_OFFSET_ALIGNMENT: u64 = 256;

/// Maximum supported frames in flight
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// Default element budget of each per-frame arena
pub const DEFAULT_ARENA_CAPACITY: usize = 4096;
